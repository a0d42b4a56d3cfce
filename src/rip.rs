//! Ripping engine, post-rip renaming and lossless re-encoding.

use std::path::{Path, PathBuf};
use std::process::Command;

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use walkdir::WalkDir;

use crate::models::DiscLayout;

/// Name given to the engine's table-of-contents pseudo-track.
const TOC_TRACK_STEM: &str = "00 - CDDA TOC";

#[derive(Error, Debug)]
pub enum RipError {
    #[error("Ripping engine failed: {0}")]
    Engine(String),
    #[error("Expected {expected} ripped tracks, found {found}")]
    RenameCountMismatch { expected: usize, found: usize },
    #[error("Failed to rename {} to {}: {source}", from.display(), to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Re-encoding {} failed: {message}", path.display())]
    Encode { path: PathBuf, message: String },
    #[error("Interrupted")]
    Interrupted,
}

/// External audio extraction tool.
pub trait RipEngine {
    /// Rip every track into `directory`.
    fn rip(&mut self, directory: &Path) -> Result<(), RipError>;

    /// Default filename the engine gives track `number` (1-based).
    fn raw_track_name(&self, number: u32) -> String;

    /// Filename of the table-of-contents pseudo-track, when the engine makes one.
    fn raw_toc_name(&self) -> Option<String>;

    /// Extension of the raw audio files.
    fn raw_extension(&self) -> &str;
}

pub struct Cdparanoia {
    command: String,
    read_speed: u32,
}

impl Cdparanoia {
    pub fn new(command: impl Into<String>, read_speed: u32) -> Self {
        Self {
            command: command.into(),
            read_speed,
        }
    }
}

impl RipEngine for Cdparanoia {
    fn rip(&mut self, directory: &Path) -> Result<(), RipError> {
        let mut cmd = Command::new(&self.command);
        cmd.args([
            "--log-debug=/dev/null",
            "--log-summary=/dev/null",
            "--output-wav",
            "--batch",
        ])
        .arg(format!("--force-read-speed={}", self.read_speed))
        .arg("--never-skip")
        .current_dir(directory);

        log::info!("Ripping into {}", directory.display());
        log::debug!("Running {cmd:?}");
        let status = cmd
            .status()
            .map_err(|e| RipError::Engine(format!("could not run {}: {e}", self.command)))?;
        if crate::interrupt::killed_by_signal(&status) {
            return Err(RipError::Interrupted);
        }
        if !status.success() {
            return Err(RipError::Engine(format!("{} exited with {status}", self.command)));
        }
        Ok(())
    }

    fn raw_track_name(&self, number: u32) -> String {
        format!("track{number:02}.cdda.wav")
    }

    fn raw_toc_name(&self) -> Option<String> {
        Some(self.raw_track_name(0))
    }

    fn raw_extension(&self) -> &str {
        "wav"
    }
}

/// Raw audio files the engine left in `directory`, excluding the TOC pseudo-track.
fn count_raw_tracks(directory: &Path, engine: &dyn RipEngine) -> usize {
    let toc = engine.raw_toc_name();
    let ext = engine.raw_extension();
    WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some(ext))
        .filter(|e| toc.as_deref() != e.file_name().to_str())
        .count()
}

/// Verify the rip produced one raw file per track, then give every file its final name.
///
/// Nothing is renamed when the count is wrong. Returns the final track paths.
pub fn commit_names(
    layout: &DiscLayout,
    engine: &dyn RipEngine,
) -> Result<Vec<PathBuf>, RipError> {
    let dir = &layout.directory_path;
    let expected = layout.track_filenames.len();
    let found = count_raw_tracks(dir, engine);
    if found != expected {
        return Err(RipError::RenameCountMismatch { expected, found });
    }

    let rename = |from: PathBuf, to: PathBuf| -> Result<(), RipError> {
        log::debug!("{} -> {}", from.display(), to.display());
        std::fs::rename(&from, &to).map_err(|source| RipError::Rename { from, to, source })
    };

    if let Some(toc) = engine.raw_toc_name() {
        let toc_path = dir.join(&toc);
        if toc_path.is_file() {
            let target = dir.join(format!("{TOC_TRACK_STEM}.{}", engine.raw_extension()));
            rename(toc_path, target)?;
        }
    }

    let mut tracks = Vec::with_capacity(expected);
    for (i, name) in layout.track_filenames.iter().enumerate() {
        let from = dir.join(engine.raw_track_name(i as u32 + 1));
        let to = dir.join(name);
        if from != to {
            rename(from, to.clone())?;
        }
        tracks.push(to);
    }
    Ok(tracks)
}

/// Lossless re-encoder applied to each raw audio file.
pub trait Reencoder {
    /// Encode one file, returning the encoded file's path.
    fn encode(&mut self, path: &Path) -> Result<PathBuf, RipError>;
}

pub struct FlacEncoder {
    command: String,
    verify: bool,
    delete_source: bool,
}

impl FlacEncoder {
    pub fn new(command: impl Into<String>, verify: bool, delete_source: bool) -> Self {
        Self {
            command: command.into(),
            verify,
            delete_source,
        }
    }

    fn args(&self, path: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = vec!["--silent".into()];
        if self.verify {
            args.push("--verify".into());
        }
        if self.delete_source {
            args.push("--delete-input-file".into());
        }
        args.push("--".into());
        args.push(path.as_os_str().to_owned());
        args
    }
}

impl Reencoder for FlacEncoder {
    fn encode(&mut self, path: &Path) -> Result<PathBuf, RipError> {
        let fail = |message: String| RipError::Encode {
            path: path.to_path_buf(),
            message,
        };
        let status = Command::new(&self.command)
            .args(self.args(path))
            .status()
            .map_err(|e| fail(format!("could not run {}: {e}", self.command)))?;
        if crate::interrupt::killed_by_signal(&status) {
            return Err(RipError::Interrupted);
        }
        if !status.success() {
            return Err(fail(format!("{} exited with {status}", self.command)));
        }
        Ok(path.with_extension("flac"))
    }
}

/// Re-encode every file with a progress bar.
pub fn encode_all(encoder: &mut dyn Reencoder, files: &[PathBuf]) -> Result<Vec<PathBuf>, RipError> {
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut encoded = Vec::with_capacity(files.len());
    for file in files {
        pb.set_message(
            file.file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
        );
        match encoder.encode(file) {
            Ok(path) => encoded.push(path),
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        }
        pb.inc(1);
    }
    pb.finish_with_message("encoded");
    Ok(encoded)
}
