//! Operator editing of disc and track titles.
//!
//! The editable buffer is plain text: `#` lines are comments, the first
//! remaining line is the disc title, and each following line titles one
//! track in order.

use std::io::Write;
use std::process::Command;

use thiserror::Error;

use crate::models::{EditedTitles, ResolvedRecord};
use crate::PATH_SEPARATOR_PLACEHOLDER;

const COMMENT_MARKER: char = '#';
/// Written before a title that itself starts with the comment marker.
const COMMENT_ESCAPE: char = '\\';
const DISC_PLACEHOLDER: &str = "Unknown Disc";

#[derive(Error, Debug)]
pub enum TitleError {
    #[error("Edited titles list {found} tracks but the disc has {expected}")]
    ShapeMismatch { expected: usize, found: usize },
    #[error("Edited titles are empty (no disc title line)")]
    Empty,
    #[error("Edit session failed: {0}")]
    Edit(String),
    #[error("Interrupted")]
    Interrupted,
}

/// Opaque "edit this text and give it back" service.
pub trait TextEditor {
    fn edit_text(&mut self, initial: &str) -> Result<String, TitleError>;
}

/// Edit session in an external program on a temporary file.
pub struct ExternalEditor {
    command: String,
}

impl ExternalEditor {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl TextEditor for ExternalEditor {
    fn edit_text(&mut self, initial: &str) -> Result<String, TitleError> {
        let io_err = |e: std::io::Error| TitleError::Edit(format!("edit buffer: {e}"));

        let mut file = tempfile::Builder::new()
            .prefix("discrip-titles-")
            .suffix(".txt")
            .tempfile()
            .map_err(io_err)?;
        file.write_all(initial.as_bytes()).map_err(io_err)?;
        file.flush().map_err(io_err)?;

        // The command may carry arguments, e.g. "code --wait"
        let mut words = self.command.split_whitespace();
        let program = words
            .next()
            .ok_or_else(|| TitleError::Edit("no editor configured".to_string()))?;
        let status = Command::new(program)
            .args(words)
            .arg(file.path())
            .status()
            .map_err(|e| TitleError::Edit(format!("could not run {program}: {e}")))?;
        if crate::interrupt::killed_by_signal(&status) {
            return Err(TitleError::Interrupted);
        }
        if !status.success() {
            return Err(TitleError::Edit(format!("{program} exited with {status}")));
        }

        std::fs::read_to_string(file.path()).map_err(io_err)
    }
}

/// Replace path separators so a title is usable as a path component.
pub fn sanitize(title: &str) -> String {
    title.replace('/', PATH_SEPARATOR_PLACEHOLDER)
}

/// Buffer line for a title, escaping a leading comment marker.
fn to_buffer_line(title: &str) -> String {
    let line = sanitize(title);
    if line.trim_start().starts_with(COMMENT_MARKER) {
        format!("{COMMENT_ESCAPE}{line}")
    } else {
        line
    }
}

/// Title from a non-comment buffer line.
fn from_buffer_line(line: &str) -> String {
    let unescaped = line
        .trim_start()
        .strip_prefix(COMMENT_ESCAPE)
        .filter(|rest| rest.trim_start().starts_with(COMMENT_MARKER))
        .unwrap_or(line);
    sanitize(unescaped)
}

fn track_placeholder(index: usize) -> String {
    format!("Track {:02}", index + 1)
}

pub struct TitleEditor<'a> {
    editor: &'a mut dyn TextEditor,
    raw_extension: String,
}

impl<'a> TitleEditor<'a> {
    pub fn new(editor: &'a mut dyn TextEditor, raw_extension: impl Into<String>) -> Self {
        Self {
            editor,
            raw_extension: raw_extension.into(),
        }
    }

    /// Build the buffer, run the edit session and parse the result.
    pub fn edit(&mut self, record: &ResolvedRecord) -> Result<EditedTitles, TitleError> {
        let buffer = build_buffer(record);
        let edited = self.editor.edit_text(&buffer)?;
        parse_buffer(record, &edited, &self.raw_extension)
    }
}

/// Editable text for a record: comments, disc title line, one line per track.
pub fn build_buffer(record: &ResolvedRecord) -> String {
    let fp = &record.fingerprint;
    let track_count = fp.track_count as usize;
    let preferred = record.preferred();

    let mut out = String::new();
    out.push_str(&format!("# Disc {fp}\n"));
    match preferred {
        Some(c) => out.push_str(&format!(
            "# Titles from CDDB ({} {})\n",
            c.disc_info.get("category").map(String::as_str).unwrap_or("?"),
            c.disc_info.get("disc_id").map(String::as_str).unwrap_or("?"),
        )),
        None => out.push_str("# No database match: replace the placeholders to name the disc\n"),
    }
    out.push_str("# First line: disc title. Then one line per track, in order.\n");
    out.push_str(&format!(
        "# Lines starting with '{COMMENT_MARKER}' are ignored; '/' is written as '{PATH_SEPARATOR_PLACEHOLDER}'.\n"
    ));
    out.push_str(&format!(
        "# A title starting with '{COMMENT_MARKER}' is written as '{COMMENT_ESCAPE}{COMMENT_MARKER}'.\n"
    ));

    let disc_title = preferred
        .and_then(|c| c.title())
        .unwrap_or(DISC_PLACEHOLDER);
    out.push_str(&to_buffer_line(disc_title));
    out.push('\n');

    for i in 0..track_count {
        let title = preferred
            .and_then(|c| c.track_titles.get(i))
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| track_placeholder(i));
        out.push_str(&to_buffer_line(&title));
        out.push('\n');
    }
    out
}

/// Parse an edited buffer back into validated, suffixed titles.
pub fn parse_buffer(
    record: &ResolvedRecord,
    edited: &str,
    raw_extension: &str,
) -> Result<EditedTitles, TitleError> {
    let fp = &record.fingerprint;
    let expected = fp.track_count as usize;

    let mut lines = edited
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim_start().starts_with(COMMENT_MARKER) && !l.trim().is_empty())
        .map(from_buffer_line);

    let disc_title = lines.next().ok_or(TitleError::Empty)?;
    let tracks: Vec<String> = lines.collect();
    if tracks.len() != expected {
        return Err(TitleError::ShapeMismatch {
            expected,
            found: tracks.len(),
        });
    }

    let unnamed = record.preferred().is_none()
        && disc_title == DISC_PLACEHOLDER
        && tracks
            .iter()
            .enumerate()
            .all(|(i, t)| *t == track_placeholder(i));
    if unnamed {
        log::info!("Titles left as placeholders; naming disc by fingerprint");
    }

    Ok(EditedTitles {
        disc_title: format!("{disc_title}.{}", fp.hex()),
        track_titles: tracks
            .into_iter()
            .map(|t| format!("{t}.{raw_extension}"))
            .collect(),
        unnamed,
    })
}
