//! Destination directory and filenames for a ripped disc.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::models::{DiscLayout, EditedTitles, Fingerprint};
use crate::rip::RipEngine;
use crate::PROVENANCE_FILENAME;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Disc {fingerprint} is already in the library at {}", existing.display())]
    DuplicateFingerprint {
        fingerprint: String,
        existing: PathBuf,
    },
    #[error("Destination directory {} exists", path.display())]
    PathCollision { path: PathBuf },
    #[error("Failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether existing library entries may be replaced. Never on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwritePolicy {
    #[default]
    Deny,
    /// Ignore duplicate disc IDs and delete a colliding destination directory.
    Overwrite,
}

pub struct LayoutPlanner {
    library_root: PathBuf,
    policy: OverwritePolicy,
}

impl LayoutPlanner {
    pub fn new(library_root: impl Into<PathBuf>, policy: OverwritePolicy) -> Self {
        Self {
            library_root: library_root.into(),
            policy,
        }
    }

    /// Work out where the disc goes. Reads the library, never writes to it.
    pub fn plan(
        &self,
        titles: &EditedTitles,
        fingerprint: &Fingerprint,
        engine: &dyn RipEngine,
    ) -> Result<DiscLayout, LayoutError> {
        if let Some(existing) = find_fingerprint(&self.library_root, fingerprint) {
            match self.policy {
                OverwritePolicy::Deny => {
                    return Err(LayoutError::DuplicateFingerprint {
                        fingerprint: fingerprint.hex(),
                        existing,
                    });
                }
                OverwritePolicy::Overwrite => log::warn!(
                    "Disc {} already in library at {}; ignoring duplicate",
                    fingerprint.hex(),
                    existing.display()
                ),
            }
        }

        let directory_name = if titles.unnamed {
            fingerprint.hex()
        } else {
            titles.disc_title.clone()
        };
        let directory_path = self.library_root.join(directory_name);

        let replace_existing = directory_path.exists();
        if replace_existing && self.policy == OverwritePolicy::Deny {
            return Err(LayoutError::PathCollision {
                path: directory_path,
            });
        }

        let track_filenames = if titles.unnamed {
            (1..=fingerprint.track_count)
                .map(|n| engine.raw_track_name(n))
                .collect()
        } else {
            titles
                .track_titles
                .iter()
                .enumerate()
                .map(|(i, title)| format!("{:02} - {title}", i + 1))
                .collect()
        };

        Ok(DiscLayout {
            directory_path,
            track_filenames,
            replace_existing,
        })
    }
}

impl DiscLayout {
    /// Create the destination, first removing the old one if replacement was allowed.
    pub fn prepare(&self) -> Result<(), LayoutError> {
        let io_err = |source| LayoutError::Io {
            path: self.directory_path.clone(),
            source,
        };
        if self.replace_existing && self.directory_path.exists() {
            log::warn!("Removing existing directory {}", self.directory_path.display());
            std::fs::remove_dir_all(&self.directory_path).map_err(io_err)?;
        }
        std::fs::create_dir_all(&self.directory_path).map_err(io_err)?;
        log::info!("Destination: {}", self.directory_path.display());
        Ok(())
    }
}

/// Find a library directory already tagged with this fingerprint.
///
/// A directory is tagged by its name (`<hex>` or `*.<hex>`) or by the disc ID
/// recorded in its provenance sidecar.
pub fn find_fingerprint(library_root: &Path, fingerprint: &Fingerprint) -> Option<PathBuf> {
    let tag = fingerprint.hex();
    let suffix = format!(".{tag}");

    WalkDir::new(library_root)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .find(|entry| {
            let name = entry.file_name().to_string_lossy();
            if name == tag || name.ends_with(&suffix) {
                return true;
            }
            let sidecar = entry.path().join(PROVENANCE_FILENAME);
            sidecar.is_file()
                && crate::provenance::read(&sidecar)
                    .map(|p| p.fingerprint.id == fingerprint.id)
                    .unwrap_or_else(|e| {
                        log::debug!("Skipping unreadable sidecar {}: {e}", sidecar.display());
                        false
                    })
        })
        .map(|entry| entry.into_path())
}
