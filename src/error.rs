use thiserror::Error;

use crate::cddb::DatabaseError;
use crate::disc::DriveError;
use crate::encoding::EncodingError;
use crate::layout::LayoutError;
use crate::prompt::PromptError;
use crate::provenance::ProvenanceError;
use crate::rip::RipError;
use crate::titles::TitleError;

/// Any failure that ends a run. Each class maps to its own exit status.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Drive(#[from] DriveError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error(transparent)]
    Titles(#[from] TitleError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Rip(#[from] RipError),
    #[error(transparent)]
    Provenance(#[from] ProvenanceError),
}

pub mod exit_code {
    pub const DRIVE: i32 = 1;
    pub const DATABASE: i32 = 2;
    pub const LAYOUT: i32 = 3;
    pub const RIP: i32 = 4;
    pub const EDIT: i32 = 5;
    pub const RENAME: i32 = 6;
    pub const ENCODE: i32 = 7;
    pub const PROVENANCE: i32 = 8;
    pub const OTHER: i32 = 10;
}

impl PipelineError {
    /// The operator interrupted the run (Ctrl-C, closed console, killed child).
    pub fn is_interrupt(&self) -> bool {
        matches!(
            self,
            PipelineError::Drive(DriveError::Interrupted)
                | PipelineError::Prompt(PromptError::Closed)
                | PipelineError::Titles(TitleError::Interrupted)
                | PipelineError::Rip(RipError::Interrupted)
        )
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_interrupt() {
            return crate::interrupt::INTERRUPTED_EXIT_CODE;
        }
        match self {
            PipelineError::Drive(_) => exit_code::DRIVE,
            // Malformed client agent comes from configuration
            PipelineError::Database(DatabaseError::Agent(_)) => exit_code::OTHER,
            PipelineError::Database(_) => exit_code::DATABASE,
            PipelineError::Layout(LayoutError::Io { .. }) => exit_code::OTHER,
            PipelineError::Layout(_) => exit_code::LAYOUT,
            PipelineError::Titles(_) => exit_code::EDIT,
            PipelineError::Rip(RipError::Engine(_)) => exit_code::RIP,
            PipelineError::Rip(RipError::Encode { .. }) => exit_code::ENCODE,
            PipelineError::Rip(_) => exit_code::RENAME,
            PipelineError::Provenance(_) => exit_code::PROVENANCE,
            PipelineError::Encoding(_) | PipelineError::Prompt(_) => exit_code::OTHER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_codes_distinct_per_class() {
        let cases: Vec<(PipelineError, i32)> = vec![
            (
                DriveError::Control {
                    action: "close",
                    device: "/dev/sr0".into(),
                    message: "x".into(),
                }
                .into(),
                1,
            ),
            (DatabaseError::Malformed("x".into()).into(), 2),
            (DatabaseError::Agent("discrip".into()).into(), 10),
            (
                LayoutError::DuplicateFingerprint {
                    fingerprint: "99".into(),
                    existing: PathBuf::from("/m/99"),
                }
                .into(),
                3,
            ),
            (LayoutError::PathCollision { path: PathBuf::from("/m/x") }.into(), 3),
            (RipError::Engine("x".into()).into(), 4),
            (TitleError::ShapeMismatch { expected: 3, found: 2 }.into(), 5),
            (RipError::RenameCountMismatch { expected: 3, found: 2 }.into(), 6),
            (
                RipError::Encode {
                    path: PathBuf::from("a.wav"),
                    message: "x".into(),
                }
                .into(),
                7,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(err.exit_code(), code, "{err}");
        }
    }

    #[test]
    fn test_interrupts() {
        let closed: PipelineError = PromptError::Closed.into();
        assert!(closed.is_interrupt());
        assert_eq!(closed.exit_code(), 130);
        let killed: PipelineError = RipError::Interrupted.into();
        assert_eq!(killed.exit_code(), 130);
    }
}
