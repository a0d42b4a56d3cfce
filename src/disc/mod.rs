//! Physical disc access: drive tray control and TOC fingerprinting.

pub mod drive;
pub mod fingerprint;

pub use drive::{DriveControl, EjectDrive};
pub use fingerprint::{CdDiscid, FingerprintSource};

use std::process::{Command, ExitStatus};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("Failed to {action} disc drive {device}: {message}")]
    Control {
        action: &'static str,
        device: String,
        message: String,
    },
    #[error("Failed to read disc TOC from {device}: {message}")]
    Toc { device: String, message: String },
    #[error("Interrupted")]
    Interrupted,
}

/// Run a subprocess to completion, describing failures in plain text.
///
/// A child killed by a signal is reported as `Ok(None)` so callers can treat
/// it as an operator interrupt.
pub(crate) fn run_status(cmd: &mut Command) -> Result<Option<ExitStatus>, String> {
    log::debug!("Running {cmd:?}");
    let status = cmd
        .status()
        .map_err(|e| format!("could not run {:?}: {e}", cmd.get_program()))?;
    if crate::interrupt::killed_by_signal(&status) {
        return Ok(None);
    }
    Ok(Some(status))
}
