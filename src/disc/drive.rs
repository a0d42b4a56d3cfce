use std::process::Command;

use super::{run_status, DriveError};

/// Tray control for the disc drive.
pub trait DriveControl {
    /// Load the disc (close the tray).
    fn close(&mut self) -> Result<(), DriveError>;

    /// Unload the disc (open the tray).
    fn open(&mut self) -> Result<(), DriveError>;
}

/// Drive control through the `eject` utility.
pub struct EjectDrive {
    command: String,
    device: String,
}

impl EjectDrive {
    pub fn new(command: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            device: device.into(),
        }
    }

    fn run(&self, action: &'static str, close_tray: bool) -> Result<(), DriveError> {
        let mut cmd = Command::new(&self.command);
        if close_tray {
            cmd.arg("-t");
        }
        cmd.arg(&self.device);

        let fail = |message: String| DriveError::Control {
            action,
            device: self.device.clone(),
            message,
        };
        match run_status(&mut cmd).map_err(fail)? {
            None => Err(DriveError::Interrupted),
            Some(status) if status.success() => {
                log::info!("Drive {} {}", self.device, if close_tray { "closed" } else { "opened" });
                Ok(())
            }
            Some(status) => Err(fail(format!("{} exited with {status}", self.command))),
        }
    }
}

impl DriveControl for EjectDrive {
    fn close(&mut self) -> Result<(), DriveError> {
        self.run("close", true)
    }

    fn open(&mut self) -> Result<(), DriveError> {
        self.run("open", false)
    }
}
