//! Process interrupt handling.
//!
//! Ctrl-C ends the run silently with status 130, wherever the pipeline is blocked.

use std::process::ExitStatus;

/// Exit status used for an operator interrupt.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Watch for Ctrl-C on a background thread and exit quietly when it arrives.
pub fn install() {
    let spawned = std::thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(|| {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    log::warn!("Interrupt handler unavailable: {e}");
                    return;
                }
            };
            if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
                log::debug!("Interrupt received");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        });
    if let Err(e) = spawned {
        log::warn!("Failed to start interrupt handler: {e}");
    }
}

/// True when a child process ended because of a signal rather than exiting.
pub fn killed_by_signal(status: &ExitStatus) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal().is_some()
    }
    #[cfg(not(unix))]
    {
        status.code().is_none()
    }
}
