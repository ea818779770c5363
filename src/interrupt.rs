use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::error::MinerError;

/// Exit status used when the user stops a run.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Installs a Ctrl-C handler that raises `flag`. A second Ctrl-C while the
/// first is still being honoured exits immediately.
pub fn install(flag: Arc<AtomicBool>) -> Result<(), MinerError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| MinerError::Signal(err.to_string()))?;

    thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            runtime.block_on(async move {
                loop {
                    if let Err(err) = tokio::signal::ctrl_c().await {
                        tracing::warn!("interrupt handler stopped: {err}");
                        return;
                    }
                    if flag.swap(true, Ordering::SeqCst) {
                        process::exit(INTERRUPTED_EXIT_CODE);
                    }
                    tracing::info!("interrupt received, stopping after the current job");
                }
            })
        })
        .map_err(|err| MinerError::Signal(err.to_string()))?;
    Ok(())
}
