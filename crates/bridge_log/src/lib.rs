//! FilerBridge Logging & Observability Module
//!
//! Provides structured logging, panic handling, crash reports, and deadlock detection
//! for processes embedding the page-side bridge.

mod panic_hook;
mod logging;

pub use panic_hook::{init_panic_hook, crash_report};
pub use logging::{init_logging, cleanup_old_logs, cleanup_logs_in};

use std::path::PathBuf;
use directories::ProjectDirs;

/// Get the bridge log directory
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "FilerBridge", "FilerBridge")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialize all observability features
pub fn init() -> anyhow::Result<()> {
    init_logging()?;
    init_panic_hook();

    #[cfg(debug_assertions)]
    init_deadlock_detector();

    Ok(())
}

#[cfg(debug_assertions)]
fn init_deadlock_detector() {
    use std::thread;
    use std::time::Duration;

    thread::Builder::new()
        .name("deadlock-detector".into())
        .spawn(|| loop {
            thread::sleep(Duration::from_secs(10));
            let deadlocks = parking_lot::deadlock::check_deadlock();
            if deadlocks.is_empty() {
                continue;
            }
            tracing::error!("{} deadlock(s) detected", deadlocks.len());
            for (i, threads) in deadlocks.iter().enumerate() {
                for t in threads {
                    tracing::error!(
                        deadlock = i,
                        thread_id = ?t.thread_id(),
                        "{:#?}",
                        t.backtrace()
                    );
                }
            }
        })
        .map(drop)
        .unwrap_or_else(|e| tracing::warn!("Deadlock detector not started: {}", e));
}
