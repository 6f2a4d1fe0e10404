//! Host capabilities the engine needs but does not own
//!
//! The startup handshake waits between attempts, and a REBOOT control
//! message asks the host to restart the node. Both go through this trait so
//! the engine never sleeps or exits on its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub trait Platform {
    /// Block for a short, fixed time
    fn delay(&mut self, duration: Duration);

    /// Restart the node.
    ///
    /// On real hardware this does not return. Hosts that restart by
    /// rebuilding the engine may return; the engine stops handling the
    /// current frame when they do.
    fn restart(&mut self);
}

/// Platform for hosted runs: sleeps the thread and raises a shared flag
/// that the host loop checks to rebuild the engine.
#[derive(Debug, Clone, Default)]
pub struct StdPlatform {
    restart_requested: Arc<AtomicBool>,
}

impl StdPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the flag, returning whether a restart was pending
    pub fn take_restart(&self) -> bool {
        self.restart_requested.swap(false, Ordering::SeqCst)
    }
}

impl Platform for StdPlatform {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    fn restart(&mut self) {
        tracing::info!("Restart requested");
        self.restart_requested.store(true, Ordering::SeqCst);
    }
}
