//! Exclusive access to the capture process.
//!
//! The microphone is a single device-wide resource, so the host grants at
//! most one lease at a time. Dropping the lease releases it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CaptureError;
use crate::AudioCaptureProcess;

/// Something a session binder can connect through.
///
/// Connecting may take time (the process may still be launching) and may
/// fail; the binder treats any error as "service unavailable".
#[async_trait]
pub trait CaptureConnector: Send + Sync {
    async fn connect(&self) -> Result<CaptureLease, CaptureError>;
}

/// Exclusive handle on the capture process, held by one binder.
pub struct CaptureLease {
    process: Arc<dyn AudioCaptureProcess>,
    held: Arc<AtomicBool>,
}

impl CaptureLease {
    pub fn process(&self) -> Arc<dyn AudioCaptureProcess> {
        Arc::clone(&self.process)
    }
}

impl Drop for CaptureLease {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
        tracing::debug!("Capture lease released");
    }
}

impl std::fmt::Debug for CaptureLease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureLease")
            .field("alive", &self.process.is_alive())
            .finish()
    }
}

/// Owner of the device-wide capture process.
#[derive(Clone)]
pub struct CaptureHost {
    process: Arc<dyn AudioCaptureProcess>,
    held: Arc<AtomicBool>,
    startup_delay: Duration,
}

impl CaptureHost {
    pub fn new(process: Arc<dyn AudioCaptureProcess>) -> Self {
        Self {
            process,
            held: Arc::new(AtomicBool::new(false)),
            startup_delay: Duration::ZERO,
        }
    }

    /// Simulate a process that needs time before it accepts connections.
    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    /// Whether a lease is currently outstanding.
    pub fn is_leased(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    /// Take the lease without waiting.
    pub fn acquire(&self) -> Result<CaptureLease, CaptureError> {
        if !self.process.is_alive() {
            return Err(CaptureError::Disconnected);
        }
        if self
            .held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CaptureError::Busy);
        }
        tracing::debug!("Capture lease granted");
        Ok(CaptureLease {
            process: Arc::clone(&self.process),
            held: Arc::clone(&self.held),
        })
    }
}

#[async_trait]
impl CaptureConnector for CaptureHost {
    async fn connect(&self) -> Result<CaptureLease, CaptureError> {
        if !self.startup_delay.is_zero() {
            tokio::time::sleep(self.startup_delay).await;
        }
        self.acquire()
    }
}
