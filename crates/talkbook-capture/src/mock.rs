//! Mock capture process for tests and the demo binary.
//!
//! Simulates the microphone-owning process in memory. Duration only advances
//! through `advance` or a ticker spawned with `spawn_ticker`, which keeps
//! tests deterministic. No audio file is written.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::CaptureError;
use crate::{AudioCaptureProcess, CaptureSignals, CaptureSummary};

struct MockInner {
    signals: watch::Sender<CaptureSignals>,
    current_file: Mutex<Option<PathBuf>>,
    start_delay: Duration,
    fail_next_start: AtomicBool,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    pause_calls: AtomicUsize,
    resume_calls: AtomicUsize,
}

impl MockInner {
    fn snapshot(&self) -> CaptureSignals {
        *self.signals.borrow()
    }

    fn publish(&self, update: impl FnOnce(&mut CaptureSignals)) {
        self.signals.send_modify(|s| {
            update(s);
            s.seq += 1;
        });
    }
}

/// In-memory capture process.
///
/// Cloning yields another handle to the same simulated process; call counters
/// let tests assert how many physical capture calls were made.
#[derive(Clone)]
pub struct MockCaptureProcess {
    inner: Arc<MockInner>,
}

impl Default for MockCaptureProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockCaptureProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCaptureProcess")
            .field("signals", &self.inner.snapshot())
            .field("start_calls", &self.start_calls())
            .finish()
    }
}

impl MockCaptureProcess {
    pub fn new() -> Self {
        Self::with_start_delay(Duration::ZERO)
    }

    /// A process whose `start` takes `delay` before capture begins.
    pub fn with_start_delay(delay: Duration) -> Self {
        let (signals, _) = watch::channel(CaptureSignals::idle());
        Self {
            inner: Arc::new(MockInner {
                signals,
                current_file: Mutex::new(None),
                start_delay: delay,
                fail_next_start: AtomicBool::new(false),
                start_calls: AtomicUsize::new(0),
                stop_calls: AtomicUsize::new(0),
                pause_calls: AtomicUsize::new(0),
                resume_calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn start_calls(&self) -> usize {
        self.inner.start_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.inner.stop_calls.load(Ordering::SeqCst)
    }

    pub fn pause_calls(&self) -> usize {
        self.inner.pause_calls.load(Ordering::SeqCst)
    }

    pub fn resume_calls(&self) -> usize {
        self.inner.resume_calls.load(Ordering::SeqCst)
    }

    /// Total physical capture calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.start_calls() + self.stop_calls() + self.pause_calls() + self.resume_calls()
    }

    /// Latest published snapshot.
    pub fn current(&self) -> CaptureSignals {
        self.inner.snapshot()
    }

    /// Make the next `start` fail with `CaptureError::Failed`.
    pub fn fail_next_start(&self) {
        self.inner.fail_next_start.store(true, Ordering::SeqCst);
    }

    /// Add captured audio to the current recording if the microphone is live.
    pub fn advance(&self, elapsed_ms: u64) {
        if self.inner.snapshot().capturing {
            self.inner.publish(|s| s.duration_ms += elapsed_ms);
        }
    }

    /// Simulate process death. Capture stops and the process becomes unreachable.
    pub fn kill(&self) {
        tracing::warn!("Mock capture process killed");
        *self.lock_file() = None;
        self.inner.publish(|s| {
            s.alive = false;
            s.capturing = false;
            s.paused = false;
            s.has_recording = false;
            s.duration_ms = 0;
        });
    }

    /// Bring a killed process back with no recording.
    pub fn revive(&self) {
        self.inner.publish(|s| {
            let seq = s.seq;
            *s = CaptureSignals { seq, ..CaptureSignals::idle() };
        });
    }

    /// Advance the duration every `interval` while capturing.
    ///
    /// The ticker ends when the process dies or every handle is dropped.
    pub fn spawn_ticker(&self, interval: Duration) -> JoinHandle<()> {
        let weak: Weak<MockInner> = Arc::downgrade(&self.inner);
        let step_ms = interval.as_millis() as u64;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                let current = inner.snapshot();
                if !current.alive {
                    break;
                }
                if current.capturing {
                    inner.publish(|s| s.duration_ms += step_ms);
                }
            }
        })
    }

    fn lock_file(&self) -> std::sync::MutexGuard<'_, Option<PathBuf>> {
        // The guarded value is a plain path; a poisoned lock still holds a usable value.
        self.inner
            .current_file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AudioCaptureProcess for MockCaptureProcess {
    async fn start(&self, file_path: &Path) -> Result<(), CaptureError> {
        let current = self.inner.snapshot();
        if !current.alive {
            return Err(CaptureError::Disconnected);
        }
        if current.has_recording {
            return Err(CaptureError::AlreadyActive);
        }
        self.inner.start_calls.fetch_add(1, Ordering::SeqCst);

        if !self.inner.start_delay.is_zero() {
            tokio::time::sleep(self.inner.start_delay).await;
        }
        if self.inner.fail_next_start.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::Failed("microphone could not be opened".to_string()));
        }
        if !self.inner.snapshot().alive {
            return Err(CaptureError::Disconnected);
        }

        *self.lock_file() = Some(file_path.to_path_buf());
        self.inner.publish(|s| {
            s.capturing = true;
            s.paused = false;
            s.has_recording = true;
            s.duration_ms = 0;
        });
        tracing::info!(file = %file_path.display(), "Mock capture started");
        Ok(())
    }

    async fn pause(&self) -> Result<(), CaptureError> {
        let current = self.inner.snapshot();
        if !current.alive {
            return Err(CaptureError::Disconnected);
        }
        if !current.capturing {
            return Err(CaptureError::NotActive);
        }
        self.inner.pause_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.publish(|s| {
            s.capturing = false;
            s.paused = true;
        });
        tracing::info!(duration_ms = current.duration_ms, "Mock capture paused");
        Ok(())
    }

    async fn resume(&self) -> Result<(), CaptureError> {
        let current = self.inner.snapshot();
        if !current.alive {
            return Err(CaptureError::Disconnected);
        }
        if !current.paused {
            return Err(CaptureError::NotPaused);
        }
        self.inner.resume_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.publish(|s| {
            s.capturing = true;
            s.paused = false;
        });
        tracing::info!("Mock capture resumed");
        Ok(())
    }

    async fn stop(&self) -> Result<CaptureSummary, CaptureError> {
        let current = self.inner.snapshot();
        if !current.alive {
            return Err(CaptureError::Disconnected);
        }
        if !current.has_recording {
            return Err(CaptureError::NotActive);
        }
        self.inner.stop_calls.fetch_add(1, Ordering::SeqCst);
        let file_path = self.lock_file().take().unwrap_or_default();
        self.inner.publish(|s| {
            s.capturing = false;
            s.paused = false;
            s.has_recording = false;
            s.duration_ms = 0;
        });
        tracing::info!(duration_ms = current.duration_ms, "Mock capture stopped");
        Ok(CaptureSummary {
            file_path,
            duration_ms: current.duration_ms,
        })
    }

    fn current_file(&self) -> Option<PathBuf> {
        self.lock_file().clone()
    }

    fn signals(&self) -> watch::Receiver<CaptureSignals> {
        self.inner.signals.subscribe()
    }
}

// =============================================================================
// Tests
// =============================================================================
