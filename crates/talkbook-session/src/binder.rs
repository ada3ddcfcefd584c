//! Asynchronous link between a session controller and the capture process.
//!
//! The capture process may not exist yet when a controller is built and may
//! die at any time. The binder models the link as an explicit state
//! (`Disconnected`, `Connecting`, `Connected`) published on a watch channel,
//! forwards capture signals while connected, and downgrades itself to
//! `Disconnected` when the process goes away. A monitor task belonging to an
//! earlier connection never touches a newer one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use talkbook_capture::{AudioCaptureProcess, CaptureConnector, CaptureLease, CaptureSignals};
use talkbook_core::events::SessionEvent;

use crate::error::SessionError;

const EVENT_CAPACITY: usize = 64;

/// Connection state of a binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinderState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for BinderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinderState::Disconnected => write!(f, "Disconnected"),
            BinderState::Connecting => write!(f, "Connecting"),
            BinderState::Connected => write!(f, "Connected"),
        }
    }
}

/// The process handle and its signal receiver for the current connection.
struct LiveLink {
    process: Arc<dyn AudioCaptureProcess>,
    signals: watch::Receiver<CaptureSignals>,
}

/// Resources owned by one connection.
struct Link {
    _lease: CaptureLease,
    monitor: JoinHandle<()>,
}

struct BinderShared {
    state_tx: watch::Sender<BinderState>,
    signals_tx: watch::Sender<CaptureSignals>,
    live: StdMutex<Option<LiveLink>>,
    generation: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

impl BinderShared {
    fn live(&self) -> MutexGuard<'_, Option<LiveLink>> {
        // The guarded value is replaced wholesale, so a poisoned lock is still consistent.
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Forward a snapshot if `generation` is still the current connection.
    fn forward_if_current(&self, generation: u64, snapshot: CaptureSignals) -> bool {
        let _live = self.live();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        self.signals_tx.send_replace(snapshot);
        true
    }

    /// Downgrade after the process went away without a disconnect request.
    fn mark_lost(&self, generation: u64) {
        let last = {
            let mut live = self.live();
            if self.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            live.take();
            let last = *self.signals_tx.borrow();
            self.signals_tx
                .send_replace(CaptureSignals::disconnected(last.seq + 1));
            last
        };
        self.state_tx.send_replace(BinderState::Disconnected);
        tracing::warn!(
            was_recording = last.has_recording,
            duration_ms = last.duration_ms,
            "Capture process disconnected unexpectedly"
        );
        let _ = self.events.send(SessionEvent::CaptureDisconnected {
            was_recording: last.has_recording,
            timestamp: Utc::now(),
        });
    }
}

/// Link between one controller and the capture process.
pub struct SessionBinder {
    connector: Arc<dyn CaptureConnector>,
    connect_timeout: Duration,
    shared: Arc<BinderShared>,
    link: Mutex<Option<Link>>,
}

impl fmt::Debug for SessionBinder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBinder")
            .field("state", &self.state())
            .field("signals", &self.current_signals())
            .finish()
    }
}

impl SessionBinder {
    /// Create a disconnected binder. Nothing is contacted until `connect`.
    pub fn new(connector: Arc<dyn CaptureConnector>, connect_timeout: Duration) -> Self {
        let (state_tx, _) = watch::channel(BinderState::Disconnected);
        let (signals_tx, _) = watch::channel(CaptureSignals::disconnected(0));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            connector,
            connect_timeout,
            shared: Arc::new(BinderShared {
                state_tx,
                signals_tx,
                live: StdMutex::new(None),
                generation: AtomicU64::new(0),
                events,
            }),
            link: Mutex::new(None),
        }
    }

    /// Establish the link, waiting at most the configured timeout.
    ///
    /// Connecting an already connected binder is a no-op. Any failure leaves
    /// the binder `Disconnected` and is reported as `ServiceUnavailable`.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let mut link = self.link.lock().await;
        if link.is_some() && self.state() == BinderState::Connected {
            return Ok(());
        }
        if let Some(stale) = link.take() {
            stale.monitor.abort();
            tracing::debug!("Released stale capture link");
        }

        self.shared.state_tx.send_replace(BinderState::Connecting);
        tracing::info!("Connecting to capture process");

        let lease = match tokio::time::timeout(self.connect_timeout, self.connector.connect()).await
        {
            Ok(Ok(lease)) => lease,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Capture process connection failed");
                self.shared.state_tx.send_replace(BinderState::Disconnected);
                return Err(SessionError::ServiceUnavailable);
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.connect_timeout.as_millis() as u64,
                    "Capture process connection timed out"
                );
                self.shared.state_tx.send_replace(BinderState::Disconnected);
                return Err(SessionError::ServiceUnavailable);
            }
        };

        let process = lease.process();
        let mut signals = process.signals();
        let first = *signals.borrow_and_update();
        if !first.alive {
            tracing::warn!("Capture process died while connecting");
            self.shared.state_tx.send_replace(BinderState::Disconnected);
            return Err(SessionError::ServiceUnavailable);
        }

        let generation = {
            let mut live = self.shared.live();
            let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *live = Some(LiveLink {
                process,
                signals: signals.clone(),
            });
            self.shared.signals_tx.send_replace(first);
            generation
        };
        self.shared.state_tx.send_replace(BinderState::Connected);

        let monitor = tokio::spawn(monitor(Arc::clone(&self.shared), signals, generation));
        *link = Some(Link {
            _lease: lease,
            monitor,
        });
        tracing::info!(generation, "Connected to capture process");
        Ok(())
    }

    /// Release the link and the capture lease. Safe to call when never connected.
    pub async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        {
            let mut live = self.shared.live();
            self.shared.generation.fetch_add(1, Ordering::SeqCst);
            live.take();
            let last = *self.shared.signals_tx.borrow();
            if last.alive {
                self.shared
                    .signals_tx
                    .send_replace(CaptureSignals::disconnected(last.seq + 1));
            }
        }
        if let Some(link) = link.take() {
            link.monitor.abort();
            tracing::info!("Disconnected from capture process");
        }
        self.shared.state_tx.send_replace(BinderState::Disconnected);
    }

    pub fn state(&self) -> BinderState {
        *self.shared.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == BinderState::Connected
    }

    /// The capture process, if connected to a live one.
    pub fn process(&self) -> Option<Arc<dyn AudioCaptureProcess>> {
        let live = self.shared.live();
        let link = live.as_ref()?;
        if !link.signals.borrow().alive {
            return None;
        }
        Some(Arc::clone(&link.process))
    }

    /// The most recent capture snapshot.
    ///
    /// While connected this reads the process channel directly, so it is never
    /// older than what the forwarding task has published.
    pub fn current_signals(&self) -> CaptureSignals {
        if let Some(link) = self.shared.live().as_ref() {
            return *link.signals.borrow();
        }
        *self.shared.signals_tx.borrow()
    }

    /// Forwarded capture snapshots; a disconnected snapshot while unbound.
    pub fn watch_signals(&self) -> watch::Receiver<CaptureSignals> {
        self.shared.signals_tx.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<BinderState> {
        self.shared.state_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    /// Sender for session events, shared with the owning controller.
    pub fn event_sender(&self) -> broadcast::Sender<SessionEvent> {
        self.shared.events.clone()
    }
}

impl Drop for SessionBinder {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().take() {
            link.monitor.abort();
        }
    }
}

/// Forward process snapshots until the process dies or the link is replaced.
async fn monitor(
    shared: Arc<BinderShared>,
    mut signals: watch::Receiver<CaptureSignals>,
    generation: u64,
) {
    loop {
        if signals.changed().await.is_err() {
            shared.mark_lost(generation);
            return;
        }
        let snapshot = *signals.borrow_and_update();
        if !snapshot.alive {
            shared.mark_lost(generation);
            return;
        }
        if !shared.forward_if_current(generation, snapshot) {
            return;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
