//! Recording session controller.
//!
//! One controller exists per active screen. It owns the mapping from capture
//! signals to `RecordingState` and serializes start, pause, resume and stop
//! against a single session. Operation bodies run in their own task so a
//! caller that goes away (screen teardown) cannot abort a capture call halfway.

use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use talkbook_capture::{AudioCaptureProcess, CaptureConnector, CaptureError, CaptureSignals};
use talkbook_core::config::RecordingConfig;
use talkbook_core::events::SessionEvent;
use talkbook_core::types::Recording;

use crate::binder::SessionBinder;
use crate::error::SessionError;
use crate::permission::PermissionCheck;
use crate::state::{derive_state, RecordingState, SessionAction};

/// Bookkeeping for the current recording.
#[derive(Debug, Default)]
struct SessionData {
    recording: Option<Recording>,
    started_at: Option<DateTime<Utc>>,
    segment_started_at: Option<Instant>,
    accumulated_ms: u64,
}

impl SessionData {
    /// Captured time according to local segment accounting.
    fn wall_clock_ms(&self) -> u64 {
        let running = self
            .segment_started_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.accumulated_ms + running
    }

    fn close_segment(&mut self) {
        if let Some(started) = self.segment_started_at.take() {
            self.accumulated_ms += started.elapsed().as_millis() as u64;
        }
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Prefer the capture process's own duration; fall back to wall-clock segments.
fn reconcile_duration(capture_ms: u64, wall_clock_ms: u64) -> u64 {
    if capture_ms > 0 {
        capture_ms
    } else {
        wall_clock_ms
    }
}

struct ControllerInner {
    binder: SessionBinder,
    permission: Arc<dyn PermissionCheck>,
    recordings_dir: PathBuf,
    max_duration: Option<Duration>,
    op_lock: Mutex<()>,
    session: StdMutex<SessionData>,
    state_tx: watch::Sender<RecordingState>,
    events: broadcast::Sender<SessionEvent>,
    observer: StdMutex<Option<JoinHandle<()>>>,
    limit_reached: AtomicBool,
    closed: AtomicBool,
}

impl ControllerInner {
    fn session(&self) -> MutexGuard<'_, SessionData> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn observer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.observer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SessionEvent) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Re-derive the state from the latest capture snapshot and publish changes.
    fn refresh(&self) -> RecordingState {
        self.update_state(derive_state)
    }

    /// Compute the next state from the latest snapshot and publish a change.
    ///
    /// The snapshot is read while the state channel is locked, so concurrent
    /// updates apply snapshots in the order they were read.
    fn update_state<F>(&self, next_state: F) -> RecordingState
    where
        F: FnOnce(&CaptureSignals, RecordingState) -> RecordingState,
    {
        if self.closed.load(Ordering::SeqCst) {
            return *self.state_tx.borrow();
        }
        let mut change = None;
        let mut seq = 0;
        self.state_tx.send_if_modified(|state| {
            let signals = self.binder.current_signals();
            seq = signals.seq;
            let next = next_state(&signals, *state);
            if next == *state {
                return false;
            }
            change = Some((*state, next));
            *state = next;
            true
        });
        match change {
            Some((from, to)) => {
                tracing::debug!(%from, %to, seq, "Recording state changed");
                self.emit(SessionEvent::StateChanged {
                    from,
                    to,
                    timestamp: Utc::now(),
                });
                to
            }
            None => *self.state_tx.borrow(),
        }
    }

    /// The current recording with its live duration.
    fn snapshot(&self) -> Option<Recording> {
        let signals = self.binder.current_signals();
        let session = self.session();
        session.recording.clone().map(|mut recording| {
            recording.duration_ms = reconcile_duration(signals.duration_ms, session.wall_clock_ms());
            recording
        })
    }

    fn has_recording(&self) -> bool {
        self.session().recording.is_some()
    }

    /// Take over an unfinished recording the capture process reports but this
    /// controller did not start, such as one begun from a screen that has
    /// since been closed.
    fn adopt_unowned(&self, process: &dyn AudioCaptureProcess) {
        let signals = self.binder.current_signals();
        if !signals.alive || !signals.has_recording {
            return;
        }
        let recording = {
            let mut session = self.session();
            if session.recording.is_some() {
                return;
            }
            let recording = Recording::new(process.current_file().unwrap_or_default());
            session.clear();
            session.accumulated_ms = signals.duration_ms;
            session.segment_started_at = signals.capturing.then(Instant::now);
            session.recording = Some(recording.clone());
            recording
        };
        self.limit_reached.store(false, Ordering::SeqCst);
        self.update_state(|signals, current| {
            if signals.has_recording {
                derive_state(signals, RecordingState::Recording)
            } else {
                derive_state(signals, current)
            }
        });
        tracing::info!(
            recording_id = %recording.id,
            file = %recording.file_path.display(),
            duration_ms = signals.duration_ms,
            "Adopted recording already in progress"
        );
    }

    /// Forget the current recording without a capture call.
    fn discard_reference(&self, reason: &'static str) {
        let mut session = self.session();
        session.close_segment();
        if let Some(recording) = session.recording.take() {
            tracing::warn!(
                recording_id = %recording.id,
                duration_ms = session.accumulated_ms,
                reason,
                "Dropping recording reference"
            );
        }
        session.clear();
    }

    /// Match the local reference to what the capture process reports.
    fn reconcile_reference(&self, process: &dyn AudioCaptureProcess) {
        let signals = self.binder.current_signals();
        if signals.alive && !signals.has_recording && self.has_recording() {
            self.discard_reference("capture process has no recording");
        } else {
            self.adopt_unowned(process);
        }
    }

    /// Check `action` against the derived state.
    ///
    /// `Ok(Some(_))` means the session already is where the action leads, so
    /// no capture call is needed.
    fn admit(&self, action: SessionAction) -> Result<Option<Recording>, SessionError> {
        let from = self.refresh();
        if action != SessionAction::Stop && from == action.outcome() {
            if let Some(current) = self.snapshot() {
                tracing::debug!(recording_id = %current.id, %action, "Already in requested state");
                return Ok(Some(current));
            }
        }
        match action.target(from) {
            Some(_) => Ok(None),
            None => Err(SessionError::InvalidTransition { from, action }),
        }
    }

    async fn start(&self) -> Result<Recording, SessionError> {
        let _guard = self.op_lock.lock().await;

        if !self.permission.has_record_audio_permission() {
            tracing::warn!("Recording start rejected: microphone permission not granted");
            return Err(SessionError::PermissionDenied);
        }
        let process = self
            .binder
            .process()
            .ok_or(SessionError::ServiceUnavailable)?;
        self.adopt_unowned(process.as_ref());
        if let Some(current) = self.admit(SessionAction::Start)? {
            return Ok(current);
        }

        let recording = Recording::in_dir(&self.recordings_dir);
        process.start(&recording.file_path).await?;

        let now = Utc::now();
        {
            let mut session = self.session();
            session.clear();
            session.recording = Some(recording.clone());
            session.started_at = Some(now);
            session.segment_started_at = Some(Instant::now());
        }
        self.limit_reached.store(false, Ordering::SeqCst);
        self.refresh();

        tracing::info!(
            recording_id = %recording.id,
            file = %recording.file_path.display(),
            "Recording started"
        );
        self.emit(SessionEvent::RecordingStarted {
            recording_id: recording.id,
            timestamp: now,
        });
        Ok(recording)
    }

    async fn pause(&self) -> Result<Recording, SessionError> {
        let _guard = self.op_lock.lock().await;

        let process = self
            .binder
            .process()
            .ok_or(SessionError::ServiceUnavailable)?;
        self.adopt_unowned(process.as_ref());
        if !self.has_recording() {
            return Err(SessionError::NoActiveRecording);
        }
        if let Some(current) = self.admit(SessionAction::Pause)? {
            return Ok(current);
        }

        process.pause().await?;
        self.session().close_segment();
        self.refresh();

        let recording = self.snapshot().ok_or(SessionError::NoActiveRecording)?;
        tracing::info!(
            recording_id = %recording.id,
            duration_ms = recording.duration_ms,
            "Recording paused"
        );
        self.emit(SessionEvent::RecordingPaused {
            recording_id: recording.id,
            duration_ms: recording.duration_ms,
            timestamp: Utc::now(),
        });
        Ok(recording)
    }

    async fn resume(&self) -> Result<Recording, SessionError> {
        let _guard = self.op_lock.lock().await;

        let process = self
            .binder
            .process()
            .ok_or(SessionError::ServiceUnavailable)?;
        self.adopt_unowned(process.as_ref());
        if !self.has_recording() {
            return Err(SessionError::NoActiveRecording);
        }
        if let Some(current) = self.admit(SessionAction::Resume)? {
            return Ok(current);
        }

        process.resume().await?;
        self.session().segment_started_at = Some(Instant::now());
        self.refresh();

        let recording = self.snapshot().ok_or(SessionError::NoActiveRecording)?;
        tracing::info!(recording_id = %recording.id, "Recording resumed");
        self.emit(SessionEvent::RecordingResumed {
            recording_id: recording.id,
            timestamp: Utc::now(),
        });
        Ok(recording)
    }

    async fn stop(&self) -> Result<Recording, SessionError> {
        let _guard = self.op_lock.lock().await;

        let process = self
            .binder
            .process()
            .ok_or(SessionError::ServiceUnavailable)?;
        self.adopt_unowned(process.as_ref());
        if !self.has_recording() {
            return Err(SessionError::NoActiveRecording);
        }
        if let Err(e) = self.admit(SessionAction::Stop) {
            // Idle or Stopped: the capture process finished this recording itself.
            tracing::debug!(error = %e, "Stop found no unfinished recording");
            self.discard_reference("recording already finalized by the capture process");
            self.refresh();
            return Err(SessionError::NoActiveRecording);
        }

        let summary = match process.stop().await {
            Ok(summary) => summary,
            Err(CaptureError::NotActive) => {
                self.discard_reference("capture process has no recording");
                self.refresh();
                return Err(SessionError::NoActiveRecording);
            }
            Err(e) => return Err(e.into()),
        };

        let recording = {
            let mut session = self.session();
            let wall_clock_ms = session.wall_clock_ms();
            let recording = session.recording.take().map(|mut recording| {
                recording.duration_ms = reconcile_duration(summary.duration_ms, wall_clock_ms);
                if !summary.file_path.as_os_str().is_empty() {
                    recording.file_path = summary.file_path;
                }
                recording
            });
            session.clear();
            recording
        };
        self.refresh();

        let recording = recording.ok_or(SessionError::NoActiveRecording)?;
        tracing::info!(
            recording_id = %recording.id,
            duration_ms = recording.duration_ms,
            "Recording stopped"
        );
        self.emit(SessionEvent::RecordingStopped {
            recording_id: recording.id,
            duration_ms: recording.duration_ms,
            timestamp: Utc::now(),
        });
        Ok(recording)
    }

    /// Stop once per recording when the capture duration hits the limit.
    fn enforce_limit(self: &Arc<Self>, signals: &CaptureSignals) {
        let Some(limit) = self.max_duration else {
            return;
        };
        if !signals.capturing || signals.duration_ms < limit.as_millis() as u64 {
            return;
        }
        if self.limit_reached.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(
            duration_ms = signals.duration_ms,
            limit_secs = limit.as_secs(),
            "Recording reached maximum duration, stopping"
        );
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = inner.stop().await {
                tracing::warn!(error = %e, "Automatic stop failed");
            }
        });
    }
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        if let Some(observer) = self.observer().take() {
            observer.abort();
        }
    }
}

/// Re-derive the state on every forwarded snapshot until the controller is gone.
async fn observe(inner: Weak<ControllerInner>, mut signals: watch::Receiver<CaptureSignals>) {
    while signals.changed().await.is_ok() {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let snapshot = *signals.borrow_and_update();
        if !snapshot.alive && inner.has_recording() {
            inner.discard_reference("capture process lost");
        }
        inner.refresh();
        inner.enforce_limit(&snapshot);
    }
}

/// Run an operation in its own task so dropping the caller does not cancel it.
async fn detached<F>(op: F) -> Result<Recording, SessionError>
where
    F: Future<Output = Result<Recording, SessionError>> + Send + 'static,
{
    tokio::spawn(op)
        .await
        .map_err(|e| SessionError::Internal(e.to_string()))?
}

/// Per-screen handle on the recording session. Clones share the session.
#[derive(Clone)]
pub struct RecordingSessionController {
    inner: Arc<ControllerInner>,
}

impl std::fmt::Debug for RecordingSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSessionController")
            .field("state", &*self.inner.state_tx.borrow())
            .field("binder", &self.inner.binder)
            .finish()
    }
}

impl RecordingSessionController {
    pub fn new(
        binder: SessionBinder,
        permission: Arc<dyn PermissionCheck>,
        config: &RecordingConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(RecordingState::Idle);
        let events = binder.event_sender();
        Self {
            inner: Arc::new(ControllerInner {
                binder,
                permission,
                recordings_dir: config.recordings_path(),
                max_duration: config.max_duration(),
                op_lock: Mutex::new(()),
                session: StdMutex::new(SessionData::default()),
                state_tx,
                events,
                observer: StdMutex::new(None),
                limit_reached: AtomicBool::new(false),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Build a controller with its own binder over `connector`.
    pub fn from_connector(
        connector: Arc<dyn CaptureConnector>,
        permission: Arc<dyn PermissionCheck>,
        config: &RecordingConfig,
    ) -> Self {
        let binder = SessionBinder::new(connector, config.connect_timeout());
        Self::new(binder, permission, config)
    }

    /// Attach to the capture process and start observing its signals.
    pub async fn connect(&self) -> Result<(), SessionError> {
        {
            let _guard = self.inner.op_lock.lock().await;
            if self.inner.closed.load(Ordering::SeqCst) {
                return Err(SessionError::ServiceUnavailable);
            }
            self.inner.binder.connect().await?;
            if let Some(process) = self.inner.binder.process() {
                self.inner.reconcile_reference(process.as_ref());
            }
            self.inner.refresh();
        }

        let mut observer = self.inner.observer();
        if observer.as_ref().map_or(true, |h| h.is_finished()) {
            let signals = self.inner.binder.watch_signals();
            *observer = Some(tokio::spawn(observe(Arc::downgrade(&self.inner), signals)));
        }
        Ok(())
    }

    /// Wait for any in-flight operation, stop propagation and release the binder.
    pub async fn close(&self) {
        let _guard = self.inner.op_lock.lock().await;
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(observer) = self.inner.observer().take() {
            observer.abort();
        }
        self.inner.binder.disconnect().await;
        tracing::info!("Recording session closed");
    }

    pub async fn start(&self) -> Result<Recording, SessionError> {
        let inner = Arc::clone(&self.inner);
        detached(async move { inner.start().await }).await
    }

    pub async fn pause(&self) -> Result<Recording, SessionError> {
        let inner = Arc::clone(&self.inner);
        detached(async move { inner.pause().await }).await
    }

    pub async fn resume(&self) -> Result<Recording, SessionError> {
        let inner = Arc::clone(&self.inner);
        detached(async move { inner.resume().await }).await
    }

    pub async fn stop(&self) -> Result<Recording, SessionError> {
        let inner = Arc::clone(&self.inner);
        detached(async move { inner.stop().await }).await
    }

    /// Derived state from the most recent capture snapshot.
    pub fn state(&self) -> RecordingState {
        self.inner.refresh()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RecordingState> {
        self.inner.state_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// The unfinished recording, if any, with its live duration.
    pub fn current_recording(&self) -> Option<Recording> {
        self.inner.snapshot()
    }

    /// Wall-clock time the current recording was started.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.inner.session().started_at
    }

    pub fn is_connected(&self) -> bool {
        self.inner.binder.is_connected()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::SharedPermission;
    use talkbook_capture::{CaptureHost, MockCaptureProcess};

    fn test_config() -> RecordingConfig {
        RecordingConfig {
            recordings_dir: "/tmp/talkbook-test/recordings".to_string(),
            connect_timeout_ms: 500,
            ..RecordingConfig::default()
        }
    }

    fn controller_with(
        process: &MockCaptureProcess,
        permission: SharedPermission,
        config: &RecordingConfig,
    ) -> RecordingSessionController {
        let host = CaptureHost::new(Arc::new(process.clone()));
        RecordingSessionController::from_connector(Arc::new(host), Arc::new(permission), config)
    }

    async fn connected(process: &MockCaptureProcess) -> RecordingSessionController {
        let controller = controller_with(process, SharedPermission::granted(), &test_config());
        controller.connect().await.unwrap();
        controller
    }

    async fn wait_for_state(controller: &RecordingSessionController, target: RecordingState) {
        let mut rx = controller.subscribe_state();
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|s| *s == target))
            .await
            .expect("recording state not reached in time")
            .unwrap();
    }

    #[tokio::test]
    async fn test_full_cycle_follows_transition_table() {
        let process = MockCaptureProcess::new();
        let controller = connected(&process).await;
        assert_eq!(controller.state(), RecordingState::Idle);

        let first = controller.start().await.unwrap();
        assert_eq!(first.duration_ms, 0);
        assert_eq!(controller.state(), RecordingState::Recording);
        assert!(controller.started_at().is_some());

        process.advance(800);
        controller.pause().await.unwrap();
        assert_eq!(controller.state(), RecordingState::Paused);

        controller.resume().await.unwrap();
        assert_eq!(controller.state(), RecordingState::Recording);

        process.advance(400);
        let finished = controller.stop().await.unwrap();
        assert_eq!(finished.id, first.id);
        assert_eq!(finished.duration_ms, 1200);
        assert_eq!(controller.state(), RecordingState::Stopped);
        assert!(controller.current_recording().is_none());
        assert!(controller.started_at().is_none());

        let second = controller.start().await.unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.duration_ms, 0);
        assert_eq!(controller.state(), RecordingState::Recording);
    }

    #[tokio::test]
    async fn test_concurrent_starts_issue_one_capture_call() {
        let process = MockCaptureProcess::with_start_delay(Duration::from_millis(50));
        let controller = connected(&process).await;

        let (a, b) = tokio::join!(controller.start(), controller.start());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.id, b.id);
        assert_eq!(process.start_calls(), 1);
        assert_eq!(controller.state(), RecordingState::Recording);
    }

    #[tokio::test]
    async fn test_permission_denied_makes_no_capture_call() {
        let process = MockCaptureProcess::new();
        let controller = controller_with(&process, SharedPermission::denied(), &test_config());
        controller.connect().await.unwrap();

        assert_eq!(
            controller.start().await.unwrap_err(),
            SessionError::PermissionDenied
        );
        assert_eq!(controller.state(), RecordingState::Idle);
        assert_eq!(process.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_unbound_start_is_service_unavailable() {
        let process = MockCaptureProcess::new();
        let controller = controller_with(&process, SharedPermission::granted(), &test_config());

        assert_eq!(
            controller.start().await.unwrap_err(),
            SessionError::ServiceUnavailable
        );
        assert_eq!(process.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_mid_recording() {
        let process = MockCaptureProcess::new();
        let controller = connected(&process).await;
        let mut events = controller.subscribe_events();
        controller.start().await.unwrap();

        process.kill();
        assert_eq!(
            controller.pause().await.unwrap_err(),
            SessionError::ServiceUnavailable
        );
        wait_for_state(&controller, RecordingState::Stopped).await;
        assert!(!controller.is_connected());

        let mut saw_disconnect = false;
        while let Ok(Ok(event)) =
            tokio::time::timeout(Duration::from_millis(200), events.recv()).await
        {
            if matches!(event, SessionEvent::CaptureDisconnected { .. }) {
                saw_disconnect = true;
                break;
            }
        }
        assert!(saw_disconnect);
    }

    #[tokio::test]
    async fn test_start_while_paused_is_invalid() {
        let process = MockCaptureProcess::new();
        let controller = connected(&process).await;
        controller.start().await.unwrap();
        controller.pause().await.unwrap();

        let err = controller.start().await.unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                from: RecordingState::Paused,
                action: SessionAction::Start,
            }
        );
        assert_eq!(process.start_calls(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_pause_and_resume_are_idempotent() {
        let process = MockCaptureProcess::new();
        let controller = connected(&process).await;
        controller.start().await.unwrap();

        controller.resume().await.unwrap();
        assert_eq!(process.resume_calls(), 0);

        controller.pause().await.unwrap();
        controller.pause().await.unwrap();
        assert_eq!(process.pause_calls(), 1);
        assert_eq!(controller.state(), RecordingState::Paused);

        controller.start().await.unwrap_err();
        controller.resume().await.unwrap();
        assert_eq!(process.resume_calls(), 1);
    }

    #[tokio::test]
    async fn test_operations_without_recording() {
        let process = MockCaptureProcess::new();
        let controller = connected(&process).await;

        assert_eq!(
            controller.stop().await.unwrap_err(),
            SessionError::NoActiveRecording
        );
        assert_eq!(
            controller.pause().await.unwrap_err(),
            SessionError::NoActiveRecording
        );
        assert_eq!(
            controller.resume().await.unwrap_err(),
            SessionError::NoActiveRecording
        );
        assert_eq!(process.total_calls(), 0);

        controller.start().await.unwrap();
        controller.stop().await.unwrap();
        assert_eq!(
            controller.stop().await.unwrap_err(),
            SessionError::NoActiveRecording
        );
        assert_eq!(process.stop_calls(), 1);
    }

    #[tokio::test]
    async fn test_stop_falls_back_to_wall_clock_duration() {
        let process = MockCaptureProcess::new();
        let controller = connected(&process).await;
        controller.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let finished = controller.stop().await.unwrap();
        assert!(finished.duration_ms >= 30, "got {}", finished.duration_ms);
    }

    #[tokio::test]
    async fn test_failed_capture_start_leaves_state_idle() {
        let process = MockCaptureProcess::new();
        let controller = connected(&process).await;
        process.fail_next_start();

        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, SessionError::Capture(CaptureError::Failed(_))));
        assert_eq!(controller.state(), RecordingState::Idle);
        assert!(controller.current_recording().is_none());
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_cancel_start() {
        let process = MockCaptureProcess::with_start_delay(Duration::from_millis(50));
        let controller = connected(&process).await;

        let result = tokio::time::timeout(Duration::from_millis(5), controller.start()).await;
        assert!(result.is_err());

        wait_for_state(&controller, RecordingState::Recording).await;
        assert_eq!(process.start_calls(), 1);
        assert!(controller.current_recording().is_some());
    }

    #[tokio::test]
    async fn test_close_waits_and_stops_propagation() {
        let process = MockCaptureProcess::with_start_delay(Duration::from_millis(30));
        let host = CaptureHost::new(Arc::new(process.clone()));
        let controller = RecordingSessionController::from_connector(
            Arc::new(host.clone()),
            Arc::new(SharedPermission::granted()),
            &test_config(),
        );
        controller.connect().await.unwrap();

        let starter = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.start().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        controller.close().await;

        // The in-flight start completed before close released the binder.
        assert!(starter.await.unwrap().is_ok());
        assert!(controller.is_closed());
        assert!(!host.is_leased());

        let mut events = controller.subscribe_events();
        let state_before = *controller.subscribe_state().borrow();
        process.kill();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(controller.state(), state_before);
        assert!(events.try_recv().is_err());
        assert_eq!(
            controller.start().await.unwrap_err(),
            SessionError::ServiceUnavailable
        );
    }

    #[tokio::test]
    async fn test_start_emits_state_change_and_started_event() {
        let process = MockCaptureProcess::new();
        let controller = connected(&process).await;
        let mut events = controller.subscribe_events();

        let recording = controller.start().await.unwrap();

        let mut saw_change = false;
        loop {
            let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .unwrap()
                .unwrap();
            match event {
                SessionEvent::StateChanged {
                    from: RecordingState::Idle,
                    to: RecordingState::Recording,
                    ..
                } => saw_change = true,
                SessionEvent::RecordingStarted { recording_id, .. } => {
                    assert_eq!(recording_id, recording.id);
                    break;
                }
                _ => {}
            }
        }
        assert!(saw_change);
    }

    #[tokio::test]
    async fn test_recording_stops_at_max_duration() {
        let process = MockCaptureProcess::new();
        let config = RecordingConfig {
            max_duration_secs: 1,
            ..test_config()
        };
        let controller = controller_with(&process, SharedPermission::granted(), &config);
        controller.connect().await.unwrap();
        controller.start().await.unwrap();

        process.advance(1000);
        wait_for_state(&controller, RecordingState::Stopped).await;
        assert_eq!(process.stop_calls(), 1);
    }

    #[tokio::test]
    async fn test_observer_tracks_external_signal_changes() {
        let process = MockCaptureProcess::new();
        let controller = connected(&process).await;
        controller.start().await.unwrap();

        // The capture process finalizes the recording on its own.
        process.stop().await.unwrap();
        wait_for_state(&controller, RecordingState::Stopped).await;

        assert_eq!(
            controller.stop().await.unwrap_err(),
            SessionError::NoActiveRecording
        );
        assert!(controller.current_recording().is_none());
        assert_eq!(process.stop_calls(), 1);
    }

    #[tokio::test]
    async fn test_process_death_ends_recording() {
        let process = MockCaptureProcess::new();
        let controller = connected(&process).await;
        controller.start().await.unwrap();

        process.kill();
        wait_for_state(&controller, RecordingState::Stopped).await;
        assert!(controller.current_recording().is_none());
        assert!(controller.started_at().is_none());

        // A revived process starts a fresh session.
        process.revive();
        controller.connect().await.unwrap();
        assert_eq!(controller.state(), RecordingState::Stopped);
        controller.start().await.unwrap();
        assert_eq!(controller.state(), RecordingState::Recording);
    }

    /// Capture process that lost track of its recording: stop reports
    /// `NotActive` while the signals still show one.
    struct ForgetfulProcess(MockCaptureProcess);

    #[async_trait::async_trait]
    impl AudioCaptureProcess for ForgetfulProcess {
        async fn start(&self, file_path: &std::path::Path) -> Result<(), CaptureError> {
            self.0.start(file_path).await
        }

        async fn pause(&self) -> Result<(), CaptureError> {
            self.0.pause().await
        }

        async fn resume(&self) -> Result<(), CaptureError> {
            self.0.resume().await
        }

        async fn stop(&self) -> Result<talkbook_capture::CaptureSummary, CaptureError> {
            Err(CaptureError::NotActive)
        }

        fn signals(&self) -> watch::Receiver<CaptureSignals> {
            self.0.signals()
        }
    }

    #[tokio::test]
    async fn test_stop_rejected_by_capture_drops_reference() {
        let process = MockCaptureProcess::new();
        let host = CaptureHost::new(Arc::new(ForgetfulProcess(process.clone())));
        let controller = RecordingSessionController::from_connector(
            Arc::new(host),
            Arc::new(SharedPermission::granted()),
            &test_config(),
        );
        controller.connect().await.unwrap();
        controller.start().await.unwrap();
        assert!(controller.started_at().is_some());

        assert_eq!(
            controller.stop().await.unwrap_err(),
            SessionError::NoActiveRecording
        );
        assert!(controller.current_recording().is_none());
        assert!(controller.started_at().is_none());
    }

    #[tokio::test]
    async fn test_second_controller_takes_over_running_recording() {
        let process = MockCaptureProcess::new();
        let host = CaptureHost::new(Arc::new(process.clone()));
        let open = |host: &CaptureHost| {
            RecordingSessionController::from_connector(
                Arc::new(host.clone()),
                Arc::new(SharedPermission::granted()),
                &test_config(),
            )
        };

        let first = open(&host);
        first.connect().await.unwrap();
        let started = first.start().await.unwrap();
        process.advance(700);
        first.close().await;
        assert!(process.current().capturing);

        let second = open(&host);
        second.connect().await.unwrap();
        assert_eq!(second.state(), RecordingState::Recording);
        let adopted = second.current_recording().unwrap();
        assert_eq!(adopted.file_path, started.file_path);
        assert_eq!(adopted.duration_ms, 700);

        // A duplicate start resolves to the running recording.
        assert_eq!(second.start().await.unwrap().id, adopted.id);
        assert_eq!(process.start_calls(), 1);

        second.pause().await.unwrap();
        assert_eq!(second.state(), RecordingState::Paused);
        second.resume().await.unwrap();
        process.advance(300);

        let finished = second.stop().await.unwrap();
        assert_eq!(finished.id, adopted.id);
        assert_eq!(finished.file_path, started.file_path);
        assert_eq!(finished.duration_ms, 1000);
        assert_eq!(process.stop_calls(), 1);
        assert!(!process.current().has_recording);
        assert_eq!(second.state(), RecordingState::Stopped);
    }

    #[tokio::test]
    async fn test_paused_recording_is_taken_over_as_paused() {
        let process = MockCaptureProcess::new();
        let host = CaptureHost::new(Arc::new(process.clone()));
        let first = RecordingSessionController::from_connector(
            Arc::new(host.clone()),
            Arc::new(SharedPermission::granted()),
            &test_config(),
        );
        first.connect().await.unwrap();
        first.start().await.unwrap();
        first.pause().await.unwrap();
        first.close().await;

        let second = RecordingSessionController::from_connector(
            Arc::new(host),
            Arc::new(SharedPermission::granted()),
            &test_config(),
        );
        second.connect().await.unwrap();
        assert_eq!(second.state(), RecordingState::Paused);
        assert!(matches!(
            second.start().await.unwrap_err(),
            SessionError::InvalidTransition {
                from: RecordingState::Paused,
                action: SessionAction::Start,
            }
        ));

        second.resume().await.unwrap();
        assert_eq!(second.state(), RecordingState::Recording);
        second.stop().await.unwrap();
        assert_eq!(process.stop_calls(), 1);
    }
}
