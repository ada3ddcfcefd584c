//! Microphone permission contract.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Consulted before every `start()`.
pub trait PermissionCheck: Send + Sync {
    fn has_record_audio_permission(&self) -> bool;
}

/// Permission flag that can be granted or revoked at runtime.
///
/// Clones share the same flag.
#[derive(Debug, Clone)]
pub struct SharedPermission {
    granted: Arc<AtomicBool>,
}

impl SharedPermission {
    pub fn new(granted: bool) -> Self {
        Self {
            granted: Arc::new(AtomicBool::new(granted)),
        }
    }

    pub fn granted() -> Self {
        Self::new(true)
    }

    pub fn denied() -> Self {
        Self::new(false)
    }

    pub fn grant(&self) {
        self.granted.store(true, Ordering::SeqCst);
    }

    pub fn revoke(&self) {
        self.granted.store(false, Ordering::SeqCst);
    }
}

impl PermissionCheck for SharedPermission {
    fn has_record_audio_permission(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }
}
