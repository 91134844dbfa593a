//! Progress provider implementation for CLI
//!
//! Bridges the core library's progress reporting with the CLI's rendering task.

use iamctl_core::progress::{ProgressProvider, ProgressUpdate};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Buffered updates before new ones are dropped
const CHANNEL_CAPACITY: usize = 256;

/// Channel-based progress provider for CLI rendering
///
/// Sending never blocks a batch worker: when the renderer falls behind,
/// updates are dropped.
pub struct ChannelProvider {
    tx: Mutex<Option<mpsc::Sender<ProgressUpdate>>>,
}

impl ChannelProvider {
    pub fn new(tx: mpsc::Sender<ProgressUpdate>) -> Self {
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    fn sender(&self) -> Option<mpsc::Sender<ProgressUpdate>> {
        self.tx.lock().ok().and_then(|guard| guard.clone())
    }
}

impl ProgressProvider for ChannelProvider {
    fn report(&self, update: ProgressUpdate) {
        if let Some(tx) = self.sender() {
            let _ = tx.try_send(update);
        }
    }

    fn complete(&self) {
        // Dropping the sender lets the renderer exit its loop
        if let Ok(mut guard) = self.tx.lock() {
            *guard = None;
        }
    }
}

/// Create a progress provider and renderer channel pair for CLI operations
pub fn create_progress_infrastructure()
-> (Arc<dyn ProgressProvider>, mpsc::Receiver<ProgressUpdate>) {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    let provider = Arc::new(ChannelProvider::new(tx)) as Arc<dyn ProgressProvider>;
    (provider, rx)
}
