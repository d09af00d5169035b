use tokio::sync::broadcast;
use tracing::trace;

use crate::models::Id;

/// Change notification sent after a store mutation has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    SignedIn,
    SignedOut,
    UserChanged(Id),
    UsersReplaced,
    SessionError,
    SourcesReplaced,
    SourceChanged(Id),
    PostsReplaced,
    PostChanged(Id),
    FiltersChanged,
    SettingsChanged,
    LoadingChanged,
}

const CAPACITY: usize = 64;

#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: StoreEvent) {
        // no subscribers is fine
        if self.tx.send(event.clone()).is_err() {
            trace!(?event, "store event dropped");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
