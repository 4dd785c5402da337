//! Remote store adapters.
//!
//! A [`StudentStore`] turns CRUD intents into calls against the authoritative
//! student collection and hands back normalized [`StudentRecord`]s. Stores are
//! built explicitly and passed to the roster, so tests can swap in a fake.

/// REST API backend
pub mod rest;
/// Table backend with realtime change notifications
pub mod table;

pub use rest::RestStore;
pub use table::TableStore;

use crate::{
    errors::Result,
    models::{StudentChanges, StudentInput, StudentPatch, StudentRecord},
};
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::warn;

/// CRUD access to the student collection.
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// All students, newest first.
    async fn list(&self) -> Result<Vec<StudentRecord>>;

    /// Persists a new student and returns it with id and timestamps.
    async fn create(&self, input: &StudentInput) -> Result<StudentRecord>;

    /// Sends only the fields present in `patch`.
    ///
    /// Returns whatever columns the store echoed back, which may be a subset.
    /// `Ok(None)` means the store confirmed the update without a body.
    async fn update(&self, id: &str, patch: &StudentPatch) -> Result<Option<StudentChanges>>;

    /// Removes a student. Unknown ids fail with `NotFound`.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Row-level change notifications, when the backend can push them.
    async fn subscribe(&self) -> Result<Option<ChangeFeed>> {
        Ok(None)
    }
}

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A row was inserted
    Insert,
    /// A row was updated
    Update,
    /// A row was deleted
    Delete,
    /// Something changed, details unknown
    Any,
}

/// A change notification for the students table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// What happened
    pub kind: ChangeKind,
    /// Affected row, if known
    pub id: Option<String>,
}

/// Receiving side of a store's change notifications.
#[derive(Debug)]
pub struct ChangeFeed {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl ChangeFeed {
    /// Wraps a broadcast receiver.
    #[must_use]
    pub const fn new(receiver: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { receiver }
    }

    /// Next event, or `None` once the store has gone away.
    ///
    /// Missed events collapse into a single [`ChangeKind::Any`].
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Change feed lagged, {} events skipped", skipped);
                Some(ChangeEvent {
                    kind: ChangeKind::Any,
                    id: None,
                })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}
