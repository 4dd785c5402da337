//! Roster synchronization - the in-memory student list the UI renders from.
//!
//! The roster never changes its local copy before the store confirms a
//! mutation. Every failure produces exactly one destructive [`Notice`] and is
//! then returned to the caller, so a form can stay in its retry state.
//!
//! Operations are not serialized: two mutations issued at once race to the
//! store independently.

use crate::{
    errors::{Error, Result},
    mapping,
    models::{StudentInput, StudentPatch, StudentRecord},
    notify::{Notice, Notifier},
    store::{ChangeFeed, StudentStore},
};
use serde::Deserialize;
use std::{
    collections::HashSet,
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{debug, error, info, instrument, warn};

const LOAD_FAILED: &str = "Erro ao carregar alunos";
const CREATE_FAILED: &str = "Erro ao cadastrar aluno";
const UPDATE_FAILED: &str = "Erro ao atualizar aluno";
const DELETE_FAILED: &str = "Erro ao remover aluno";
const SUBSCRIBE_FAILED: &str = "Erro ao acompanhar alterações";

/// How the local list catches up after a confirmed mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStrategy {
    /// Apply the store's response to the local list
    #[default]
    Merge,
    /// Reload the whole list from the store
    Refetch,
}

impl FromStr for SyncStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "refetch" => Ok(Self::Refetch),
            other => Err(format!(
                "Unknown sync strategy '{other}' (expected merge or refetch)"
            )),
        }
    }
}

#[derive(Default)]
struct Shared {
    records: RwLock<Vec<StudentRecord>>,
    loads_in_flight: AtomicUsize,
}

/// Marks a load in flight until dropped, including when the load future is cancelled.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Keeps only the first record seen for each id.
fn unique_by_id(records: Vec<StudentRecord>) -> Vec<StudentRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .collect()
}

/// Handle to the roster. Clones share the same list.
#[derive(Clone)]
pub struct Roster {
    store: Arc<dyn StudentStore>,
    notifier: Arc<dyn Notifier>,
    strategy: SyncStrategy,
    shared: Arc<Shared>,
}

impl Roster {
    /// Creates an empty roster over `store`, reporting to `notifier`.
    #[must_use]
    pub fn new(store: Arc<dyn StudentStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            strategy: SyncStrategy::default(),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Sets the post-mutation strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Current post-mutation strategy.
    #[must_use]
    pub const fn strategy(&self) -> SyncStrategy {
        self.strategy
    }

    /// Snapshot of the list, in display order.
    pub async fn records(&self) -> Vec<StudentRecord> {
        self.shared.records.read().await.clone()
    }

    /// Local copy of one record.
    pub async fn record(&self, id: &str) -> Option<StudentRecord> {
        self.shared
            .records
            .read()
            .await
            .iter()
            .find(|record| record.id == id)
            .cloned()
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.shared.records.read().await.len()
    }

    /// True when no record is held.
    pub async fn is_empty(&self) -> bool {
        self.shared.records.read().await.is_empty()
    }

    /// True while a full load is running.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared.loads_in_flight.load(Ordering::SeqCst) > 0
    }

    fn fail<T>(&self, title: &str, error: Error) -> Result<T> {
        error!("{}: {}", title, error);
        self.notifier
            .notify(Notice::destructive(title, error.to_string()));
        Err(error)
    }

    async fn reload(&self) -> Result<usize> {
        let _loading = LoadingGuard::start(&self.shared.loads_in_flight);
        let records = unique_by_id(self.store.list().await?);
        let count = records.len();
        *self.shared.records.write().await = records;
        Ok(count)
    }

    /// Reloads the list after a mutation when the strategy asks for it.
    ///
    /// Returns false when the local list still needs the mutation applied.
    async fn reloaded_after(&self, action: &str) -> bool {
        if self.strategy != SyncStrategy::Refetch {
            return false;
        }
        match self.reload().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Reload after {} failed, applying locally: {}", action, e);
                false
            }
        }
    }

    /// Replaces the list with the store's. On failure the previous list is kept.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        match self.reload().await {
            Ok(count) => {
                info!("Roster loaded with {} students", count);
                Ok(())
            }
            Err(e) => self.fail(LOAD_FAILED, e),
        }
    }

    /// Manual reload.
    pub async fn refresh(&self) -> Result<()> {
        self.initialize().await
    }

    /// Creates a student. The new record is in the list when this returns `Ok`.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn add_record(&self, input: &StudentInput) -> Result<StudentRecord> {
        let created = match self.store.create(input).await {
            Ok(record) => record,
            Err(e) => return self.fail(CREATE_FAILED, e),
        };

        let reloaded = self.reloaded_after("create").await;
        let mut records = self.shared.records.write().await;
        let present = records.iter().any(|record| record.id == created.id);
        if !reloaded || !present {
            // A change notification may already have brought it in.
            records.retain(|record| record.id != created.id);
            records.insert(0, created.clone());
        }
        drop(records);

        self.notifier.notify(Notice::success(
            "Aluno cadastrado!",
            format!("{} foi adicionado com sucesso.", created.name),
        ));
        Ok(created)
    }

    /// Applies a partial update and returns the local record afterwards.
    #[instrument(skip(self, patch))]
    pub async fn edit_record(
        &self,
        id: &str,
        patch: &StudentPatch,
    ) -> Result<Option<StudentRecord>> {
        let patch = mapping::normalized_patch(patch);
        let returned = match self.store.update(id, &patch).await {
            Ok(returned) => returned,
            Err(e) => return self.fail(UPDATE_FAILED, e),
        };

        if !self.reloaded_after("update").await {
            let mut records = self.shared.records.write().await;
            match records.iter_mut().find(|record| record.id == id) {
                Some(local) => match returned {
                    Some(changes) => changes.apply_to(local),
                    None => patch.apply_to(local),
                },
                None => debug!("Updated student {} is not in the local list", id),
            }
        }

        self.notifier.notify(Notice::success(
            "Aluno atualizado!",
            "Os dados foram salvos com sucesso.",
        ));
        Ok(self.record(id).await)
    }

    /// Deletes a student.
    #[instrument(skip(self))]
    pub async fn remove_record(&self, id: &str) -> Result<()> {
        if let Err(e) = self.store.delete(id).await {
            return self.fail(DELETE_FAILED, e);
        }

        if !self.reloaded_after("delete").await {
            self.shared
                .records
                .write()
                .await
                .retain(|record| record.id != id);
        }

        self.notifier.notify(Notice::success(
            "Aluno removido",
            "O aluno foi excluído com sucesso.",
        ));
        Ok(())
    }

    /// Subscribes to store changes and reloads the whole list on each one.
    ///
    /// Returns `Ok(None)` when the store cannot push changes. The listener
    /// stops when the returned [`ChangeWatch`] is dropped.
    pub async fn watch_changes(&self) -> Result<Option<ChangeWatch>> {
        let feed = match self.store.subscribe().await {
            Ok(Some(feed)) => feed,
            Ok(None) => {
                debug!("Store has no change notifications");
                return Ok(None);
            }
            Err(e) => return self.fail(SUBSCRIBE_FAILED, e),
        };

        let roster = self.clone();
        let handle = tokio::spawn(async move { roster.follow(feed).await });
        info!("Watching student changes");
        Ok(Some(ChangeWatch { handle }))
    }

    async fn follow(self, mut feed: ChangeFeed) {
        while let Some(event) = feed.next().await {
            debug!("{:?} on {:?}, reloading roster", event.kind, event.id);
            // Failures were already reported by initialize.
            let _ = self.initialize().await;
        }
        info!("Change feed closed");
    }

    /// Subscribes (when supported) and performs the first load.
    ///
    /// Errors are reported through the notifier; the watch is returned even if
    /// the first load fails so later changes still refresh the list.
    pub async fn mount(&self) -> Option<ChangeWatch> {
        let watch = self.watch_changes().await.ok().flatten();
        if let Err(e) = self.initialize().await {
            warn!("First load failed: {}", e);
        }
        watch
    }
}

/// Live subscription started by [`Roster::watch_changes`]. Dropping it unsubscribes.
#[derive(Debug)]
pub struct ChangeWatch {
    handle: JoinHandle<()>,
}

impl ChangeWatch {
    /// False once the feed has closed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ChangeWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
