//! Shared test utilities for the roster.
//!
//! Provides an in-memory table store, a scriptable fake store, a notifier that
//! records what it was told, and the usual fixtures.

#![allow(clippy::unwrap_used)]

use crate::{
    errors::{Error, Result},
    models::{Belt, StudentChanges, StudentInput, StudentPatch, StudentRecord},
    notify::{Notice, Notifier},
    store::{StudentStore, TableStore},
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Table store on an in-memory `SQLite` database with the schema created.
pub async fn setup_table_store() -> Result<TableStore> {
    TableStore::connect("sqlite::memory:").await
}

/// Serves `router` on an ephemeral local port and returns the `/api/` base URL.
pub async fn serve_api(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/api/")
}

/// The student used throughout the scenarios.
pub fn ana_lima() -> StudentInput {
    StudentInput::new("Ana Lima", 10, Belt::Amarela).with_monthly_fee(150.0)
}

/// Store operation a failure can be scripted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeOp {
    /// `list`
    List,
    /// `create`
    Create,
    /// `update`
    Update,
    /// `delete`
    Delete,
}

/// In-memory store with scripted failures.
pub struct FakeStore {
    rows: Mutex<Vec<StudentRecord>>,
    failures: Mutex<Vec<(FakeOp, Error)>>,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    update_returns_body: AtomicBool,
}

impl Default for FakeStore {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            list_calls: AtomicUsize::new(0),
            update_returns_body: AtomicBool::new(true),
        }
    }
}

impl FakeStore {
    fn insert(&self, input: &StudentInput) -> StudentRecord {
        let id = format!("fake-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let now = Utc::now();
        let record = StudentRecord {
            id,
            name: input.name.clone(),
            mother_name: input.mother_name.clone(),
            father_name: input.father_name.clone(),
            age: input.age,
            belt: input.belt,
            blood_type: input.blood_type,
            phone: input.phone.clone(),
            address: input.address.clone(),
            observations: input.observations.clone(),
            enrollment_date: input.enrollment_date,
            monthly_fee: input.monthly_fee,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.rows.lock().unwrap().insert(0, record.clone());
        record
    }

    fn take_failure(&self, op: FakeOp) -> Result<()> {
        let mut failures = self.failures.lock().unwrap();
        match failures.iter().position(|(scripted, _)| *scripted == op) {
            Some(index) => Err(failures.remove(index).1),
            None => Ok(()),
        }
    }

    /// Adds a row directly, bypassing failure scripts. Returns its id.
    pub fn seed(&self, input: &StudentInput) -> String {
        self.insert(input).id
    }

    /// Makes the row with `id` appear twice in listings.
    pub fn duplicate(&self, id: &str) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter().find(|row| row.id == id).cloned() {
            rows.push(row);
        }
    }

    /// The next call to `op` fails with `error`.
    pub fn fail_next(&self, op: FakeOp, error: Error) {
        self.failures.lock().unwrap().push((op, error));
    }

    /// Whether `update` answers with the row or with an empty body.
    pub fn set_update_returns_body(&self, value: bool) {
        self.update_returns_body.store(value, Ordering::SeqCst);
    }

    /// How many times `list` was called.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StudentStore for FakeStore {
    async fn list(&self) -> Result<Vec<StudentRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure(FakeOp::List)?;
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn create(&self, input: &StudentInput) -> Result<StudentRecord> {
        self.take_failure(FakeOp::Create)?;
        Ok(self.insert(input))
    }

    async fn update(&self, id: &str, patch: &StudentPatch) -> Result<Option<StudentChanges>> {
        self.take_failure(FakeOp::Update)?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or_else(|| Error::NotFound { id: id.to_string() })?;
        patch.apply_to(row);
        row.updated_at = Some(Utc::now());
        let body = self.update_returns_body.load(Ordering::SeqCst);
        Ok(body.then(|| StudentChanges::from(row.clone())))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.take_failure(FakeOp::Delete)?;
        let mut rows = self.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|row| row.id != id);
        if rows.len() == before {
            return Err(Error::NotFound { id: id.to_string() });
        }
        Ok(())
    }
}

/// Notifier that keeps every notice for later assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    /// Everything notified so far.
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    /// Number of error notices.
    pub fn destructive_count(&self) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|notice| notice.is_destructive())
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}
