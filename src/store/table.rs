//! Table-backed store.
//!
//! Plays the role of a hosted table with realtime subscriptions: rows live in a
//! SeaORM database, and every committed mutation is published on a broadcast
//! channel that [`StudentStore::subscribe`] hands out.

use crate::{
    config::database,
    entities::{Student, student},
    errors::{Error, Result},
    mapping::{apply_payload, insert_payload, record_from_model, update_payload},
    models::{StudentChanges, StudentInput, StudentPatch, StudentRecord},
    store::{ChangeEvent, ChangeFeed, ChangeKind, StudentStore},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use tokio::sync::broadcast;
use tracing::{debug, info, trace};
use uuid::Uuid;

/// Events buffered per subscriber before it starts lagging.
const CHANGE_BUFFER: usize = 64;

/// Student store over a SeaORM connection.
#[derive(Debug)]
pub struct TableStore {
    db: DatabaseConnection,
    changes: broadcast::Sender<ChangeEvent>,
}

impl TableStore {
    /// Wraps an existing connection. The `students` table must already exist.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self { db, changes }
    }

    /// Connects to `database_url` and creates the `students` table if needed.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let db = database::create_connection(database_url).await?;
        database::create_tables(&db).await?;
        info!("Table store ready");
        Ok(Self::new(db))
    }

    /// Underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Number of live change subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn publish(&self, kind: ChangeKind, id: &str) {
        let event = ChangeEvent {
            kind,
            id: Some(id.to_string()),
        };
        // No subscribers is not an error.
        if self.changes.send(event).is_err() {
            trace!("No change subscribers for {:?} on {}", kind, id);
        }
    }

    async fn find(&self, id: &str) -> Result<student::Model> {
        Student::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| Error::NotFound { id: id.to_string() })
    }
}

#[async_trait]
impl StudentStore for TableStore {
    async fn list(&self) -> Result<Vec<StudentRecord>> {
        let rows = Student::find()
            .order_by_desc(student::Column::CreatedAt)
            .all(&self.db)
            .await?;
        debug!("Loaded {} student rows", rows.len());
        rows.into_iter().map(record_from_model).collect()
    }

    async fn create(&self, input: &StudentInput) -> Result<StudentRecord> {
        let payload = insert_payload(input);
        let now = Utc::now();
        let mut active = student::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        apply_payload(&mut active, &payload)?;

        let model = active.insert(&self.db).await?;
        info!("Inserted student {} ({})", model.id, model.name);
        self.publish(ChangeKind::Insert, &model.id);
        record_from_model(model)
    }

    async fn update(&self, id: &str, patch: &StudentPatch) -> Result<Option<StudentChanges>> {
        let payload = update_payload(patch);
        let current = self.find(id).await?;
        if payload.is_empty() {
            return record_from_model(current).map(|record| Some(record.into()));
        }
        trace!("Update payload for {}: {:?}", id, payload);

        let mut active: student::ActiveModel = current.into();
        apply_payload(&mut active, &payload)?;
        active.updated_at = Set(Utc::now());

        // The row can disappear between the lookup and the write.
        let model = active.update(&self.db).await.map_err(|e| match e {
            DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => Error::NotFound {
                id: id.to_string(),
            },
            other => other.into(),
        })?;
        info!(
            "Updated student {} ({} field(s))",
            model.id,
            payload.len()
        );
        self.publish(ChangeKind::Update, &model.id);
        record_from_model(model).map(|record| Some(record.into()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = Student::delete_by_id(id.to_string())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(Error::NotFound { id: id.to_string() });
        }
        info!("Deleted student {}", id);
        self.publish(ChangeKind::Delete, id);
        Ok(())
    }

    async fn subscribe(&self) -> Result<Option<ChangeFeed>> {
        debug!("New subscriber on the students change feed");
        Ok(Some(ChangeFeed::new(self.changes.subscribe())))
    }
}
