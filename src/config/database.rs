//! Database configuration for the table-backed store.
//!
//! Handles the SeaORM connection and creates the `students` table from the
//! entity definition with `Schema::create_table_from_entity`, so the schema
//! always matches the Rust struct without hand-written SQL.

use crate::entities::Student;
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Used when neither the config file nor `DATABASE_URL` names a database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/dojo_roster.sqlite?mode=rwc";

/// Establishes a connection to `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates the `students` table if it does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut student_table = schema.create_table_from_entity(Student);
    student_table.if_not_exists();

    db.execute(builder.build(&student_table)).await?;
    Ok(())
}
