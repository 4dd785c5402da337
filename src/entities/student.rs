//! Student entity - One row per enrolled student.
//!
//! Columns use the snake_case wire names. Belt and blood type are stored as
//! their labels; conversion to the domain enums happens in [`crate::mapping`].

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    /// Opaque identifier (UUID v4 string)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Full name
    pub name: String,
    /// Mother's name
    pub mother_name: Option<String>,
    /// Father's name
    pub father_name: Option<String>,
    /// Age in years
    pub age: i32,
    /// Belt label, e.g. "Amarela"
    pub belt: String,
    /// Blood type label, e.g. "O+"
    pub blood_type: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Home address
    pub address: Option<String>,
    /// Free-form notes
    #[sea_orm(column_type = "Text", nullable)]
    pub observations: Option<String>,
    /// Date the student joined
    pub enrollment_date: Option<Date>,
    /// Monthly fee, null when not informed
    pub monthly_fee: Option<f64>,
    /// When the row was inserted
    pub created_at: DateTimeUtc,
    /// When the row was last modified
    pub updated_at: DateTimeUtc,
}

/// Students have no relations.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
