//! Entity module - SeaORM entity definitions for the table-backed store.

pub mod student;

pub use student::{Column as StudentColumn, Entity as Student, Model as StudentModel};
