/// Roster synchronization with the remote store
pub mod roster;
/// Aggregates and display formatting for the student list
pub mod summary;
/// Form parsing and field validation
pub mod validation;

pub use roster::{ChangeWatch, Roster, SyncStrategy};
pub use summary::{RosterSummary, format_date, format_fee, student_count_label, summarize};
pub use validation::StudentForm;
