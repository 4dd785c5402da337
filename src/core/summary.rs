//! Aggregates over the roster and the display formats the student table uses.
//!
//! Everything here is pure and works on a slice of records, so it can run on
//! any snapshot taken from [`crate::core::Roster::records`].

use crate::models::{Belt, StudentRecord};
use chrono::NaiveDate;

/// Shown for a fee that was never informed.
pub const FEE_NOT_INFORMED: &str = "Não informado";

/// Totals for a roster snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterSummary {
    /// Number of students
    pub total: usize,
    /// Students per belt, every belt listed in rank order
    pub by_belt: Vec<(Belt, usize)>,
    /// Sum of every informed monthly fee
    pub monthly_revenue: f64,
    /// Students whose fee is not informed
    pub fees_not_informed: usize,
}

impl RosterSummary {
    /// Count for a single belt.
    #[must_use]
    pub fn count_for(&self, belt: Belt) -> usize {
        self.by_belt
            .iter()
            .find(|(b, _)| *b == belt)
            .map_or(0, |(_, count)| *count)
    }
}

/// Builds the summary for `records`.
#[must_use]
pub fn summarize(records: &[StudentRecord]) -> RosterSummary {
    let mut counts = [0usize; Belt::ALL.len()];
    let mut monthly_revenue = 0.0;
    let mut fees_not_informed = 0;

    for record in records {
        counts[record.belt.rank()] += 1;
        match record.monthly_fee {
            Some(fee) => monthly_revenue += fee,
            None => fees_not_informed += 1,
        }
    }

    RosterSummary {
        total: records.len(),
        by_belt: Belt::ALL.iter().copied().zip(counts).collect(),
        monthly_revenue,
        fees_not_informed,
    }
}

/// Groups the integer part with dots, e.g. `1234567` -> `1.234.567`.
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Formats an amount in Brazilian reais, e.g. `R$ 1.234,50`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_currency(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{sign}R$ {},{:02}",
        group_thousands(cents / 100),
        cents % 100
    )
}

/// Display text for a monthly fee. An informed zero is shown as `R$ 0,00`.
#[must_use]
pub fn format_fee(fee: Option<f64>) -> String {
    fee.map_or_else(|| FEE_NOT_INFORMED.to_string(), format_currency)
}

/// Enrollment date as `dd/mm/yyyy`, or `-` when missing.
#[must_use]
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map_or_else(|| "-".to_string(), |d| d.format("%d/%m/%Y").to_string())
}

/// "1 aluno", "3 alunos".
#[must_use]
pub fn student_count_label(count: usize) -> String {
    if count == 1 {
        "1 aluno".to_string()
    } else {
        format!("{count} alunos")
    }
}
