//! Form parsing and field validation.
//!
//! A [`StudentForm`] holds exactly what the user typed. Validation checks the
//! fields in display order and stops at the first problem, returning an
//! `Error::Validation` that names the offending field by its internal name.

use crate::{
    errors::{Error, Result},
    mapping::Field,
    models::{Belt, BloodType, StudentInput, StudentPatch, StudentRecord},
    notify::Notice,
};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Youngest accepted age.
pub const MIN_AGE: i32 = 3;
/// Oldest accepted age.
pub const MAX_AGE: i32 = 100;

const NAME_REQUIRED: &str = "O nome completo é obrigatório.";
const AGE_OUT_OF_RANGE: &str = "A idade deve estar entre 3 e 100 anos.";
const BELT_REQUIRED: &str = "Selecione a graduação (faixa) do aluno.";
const BLOOD_TYPE_INVALID: &str = "Selecione um tipo sanguíneo válido.";
const PHONE_INVALID: &str = "Digite um número de celular válido.";
const FEE_INVALID: &str = "Digite um valor válido para a mensalidade.";
const DATE_INVALID: &str = "Digite uma data de matrícula válida.";

/// Brazilian mobile or landline, with optional area-code parentheses and separators.
#[allow(clippy::expect_used)]
static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(?\d{2}\)?[\s-]?\d{4,5}[\s-]?\d{4}$").expect("phone pattern is valid")
});

/// Raw contents of the student form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentForm {
    /// Full name
    pub name: String,
    /// Mother's name
    pub mother_name: String,
    /// Father's name
    pub father_name: String,
    /// Age, as typed
    pub age: String,
    /// Belt label
    pub belt: String,
    /// Blood type label
    pub blood_type: String,
    /// Contact phone
    pub phone: String,
    /// Home address
    pub address: String,
    /// Free-form notes
    pub observations: String,
    /// Enrollment date, `YYYY-MM-DD`
    pub enrollment_date: String,
    /// Monthly fee, `.` or `,` as decimal separator
    pub monthly_fee: String,
}

/// Fields after validation, shared by the create and edit paths.
struct Checked {
    name: String,
    mother_name: Option<String>,
    father_name: Option<String>,
    age: i32,
    belt: Belt,
    blood_type: Option<BloodType>,
    phone: Option<String>,
    address: Option<String>,
    observations: Option<String>,
    enrollment_date: Option<NaiveDate>,
    monthly_fee: Option<f64>,
}

fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn invalid(field: Field, message: &str) -> Error {
    Error::invalid_field(field.internal_name(), message)
}

/// True for an empty phone or one matching the accepted formats.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    compact.is_empty() || PHONE_PATTERN.is_match(&compact)
}

/// Parses an age within [`MIN_AGE`]..=[`MAX_AGE`].
pub fn parse_age(value: &str) -> Result<i32> {
    value
        .trim()
        .parse::<i32>()
        .ok()
        .filter(|age| (MIN_AGE..=MAX_AGE).contains(age))
        .ok_or_else(|| invalid(Field::Age, AGE_OUT_OF_RANGE))
}

/// Parses a monthly fee. Empty input means "not informed".
pub fn parse_fee(value: &str) -> Result<Option<f64>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|fee| fee.is_finite() && *fee >= 0.0)
        .map(Some)
        .ok_or_else(|| invalid(Field::MonthlyFee, FEE_INVALID))
}

impl StudentForm {
    /// Form prefilled from an existing record, as the edit dialog opens it.
    #[must_use]
    pub fn from_record(record: &StudentRecord) -> Self {
        Self {
            name: record.name.clone(),
            mother_name: record.mother_name.clone().unwrap_or_default(),
            father_name: record.father_name.clone().unwrap_or_default(),
            age: record.age.to_string(),
            belt: record.belt.label().to_string(),
            blood_type: record
                .blood_type
                .map(|bt| bt.label().to_string())
                .unwrap_or_default(),
            phone: record.phone.clone().unwrap_or_default(),
            address: record.address.clone().unwrap_or_default(),
            observations: record.observations.clone().unwrap_or_default(),
            enrollment_date: record
                .enrollment_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            monthly_fee: record.monthly_fee.map(|f| f.to_string()).unwrap_or_default(),
        }
    }

    fn check(&self) -> Result<Checked> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(invalid(Field::Name, NAME_REQUIRED));
        }
        let age = parse_age(&self.age)?;
        let belt = self
            .belt
            .parse::<Belt>()
            .map_err(|_| invalid(Field::Belt, BELT_REQUIRED))?;
        let blood_type = match optional_text(&self.blood_type) {
            Some(label) => Some(
                label
                    .parse::<BloodType>()
                    .map_err(|_| invalid(Field::BloodType, BLOOD_TYPE_INVALID))?,
            ),
            None => None,
        };
        if !is_valid_phone(&self.phone) {
            return Err(invalid(Field::Phone, PHONE_INVALID));
        }
        let monthly_fee = parse_fee(&self.monthly_fee)?;
        let enrollment_date = match optional_text(&self.enrollment_date) {
            Some(date) => Some(
                NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|_| invalid(Field::EnrollmentDate, DATE_INVALID))?,
            ),
            None => None,
        };

        Ok(Checked {
            name: name.to_string(),
            mother_name: optional_text(&self.mother_name),
            father_name: optional_text(&self.father_name),
            age,
            belt,
            blood_type,
            phone: optional_text(&self.phone),
            address: optional_text(&self.address),
            observations: optional_text(&self.observations),
            enrollment_date,
            monthly_fee,
        })
    }

    /// Validates the form for a new student.
    pub fn validate_new(&self) -> Result<StudentInput> {
        let c = self.check()?;
        Ok(StudentInput {
            name: c.name,
            mother_name: c.mother_name,
            father_name: c.father_name,
            age: c.age,
            belt: c.belt,
            blood_type: c.blood_type,
            phone: c.phone,
            address: c.address,
            observations: c.observations,
            enrollment_date: c.enrollment_date,
            monthly_fee: c.monthly_fee,
        })
    }

    /// Validates the form for an edit. Every field on the form is sent, so
    /// cleared inputs clear the stored value.
    pub fn validate_edit(&self) -> Result<StudentPatch> {
        let c = self.check()?;
        Ok(StudentPatch {
            name: Some(c.name),
            mother_name: Some(c.mother_name),
            father_name: Some(c.father_name),
            age: Some(c.age),
            belt: Some(c.belt),
            blood_type: Some(c.blood_type),
            phone: Some(c.phone),
            address: Some(c.address),
            observations: Some(c.observations),
            enrollment_date: Some(c.enrollment_date),
            monthly_fee: Some(c.monthly_fee),
        })
    }
}

/// Notice shown when a form fails validation.
#[must_use]
pub fn invalid_form_notice(error: &Error) -> Notice {
    let field = match error {
        Error::Validation { field, .. } => field.as_deref().and_then(Field::from_internal_name),
        _ => None,
    };
    let title = match field {
        Some(Field::Name | Field::Belt) => "Campo obrigatório",
        Some(Field::Age) => "Idade inválida",
        Some(Field::Phone) => "Celular inválido",
        Some(Field::MonthlyFee) => "Mensalidade inválida",
        _ => "Dados inválidos",
    };
    Notice::destructive(title, error.to_string())
}
