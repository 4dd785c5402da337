//! Internal <-> wire field mapping.
//!
//! This is the only place that knows both names of a field. Payload builders,
//! row decoding and the table store's column writes all go through
//! [`FIELD_NAMES`], so adding a field means touching this table and the
//! conversions below it, nothing else.
//!
//! Empty or whitespace-only optional text is always sent and read back as null.

use crate::{
    entities::student,
    errors::{Error, Result},
    models::{Belt, BloodType, StudentChanges, StudentInput, StudentPatch, StudentRecord},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::ActiveModelTrait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// JSON object sent to the remote store, keyed by wire names.
pub type WirePayload = serde_json::Map<String, Value>;

/// Wire name of the identifier.
pub const ID: &str = "id";
/// Wire name of the creation timestamp.
pub const CREATED_AT: &str = "created_at";
/// Wire name of the last-update timestamp.
pub const UPDATED_AT: &str = "updated_at";

/// Every user-editable field of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// `name`
    Name,
    /// `motherName` / `mother_name`
    MotherName,
    /// `fatherName` / `father_name`
    FatherName,
    /// `age`
    Age,
    /// `belt`
    Belt,
    /// `bloodType` / `blood_type`
    BloodType,
    /// `phone`
    Phone,
    /// `address`
    Address,
    /// `observations`
    Observations,
    /// `enrollmentDate` / `enrollment_date`
    EnrollmentDate,
    /// `monthlyFee` / `monthly_fee`
    MonthlyFee,
}

/// (field, internal camelCase name, wire snake_case name)
pub const FIELD_NAMES: [(Field, &str, &str); 11] = [
    (Field::Name, "name", "name"),
    (Field::MotherName, "motherName", "mother_name"),
    (Field::FatherName, "fatherName", "father_name"),
    (Field::Age, "age", "age"),
    (Field::Belt, "belt", "belt"),
    (Field::BloodType, "bloodType", "blood_type"),
    (Field::Phone, "phone", "phone"),
    (Field::Address, "address", "address"),
    (Field::Observations, "observations", "observations"),
    (Field::EnrollmentDate, "enrollmentDate", "enrollment_date"),
    (Field::MonthlyFee, "monthlyFee", "monthly_fee"),
];

impl Field {
    /// All fields, in table order.
    pub const ALL: [Self; 11] = [
        Self::Name,
        Self::MotherName,
        Self::FatherName,
        Self::Age,
        Self::Belt,
        Self::BloodType,
        Self::Phone,
        Self::Address,
        Self::Observations,
        Self::EnrollmentDate,
        Self::MonthlyFee,
    ];

    const fn names(self) -> (&'static str, &'static str) {
        let (_, internal, wire) = FIELD_NAMES[self as usize];
        (internal, wire)
    }

    /// camelCase name used by the application.
    #[must_use]
    pub const fn internal_name(self) -> &'static str {
        self.names().0
    }

    /// snake_case name used by the remote store.
    #[must_use]
    pub const fn wire_name(self) -> &'static str {
        self.names().1
    }

    /// Looks a field up by its wire name.
    #[must_use]
    pub fn from_wire_name(name: &str) -> Option<Self> {
        FIELD_NAMES
            .iter()
            .find(|(_, _, wire)| *wire == name)
            .map(|(field, _, _)| *field)
    }

    /// Looks a field up by its internal name.
    #[must_use]
    pub fn from_internal_name(name: &str) -> Option<Self> {
        FIELD_NAMES
            .iter()
            .find(|(_, internal, _)| *internal == name)
            .map(|(field, _, _)| *field)
    }

    /// Column holding this field in the `students` table.
    #[must_use]
    pub const fn column(self) -> student::Column {
        match self {
            Self::Name => student::Column::Name,
            Self::MotherName => student::Column::MotherName,
            Self::FatherName => student::Column::FatherName,
            Self::Age => student::Column::Age,
            Self::Belt => student::Column::Belt,
            Self::BloodType => student::Column::BloodType,
            Self::Phone => student::Column::Phone,
            Self::Address => student::Column::Address,
            Self::Observations => student::Column::Observations,
            Self::EnrollmentDate => student::Column::EnrollmentDate,
            Self::MonthlyFee => student::Column::MonthlyFee,
        }
    }
}

fn normalize_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn text_value(value: Option<&str>) -> Value {
    normalize_text(value).map_or(Value::Null, Value::String)
}

fn date_value(value: Option<NaiveDate>) -> Value {
    value.map_or(Value::Null, |d| {
        Value::String(d.format("%Y-%m-%d").to_string())
    })
}

fn fee_value(value: Option<f64>) -> Value {
    value.map_or(Value::Null, Value::from)
}

fn input_value(field: Field, input: &StudentInput) -> Value {
    match field {
        Field::Name => Value::String(input.name.trim().to_string()),
        Field::MotherName => text_value(input.mother_name.as_deref()),
        Field::FatherName => text_value(input.father_name.as_deref()),
        Field::Age => Value::from(input.age),
        Field::Belt => Value::String(input.belt.label().to_string()),
        Field::BloodType => input
            .blood_type
            .map_or(Value::Null, |bt| Value::String(bt.label().to_string())),
        Field::Phone => text_value(input.phone.as_deref()),
        Field::Address => text_value(input.address.as_deref()),
        Field::Observations => text_value(input.observations.as_deref()),
        Field::EnrollmentDate => date_value(input.enrollment_date),
        Field::MonthlyFee => fee_value(input.monthly_fee),
    }
}

fn patch_value(field: Field, patch: &StudentPatch) -> Option<Value> {
    match field {
        Field::Name => patch
            .name
            .as_ref()
            .map(|name| Value::String(name.trim().to_string())),
        Field::MotherName => patch.mother_name.as_ref().map(|v| text_value(v.as_deref())),
        Field::FatherName => patch.father_name.as_ref().map(|v| text_value(v.as_deref())),
        Field::Age => patch.age.map(Value::from),
        Field::Belt => patch.belt.map(|b| Value::String(b.label().to_string())),
        Field::BloodType => patch.blood_type.map(|v| {
            v.map_or(Value::Null, |bt| Value::String(bt.label().to_string()))
        }),
        Field::Phone => patch.phone.as_ref().map(|v| text_value(v.as_deref())),
        Field::Address => patch.address.as_ref().map(|v| text_value(v.as_deref())),
        Field::Observations => patch
            .observations
            .as_ref()
            .map(|v| text_value(v.as_deref())),
        Field::EnrollmentDate => patch.enrollment_date.map(date_value),
        Field::MonthlyFee => patch.monthly_fee.map(fee_value),
    }
}

/// Full payload for creating a student.
#[must_use]
pub fn insert_payload(input: &StudentInput) -> WirePayload {
    Field::ALL
        .iter()
        .map(|&field| (field.wire_name().to_string(), input_value(field, input)))
        .collect()
}

/// Payload carrying only the fields present in `patch`.
#[must_use]
pub fn update_payload(patch: &StudentPatch) -> WirePayload {
    let patch = normalized_patch(patch);
    Field::ALL
        .iter()
        .filter_map(|&field| {
            patch_value(field, &patch).map(|value| (field.wire_name().to_string(), value))
        })
        .collect()
}

/// `patch` as the store will see it: text trimmed, blank optional text cleared.
#[must_use]
pub fn normalized_patch(patch: &StudentPatch) -> StudentPatch {
    let text = |value: &Option<Option<String>>| {
        value
            .as_ref()
            .map(|inner| normalize_text(inner.as_deref()))
    };
    StudentPatch {
        name: patch.name.as_ref().map(|name| name.trim().to_string()),
        mother_name: text(&patch.mother_name),
        father_name: text(&patch.father_name),
        phone: text(&patch.phone),
        address: text(&patch.address),
        observations: text(&patch.observations),
        ..patch.clone()
    }
}

fn decode_error(field: &str, message: impl std::fmt::Display) -> Error {
    Error::Decode {
        message: format!("{field}: {message}"),
    }
}

/// Reads the columns present in an update response.
///
/// Fields missing from `row` stay absent from the result, unknown keys are ignored.
pub fn changes_from_wire(row: &WirePayload) -> Result<StudentChanges> {
    let mut patch = StudentPatch::default();
    for field in Field::ALL {
        let Some(value) = row.get(field.wire_name()) else {
            continue;
        };
        let name = field.wire_name();
        let text = || match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(normalize_text(Some(s.as_str()))),
            other => Err(decode_error(name, format!("expected text, got {other}"))),
        };
        match field {
            Field::Name => {
                let name_value = text()?.ok_or_else(|| decode_error(name, "missing name"))?;
                patch.name = Some(name_value);
            }
            Field::MotherName => patch.mother_name = Some(text()?),
            Field::FatherName => patch.father_name = Some(text()?),
            Field::Phone => patch.phone = Some(text()?),
            Field::Address => patch.address = Some(text()?),
            Field::Observations => patch.observations = Some(text()?),
            Field::Age => {
                let age = value
                    .as_i64()
                    .and_then(|age| i32::try_from(age).ok())
                    .ok_or_else(|| decode_error(name, format!("expected an integer, got {value}")))?;
                patch.age = Some(age);
            }
            Field::Belt => {
                let label = text()?.ok_or_else(|| decode_error(name, "missing belt"))?;
                patch.belt = Some(label.parse::<Belt>().map_err(|e| decode_error(name, e))?);
            }
            Field::BloodType => {
                patch.blood_type = Some(
                    text()?
                        .map(|label| label.parse::<BloodType>())
                        .transpose()
                        .map_err(|e| decode_error(name, e))?,
                );
            }
            Field::EnrollmentDate => {
                patch.enrollment_date = Some(
                    text()?
                        .map(|date| NaiveDate::parse_from_str(&date, "%Y-%m-%d"))
                        .transpose()
                        .map_err(|e| decode_error(name, e))?,
                );
            }
            Field::MonthlyFee => {
                patch.monthly_fee =
                    Some(lenient_fee(value.clone()).map_err(|e| decode_error(name, e))?);
            }
        }
    }

    let updated_at = match row.get(UPDATED_AT) {
        None | Some(Value::Null) => None,
        Some(value) => serde_json::from_value::<DateTime<Utc>>(value.clone())
            .map(Some)
            .map_err(|e| decode_error(UPDATED_AT, e))?,
    };
    Ok(StudentChanges { patch, updated_at })
}

/// Accepts a fee sent as a number, a numeric string (postgres `numeric`), or null.
fn lenient_fee<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(other) => Err(serde::de::Error::custom(format!(
            "monthly_fee must be a number, got {other}"
        ))),
    }
}

/// A student row as the remote store returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRow {
    /// Identifier
    pub id: String,
    /// Full name
    pub name: String,
    /// Mother's name
    #[serde(default)]
    pub mother_name: Option<String>,
    /// Father's name
    #[serde(default)]
    pub father_name: Option<String>,
    /// Age
    pub age: i32,
    /// Belt label
    pub belt: String,
    /// Blood type label
    #[serde(default)]
    pub blood_type: Option<String>,
    /// Phone
    #[serde(default)]
    pub phone: Option<String>,
    /// Address
    #[serde(default)]
    pub address: Option<String>,
    /// Observations
    #[serde(default)]
    pub observations: Option<String>,
    /// Enrollment date (`YYYY-MM-DD`)
    #[serde(default)]
    pub enrollment_date: Option<NaiveDate>,
    /// Monthly fee
    #[serde(default, deserialize_with = "lenient_fee")]
    pub monthly_fee: Option<f64>,
    /// Creation timestamp
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<WireRow> for StudentRecord {
    type Error = Error;

    fn try_from(row: WireRow) -> Result<Self> {
        let belt = row.belt.parse::<Belt>().map_err(|message| Error::Decode {
            message: format!("student {}: {message}", row.id),
        })?;
        let blood_type = normalize_text(row.blood_type.as_deref())
            .map(|label| label.parse::<BloodType>())
            .transpose()
            .map_err(|message| Error::Decode {
                message: format!("student {}: {message}", row.id),
            })?;

        Ok(Self {
            name: row.name.trim().to_string(),
            mother_name: normalize_text(row.mother_name.as_deref()),
            father_name: normalize_text(row.father_name.as_deref()),
            age: row.age,
            belt,
            blood_type,
            phone: normalize_text(row.phone.as_deref()),
            address: normalize_text(row.address.as_deref()),
            observations: normalize_text(row.observations.as_deref()),
            enrollment_date: row.enrollment_date,
            monthly_fee: row.monthly_fee,
            created_at: row.created_at,
            updated_at: row.updated_at,
            id: row.id,
        })
    }
}

impl From<student::Model> for WireRow {
    fn from(model: student::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            mother_name: model.mother_name,
            father_name: model.father_name,
            age: model.age,
            belt: model.belt,
            blood_type: model.blood_type,
            phone: model.phone,
            address: model.address,
            observations: model.observations,
            enrollment_date: model.enrollment_date,
            monthly_fee: model.monthly_fee,
            created_at: Some(model.created_at),
            updated_at: Some(model.updated_at),
        }
    }
}

/// Decodes a table row straight into a record.
pub fn record_from_model(model: student::Model) -> Result<StudentRecord> {
    StudentRecord::try_from(WireRow::from(model))
}

fn nullable_text(field: Field, value: &Value) -> Result<sea_orm::Value> {
    match value {
        Value::Null => Ok(sea_orm::Value::from(None::<String>)),
        Value::String(s) => Ok(sea_orm::Value::from(normalize_text(Some(s.as_str())))),
        other => Err(Error::invalid_field(
            field.internal_name(),
            format!("expected text, got {other}"),
        )),
    }
}

/// Converts one payload entry into a typed column value, rejecting what the table cannot hold.
fn column_value(field: Field, value: &Value) -> Result<sea_orm::Value> {
    let invalid = |message: &str| Error::invalid_field(field.internal_name(), message);
    match field {
        Field::Name => match value.as_str().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(sea_orm::Value::from(name.to_string())),
            _ => Err(invalid("O nome completo é obrigatório.")),
        },
        Field::Age => value
            .as_i64()
            .and_then(|age| i32::try_from(age).ok())
            .map(sea_orm::Value::from)
            .ok_or_else(|| invalid("A idade deve ser um número inteiro.")),
        Field::Belt => value
            .as_str()
            .and_then(|label| label.parse::<Belt>().ok())
            .map(|belt| sea_orm::Value::from(belt.label().to_string()))
            .ok_or_else(|| invalid("Graduação (faixa) inválida.")),
        Field::BloodType => match value {
            Value::Null => Ok(sea_orm::Value::from(None::<String>)),
            Value::String(s) if s.trim().is_empty() => Ok(sea_orm::Value::from(None::<String>)),
            Value::String(s) => s
                .parse::<BloodType>()
                .map(|bt| sea_orm::Value::from(Some(bt.label().to_string())))
                .map_err(|_| invalid("Tipo sanguíneo inválido.")),
            _ => Err(invalid("Tipo sanguíneo inválido.")),
        },
        Field::MotherName
        | Field::FatherName
        | Field::Phone
        | Field::Address
        | Field::Observations => nullable_text(field, value),
        Field::EnrollmentDate => match value {
            Value::Null => Ok(sea_orm::Value::from(None::<NaiveDate>)),
            Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(|d| sea_orm::Value::from(Some(d)))
                .map_err(|_| invalid("Data de matrícula inválida.")),
            _ => Err(invalid("Data de matrícula inválida.")),
        },
        Field::MonthlyFee => match value {
            Value::Null => Ok(sea_orm::Value::from(None::<f64>)),
            Value::Number(n) => match n.as_f64() {
                Some(fee) if fee >= 0.0 && fee.is_finite() => {
                    Ok(sea_orm::Value::from(Some(fee)))
                }
                _ => Err(invalid("Digite um valor válido para a mensalidade.")),
            },
            _ => Err(invalid("Digite um valor válido para a mensalidade.")),
        },
    }
}

/// Writes every payload entry into `active`, addressing columns through the field table.
///
/// # Errors
/// Returns `Validation` for unknown keys and for values the column cannot hold.
pub fn apply_payload(active: &mut student::ActiveModel, payload: &WirePayload) -> Result<()> {
    for (key, value) in payload {
        let field = Field::from_wire_name(key).ok_or_else(|| Error::Validation {
            field: None,
            message: format!("unknown field '{key}'"),
        })?;
        let column_value = column_value(field, value)?;
        active.set(field.column(), column_value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use serde_json::json;

    fn ana() -> StudentInput {
        StudentInput::new("Ana Lima", 10, Belt::Amarela).with_monthly_fee(150.0)
    }

    #[test]
    fn test_field_table_is_exhaustive_and_consistent() {
        let input_json = serde_json::to_value(ana()).unwrap();
        let internal_keys: Vec<&String> = input_json.as_object().unwrap().keys().collect();
        assert_eq!(internal_keys.len(), Field::ALL.len());

        let payload = insert_payload(&ana());
        assert_eq!(payload.len(), Field::ALL.len());

        for field in Field::ALL {
            assert!(input_json.get(field.internal_name()).is_some());
            assert!(payload.contains_key(field.wire_name()));
            assert_eq!(Field::from_wire_name(field.wire_name()), Some(field));
            assert_eq!(Field::from_internal_name(field.internal_name()), Some(field));
        }
    }

    #[test]
    fn test_insert_payload_nulls_empty_optionals() {
        let mut input = ana();
        input.mother_name = Some("   ".to_string());
        input.phone = Some(String::new());
        input.father_name = Some(" João ".to_string());

        let payload = insert_payload(&input);

        assert_eq!(payload["mother_name"], Value::Null);
        assert_eq!(payload["phone"], Value::Null);
        assert_eq!(payload["father_name"], json!("João"));
        assert_eq!(payload["belt"], json!("Amarela"));
        assert_eq!(payload["monthly_fee"], json!(150.0));
        assert_eq!(payload["enrollment_date"], Value::Null);
    }

    #[test]
    fn test_update_payload_omits_absent_fields() {
        let patch = StudentPatch::default().belt(Belt::Verde).phone(Some(""));
        let payload = update_payload(&patch);

        assert_eq!(payload.len(), 2);
        assert_eq!(payload["belt"], json!("Verde"));
        assert_eq!(payload["phone"], Value::Null);
        assert!(!payload.contains_key("age"));
    }

    #[test]
    fn test_wire_row_decodes_supabase_shape() {
        let row: WireRow = serde_json::from_value(json!({
            "id": "abc",
            "name": "Ana Lima",
            "mother_name": "",
            "father_name": null,
            "age": 10,
            "belt": "Branca",
            "blood_type": "O+",
            "enrollment_date": "2024-02-01",
            "monthly_fee": "150.00",
            "created_at": "2024-02-01T12:00:00Z"
        }))
        .unwrap();

        let record = StudentRecord::try_from(row).unwrap();
        assert_eq!(record.id, "abc");
        assert_eq!(record.mother_name, None);
        assert_eq!(record.belt, Belt::Branca);
        assert_eq!(record.blood_type, Some(BloodType::OPositive));
        assert_eq!(record.monthly_fee, Some(150.0));
        assert_eq!(
            record.enrollment_date,
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
        assert!(record.created_at.is_some());
        assert!(record.updated_at.is_none());
    }

    #[test]
    fn test_wire_row_uses_identity_names() {
        let row: WireRow = serde_json::from_value(json!({
            "id": "abc", "name": "Ana", "age": 10, "belt": "Verde",
            "created_at": "2024-02-01T12:00:00Z", "updated_at": "2024-02-02T12:00:00Z"
        }))
        .unwrap();
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value[ID], json!("abc"));
        assert!(value[CREATED_AT].is_string());
        assert!(value[UPDATED_AT].is_string());
    }

    #[test]
    fn test_zero_fee_stays_informed() {
        let row: WireRow = serde_json::from_value(json!({
            "id": "z", "name": "Zero", "age": 7, "belt": "Cinza", "monthly_fee": 0
        }))
        .unwrap();
        let record = StudentRecord::try_from(row).unwrap();
        assert_eq!(record.monthly_fee, Some(0.0));
    }

    #[test]
    fn test_unknown_belt_is_a_decode_error() {
        let row: WireRow = serde_json::from_value(json!({
            "id": "x", "name": "X", "age": 9, "belt": "Roxa"
        }))
        .unwrap();
        let err = StudentRecord::try_from(row).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_apply_payload_rejects_blank_name_and_negative_fee() {
        let mut active = student::ActiveModel {
            ..Default::default()
        };
        let mut payload = WirePayload::new();
        payload.insert("name".to_string(), json!("  "));
        let err = apply_payload(&mut active, &payload).unwrap_err();
        assert!(matches!(err, Error::Validation { field: Some(ref f), .. } if f == "name"));

        let mut payload = WirePayload::new();
        payload.insert("monthly_fee".to_string(), json!(-1.0));
        let err = apply_payload(&mut active, &payload).unwrap_err();
        assert!(matches!(err, Error::Validation { field: Some(ref f), .. } if f == "monthlyFee"));
    }

    #[test]
    fn test_apply_payload_rejects_unknown_key() {
        let mut active = student::ActiveModel {
            ..Default::default()
        };
        let mut payload = WirePayload::new();
        payload.insert("shoe_size".to_string(), json!(38));
        assert!(apply_payload(&mut active, &payload).is_err());
    }

    #[test]
    fn test_normalized_patch_trims_and_clears() {
        let patch = StudentPatch::default()
            .name("  Ana Souza  ")
            .phone(Some("   "))
            .age(11);

        let normalized = normalized_patch(&patch);

        assert_eq!(normalized.name.as_deref(), Some("Ana Souza"));
        assert_eq!(normalized.phone, Some(None));
        assert_eq!(normalized.age, Some(11));
        assert_eq!(normalized.address, None);
    }

    #[test]
    fn test_partial_update_response_decodes_present_fields() {
        let row = json!({ "id": "s1", "belt": "Verde", "phone": "", "extra": true });

        let changes = changes_from_wire(row.as_object().unwrap()).unwrap();

        assert_eq!(changes.patch.belt, Some(Belt::Verde));
        assert_eq!(changes.patch.phone, Some(None));
        assert_eq!(changes.patch.name, None);
        assert_eq!(changes.patch.age, None);
        assert_eq!(changes.updated_at, None);
    }

    #[test]
    fn test_update_response_with_bad_belt_is_decode_error() {
        let row = json!({ "belt": "Roxa", "updated_at": "2024-02-02T12:00:00Z" });
        let err = changes_from_wire(row.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }
}
