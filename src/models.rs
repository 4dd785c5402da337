//! Domain types for the student roster.
//!
//! These are the in-memory shapes the application works with. They serialize
//! in camelCase; the snake_case wire shape lives in [`crate::mapping`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Graduation level, ordered from the first belt to the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Belt {
    /// White belt, the entry level
    #[serde(rename = "Faixa Branca", alias = "Branca")]
    Branca,
    /// Grey belt
    #[serde(rename = "Cinza")]
    Cinza,
    /// Yellow belt
    #[serde(rename = "Amarela")]
    Amarela,
    /// Yellow belt with green tip
    #[serde(rename = "Amarela ponta Verde")]
    AmarelaPontaVerde,
    /// Green belt
    #[serde(rename = "Verde")]
    Verde,
    /// Green belt with blue tip
    #[serde(rename = "Verde ponta Azul")]
    VerdePontaAzul,
    /// Blue belt
    #[serde(rename = "Azul")]
    Azul,
    /// Blue belt with red tip
    #[serde(rename = "Azul ponta Vermelha")]
    AzulPontaVermelha,
    /// Red belt
    #[serde(rename = "Vermelha")]
    Vermelha,
    /// Red belt with black tip
    #[serde(rename = "Vermelha ponta Preta")]
    VermelhaPontaPreta,
    /// Black belt
    #[serde(rename = "Preta")]
    Preta,
}

impl Belt {
    /// Every belt in rank order.
    pub const ALL: [Self; 11] = [
        Self::Branca,
        Self::Cinza,
        Self::Amarela,
        Self::AmarelaPontaVerde,
        Self::Verde,
        Self::VerdePontaAzul,
        Self::Azul,
        Self::AzulPontaVermelha,
        Self::Vermelha,
        Self::VermelhaPontaPreta,
        Self::Preta,
    ];

    /// Label as stored remotely and shown to users.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Branca => "Faixa Branca",
            Self::Cinza => "Cinza",
            Self::Amarela => "Amarela",
            Self::AmarelaPontaVerde => "Amarela ponta Verde",
            Self::Verde => "Verde",
            Self::VerdePontaAzul => "Verde ponta Azul",
            Self::Azul => "Azul",
            Self::AzulPontaVermelha => "Azul ponta Vermelha",
            Self::Vermelha => "Vermelha",
            Self::VermelhaPontaPreta => "Vermelha ponta Preta",
            Self::Preta => "Preta",
        }
    }

    /// Zero-based position in the ranking.
    #[must_use]
    pub const fn rank(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Belt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Belt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Older rows still carry the short label.
        if s == "Branca" {
            return Ok(Self::Branca);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|belt| belt.label() == s)
            .ok_or_else(|| format!("unknown belt '{s}'"))
    }
}

/// ABO/Rh blood type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodType {
    /// A+
    #[serde(rename = "A+")]
    APositive,
    /// A-
    #[serde(rename = "A-")]
    ANegative,
    /// B+
    #[serde(rename = "B+")]
    BPositive,
    /// B-
    #[serde(rename = "B-")]
    BNegative,
    /// AB+
    #[serde(rename = "AB+")]
    AbPositive,
    /// AB-
    #[serde(rename = "AB-")]
    AbNegative,
    /// O+
    #[serde(rename = "O+")]
    OPositive,
    /// O-
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodType {
    /// All eight blood types.
    pub const ALL: [Self; 8] = [
        Self::APositive,
        Self::ANegative,
        Self::BPositive,
        Self::BNegative,
        Self::AbPositive,
        Self::AbNegative,
        Self::OPositive,
        Self::ONegative,
    ];

    /// Conventional label, e.g. `AB-`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::APositive => "A+",
            Self::ANegative => "A-",
            Self::BPositive => "B+",
            Self::BNegative => "B-",
            Self::AbPositive => "AB+",
            Self::AbNegative => "AB-",
            Self::OPositive => "O+",
            Self::ONegative => "O-",
        }
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BloodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|bt| bt.label() == s)
            .ok_or_else(|| format!("unknown blood type '{s}'"))
    }
}

/// A persisted student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    /// Identifier assigned by the remote store
    pub id: String,
    /// Full name
    pub name: String,
    /// Mother's name
    pub mother_name: Option<String>,
    /// Father's name
    pub father_name: Option<String>,
    /// Age in years
    pub age: i32,
    /// Current graduation
    pub belt: Belt,
    /// Blood type, if informed
    pub blood_type: Option<BloodType>,
    /// Contact phone
    pub phone: Option<String>,
    /// Home address
    pub address: Option<String>,
    /// Free-form notes
    pub observations: Option<String>,
    /// Date the student joined
    pub enrollment_date: Option<NaiveDate>,
    /// Monthly fee; `None` means not informed
    pub monthly_fee: Option<f64>,
    /// Set by the store on creation
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the store on every update
    pub updated_at: Option<DateTime<Utc>>,
}

impl StudentRecord {
    /// The visible fields of this record, without identity or timestamps.
    #[must_use]
    pub fn to_input(&self) -> StudentInput {
        StudentInput {
            name: self.name.clone(),
            mother_name: self.mother_name.clone(),
            father_name: self.father_name.clone(),
            age: self.age,
            belt: self.belt,
            blood_type: self.blood_type,
            phone: self.phone.clone(),
            address: self.address.clone(),
            observations: self.observations.clone(),
            enrollment_date: self.enrollment_date,
            monthly_fee: self.monthly_fee,
        }
    }
}

/// Fields submitted to create a student. Identity and timestamps come from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    /// Full name
    pub name: String,
    /// Mother's name
    pub mother_name: Option<String>,
    /// Father's name
    pub father_name: Option<String>,
    /// Age in years
    pub age: i32,
    /// Current graduation
    pub belt: Belt,
    /// Blood type
    pub blood_type: Option<BloodType>,
    /// Contact phone
    pub phone: Option<String>,
    /// Home address
    pub address: Option<String>,
    /// Free-form notes
    pub observations: Option<String>,
    /// Date the student joined
    pub enrollment_date: Option<NaiveDate>,
    /// Monthly fee
    pub monthly_fee: Option<f64>,
}

impl StudentInput {
    /// Input with only the required fields set.
    pub fn new(name: impl Into<String>, age: i32, belt: Belt) -> Self {
        Self {
            name: name.into(),
            mother_name: None,
            father_name: None,
            age,
            belt,
            blood_type: None,
            phone: None,
            address: None,
            observations: None,
            enrollment_date: None,
            monthly_fee: None,
        }
    }

    /// Sets the monthly fee.
    #[must_use]
    pub const fn with_monthly_fee(mut self, fee: f64) -> Self {
        self.monthly_fee = Some(fee);
        self
    }

    /// Sets the guardians' names.
    #[must_use]
    pub fn with_guardians(mut self, mother: Option<&str>, father: Option<&str>) -> Self {
        self.mother_name = mother.map(str::to_string);
        self.father_name = father.map(str::to_string);
        self
    }

    /// Sets the contact phone.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the enrollment date.
    #[must_use]
    pub const fn with_enrollment_date(mut self, date: NaiveDate) -> Self {
        self.enrollment_date = Some(date);
        self
    }
}

/// A partial update.
///
/// `None` leaves a field untouched. For nullable fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentPatch {
    /// New name
    pub name: Option<String>,
    /// New mother's name
    pub mother_name: Option<Option<String>>,
    /// New father's name
    pub father_name: Option<Option<String>>,
    /// New age
    pub age: Option<i32>,
    /// New belt
    pub belt: Option<Belt>,
    /// New blood type
    pub blood_type: Option<Option<BloodType>>,
    /// New phone
    pub phone: Option<Option<String>>,
    /// New address
    pub address: Option<Option<String>>,
    /// New observations
    pub observations: Option<Option<String>>,
    /// New enrollment date
    pub enrollment_date: Option<Option<NaiveDate>>,
    /// New monthly fee
    pub monthly_fee: Option<Option<f64>>,
}

impl StudentPatch {
    /// Changes the belt.
    #[must_use]
    pub const fn belt(mut self, belt: Belt) -> Self {
        self.belt = Some(belt);
        self
    }

    /// Changes the age.
    #[must_use]
    pub const fn age(mut self, age: i32) -> Self {
        self.age = Some(age);
        self
    }

    /// Changes the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets or clears the phone.
    #[must_use]
    pub fn phone(mut self, phone: Option<&str>) -> Self {
        self.phone = Some(phone.map(str::to_string));
        self
    }

    /// Sets or clears the monthly fee.
    #[must_use]
    pub const fn monthly_fee(mut self, fee: Option<f64>) -> Self {
        self.monthly_fee = Some(fee);
        self
    }

    /// True when no field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the present fields to `record`, leaving the others as they are.
    pub fn apply_to(&self, record: &mut StudentRecord) {
        if let Some(name) = &self.name {
            record.name.clone_from(name);
        }
        if let Some(v) = &self.mother_name {
            record.mother_name.clone_from(v);
        }
        if let Some(v) = &self.father_name {
            record.father_name.clone_from(v);
        }
        if let Some(age) = self.age {
            record.age = age;
        }
        if let Some(belt) = self.belt {
            record.belt = belt;
        }
        if let Some(v) = self.blood_type {
            record.blood_type = v;
        }
        if let Some(v) = &self.phone {
            record.phone.clone_from(v);
        }
        if let Some(v) = &self.address {
            record.address.clone_from(v);
        }
        if let Some(v) = &self.observations {
            record.observations.clone_from(v);
        }
        if let Some(v) = self.enrollment_date {
            record.enrollment_date = v;
        }
        if let Some(v) = self.monthly_fee {
            record.monthly_fee = v;
        }
    }
}

/// Fields a store echoed back after an update.
///
/// A store may answer with the whole row or only some of its columns; fields
/// missing from the answer are absent from `patch`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentChanges {
    /// Echoed field values
    pub patch: StudentPatch,
    /// New update timestamp, when returned
    pub updated_at: Option<DateTime<Utc>>,
}

impl StudentChanges {
    /// Applies the echoed fields to `record`, keeping everything else.
    pub fn apply_to(&self, record: &mut StudentRecord) {
        self.patch.apply_to(record);
        if let Some(updated_at) = self.updated_at {
            record.updated_at = Some(updated_at);
        }
    }
}

impl From<StudentRecord> for StudentChanges {
    fn from(record: StudentRecord) -> Self {
        Self {
            updated_at: record.updated_at,
            patch: StudentPatch {
                name: Some(record.name),
                mother_name: Some(record.mother_name),
                father_name: Some(record.father_name),
                age: Some(record.age),
                belt: Some(record.belt),
                blood_type: Some(record.blood_type),
                phone: Some(record.phone),
                address: Some(record.address),
                observations: Some(record.observations),
                enrollment_date: Some(record.enrollment_date),
                monthly_fee: Some(record.monthly_fee),
            },
        }
    }
}
