//! Patient models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Prefix of every externally issued medical identifier.
pub const MEDICAL_ID_PREFIX: &str = "MED";

/// A patient profile, owned by exactly one patient account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    /// Human-shareable lookup code, e.g. `MED482913`
    pub medical_id: String,
    pub created_at: String,
}

/// Fields needed to insert a patient row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPatient {
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub gender: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub medical_id: String,
}

/// Check that a string has the `MED` + six digit shape.
pub fn is_medical_id(candidate: &str) -> bool {
    candidate
        .strip_prefix(MEDICAL_ID_PREFIX)
        .map(|digits| digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}
