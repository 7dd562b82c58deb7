//! Emergency dispatch models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyStatus {
    Pending,
    Dispatched,
    Completed,
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown emergency status: {0}")]
pub struct UnknownEmergencyStatus(pub String);

impl EmergencyStatus {
    pub const ALL: [EmergencyStatus; 4] = [
        EmergencyStatus::Pending,
        EmergencyStatus::Dispatched,
        EmergencyStatus::Completed,
        EmergencyStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyStatus::Pending => "pending",
            EmergencyStatus::Dispatched => "dispatched",
            EmergencyStatus::Completed => "completed",
            EmergencyStatus::Cancelled => "cancelled",
        }
    }

    /// Pending and dispatched requests still need a responder's attention.
    pub fn is_active(&self) -> bool {
        matches!(self, EmergencyStatus::Pending | EmergencyStatus::Dispatched)
    }
}

impl fmt::Display for EmergencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmergencyStatus {
    type Err = UnknownEmergencyStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EmergencyStatus::Pending),
            "dispatched" => Ok(EmergencyStatus::Dispatched),
            "completed" => Ok(EmergencyStatus::Completed),
            "cancelled" => Ok(EmergencyStatus::Cancelled),
            _ => Err(UnknownEmergencyStatus(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRequest {
    pub id: i64,
    pub patient_id: i64,
    pub location: String,
    pub coordinates: Option<String>,
    pub emergency_type: String,
    pub notes: Option<String>,
    pub status: EmergencyStatus,
    pub responded_by: Option<String>,
    pub requested_at: String,
}

/// Dispatcher view: the request plus who to call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEmergency {
    #[serde(flatten)]
    pub request: EmergencyRequest,
    pub patient_name: String,
    pub contact_number: Option<String>,
    pub medical_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewEmergencyRequest {
    pub patient_id: i64,
    pub location: String,
    #[serde(default)]
    pub coordinates: Option<String>,
    pub emergency_type: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Dispatcher update. Same typed partial-update shape as appointments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyPatch {
    #[serde(default)]
    pub status: Option<EmergencyStatus>,
    #[serde(default)]
    pub responded_by: Option<String>,
}

impl EmergencyPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.responded_by.is_none()
    }
}
