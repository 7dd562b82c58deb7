//! Appointment models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::timestamp;

/// Appointment lifecycle status.
///
/// Transitions are unrestricted: any status may follow any other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown appointment status: {0}")]
pub struct UnknownAppointmentStatus(pub String);

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in-progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the appointment still holds its (doctor, time) slot.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = UnknownAppointmentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "in-progress" => Ok(AppointmentStatus::InProgress),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(UnknownAppointmentStatus(s.to_string())),
        }
    }
}

/// A booked appointment. Never deleted; cancellation is a status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub hospital_id: Option<i64>,
    #[serde(rename = "timestamp", with = "timestamp")]
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub is_teleconsultation: bool,
    pub created_at: String,
}

/// Client request to book a slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    /// Defaults to the doctor's hospital when absent
    #[serde(default)]
    pub hospital_id: Option<i64>,
    #[serde(rename = "timestamp", with = "timestamp")]
    pub scheduled_at: NaiveDateTime,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub is_teleconsultation: bool,
}

/// Row to insert once a booking has passed the conflict check.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub hospital_id: Option<i64>,
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub is_teleconsultation: bool,
}

/// Typed partial update. Only these two columns are mutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentPatch {
    #[serde(default)]
    pub status: Option<AppointmentStatus>,
    #[serde(
        default,
        rename = "timestamp",
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub scheduled_at: Option<NaiveDateTime>,
}

impl AppointmentPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.scheduled_at.is_none()
    }
}

/// Public view of a doctor's booked slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    #[serde(rename = "timestamp", with = "timestamp")]
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub is_teleconsultation: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&AppointmentStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!(
            "in-progress".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::InProgress
        );
        assert!("done".parse::<AppointmentStatus>().is_err());
    }

    #[test]
    fn test_only_cancelled_releases_slot() {
        assert!(AppointmentStatus::Pending.holds_slot());
        assert!(AppointmentStatus::Completed.holds_slot());
        assert!(!AppointmentStatus::Cancelled.holds_slot());
    }

    #[test]
    fn test_booking_request_accepts_minute_precision() {
        let request: BookingRequest = serde_json::from_str(
            r#"{"patientId":7,"doctorId":3,"hospitalId":1,"timestamp":"2024-05-01T10:00","reason":"checkup"}"#,
        )
        .unwrap();
        assert_eq!(request.scheduled_at.to_string(), "2024-05-01 10:00:00");
        assert!(!request.is_teleconsultation);
    }

    #[test]
    fn test_empty_patch() {
        let patch: AppointmentPatch = serde_json::from_str("{}").unwrap();
        assert!(patch.is_empty());

        let patch: AppointmentPatch =
            serde_json::from_str(r#"{"timestamp":"2024-05-01T11:00"}"#).unwrap();
        assert!(!patch.is_empty());
        assert!(patch.status.is_none());
    }
}
