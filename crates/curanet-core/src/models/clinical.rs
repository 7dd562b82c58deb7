//! Medical records, prescriptions and pharmacy orders.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A diagnosis entry written by a doctor or admin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: i64,
    pub patient_id: i64,
    pub hospital_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub diagnosis: String,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub record_date: String,
    pub follow_up_date: Option<NaiveDate>,
    /// Username of the author
    pub uploaded_by: String,
    /// Joined display names
    pub doctor_name: Option<String>,
    pub hospital_name: Option<String>,
}

/// Client request to create a record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordRequest {
    pub patient_id: i64,
    pub diagnosis: String,
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
}

/// Record row with author context resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMedicalRecord {
    pub patient_id: i64,
    pub hospital_id: Option<i64>,
    pub doctor_id: Option<i64>,
    pub diagnosis: String,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub follow_up_date: Option<NaiveDate>,
    pub uploaded_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: i64,
    pub record_id: Option<i64>,
    pub patient_id: i64,
    pub doctor_id: Option<i64>,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub issued_date: String,
    pub doctor_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRequest {
    pub patient_id: i64,
    #[serde(default)]
    pub record_id: Option<i64>,
    pub medication_name: String,
    pub dosage: String,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Prescription row with the issuing doctor resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPrescription {
    pub record_id: Option<i64>,
    pub patient_id: i64,
    pub doctor_id: Option<i64>,
    pub medication_name: String,
    pub dosage: String,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub instructions: Option<String>,
}

/// Pharmacy delivery order against an issued prescription.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyOrder {
    pub id: i64,
    pub patient_id: i64,
    pub prescription_id: i64,
    pub pharmacy_name: String,
    pub delivery_address: Option<String>,
    pub status: String,
    pub order_date: String,
    pub medication_name: Option<String>,
    pub dosage: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PharmacyOrderRequest {
    pub patient_id: i64,
    pub prescription_id: i64,
    pub pharmacy_name: String,
    #[serde(default)]
    pub delivery_address: Option<String>,
}

/// Aggregates shown on the patient dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientStatistics {
    pub record_count: u32,
    pub prescription_count: u32,
    /// Top five, most frequent first
    pub common_diagnoses: Vec<DiagnosisCount>,
    pub common_medications: Vec<MedicationCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosisCount {
    pub diagnosis: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationCount {
    pub medication: String,
    pub count: u32,
}
