//! Clinical features around the core: records, prescriptions, patient
//! lookup, search, statistics, pharmacy orders and emergency dispatch.
//!
//! Every operation evaluates its access rule before touching the store.

mod services;

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::auth::Session;
use crate::db::{Database, DbError};
use crate::models::{
    Doctor, Hospital, MedicalRecord, NewMedicalRecord, NewPrescription, Patient,
    PatientStatistics, Prescription, PrescriptionRequest, RecordRequest, Role,
};
use crate::policy::{authorize, AccessRule, Decision, DenyReason, CLINICAL_AUTHORS, SEARCHERS};

/// How many entries the statistics rankings keep.
pub const TOP_N: usize = 5;

/// Upper bound on search results per query.
pub const SEARCH_LIMIT: usize = 50;

#[derive(Error, Debug)]
pub enum ClinicalError {
    #[error("Access denied")]
    Denied(DenyReason),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("No fields to update")]
    NoFieldsToUpdate,

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<rusqlite::Error> for ClinicalError {
    fn from(err: rusqlite::Error) -> Self {
        ClinicalError::Database(DbError::Sqlite(err))
    }
}

pub type ClinicalResult<T> = Result<T, ClinicalError>;

pub(crate) fn check(session: &Session, rule: &AccessRule<'_>) -> ClinicalResult<()> {
    match authorize(Some(session), rule) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => {
            warn!(account_id = session.account_id(), role = ?session.role, "access denied");
            Err(ClinicalError::Denied(reason))
        }
    }
}

fn required(value: &str, field: &str) -> ClinicalResult<()> {
    if value.trim().is_empty() {
        return Err(ClinicalError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

/// Patient profile together with its record history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientLookup {
    pub patient: Patient,
    pub records: Vec<MedicalRecord>,
}

/// What a search runs against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    Patient,
    Doctor,
    Record,
}

impl FromStr for SearchKind {
    type Err = ClinicalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(SearchKind::Patient),
            "doctor" => Ok(SearchKind::Doctor),
            "record" => Ok(SearchKind::Record),
            other => Err(ClinicalError::Validation(format!(
                "Unknown search type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum SearchResults {
    Patients(Vec<Patient>),
    Doctors(Vec<Doctor>),
    Records(Vec<MedicalRecord>),
}

impl SearchResults {
    pub fn len(&self) -> usize {
        match self {
            SearchResults::Patients(v) => v.len(),
            SearchResults::Doctors(v) => v.len(),
            SearchResults::Records(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Clinical operations bound to a store.
pub struct Clinic<'a> {
    db: &'a Database,
}

impl<'a> Clinic<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // =========================================================================
    // Directory (public)
    // =========================================================================

    pub fn hospitals(&self) -> ClinicalResult<Vec<Hospital>> {
        Ok(self.db.list_hospitals()?)
    }

    pub fn hospital_doctors(&self, hospital_id: i64) -> ClinicalResult<Vec<Doctor>> {
        if self.db.get_hospital(hospital_id)?.is_none() {
            return Err(ClinicalError::NotFound("Hospital"));
        }
        Ok(self.db.list_doctors_for_hospital(hospital_id)?)
    }

    // =========================================================================
    // Records and prescriptions
    // =========================================================================

    /// File a record authored by the calling doctor (or admin).
    pub fn add_record(&self, session: &Session, request: &RecordRequest) -> ClinicalResult<MedicalRecord> {
        check(session, &AccessRule::roles(CLINICAL_AUTHORS))?;
        required(&request.diagnosis, "diagnosis")?;

        if self.db.get_patient(request.patient_id)?.is_none() {
            return Err(ClinicalError::NotFound("Patient"));
        }

        let hospital_id = match session.doctor_id {
            Some(doctor_id) => self.db.get_doctor(doctor_id)?.and_then(|d| d.hospital_id),
            None => None,
        };

        let id = self.db.insert_record(&NewMedicalRecord {
            patient_id: request.patient_id,
            hospital_id,
            doctor_id: session.doctor_id,
            diagnosis: request.diagnosis.clone(),
            treatment: request.treatment.clone(),
            notes: request.notes.clone(),
            follow_up_date: request.follow_up_date,
            uploaded_by: session.username.clone(),
        })?;
        info!(record_id = id, patient_id = request.patient_id, "record filed");

        self.db
            .get_record(id)?
            .ok_or(ClinicalError::NotFound("Record"))
    }

    pub fn patient_records(&self, session: &Session, patient_id: i64) -> ClinicalResult<Vec<MedicalRecord>> {
        check(session, &AccessRule::patient_data(patient_id))?;
        Ok(self.db.list_records_for_patient(patient_id)?)
    }

    /// Issue a prescription, optionally tied to one of the patient's records.
    pub fn add_prescription(
        &self,
        session: &Session,
        request: &PrescriptionRequest,
    ) -> ClinicalResult<Prescription> {
        check(session, &AccessRule::roles(CLINICAL_AUTHORS))?;
        required(&request.medication_name, "medicationName")?;
        required(&request.dosage, "dosage")?;

        if self.db.get_patient(request.patient_id)?.is_none() {
            return Err(ClinicalError::NotFound("Patient"));
        }
        if let Some(record_id) = request.record_id {
            let record = self
                .db
                .get_record(record_id)?
                .ok_or(ClinicalError::NotFound("Record"))?;
            if record.patient_id != request.patient_id {
                return Err(ClinicalError::Validation(
                    "Record belongs to a different patient".into(),
                ));
            }
        }

        let id = self.db.insert_prescription(&NewPrescription {
            record_id: request.record_id,
            patient_id: request.patient_id,
            doctor_id: session.doctor_id,
            medication_name: request.medication_name.clone(),
            dosage: request.dosage.clone(),
            frequency: request.frequency.clone(),
            duration: request.duration.clone(),
            instructions: request.instructions.clone(),
        })?;
        info!(prescription_id = id, patient_id = request.patient_id, "prescription issued");

        self.db
            .get_prescription(id)?
            .ok_or(ClinicalError::NotFound("Prescription"))
    }

    pub fn patient_prescriptions(
        &self,
        session: &Session,
        patient_id: i64,
    ) -> ClinicalResult<Vec<Prescription>> {
        check(session, &AccessRule::patient_data(patient_id))?;
        Ok(self.db.list_prescriptions_for_patient(patient_id)?)
    }

    /// Record and prescription counts plus the most frequent entries of each.
    pub fn statistics(&self, session: &Session, patient_id: i64) -> ClinicalResult<PatientStatistics> {
        check(session, &AccessRule::patient_data(patient_id))?;

        Ok(PatientStatistics {
            record_count: self.db.count_records_for_patient(patient_id)?,
            prescription_count: self.db.count_prescriptions_for_patient(patient_id)?,
            common_diagnoses: self.db.top_diagnoses(patient_id, TOP_N)?,
            common_medications: self.db.top_medications(patient_id, TOP_N)?,
        })
    }

    // =========================================================================
    // Lookup and search
    // =========================================================================

    /// Resolve a medical id to the patient and their records.
    ///
    /// Patients may only resolve their own id.
    pub fn lookup_by_medical_id(&self, session: &Session, medical_id: &str) -> ClinicalResult<PatientLookup> {
        let patient = self.db.get_patient_by_medical_id(medical_id)?;
        let patient = match session.role {
            // Self-service callers get the same answer for unknown and foreign ids
            Some(Role::Patient) | None => match patient {
                Some(p) if session.patient_id == Some(p.id) => p,
                _ => {
                    warn!(account_id = session.sub, "medical id lookup denied");
                    return Err(ClinicalError::Denied(DenyReason::Forbidden));
                }
            },
            Some(Role::Doctor | Role::Hospital | Role::Staff | Role::Admin) => {
                patient.ok_or(ClinicalError::NotFound("Patient"))?
            }
        };
        check(session, &AccessRule::patient_data(patient.id))?;

        let records = self.db.list_records_for_patient(patient.id)?;
        debug!(patient_id = patient.id, records = records.len(), "medical id resolved");
        Ok(PatientLookup { patient, records })
    }

    /// Substring search, case-insensitive, for clinical and staff roles.
    ///
    /// `kind` is one of `patient`, `doctor` or `record`, parsed after the
    /// role check.
    pub fn search(&self, session: &Session, kind: &str, keyword: &str) -> ClinicalResult<SearchResults> {
        check(session, &AccessRule::roles(SEARCHERS))?;
        let kind: SearchKind = kind.parse()?;
        let keyword = keyword.trim();
        required(keyword, "keyword")?;

        let results = match kind {
            SearchKind::Patient => SearchResults::Patients(self.db.search_patients(keyword, SEARCH_LIMIT)?),
            SearchKind::Doctor => SearchResults::Doctors(self.db.search_doctors(keyword, SEARCH_LIMIT)?),
            SearchKind::Record => SearchResults::Records(self.db.search_records(keyword, SEARCH_LIMIT)?),
        };
        debug!(?kind, hits = results.len(), "search");
        Ok(results)
    }
}
