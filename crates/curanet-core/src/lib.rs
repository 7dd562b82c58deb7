//! CuraNet Core Library
//!
//! Hospital portal backend: accounts, sessions, access control, appointment
//! booking and the clinical records around them, over SQLite.
//!
//! # Architecture
//!
//! ```text
//!   credentials ──▶ auth::verify_credentials ──▶ signed session token
//!                                                  │
//!                                     auth::SessionIssuer::verify
//!                                                  │
//!                                              Session
//!                                                  │
//!                                   policy::authorize (pure, no I/O)
//!                                                  │
//!                  ┌───────────────────────────────┼──────────────────────────┐
//!                  ▼                               ▼                          ▼
//!          booking::Scheduler          registration::Registrar        clinical::Clinic
//!      (IMMEDIATE tx + slot index)    (IMMEDIATE tx, all-or-nothing)
//!                  │                               │                          │
//!                  └───────────────────────────────┴──────────────────────────┘
//!                                                  │
//!                                            db::Database
//! ```
//!
//! # Modules
//!
//! - [`db`]: SQLite layer, schema and transactional helpers
//! - [`models`]: Domain types (Account, Patient, Appointment, ...)
//! - [`auth`]: Password hashing, login, session tokens
//! - [`policy`]: Role and ownership rules
//! - [`booking`]: Double-booking-safe appointment scheduling
//! - [`registration`]: Atomic account registration and medical ids
//! - [`clinical`]: Records, prescriptions, search, pharmacy, emergencies
//!
//! [`Portal`] ties them together behind one thread-safe handle and folds
//! every component error into [`PortalError`].

pub mod auth;
pub mod booking;
pub mod clinical;
pub mod db;
pub mod models;
pub mod policy;
pub mod registration;

// Re-export commonly used types
pub use auth::{LoginOutcome, Session, SessionIssuer};
pub use clinical::{PatientLookup, SearchKind, SearchResults};
pub use db::Database;
pub use models::{
    Account, AccountProfile, Appointment, AppointmentPatch, AppointmentStatus, BookingRequest,
    Doctor, Hospital, Patient, Role,
};
pub use policy::{Decision, DenyReason};
pub use registration::{MedicalIdGenerator, RegistrationOutcome, RegistrationRequest};

use chrono::NaiveDateTime;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::error;

use auth::{verify_credentials, AuthError, DEFAULT_SESSION_TTL_HOURS, MIN_BCRYPT_COST};
use booking::{BookingError, Scheduler};
use clinical::{Clinic, ClinicalError};
use models::{
    ActiveEmergency, EmergencyPatch, EmergencyRequest, MedicalRecord, NewDoctor,
    NewEmergencyRequest, NewHospital, PatientStatistics, PharmacyOrder, PharmacyOrderRequest,
    Prescription, PrescriptionRequest, RecordRequest, ScheduleSlot,
};
use registration::{PreparedRegistration, RegistrationError, Registrar};

// =========================================================================
// Error Type
// =========================================================================

/// Unified error surfaced to callers of [`Portal`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortalError {
    /// No session, or login failed
    #[error("{0}")]
    Unauthenticated(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The write collides with existing state (taken slot, taken username)
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    /// Details are logged, never shown to clients
    #[error("Internal server error")]
    Internal(String),
}

impl PortalError {
    pub fn is_internal(&self) -> bool {
        matches!(self, PortalError::Internal(_))
    }
}

impl From<DenyReason> for PortalError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::Unauthenticated => {
                PortalError::Unauthenticated("Access token required".into())
            }
            DenyReason::Forbidden => PortalError::Forbidden("Access denied".into()),
        }
    }
}

impl From<db::DbError> for PortalError {
    fn from(e: db::DbError) -> Self {
        match e {
            db::DbError::Constraint(what) => {
                PortalError::Conflict(format!("Conflicting record: {}", what))
            }
            other => PortalError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for PortalError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => PortalError::Unauthenticated(e.to_string()),
            AuthError::InvalidOrExpiredToken => PortalError::InvalidToken,
            AuthError::Database(db) => db.into(),
            other => PortalError::Internal(other.to_string()),
        }
    }
}

impl From<BookingError> for PortalError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::SlotUnavailable => PortalError::Conflict(e.to_string()),
            BookingError::Denied(reason) => reason.into(),
            BookingError::NotFound(_) => PortalError::NotFound(e.to_string()),
            BookingError::NoFieldsToUpdate => PortalError::Validation(e.to_string()),
            BookingError::Database(db) => db.into(),
        }
    }
}

impl From<RegistrationError> for PortalError {
    fn from(e: RegistrationError) -> Self {
        match e {
            RegistrationError::DuplicateAccount => PortalError::Conflict(e.to_string()),
            RegistrationError::Validation(msg) => PortalError::Validation(msg),
            RegistrationError::Database(db) => db.into(),
            other => PortalError::Internal(other.to_string()),
        }
    }
}

impl From<ClinicalError> for PortalError {
    fn from(e: ClinicalError) -> Self {
        match e {
            ClinicalError::Denied(reason) => reason.into(),
            ClinicalError::NotFound(_) => PortalError::NotFound(e.to_string()),
            ClinicalError::Validation(msg) => PortalError::Validation(msg),
            ClinicalError::NoFieldsToUpdate => PortalError::Validation(e.to_string()),
            ClinicalError::Database(db) => db.into(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for PortalError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        error!("portal lock poisoned");
        PortalError::Internal(format!("Lock poisoned: {}", e))
    }
}

pub type PortalResult<T> = Result<T, PortalError>;

// =========================================================================
// Settings and Factory Functions
// =========================================================================

/// Security parameters of a portal instance.
#[derive(Clone)]
pub struct PortalSettings {
    pub jwt_secret: Vec<u8>,
    pub session_ttl: chrono::Duration,
    pub bcrypt_cost: u32,
}

impl PortalSettings {
    pub fn new(jwt_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            session_ttl: chrono::Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            bcrypt_cost: MIN_BCRYPT_COST,
        }
    }
}

impl std::fmt::Debug for PortalSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalSettings")
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl", &self.session_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

/// Open or create a portal database at the given path.
pub fn open_portal<P: AsRef<Path>>(path: P, settings: &PortalSettings) -> PortalResult<Portal> {
    let db = Database::open(path)?;
    Ok(Portal::new(db, settings))
}

/// Portal over an in-memory database (for testing).
pub fn open_portal_in_memory(settings: &PortalSettings) -> PortalResult<Portal> {
    let db = Database::open_in_memory()?;
    Ok(Portal::new(db, settings))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe handle over one database connection.
///
/// Cloning is cheap and shares the connection.
#[derive(Clone)]
pub struct Portal {
    db: Arc<Mutex<Database>>,
    ids: Arc<Mutex<MedicalIdGenerator>>,
    issuer: Arc<SessionIssuer>,
    bcrypt_cost: u32,
}

impl Portal {
    pub fn new(db: Database, settings: &PortalSettings) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            ids: Arc::new(Mutex::new(MedicalIdGenerator::from_entropy())),
            issuer: Arc::new(SessionIssuer::with_ttl(
                &settings.jwt_secret,
                settings.session_ttl,
            )),
            bcrypt_cost: settings.bcrypt_cost.max(MIN_BCRYPT_COST),
        }
    }

    /// Replace the medical id source, e.g. with a seeded one.
    pub fn with_id_generator(self, ids: MedicalIdGenerator) -> Self {
        Self {
            ids: Arc::new(Mutex::new(ids)),
            ..self
        }
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Only the account fetch holds the database lock; bcrypt runs after
    /// the guard is released.
    pub fn login(&self, username: &str, password: &str) -> PortalResult<LoginOutcome> {
        let account = {
            let db = self.db.lock()?;
            db.get_account_by_username(username)?
        };
        Ok(verify_credentials(&self.issuer, account, username, password)?)
    }

    /// Turn a bearer token back into a session.
    pub fn verify_token(&self, token: &str) -> PortalResult<Session> {
        Ok(self.issuer.verify(token)?)
    }

    /// Validation and hashing happen before any lock is taken.
    pub fn register(&self, request: &RegistrationRequest) -> PortalResult<RegistrationOutcome> {
        let prepared = PreparedRegistration::new(request, self.bcrypt_cost)?;
        let db = self.db.lock()?;
        let mut ids = self.ids.lock()?;
        Ok(Registrar::new(&db, &mut ids, self.bcrypt_cost).register_prepared(prepared)?)
    }

    // =========================================================================
    // Directory
    // =========================================================================

    pub fn hospitals(&self) -> PortalResult<Vec<Hospital>> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).hospitals()?)
    }

    pub fn hospital_doctors(&self, hospital_id: i64) -> PortalResult<Vec<Doctor>> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).hospital_doctors(hospital_id)?)
    }

    pub fn doctor_schedule(&self, doctor_id: i64, from: NaiveDateTime) -> PortalResult<Vec<ScheduleSlot>> {
        let db = self.db.lock()?;
        Ok(Scheduler::new(&db).doctor_schedule(doctor_id, from)?)
    }

    /// Seed a hospital. Not exposed over HTTP.
    pub fn provision_hospital(&self, hospital: &NewHospital) -> PortalResult<Hospital> {
        let db = self.db.lock()?;
        let id = db.insert_hospital(hospital)?;
        db.get_hospital(id)?
            .ok_or_else(|| PortalError::NotFound("Hospital not found".into()))
    }

    /// Seed a doctor. Not exposed over HTTP.
    pub fn provision_doctor(&self, doctor: &NewDoctor) -> PortalResult<Doctor> {
        let db = self.db.lock()?;
        if let Some(hospital_id) = doctor.hospital_id {
            if db.get_hospital(hospital_id)?.is_none() {
                return Err(PortalError::NotFound("Hospital not found".into()));
            }
        }
        let id = db.insert_doctor(doctor)?;
        db.get_doctor(id)?
            .ok_or_else(|| PortalError::NotFound("Doctor not found".into()))
    }

    // =========================================================================
    // Patient data
    // =========================================================================

    pub fn lookup_patient(&self, session: &Session, medical_id: &str) -> PortalResult<PatientLookup> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).lookup_by_medical_id(session, medical_id)?)
    }

    pub fn patient_records(&self, session: &Session, patient_id: i64) -> PortalResult<Vec<MedicalRecord>> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).patient_records(session, patient_id)?)
    }

    pub fn patient_prescriptions(
        &self,
        session: &Session,
        patient_id: i64,
    ) -> PortalResult<Vec<Prescription>> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).patient_prescriptions(session, patient_id)?)
    }

    pub fn patient_appointments(&self, session: &Session, patient_id: i64) -> PortalResult<Vec<Appointment>> {
        let db = self.db.lock()?;
        Ok(Scheduler::new(&db).patient_appointments(session, patient_id)?)
    }

    pub fn patient_statistics(&self, session: &Session, patient_id: i64) -> PortalResult<PatientStatistics> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).statistics(session, patient_id)?)
    }

    pub fn add_record(&self, session: &Session, request: &RecordRequest) -> PortalResult<MedicalRecord> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).add_record(session, request)?)
    }

    pub fn add_prescription(
        &self,
        session: &Session,
        request: &PrescriptionRequest,
    ) -> PortalResult<Prescription> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).add_prescription(session, request)?)
    }

    /// `kind` is `patient`, `doctor` or `record`.
    pub fn search(&self, session: &Session, kind: &str, keyword: &str) -> PortalResult<SearchResults> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).search(session, kind, keyword)?)
    }

    // =========================================================================
    // Appointments
    // =========================================================================

    pub fn book_appointment(&self, session: &Session, request: &BookingRequest) -> PortalResult<Appointment> {
        let db = self.db.lock()?;
        Ok(Scheduler::new(&db).create_appointment(session, request)?)
    }

    pub fn update_appointment(
        &self,
        session: &Session,
        id: i64,
        patch: &AppointmentPatch,
    ) -> PortalResult<Appointment> {
        let db = self.db.lock()?;
        Ok(Scheduler::new(&db).update_appointment(session, id, patch)?)
    }

    // =========================================================================
    // Pharmacy and emergencies
    // =========================================================================

    pub fn place_pharmacy_order(
        &self,
        session: &Session,
        request: &PharmacyOrderRequest,
    ) -> PortalResult<PharmacyOrder> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).place_pharmacy_order(session, request)?)
    }

    pub fn pharmacy_orders(&self, session: &Session, patient_id: i64) -> PortalResult<Vec<PharmacyOrder>> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).pharmacy_orders(session, patient_id)?)
    }

    pub fn request_emergency(
        &self,
        session: &Session,
        request: &NewEmergencyRequest,
    ) -> PortalResult<EmergencyRequest> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).request_emergency(session, request)?)
    }

    pub fn active_emergencies(&self, session: &Session) -> PortalResult<Vec<ActiveEmergency>> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).active_emergencies(session)?)
    }

    pub fn update_emergency(
        &self,
        session: &Session,
        id: i64,
        patch: &EmergencyPatch,
    ) -> PortalResult<EmergencyRequest> {
        let db = self.db.lock()?;
        Ok(Clinic::new(&db).update_emergency(session, id, patch)?)
    }
}
