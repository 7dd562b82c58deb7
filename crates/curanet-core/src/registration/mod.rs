//! Account registration.
//!
//! A registration writes up to four rows (patient, account, role
//! assignment) inside one IMMEDIATE transaction. Any failure drops the
//! transaction, so a failed registration leaves nothing behind.

mod medical_id;

pub use medical_id::*;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::{hash_password, MIN_BCRYPT_COST};
use crate::db::{Database, DbError};
use crate::models::{NewAccount, NewPatient, Role};

/// Registration errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Username or email already exists")]
    DuplicateAccount,

    #[error("{0}")]
    Validation(String),

    #[error("Could not allocate a unique medical id after {0} attempts")]
    MedicalIdExhausted(usize),

    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<rusqlite::Error> for RegistrationError {
    fn from(err: rusqlite::Error) -> Self {
        RegistrationError::Database(DbError::Sqlite(err))
    }
}

pub type RegistrationResult<T> = Result<T, RegistrationError>;

/// Sign-up payload as submitted by a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationRequest {
    pub username: String,
    pub password: String,
    pub email: String,
    /// Parsed during validation so unknown roles become a validation error
    pub role: String,
    #[serde(default)]
    pub name: Option<String>,
    /// `YYYY-MM-DD`, required for patients
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
    /// Links a doctor account to a provisioned doctor
    #[serde(default)]
    pub doctor_id: Option<i64>,
}

impl std::fmt::Display for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the password
        write!(f, "{} <{}> as {}", self.username, self.email, self.role)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOutcome {
    pub account_id: i64,
    pub role: Role,
    pub patient_id: Option<i64>,
    pub medical_id: Option<String>,
}

/// Request after validation.
struct Validated {
    role: Role,
    patient: Option<PatientDetails>,
}

struct PatientDetails {
    name: String,
    date_of_birth: NaiveDate,
}

fn require(value: &str, field: &str) -> RegistrationResult<()> {
    if value.trim().is_empty() {
        return Err(RegistrationError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

fn validate(request: &RegistrationRequest) -> RegistrationResult<Validated> {
    require(&request.username, "username")?;
    require(&request.password, "password")?;
    require(&request.email, "email")?;

    let role: Role = request
        .role
        .parse()
        .map_err(|e: crate::models::UnknownRole| RegistrationError::Validation(e.to_string()))?;

    let patient = match role {
        Role::Patient => {
            let name = request
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| RegistrationError::Validation("name is required".into()))?;
            let dob = request
                .date_of_birth
                .as_deref()
                .ok_or_else(|| RegistrationError::Validation("dateOfBirth is required".into()))?;
            let date_of_birth = NaiveDate::parse_from_str(dob.trim(), "%Y-%m-%d").map_err(|_| {
                RegistrationError::Validation(format!("Invalid dateOfBirth: {}", dob))
            })?;
            Some(PatientDetails {
                name: name.to_string(),
                date_of_birth,
            })
        }
        Role::Doctor | Role::Hospital | Role::Staff | Role::Admin => None,
    };

    Ok(Validated { role, patient })
}

/// A validated request with its password already hashed.
///
/// Built without touching the store, so the slow bcrypt step never runs
/// while a database handle is held.
pub struct PreparedRegistration<'r> {
    request: &'r RegistrationRequest,
    validated: Validated,
    password_hash: String,
}

impl<'r> PreparedRegistration<'r> {
    pub fn new(request: &'r RegistrationRequest, bcrypt_cost: u32) -> RegistrationResult<Self> {
        let validated = validate(request)?;
        let password_hash = hash_password(&request.password, bcrypt_cost.max(MIN_BCRYPT_COST))?;
        Ok(Self {
            request,
            validated,
            password_hash,
        })
    }
}

/// Creates accounts, bound to a store and a medical id source.
pub struct Registrar<'a> {
    db: &'a Database,
    ids: &'a mut MedicalIdGenerator,
    bcrypt_cost: u32,
}

impl<'a> Registrar<'a> {
    pub fn new(db: &'a Database, ids: &'a mut MedicalIdGenerator, bcrypt_cost: u32) -> Self {
        Self {
            db,
            ids,
            bcrypt_cost: bcrypt_cost.max(MIN_BCRYPT_COST),
        }
    }

    /// Validate, hash and register in one call.
    pub fn register(&mut self, request: &RegistrationRequest) -> RegistrationResult<RegistrationOutcome> {
        let prepared = PreparedRegistration::new(request, self.bcrypt_cost)?;
        self.register_prepared(prepared)
    }

    /// Register a new account with exactly one role.
    pub fn register_prepared(
        &mut self,
        prepared: PreparedRegistration<'_>,
    ) -> RegistrationResult<RegistrationOutcome> {
        let PreparedRegistration {
            request,
            validated,
            password_hash,
        } = prepared;

        let db = self.db;
        let tx = db.begin_immediate()?;

        if db.account_exists(&request.username, &request.email)? {
            warn!(username = %request.username, "registration with taken username or email");
            return Err(RegistrationError::DuplicateAccount);
        }

        let doctor_id = match (validated.role, request.doctor_id) {
            (Role::Doctor, Some(id)) => {
                if db.get_doctor(id)?.is_none() {
                    return Err(RegistrationError::Validation(format!(
                        "Unknown doctor: {}",
                        id
                    )));
                }
                Some(id)
            }
            _ => None,
        };

        let (patient_id, medical_id) = match &validated.patient {
            Some(details) => {
                let medical_id = self.allocate_medical_id()?;
                let patient_id = db.insert_patient(&NewPatient {
                    name: details.name.clone(),
                    date_of_birth: details.date_of_birth,
                    gender: request.gender.clone(),
                    contact_number: request.contact_number.clone(),
                    email: Some(request.email.clone()),
                    medical_id: medical_id.clone(),
                })?;
                (Some(patient_id), Some(medical_id))
            }
            None => (None, None),
        };

        let account_id = db
            .insert_account(&NewAccount {
                username: request.username.clone(),
                email: request.email.clone(),
                password_hash,
                patient_id,
                doctor_id,
            })
            .map_err(|e| match e {
                DbError::Constraint(_) => RegistrationError::DuplicateAccount,
                other => RegistrationError::Database(other),
            })?;

        db.assign_role(account_id, validated.role)?;
        tx.commit()?;

        info!(
            account_id,
            role = %validated.role,
            medical_id = medical_id.as_deref().unwrap_or("-"),
            "account registered"
        );

        Ok(RegistrationOutcome {
            account_id,
            role: validated.role,
            patient_id,
            medical_id,
        })
    }

    /// Draw medical ids until one is unused. Runs inside the open transaction.
    fn allocate_medical_id(&mut self) -> RegistrationResult<String> {
        for _ in 0..MAX_MEDICAL_ID_ATTEMPTS {
            let candidate = self.ids.next_id();
            if !self.db.medical_id_exists(&candidate)? {
                return Ok(candidate);
            }
            warn!(medical_id = %candidate, "medical id collision, redrawing");
        }
        Err(RegistrationError::MedicalIdExhausted(MAX_MEDICAL_ID_ATTEMPTS))
    }
}
