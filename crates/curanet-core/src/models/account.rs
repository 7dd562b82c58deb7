//! Account and role models.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Portal role. Each account holds at most one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Hospital,
    Staff,
    Admin,
}

/// Raised when a role name is not one of the known roles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Patient,
        Role::Doctor,
        Role::Hospital,
        Role::Staff,
        Role::Admin,
    ];

    /// Storage and wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Hospital => "hospital",
            Role::Staff => "staff",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "hospital" => Ok(Role::Hospital),
            "staff" => Ok(Role::Staff),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// A stored account, joined with its role assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never serialized
    pub password_hash: String,
    /// Linked patient profile (patients only)
    pub patient_id: Option<i64>,
    /// Linked doctor profile (doctors only)
    pub doctor_id: Option<i64>,
    /// `None` when no role assignment row exists
    pub role: Option<Role>,
    pub created_at: String,
}

impl Account {
    /// Public view of this account.
    pub fn profile(&self) -> AccountProfile {
        AccountProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
        }
    }
}

/// Fields needed to insert an account row.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}

/// Account as returned to clients after login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Option<Role>,
    pub patient_id: Option<i64>,
    pub doctor_id: Option<i64>,
}
