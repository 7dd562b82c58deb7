//! Hospitals and doctors. Provisioned out of band, referenced by everything else.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub contact_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewHospital {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_number: Option<String>,
}

impl NewHospital {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
            contact_number: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialization: Option<String>,
    /// Hospital affiliation
    pub hospital_id: Option<i64>,
    pub hospital_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    pub name: String,
    #[serde(default)]
    pub specialization: Option<String>,
    #[serde(default)]
    pub hospital_id: Option<i64>,
}

impl NewDoctor {
    pub fn new(name: impl Into<String>, hospital_id: Option<i64>) -> Self {
        Self {
            name: name.into(),
            specialization: None,
            hospital_id,
        }
    }
}
