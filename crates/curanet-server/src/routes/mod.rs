//! Route table. Everything lives under `/api`.

mod appointments;
mod auth;
mod clinical;
mod directory;
mod emergency;
mod patients;
mod pharmacy;

use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Identity
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        // Directory
        .route("/hospitals", get(directory::hospitals))
        .route("/hospitals/:hospital_id/doctors", get(directory::hospital_doctors))
        .route("/doctors/:doctor_id/schedule", get(directory::doctor_schedule))
        // Patient data
        .route("/patients/by-medical-id/:medical_id", get(patients::by_medical_id))
        .route("/patients/:patient_id/records", get(patients::records))
        .route("/patients/:patient_id/prescriptions", get(patients::prescriptions))
        .route("/patients/:patient_id/appointments", get(patients::appointments))
        .route("/patients/:patient_id/statistics", get(patients::statistics))
        // Clinical authoring and search
        .route("/records", post(clinical::create_record))
        .route("/prescriptions", post(clinical::create_prescription))
        .route("/search", get(clinical::search))
        // Appointments
        .route("/appointments", post(appointments::create))
        .route("/appointments/:appointment_id", patch(appointments::update))
        // Emergency dispatch
        .route("/emergency", post(emergency::create))
        .route("/emergency/active", get(emergency::active))
        .route("/emergency/:request_id", patch(emergency::update))
        // Pharmacy
        .route("/pharmacy/orders", post(pharmacy::create_order))
        .route("/pharmacy/orders/:patient_id", get(pharmacy::list_orders))
}
