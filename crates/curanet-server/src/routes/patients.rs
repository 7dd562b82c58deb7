use axum::{extract::State, Json};
use curanet_core::models::{MedicalRecord, PatientStatistics, Prescription};
use curanet_core::{Appointment, PatientLookup};

use crate::error::ApiResult;
use crate::extract::{ApiPath, Authenticated};
use crate::state::AppState;

pub async fn by_medical_id(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    ApiPath(medical_id): ApiPath<String>,
) -> ApiResult<Json<PatientLookup>> {
    Ok(Json(
        state
            .run(move |portal| portal.lookup_patient(&session, &medical_id))
            .await?,
    ))
}

pub async fn records(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    ApiPath(patient_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<MedicalRecord>>> {
    Ok(Json(
        state
            .run(move |portal| portal.patient_records(&session, patient_id))
            .await?,
    ))
}

pub async fn prescriptions(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    ApiPath(patient_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Prescription>>> {
    Ok(Json(
        state
            .run(move |portal| portal.patient_prescriptions(&session, patient_id))
            .await?,
    ))
}

pub async fn appointments(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    ApiPath(patient_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Appointment>>> {
    Ok(Json(
        state
            .run(move |portal| portal.patient_appointments(&session, patient_id))
            .await?,
    ))
}

pub async fn statistics(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    ApiPath(patient_id): ApiPath<i64>,
) -> ApiResult<Json<PatientStatistics>> {
    Ok(Json(
        state
            .run(move |portal| portal.patient_statistics(&session, patient_id))
            .await?,
    ))
}
