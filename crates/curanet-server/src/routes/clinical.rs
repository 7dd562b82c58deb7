use axum::{extract::State, http::StatusCode, Json};
use curanet_core::models::{MedicalRecord, Prescription, PrescriptionRequest, RecordRequest};
use curanet_core::SearchResults;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::extract::{ApiQuery, Authenticated, JsonBody};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub keyword: String,
}

pub async fn create_record(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    JsonBody(body): JsonBody<RecordRequest>,
) -> ApiResult<(StatusCode, Json<MedicalRecord>)> {
    let record = state
        .run(move |portal| portal.add_record(&session, &body))
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn create_prescription(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    JsonBody(body): JsonBody<PrescriptionRequest>,
) -> ApiResult<(StatusCode, Json<Prescription>)> {
    let prescription = state
        .run(move |portal| portal.add_prescription(&session, &body))
        .await?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

pub async fn search(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> ApiResult<Json<SearchResults>> {
    Ok(Json(
        state
            .run(move |portal| portal.search(&session, &query.kind, &query.keyword))
            .await?,
    ))
}
