use axum::{extract::State, Json};
use chrono::{Local, NaiveDateTime, NaiveTime};
use curanet_core::models::{Doctor, Hospital, ScheduleSlot};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiPath, ApiQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScheduleQuery {
    /// Earliest slot to include; defaults to the start of today
    pub from: Option<String>,
}

pub async fn hospitals(State(state): State<AppState>) -> ApiResult<Json<Vec<Hospital>>> {
    Ok(Json(state.run(|portal| portal.hospitals()).await?))
}

pub async fn hospital_doctors(
    State(state): State<AppState>,
    ApiPath(hospital_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<Doctor>>> {
    Ok(Json(
        state
            .run(move |portal| portal.hospital_doctors(hospital_id))
            .await?,
    ))
}

pub async fn doctor_schedule(
    State(state): State<AppState>,
    ApiPath(doctor_id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ScheduleQuery>,
) -> ApiResult<Json<Vec<ScheduleSlot>>> {
    let from: NaiveDateTime = match query.from.as_deref() {
        Some(raw) => curanet_core::models::timestamp::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid timestamp: {}", raw)))?,
        None => Local::now().date_naive().and_time(NaiveTime::MIN),
    };
    Ok(Json(
        state
            .run(move |portal| portal.doctor_schedule(doctor_id, from))
            .await?,
    ))
}
