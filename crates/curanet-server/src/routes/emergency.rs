use axum::{extract::State, http::StatusCode, Json};
use curanet_core::models::{ActiveEmergency, EmergencyPatch, EmergencyRequest, NewEmergencyRequest};

use crate::error::ApiResult;
use crate::extract::{ApiPath, Authenticated, JsonBody};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    JsonBody(body): JsonBody<NewEmergencyRequest>,
) -> ApiResult<(StatusCode, Json<EmergencyRequest>)> {
    let request = state
        .run(move |portal| portal.request_emergency(&session, &body))
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn active(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> ApiResult<Json<Vec<ActiveEmergency>>> {
    Ok(Json(
        state
            .run(move |portal| portal.active_emergencies(&session))
            .await?,
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    ApiPath(request_id): ApiPath<i64>,
    JsonBody(patch): JsonBody<EmergencyPatch>,
) -> ApiResult<Json<EmergencyRequest>> {
    Ok(Json(
        state
            .run(move |portal| portal.update_emergency(&session, request_id, &patch))
            .await?,
    ))
}
