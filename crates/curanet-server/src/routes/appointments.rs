use axum::{extract::State, http::StatusCode, Json};
use curanet_core::{Appointment, AppointmentPatch, BookingRequest};

use crate::error::ApiResult;
use crate::extract::{ApiPath, Authenticated, JsonBody};
use crate::state::AppState;

pub async fn create(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    JsonBody(body): JsonBody<BookingRequest>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    let appointment = state
        .run(move |portal| portal.book_appointment(&session, &body))
        .await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn update(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    ApiPath(appointment_id): ApiPath<i64>,
    JsonBody(patch): JsonBody<AppointmentPatch>,
) -> ApiResult<Json<Appointment>> {
    Ok(Json(
        state
            .run(move |portal| portal.update_appointment(&session, appointment_id, &patch))
            .await?,
    ))
}
