use axum::{extract::State, http::StatusCode, Json};
use curanet_core::models::{PharmacyOrder, PharmacyOrderRequest};

use crate::error::ApiResult;
use crate::extract::{ApiPath, Authenticated, JsonBody};
use crate::state::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    JsonBody(body): JsonBody<PharmacyOrderRequest>,
) -> ApiResult<(StatusCode, Json<PharmacyOrder>)> {
    let order = state
        .run(move |portal| portal.place_pharmacy_order(&session, &body))
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    ApiPath(patient_id): ApiPath<i64>,
) -> ApiResult<Json<Vec<PharmacyOrder>>> {
    Ok(Json(
        state
            .run(move |portal| portal.pharmacy_orders(&session, patient_id))
            .await?,
    ))
}
