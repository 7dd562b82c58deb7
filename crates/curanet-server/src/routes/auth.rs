use axum::{extract::State, http::StatusCode, Json};
use curanet_core::{AccountProfile, RegistrationRequest};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AccountProfile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: &'static str,
    pub account_id: i64,
    pub medical_id: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let outcome = state
        .run(move |portal| portal.login(&body.username, &body.password))
        .await?;
    Ok(Json(LoginResponse {
        token: outcome.token,
        user: outcome.profile,
    }))
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegistrationRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let outcome = state.run(move |portal| portal.register(&body)).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            account_id: outcome.account_id,
            medical_id: outcome.medical_id,
        }),
    ))
}
