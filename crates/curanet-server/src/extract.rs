//! Request extractors.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, Path, Query, Request,
    },
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use curanet_core::Session;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// A caller with a verified bearer token.
///
/// Missing token: 401. Present but invalid or expired: 403.
#[derive(Debug, Clone)]
pub struct Authenticated(pub Session);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| ApiError::unauthorized("Access token required"))?;
        let session = state.portal.verify_token(token).map_err(|err| {
            debug!(%err, "bearer token rejected");
            ApiError::from(err)
        })?;
        Ok(Authenticated(session))
    }
}

/// JSON body whose parse failures use the API error shape.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(reject_json(rejection)),
        }
    }
}

fn reject_json(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

/// Path parameters whose parse failures use the API error shape.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(reject_path(rejection)),
        }
    }
}

fn reject_path(rejection: PathRejection) -> ApiError {
    ApiError::new(rejection.status(), rejection.body_text())
}

/// Query string whose parse failures use the API error shape.
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => Err(reject_query(rejection)),
        }
    }
}

fn reject_query(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}
