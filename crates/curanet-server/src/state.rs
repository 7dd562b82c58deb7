//! Shared application state.

use curanet_core::{Portal, PortalResult};

use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub portal: Portal,
}

impl AppState {
    pub fn new(portal: Portal) -> Self {
        Self { portal }
    }

    /// Run blocking portal work off the async runtime.
    ///
    /// The closure runs to completion even if the client goes away, so a
    /// started transaction always commits or rolls back.
    pub async fn run<F, T>(&self, work: F) -> ApiResult<T>
    where
        F: FnOnce(&Portal) -> PortalResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let portal = self.portal.clone();
        tokio::task::spawn_blocking(move || work(&portal))
            .await
            .map_err(|err| ApiError::internal(&format!("task join error: {}", err)))?
            .map_err(ApiError::from)
    }
}
