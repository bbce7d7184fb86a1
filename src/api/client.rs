// Photo API client.
// Classifies responses: absent data for reads, typed errors for writes.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ClassifiedError, ErrorKind};

use super::navigator::{Navigator, login_url};
use super::transport::{ApiRequest, ApiResponse, Transport};

/// Photo API client shared by queries and mutations.
///
/// Cheap to clone; every clone talks through the same transport.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    navigator: Arc<dyn Navigator>,
    login_path: Arc<str>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        navigator: Arc<dyn Navigator>,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            navigator,
            login_path: login_path.into().into(),
        }
    }

    /// Read a resource.
    ///
    /// A 404 resolves as `Ok(None)`. A 401 sends the user to the login entry
    /// point once and also resolves as `Ok(None)`. A 403 is `Forbidden`;
    /// anything else is `Transport`.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<Option<T>, ClassifiedError> {
        let path = request.path.clone();
        let response = self.transport.send(request).await?;

        match response.status {
            status if status.is_success() => response.json().map(Some).map_err(|e| {
                ClassifiedError::transport(
                    Some(status.as_u16()),
                    format!("decode {}: {}", path, e),
                )
            }),
            StatusCode::NOT_FOUND => {
                debug!(path = %path, "not found, treating as absent");
                Ok(None)
            }
            StatusCode::UNAUTHORIZED => {
                self.redirect_to_login(&path);
                Ok(None)
            }
            status => {
                let err = ClassifiedError::from_status(status, &response.text());
                warn!(path = %path, status = status.as_u16(), kind = %err.kind, "read failed");
                Err(err)
            }
        }
    }

    /// Perform an effectful call. Every non-2xx status is an error.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ClassifiedError> {
        let method = request.method.clone();
        let path = request.path.clone();
        let response = self.transport.send(request).await?;

        if response.status.is_success() {
            info!(%method, path = %path, status = response.status.as_u16(), "request succeeded");
            Ok(response)
        } else {
            let err = ClassifiedError::from_status(response.status, &response.text());
            warn!(%method, path = %path, kind = %err.kind, "request failed");
            Err(err)
        }
    }

    /// Like [`execute`](Self::execute), decoding the response body.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ClassifiedError> {
        let path = request.path.clone();
        let response = self.execute(request).await?;
        response.json().map_err(|e| {
            ClassifiedError::new(
                ErrorKind::Transport,
                Some(response.status.as_u16()),
                format!("decode {}: {}", path, e),
            )
        })
    }

    fn redirect_to_login(&self, path: &str) {
        let url = login_url(&self.login_path, &self.navigator.current_location());
        info!(path = %path, redirect = %url, "unauthorized, redirecting to login");
        self.navigator.navigate_external(&url);
    }
}
