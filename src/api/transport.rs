// Photo API HTTP transport.
// Sends requests through reqwest and returns the raw status and body.

use futures::future::BoxFuture;
use reqwest::{
    Client, Method, StatusCode,
    header::{ACCEPT, CONTENT_TYPE, COOKIE, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, ClassifiedError, Result};

/// Name of the backend's session cookie.
const SESSION_COOKIE: &str = "SESSION";

/// Request body variants understood by the photo API.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Binary { content_type: String, data: Vec<u8> },
}

/// A request relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> std::result::Result<Self, ClassifiedError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClassifiedError::transport(None, format!("encode body: {}", e)))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn binary(mut self, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.body = RequestBody::Binary {
            content_type: content_type.into(),
            data,
        };
        self
    }
}

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Anything that can carry an [`ApiRequest`] to the photo API.
///
/// Only network failures are errors here; every received status is returned
/// as a response and classified by the caller.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: ApiRequest,
    ) -> BoxFuture<'static, std::result::Result<ApiResponse, ClassifiedError>>;
}

/// reqwest-backed transport with the session cookie attached.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("snapdeck"));
        if let Some(session) = &config.session_cookie {
            headers.insert(
                COOKIE,
                HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, session))
                    .map_err(|e| AppError::Config(format!("session cookie: {}", e)))?,
            );
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
        })
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        request: ApiRequest,
    ) -> BoxFuture<'static, std::result::Result<ApiResponse, ClassifiedError>> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self.client.request(request.method.clone(), &url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Binary { content_type, data } => {
                builder.header(CONTENT_TYPE, content_type).body(data)
            }
        };

        let method = request.method;
        let path = request.path;
        Box::pin(async move {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            debug!(%method, path = %path, status = status.as_u16(), bytes = body.len(), "api response");
            Ok(ApiResponse::new(status, body.to_vec()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::get("/api/metadatas-by-tag")
            .param("tag", "cats")
            .param("page", 2);

        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.query,
            vec![
                ("tag".to_string(), "cats".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(request.body, RequestBody::Empty);
    }

    #[test]
    fn test_json_body() {
        let request = ApiRequest::post("/api/search")
            .json(&serde_json::json!({ "token": "sunset" }))
            .unwrap();

        match request.body {
            RequestBody::Json(value) => assert_eq!(value["token"], "sunset"),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_http_transport_rejects_bad_cookie() {
        let config = Config {
            session_cookie: Some("bad\nvalue".to_string()),
            ..Config::default()
        };
        assert!(matches!(
            HttpTransport::new(&config),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_response_helpers() {
        let response = ApiResponse::new(StatusCode::OK, br#"[1, 2, 3]"#.to_vec());
        let values: Vec<u32> = response.json().unwrap();
        assert_eq!(values, vec![1, 2, 3]);
        assert_eq!(response.text(), "[1, 2, 3]");
    }
}
