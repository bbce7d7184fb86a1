// Test doubles for the transport and navigation seams.
// Scripted responses per route, call counting, and held replies.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use reqwest::StatusCode;
use tokio::sync::oneshot;

use crate::error::ClassifiedError;

use super::client::ApiClient;
use super::navigator::Navigator;
use super::transport::{ApiRequest, ApiResponse, Transport};

enum Reply {
    Response(ApiResponse),
    Failure(ClassifiedError),
    Held(oneshot::Receiver<ApiResponse>),
}

/// Route key of a request: `METHOD /path?name=value&...`.
pub fn route_key(request: &ApiRequest) -> String {
    let mut key = format!("{} {}", request.method, request.path);
    for (i, (name, value)) in request.query.iter().enumerate() {
        key.push(if i == 0 { '?' } else { '&' });
        key.push_str(&format!("{}={}", name, value));
    }
    key
}

#[derive(Default)]
struct Script {
    replies: HashMap<String, VecDeque<Reply>>,
    requests: Vec<ApiRequest>,
}

/// Transport that answers from a per-route script.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, route: &str, reply: Reply) {
        self.script
            .lock()
            .unwrap()
            .replies
            .entry(route.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn respond(&self, route: &str, status: StatusCode, body: serde_json::Value) {
        let body = serde_json::to_vec(&body).unwrap();
        self.push(route, Reply::Response(ApiResponse::new(status, body)));
    }

    pub fn respond_empty(&self, route: &str, status: StatusCode) {
        self.push(route, Reply::Response(ApiResponse::new(status, Vec::new())));
    }

    pub fn fail(&self, route: &str, error: ClassifiedError) {
        self.push(route, Reply::Failure(error));
    }

    /// Queue a reply that resolves only when the returned sender fires.
    pub fn hold(&self, route: &str) -> oneshot::Sender<ApiResponse> {
        let (tx, rx) = oneshot::channel();
        self.push(route, Reply::Held(rx));
        tx
    }

    pub fn calls(&self, route: &str) -> usize {
        self.script
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| route_key(r) == route)
            .count()
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.script.lock().unwrap().requests.clone()
    }
}

impl Transport for ScriptedTransport {
    fn send(
        &self,
        request: ApiRequest,
    ) -> BoxFuture<'static, Result<ApiResponse, ClassifiedError>> {
        let route = route_key(&request);
        let reply = {
            let mut script = self.script.lock().unwrap();
            script.requests.push(request);
            script.replies.get_mut(&route).and_then(VecDeque::pop_front)
        };

        Box::pin(async move {
            match reply {
                Some(Reply::Response(response)) => Ok(response),
                Some(Reply::Failure(error)) => Err(error),
                Some(Reply::Held(rx)) => rx
                    .await
                    .map_err(|_| ClassifiedError::transport(None, "held reply dropped")),
                None => Ok(ApiResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("no scripted reply for {}", route).into_bytes(),
                )),
            }
        })
    }
}

/// Navigator that remembers every external navigation.
pub struct RecordingNavigator {
    location: Mutex<String>,
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(location: &str) -> Arc<Self> {
        Arc::new(Self {
            location: Mutex::new(location.to_string()),
            visited: Mutex::new(Vec::new()),
        })
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_location(&self) -> String {
        self.location.lock().unwrap().clone()
    }

    fn navigate_external(&self, url: &str) {
        self.visited.lock().unwrap().push(url.to_string());
    }
}

/// An API client wired to fresh test doubles.
pub fn scripted_client(location: &str) -> (ApiClient, Arc<ScriptedTransport>, Arc<RecordingNavigator>) {
    let transport = ScriptedTransport::new();
    let navigator = RecordingNavigator::at(location);
    let client = ApiClient::new(transport.clone(), navigator.clone(), "/auth/github");
    (client, transport, navigator)
}
