//! Scripted transport for unit tests.
//!
//! Records every request at the moment it is dispatched and answers with a
//! response produced by a handler closure. Requests to a gated path are held
//! until the test releases a permit.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tokio::sync::Semaphore;

use crate::transport::Transport;

type Handler = dyn Fn(&RecordedCall) -> reqwest::Response + Send + Sync;

/// A request as seen by the transport.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: reqwest::Method,
    pub path: String,
    pub bearer: Option<String>,
    /// Every `Authorization` value sent
    pub authorization: Vec<String>,
    pub request_id: Option<String>,
    pub body: serde_json::Value,
}

pub struct ScriptedTransport {
    handler: Box<Handler>,
    calls: Mutex<Vec<RecordedCall>>,
    gate: Option<(String, Arc<Semaphore>)>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&RecordedCall) -> reqwest::Response + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Hold responses for `path` until a permit is added to the returned semaphore.
    pub fn gated<F>(path: &str, handler: F) -> (Self, Arc<Semaphore>)
    where
        F: Fn(&RecordedCall) -> reqwest::Response + Send + Sync + 'static,
    {
        let gate = Arc::new(Semaphore::new(0));
        let mut transport = Self::new(handler);
        transport.gate = Some((path.to_string(), Arc::clone(&gate)));
        (transport, gate)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }
}

impl Transport for ScriptedTransport {
    fn execute(
        &self,
        request: reqwest::Request,
    ) -> BoxFuture<'static, Result<reqwest::Response, reqwest::Error>> {
        let call = RecordedCall {
            method: request.method().clone(),
            path: request.url().path().to_string(),
            bearer: request
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(String::from),
            authorization: request
                .headers()
                .get_all(AUTHORIZATION)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(String::from)
                .collect(),
            request_id: request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            body: request
                .body()
                .and_then(reqwest::Body::as_bytes)
                .map_or(serde_json::Value::Null, |bytes| {
                    serde_json::from_slice(bytes).unwrap()
                }),
        };

        let response = (self.handler)(&call);
        let gate = self
            .gate
            .as_ref()
            .filter(|(path, _)| *path == call.path)
            .map(|(_, gate)| Arc::clone(gate));
        self.calls.lock().unwrap().push(call);

        Box::pin(async move {
            if let Some(gate) = gate {
                gate.acquire().await.unwrap().forget();
            }
            Ok(response)
        })
    }
}

pub fn json_response(status: StatusCode, body: &serde_json::Value) -> reqwest::Response {
    let response = http::Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap();
    reqwest::Response::from(response)
}

pub fn text_response(status: StatusCode, body: &str) -> reqwest::Response {
    let response = http::Response::builder()
        .status(status)
        .body(body.to_string())
        .unwrap();
    reqwest::Response::from(response)
}
