#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use crud_router::{parse_config, resolve, resource_routes, CrudSettings, MemoryBackend, SharedGuard};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Router for the resources in `config`, backed by a fresh in-memory store.
pub fn app(config: Value, write_guards: &[SharedGuard]) -> Router {
    app_with(config, CrudSettings::default(), write_guards)
}

pub fn app_with(config: Value, settings: CrudSettings, write_guards: &[SharedGuard]) -> Router {
    let config = parse_config(&config.to_string()).unwrap();
    let model = resolve(&config, &settings).unwrap();
    resource_routes(Arc::new(MemoryBackend::new()), &model, write_guards).unwrap()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn content_range(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_RANGE).and_then(|v| v.to_str().ok())
    }
}

pub struct TestRequest {
    method: Method,
    uri: String,
    body: Option<String>,
    token: Option<String>,
}

impl TestRequest {
    pub fn new(method: Method, uri: &str) -> Self {
        TestRequest {
            method,
            uri: uri.to_string(),
            body: None,
            token: None,
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn put(uri: &str) -> Self {
        Self::new(Method::PUT, uri)
    }

    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn raw_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub async fn send(self, app: &Router) -> TestResponse {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if self.body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(token) = self.token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder
            .body(self.body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse { status, headers, body }
    }
}

/// Percent-encode a query parameter value.
pub fn encode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            _ => format!("%{:02X}", b),
        })
        .collect()
}
