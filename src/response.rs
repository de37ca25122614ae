//! Framework-neutral response produced by generated handlers.

use crate::backend::Page;
use crate::query::Pagination;
use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

#[derive(Clone, Debug)]
pub struct CrudResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl CrudResponse {
    pub fn ok(body: Value) -> Self {
        CrudResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body,
        }
    }

    pub fn created(body: Value) -> Self {
        CrudResponse {
            status: StatusCode::CREATED,
            ..Self::ok(body)
        }
    }

    /// List-shaped response: items as a JSON array and `Content-Range` for the window.
    pub fn page(pagination: &Pagination, page: Page) -> Self {
        let range = pagination.content_range(page.items.len(), page.total);
        let mut headers = HeaderMap::new();
        // digits and dashes only
        if let Ok(v) = HeaderValue::from_str(&range) {
            headers.insert(header::CONTENT_RANGE, v);
        }
        CrudResponse {
            status: StatusCode::OK,
            headers,
            body: Value::Array(page.items),
        }
    }

    pub fn content_range(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
    }
}

impl IntoResponse for CrudResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, Json(self.body)).into_response()
    }
}
