//! The capability a web framework adapter offers the generator: register a handler for a
//! method and path behind a list of guards. Handlers see a framework-neutral request.

use crate::error::{AppError, ConfigError};
use crate::response::CrudResponse;
use crate::router::guard::SharedGuard;
use axum::http::{HeaderMap, Method};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Name of the path parameter carrying a record's primary key.
pub const ITEM_ID_PARAM: &str = "item_id";

/// What a generated handler receives.
#[derive(Clone, Debug, Default)]
pub struct CrudRequest {
    /// Raw `{item_id}` path segment, for item routes.
    pub item_id: Option<String>,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    /// Parsed JSON body; None when the request had no body.
    pub body: Option<Value>,
}

impl CrudRequest {
    pub fn with_item_id(mut self, id: impl Into<String>) -> Self {
        self.item_id = Some(id.into());
        self
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.insert(key.to_string(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<CrudResponse, AppError>> + Send>>;

pub type RouteHandler = Arc<dyn Fn(CrudRequest) -> HandlerFuture + Send + Sync>;

/// Paths use `{item_id}` placeholders; adapters translate them to their own syntax.
pub trait RouteRegistrar {
    fn register(
        &mut self,
        method: Method,
        path: &str,
        handler: RouteHandler,
        guards: Vec<SharedGuard>,
    ) -> Result<(), ConfigError>;
}
