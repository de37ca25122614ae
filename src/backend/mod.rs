//! Storage adapters. Each one implements the storage half of the six CRUD operations;
//! the route layer (`crate::router`) handles parsing, validation and HTTP shaping.

mod memory;
mod postgres;

pub use memory::MemoryBackend;
pub use postgres::PgBackend;

use crate::config::ResolvedResource;
use crate::error::AppError;
use crate::query::ListQuery;
use crate::service::Payload;
use async_trait::async_trait;
use serde_json::Value;

/// One page of records plus the number of records matching the filter before paging.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    pub total: u64,
}

/// Storage contract every adapter satisfies to receive generated routes.
///
/// Ids and payloads arrive already coerced to the resource's field types. Writes are
/// committed before returning; on a constraint violation nothing is persisted and
/// `AppError::Conflict` is returned.
#[async_trait]
pub trait CrudBackend: Send + Sync + 'static {
    /// Filter, count, then sort and apply skip/limit.
    async fn list(&self, resource: &ResolvedResource, query: &ListQuery) -> Result<Page, AppError>;

    /// `AppError::NotFound` when the id does not resolve.
    async fn get_one(&self, resource: &ResolvedResource, id: &Value) -> Result<Value, AppError>;

    async fn create(&self, resource: &ResolvedResource, payload: &Payload) -> Result<Value, AppError>;

    async fn update(&self, resource: &ResolvedResource, id: &Value, payload: &Payload) -> Result<Value, AppError>;

    /// Returns the removed record's last state.
    async fn delete_one(&self, resource: &ResolvedResource, id: &Value) -> Result<Value, AppError>;

    /// Remove every record, then report the equivalent of an unbounded list.
    async fn delete_all(&self, resource: &ResolvedResource) -> Result<Page, AppError>;

    /// Readiness probe.
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

pub(crate) fn not_found(resource: &ResolvedResource, id: &Value) -> AppError {
    let id = match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    AppError::NotFound(format!("{} {}", resource.table_name, id))
}
