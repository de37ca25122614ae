//! PostgreSQL adapter over a sqlx pool.

use super::{not_found, CrudBackend, Page};
use crate::config::ResolvedResource;
use crate::error::AppError;
use crate::query::ListQuery;
use crate::service::Payload;
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgConnection, PgPool};

const DUPLICATE_KEY: &str = "Key already exists";

/// Every write runs in its own transaction; a failed statement rolls it back before
/// the error is returned.
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        PgBackend { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn count(&self, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let n = query.fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }

    async fn query_many(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, Value>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        Ok(query.fetch_all(&self.pool).await?)
    }
}

async fn query_one_tx(tx: &mut PgConnection, q: &QueryBuf) -> Result<Option<Value>, sqlx::Error> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query (tx)");
    let mut query = sqlx::query_scalar::<_, Value>(&q.sql);
    for p in &q.params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query.fetch_optional(&mut *tx).await
}

#[async_trait]
impl CrudBackend for PgBackend {
    async fn list(&self, resource: &ResolvedResource, query: &ListQuery) -> Result<Page, AppError> {
        let total = self.count(&sql::count(resource, &query.filter)).await?;
        let items = self.query_many(&sql::select_page(resource, query)).await?;
        Ok(Page { items, total })
    }

    async fn get_one(&self, resource: &ResolvedResource, id: &Value) -> Result<Value, AppError> {
        let q = sql::select_by_id(resource, id, false);
        let mut conn = self.pool.acquire().await?;
        query_one_tx(&mut conn, &q)
            .await?
            .ok_or_else(|| not_found(resource, id))
    }

    async fn create(&self, resource: &ResolvedResource, payload: &Payload) -> Result<Value, AppError> {
        let q = sql::insert(resource, payload);
        let mut tx = self.pool.begin().await?;
        match query_one_tx(&mut tx, &q).await {
            Ok(Some(row)) => {
                tx.commit().await?;
                Ok(row)
            }
            Ok(None) => Err(AppError::Db(sqlx::Error::RowNotFound)),
            Err(e) => {
                let _ = tx.rollback().await;
                Err(AppError::from_write(e, Some(DUPLICATE_KEY)))
            }
        }
    }

    async fn update(&self, resource: &ResolvedResource, id: &Value, payload: &Payload) -> Result<Value, AppError> {
        let mut tx = self.pool.begin().await?;
        if query_one_tx(&mut tx, &sql::select_by_id(resource, id, true)).await?.is_none() {
            let _ = tx.rollback().await;
            return Err(not_found(resource, id));
        }
        match query_one_tx(&mut tx, &sql::update(resource, id, payload)).await {
            Ok(Some(row)) => {
                tx.commit().await?;
                Ok(row)
            }
            Ok(None) => {
                let _ = tx.rollback().await;
                Err(not_found(resource, id))
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(AppError::from_write(e, None))
            }
        }
    }

    async fn delete_one(&self, resource: &ResolvedResource, id: &Value) -> Result<Value, AppError> {
        let mut tx = self.pool.begin().await?;
        if query_one_tx(&mut tx, &sql::select_by_id(resource, id, true)).await?.is_none() {
            let _ = tx.rollback().await;
            return Err(not_found(resource, id));
        }
        match query_one_tx(&mut tx, &sql::delete(resource, id)).await {
            Ok(Some(row)) => {
                tx.commit().await?;
                Ok(row)
            }
            Ok(None) => {
                let _ = tx.rollback().await;
                Err(not_found(resource, id))
            }
            Err(e) => {
                let _ = tx.rollback().await;
                Err(AppError::from_write(e, None))
            }
        }
    }

    async fn delete_all(&self, resource: &ResolvedResource) -> Result<Page, AppError> {
        let q = sql::delete_all(resource);
        tracing::debug!(sql = %q.sql, "query (tx)");
        let mut tx = self.pool.begin().await?;
        if let Err(e) = sqlx::query(&q.sql).execute(&mut *tx).await {
            let _ = tx.rollback().await;
            return Err(AppError::from_write(e, None));
        }
        tx.commit().await?;
        self.list(resource, &ListQuery::unbounded()).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
