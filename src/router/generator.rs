//! The CRUD route contract and its implementation over any [`CrudBackend`].

use crate::backend::CrudBackend;
use crate::config::{resolve_resource, CrudSettings, ResolvedResource, ResourceConfig};
use crate::error::{AppError, ConfigError};
use crate::query::ListQuery;
use crate::response::CrudResponse;
use crate::router::axum_adapter::AxumRegistrar;
use crate::router::guard::SharedGuard;
use crate::router::registrar::{CrudRequest, HandlerFuture, RouteHandler, RouteRegistrar, ITEM_ID_PARAM};
use crate::service::{coerce, RequestValidator};
use axum::http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// The six generated operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    GetAll,
    GetOne,
    Create,
    Update,
    DeleteOne,
    DeleteAll,
}

impl Operation {
    /// Registration order. Collection routes first, then item routes.
    pub const ALL: [Operation; 6] = [
        Operation::GetAll,
        Operation::Create,
        Operation::DeleteAll,
        Operation::GetOne,
        Operation::Update,
        Operation::DeleteOne,
    ];

    pub fn method(self) -> Method {
        match self {
            Operation::GetAll | Operation::GetOne => Method::GET,
            Operation::Create => Method::POST,
            Operation::Update => Method::PUT,
            Operation::DeleteOne | Operation::DeleteAll => Method::DELETE,
        }
    }

    /// Full path under `prefix`, with `{item_id}` for item routes.
    pub fn path(self, prefix: &str) -> String {
        match self {
            Operation::GetAll | Operation::Create | Operation::DeleteAll => prefix.to_string(),
            Operation::GetOne | Operation::Update | Operation::DeleteOne => {
                format!("{}/{{{}}}", prefix, ITEM_ID_PARAM)
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Operation::GetAll => "get_all",
            Operation::GetOne => "get_one",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::DeleteOne => "delete_one",
            Operation::DeleteAll => "delete_all",
        }
    }

    pub fn is_write(self) -> bool {
        !matches!(self, Operation::GetAll | Operation::GetOne)
    }
}

/// Whether an operation's route is registered, and behind which guards.
#[derive(Clone, Default)]
pub enum RouteSetting {
    Disabled,
    #[default]
    Enabled,
    Guarded(Vec<SharedGuard>),
}

impl RouteSetting {
    fn guards(&self) -> Option<Vec<SharedGuard>> {
        match self {
            RouteSetting::Disabled => None,
            RouteSetting::Enabled => Some(Vec::new()),
            RouteSetting::Guarded(g) => Some(g.clone()),
        }
    }
}

impl From<bool> for RouteSetting {
    fn from(enabled: bool) -> Self {
        if enabled {
            RouteSetting::Enabled
        } else {
            RouteSetting::Disabled
        }
    }
}

/// Six route factories plus registration. Implementors supply the factories; `register`
/// walks the enabled operations and hands each one to a [`RouteRegistrar`].
pub trait RouteGenerator {
    fn resource(&self) -> &ResolvedResource;

    /// Guards for `op`, or None when its route is disabled.
    fn guards_for(&self, op: Operation) -> Option<Vec<SharedGuard>>;

    fn get_all_route(&self) -> RouteHandler;
    fn get_one_route(&self) -> RouteHandler;
    fn create_route(&self) -> RouteHandler;
    fn update_route(&self) -> RouteHandler;
    fn delete_one_route(&self) -> RouteHandler;
    fn delete_all_route(&self) -> RouteHandler;

    fn prefix(&self) -> &str {
        &self.resource().prefix
    }

    fn route_handler(&self, op: Operation) -> RouteHandler {
        match op {
            Operation::GetAll => self.get_all_route(),
            Operation::GetOne => self.get_one_route(),
            Operation::Create => self.create_route(),
            Operation::Update => self.update_route(),
            Operation::DeleteOne => self.delete_one_route(),
            Operation::DeleteAll => self.delete_all_route(),
        }
    }

    fn register(&self, registrar: &mut dyn RouteRegistrar) -> Result<(), ConfigError> {
        for op in Operation::ALL {
            let Some(guards) = self.guards_for(op) else {
                tracing::debug!(prefix = %self.prefix(), route = op.name(), "route disabled");
                continue;
            };
            let path = op.path(self.prefix());
            tracing::info!(method = %op.method(), path = %path, guards = guards.len(), "registering route");
            registrar.register(op.method(), &path, self.route_handler(op), guards)?;
        }
        Ok(())
    }
}

/// Generated CRUD routes for one resource backed by `B`.
pub struct CrudRouter<B: CrudBackend> {
    backend: Arc<B>,
    resource: Arc<ResolvedResource>,
    routes: HashMap<Operation, RouteSetting>,
    shared_guards: Vec<SharedGuard>,
}

impl<B: CrudBackend> Clone for CrudRouter<B> {
    fn clone(&self) -> Self {
        CrudRouter {
            backend: self.backend.clone(),
            resource: self.resource.clone(),
            routes: self.routes.clone(),
            shared_guards: self.shared_guards.clone(),
        }
    }
}

impl<B: CrudBackend> CrudRouter<B> {
    /// Route toggles start from the resource's config.
    pub fn new(backend: Arc<B>, resource: ResolvedResource) -> Self {
        let t = &resource.routes;
        let routes = HashMap::from([
            (Operation::GetAll, RouteSetting::from(t.get_all)),
            (Operation::GetOne, RouteSetting::from(t.get_one)),
            (Operation::Create, RouteSetting::from(t.create)),
            (Operation::Update, RouteSetting::from(t.update)),
            (Operation::DeleteOne, RouteSetting::from(t.delete_one)),
            (Operation::DeleteAll, RouteSetting::from(t.delete_all)),
        ]);
        CrudRouter {
            backend,
            resource: Arc::new(resource),
            routes,
            shared_guards: Vec::new(),
        }
    }

    pub fn from_config(backend: Arc<B>, config: &ResourceConfig, settings: &CrudSettings) -> Result<Self, ConfigError> {
        Ok(Self::new(backend, resolve_resource(config, settings)?))
    }

    pub fn route(mut self, op: Operation, setting: impl Into<RouteSetting>) -> Self {
        self.routes.insert(op, setting.into());
        self
    }

    pub fn disable(self, op: Operation) -> Self {
        self.route(op, RouteSetting::Disabled)
    }

    /// Add a guard to one route. No effect on a disabled route.
    pub fn guard(mut self, op: Operation, guard: SharedGuard) -> Self {
        let entry = self.routes.entry(op).or_default();
        *entry = match std::mem::take(entry) {
            RouteSetting::Disabled => RouteSetting::Disabled,
            RouteSetting::Enabled => RouteSetting::Guarded(vec![guard]),
            RouteSetting::Guarded(mut g) => {
                g.push(guard);
                RouteSetting::Guarded(g)
            }
        };
        self
    }

    /// Add a guard that runs before every route's own guards.
    pub fn guard_all(mut self, guard: SharedGuard) -> Self {
        self.shared_guards.push(guard);
        self
    }

    /// Register every enabled route on a fresh axum router.
    pub fn into_router(self) -> Result<axum::Router, ConfigError> {
        let mut registrar = AxumRegistrar::new();
        self.register(&mut registrar)?;
        Ok(registrar.into_router())
    }

    /// Wrap `f` into a handler that owns clones of the backend and resource.
    fn handler<F, Fut>(&self, f: F) -> RouteHandler
    where
        F: Fn(Arc<B>, Arc<ResolvedResource>, CrudRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<CrudResponse, AppError>> + Send + 'static,
    {
        let backend = self.backend.clone();
        let resource = self.resource.clone();
        Arc::new(move |req: CrudRequest| -> HandlerFuture {
            Box::pin(f(backend.clone(), resource.clone(), req))
        })
    }
}

/// Parse the raw path id into the key's type.
pub fn parse_id(resource: &ResolvedResource, raw: Option<&str>) -> Result<Value, AppError> {
    let raw = raw.ok_or_else(|| AppError::BadRequest("missing item id".into()))?;
    let ty = resource.pk_field().field_type;
    coerce(ty, &Value::String(raw.to_string()), true)
        .filter(|v| !v.is_null())
        .ok_or_else(|| AppError::BadRequest(format!("invalid id: {}", raw)))
}

fn require_body(req: &mut CrudRequest) -> Result<Value, AppError> {
    req.body
        .take()
        .ok_or_else(|| AppError::BadRequest("request body is required".into()))
}

impl<B: CrudBackend> RouteGenerator for CrudRouter<B> {
    fn resource(&self) -> &ResolvedResource {
        &self.resource
    }

    fn guards_for(&self, op: Operation) -> Option<Vec<SharedGuard>> {
        let own = self.routes.get(&op).cloned().unwrap_or_default().guards()?;
        let mut guards = self.shared_guards.clone();
        guards.extend(own);
        Some(guards)
    }

    fn get_all_route(&self) -> RouteHandler {
        self.handler(|backend, resource, req| async move {
            let query = ListQuery::from_params(&resource, &req.query)?;
            let page = backend.list(&resource, &query).await?;
            Ok::<_, AppError>(CrudResponse::page(&query.pagination, page))
        })
    }

    fn get_one_route(&self) -> RouteHandler {
        self.handler(|backend, resource, req| async move {
            let id = parse_id(&resource, req.item_id.as_deref())?;
            let record = backend.get_one(&resource, &id).await?;
            Ok::<_, AppError>(CrudResponse::ok(record))
        })
    }

    fn create_route(&self) -> RouteHandler {
        self.handler(|backend, resource, mut req| async move {
            let body = require_body(&mut req)?;
            let payload = RequestValidator::create_payload(&resource, body)?;
            let record = backend.create(&resource, &payload).await?;
            Ok::<_, AppError>(CrudResponse::created(record))
        })
    }

    fn update_route(&self) -> RouteHandler {
        self.handler(|backend, resource, mut req| async move {
            let id = parse_id(&resource, req.item_id.as_deref())?;
            let body = require_body(&mut req)?;
            let payload = RequestValidator::update_payload(&resource, body)?;
            let record = backend.update(&resource, &id, &payload).await?;
            Ok::<_, AppError>(CrudResponse::ok(record))
        })
    }

    fn delete_one_route(&self) -> RouteHandler {
        self.handler(|backend, resource, req| async move {
            let id = parse_id(&resource, req.item_id.as_deref())?;
            let record = backend.delete_one(&resource, &id).await?;
            Ok::<_, AppError>(CrudResponse::ok(record))
        })
    }

    fn delete_all_route(&self) -> RouteHandler {
        self.handler(|backend, resource, _req| async move {
            let page = backend.delete_all(&resource).await?;
            Ok::<_, AppError>(CrudResponse::page(&ListQuery::unbounded().pagination, page))
        })
    }
}
