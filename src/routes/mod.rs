//! Router assembly for a whole resolved model.

mod common;

pub use common::{common_routes, common_routes_with_ready};

use crate::backend::CrudBackend;
use crate::config::ResolvedModel;
use crate::error::ConfigError;
use crate::router::{AxumRegistrar, CrudRouter, Operation, RouteGenerator, SharedGuard};
use axum::Router;
use std::sync::Arc;

/// Generated routes for every resource in `model`, sharing one backend. `write_guards`
/// are attached to create, update and both deletes.
pub fn resource_routes<B: CrudBackend>(
    backend: Arc<B>,
    model: &ResolvedModel,
    write_guards: &[SharedGuard],
) -> Result<Router, ConfigError> {
    let mut registrar = AxumRegistrar::new();
    for resource in &model.resources {
        let mut router = CrudRouter::new(backend.clone(), resource.clone());
        for op in Operation::ALL.into_iter().filter(|op| op.is_write()) {
            for guard in write_guards {
                router = router.guard(op, guard.clone());
            }
        }
        router.register(&mut registrar)?;
    }
    Ok(registrar.into_router())
}
