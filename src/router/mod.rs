//! Route generation: the six-operation contract, guards, and the axum adapter.

pub mod axum_adapter;
pub mod generator;
pub mod guard;
pub mod registrar;

pub use axum_adapter::AxumRegistrar;
pub use generator::{parse_id, CrudRouter, Operation, RouteGenerator, RouteSetting};
pub use guard::{run_guards, BearerTokenGuard, Guard, SharedGuard};
pub use registrar::{CrudRequest, HandlerFuture, RouteHandler, RouteRegistrar, ITEM_ID_PARAM};
