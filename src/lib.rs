//! CRUD router: generate list/get/create/update/delete routes for configured resources
//! over a pluggable storage backend.

pub mod backend;
pub mod config;
pub mod error;
pub mod migration;
pub mod query;
pub mod response;
pub mod router;
pub mod routes;
pub mod service;
pub mod sql;
pub mod store;

pub use backend::{CrudBackend, MemoryBackend, Page, PgBackend};
pub use config::{
    load_from_path, parse_config, resolve, resolve_resource, CrudSettings, FullConfig, ResolvedModel,
    ResolvedResource, ResourceConfig, ServerSettings,
};
pub use error::{AppError, ConfigError};
pub use migration::{ensure_model_tables, ensure_resource_table};
pub use query::{Filter, ListQuery, Pagination, Sort, SortOrder};
pub use response::CrudResponse;
pub use router::{
    BearerTokenGuard, CrudRequest, CrudRouter, Guard, Operation, RouteGenerator, RouteRegistrar, RouteSetting,
    SharedGuard,
};
pub use routes::{common_routes, common_routes_with_ready, resource_routes};
pub use store::ensure_database_exists;
