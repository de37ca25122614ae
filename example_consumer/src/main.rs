//! Example consumer: serves the resources described in `CRUD_CONFIG_PATH` from PostgreSQL.
//!
//! Run from repo root: `CRUD_CONFIG_PATH=demos/resources.json cargo run -p example-consumer`

use crud_router::{
    common_routes_with_ready, ensure_database_exists, ensure_model_tables, load_from_path, resolve,
    resource_routes, BearerTokenGuard, PgBackend, ServerSettings, SharedGuard,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("crud_router=info,example_consumer=info")),
        )
        .init();

    let settings = ServerSettings::from_env()?;
    let config = load_from_path(&settings.config_path).await?;
    let model = resolve(&config, &settings.crud_settings())?;

    ensure_database_exists(&settings.database_url).await?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&settings.database_url)
        .await?;
    ensure_model_tables(&pool, &model).await?;

    let write_guards: Vec<SharedGuard> = match &settings.api_token {
        Some(token) => vec![BearerTokenGuard::shared(token.clone())],
        None => {
            tracing::warn!("CRUD_API_TOKEN not set; write routes are open");
            Vec::new()
        }
    };

    let backend = Arc::new(PgBackend::new(pool));
    let app = resource_routes(backend.clone(), &model, &write_guards)?
        .merge(common_routes_with_ready(backend))
        .layer(RequestBodyLimitLayer::new(settings.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        resources = model.resources.len(),
        "listening"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
