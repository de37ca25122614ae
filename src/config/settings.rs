//! Explicit router defaults and server settings read from the environment.

use crate::error::ConfigError;
use std::net::SocketAddr;

/// Defaults applied to every resource a router generates routes for.
/// Passed at construction; nothing here is global.
#[derive(Clone, Debug)]
pub struct CrudSettings {
    /// Path every resource prefix is joined onto. Default `/`.
    pub base_path: String,
    /// Maximum list `limit` when a resource does not set `paginate`.
    pub max_limit: Option<u64>,
}

impl Default for CrudSettings {
    fn default() -> Self {
        CrudSettings {
            base_path: "/".into(),
            max_limit: None,
        }
    }
}

impl CrudSettings {
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_max_limit(mut self, max_limit: u64) -> Self {
        self.max_limit = Some(max_limit);
        self
    }
}

/// Settings for the bundled server, from env (a `.env` file is honoured by the binary).
#[derive(Clone, Debug)]
pub struct ServerSettings {
    pub database_url: String,
    pub config_path: String,
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize,
    /// When set, write routes require `Authorization: Bearer <token>`.
    pub api_token: Option<String>,
    pub max_limit: Option<u64>,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/crud".into());
        let config_path = lookup("CRUD_CONFIG_PATH").unwrap_or_else(|| "resources.json".into());
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:3000".into())
            .parse()
            .map_err(|e| ConfigError::Load(format!("BIND_ADDR: {}", e)))?;
        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(v) => v
                .parse()
                .map_err(|e| ConfigError::Load(format!("MAX_BODY_BYTES: {}", e)))?,
            None => 1024 * 1024,
        };
        let max_limit = match lookup("CRUD_MAX_LIMIT") {
            Some(v) => Some(
                v.parse()
                    .map_err(|e| ConfigError::Load(format!("CRUD_MAX_LIMIT: {}", e)))?,
            ),
            None => None,
        };
        let api_token = lookup("CRUD_API_TOKEN").filter(|s| !s.trim().is_empty());
        Ok(ServerSettings {
            database_url,
            config_path,
            bind_addr,
            max_body_bytes,
            api_token,
            max_limit,
        })
    }

    pub fn crud_settings(&self) -> CrudSettings {
        CrudSettings {
            max_limit: self.max_limit,
            ..CrudSettings::default()
        }
    }
}
