//! axum implementation of [`RouteRegistrar`].

use crate::error::{AppError, ConfigError};
use crate::router::guard::{run_guards, SharedGuard};
use crate::router::registrar::{CrudRequest, RouteHandler, RouteRegistrar, ITEM_ID_PARAM};
use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
    routing::{MethodFilter, MethodRouter},
    Router,
};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Collects generated routes, then builds one `axum::Router`.
#[derive(Default)]
pub struct AxumRegistrar {
    routes: BTreeMap<String, MethodRouter>,
    seen: HashSet<(String, Method)>,
}

impl AxumRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_router(self) -> Router {
        self.routes
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| router.route(&path, method_router))
    }
}

/// `/potatoes/{item_id}` -> `/potatoes/:item_id`.
pub fn to_axum_path(path: &str) -> String {
    path.split('/')
        .map(|seg| match seg.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => format!(":{}", name),
            None => seg.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn method_filter(method: &Method) -> Result<MethodFilter, ConfigError> {
    Ok(match *method {
        Method::GET => MethodFilter::GET,
        Method::POST => MethodFilter::POST,
        Method::PUT => MethodFilter::PUT,
        Method::PATCH => MethodFilter::PATCH,
        Method::DELETE => MethodFilter::DELETE,
        Method::HEAD => MethodFilter::HEAD,
        Method::OPTIONS => MethodFilter::OPTIONS,
        _ => return Err(ConfigError::Validation(format!("unsupported method: {}", method))),
    })
}

impl RouteRegistrar for AxumRegistrar {
    fn register(
        &mut self,
        method: Method,
        path: &str,
        handler: RouteHandler,
        guards: Vec<SharedGuard>,
    ) -> Result<(), ConfigError> {
        let axum_path = to_axum_path(path);
        if !self.seen.insert((axum_path.clone(), method.clone())) {
            return Err(ConfigError::DuplicateRoute {
                method: method.to_string(),
                path: path.to_string(),
            });
        }
        let filter = method_filter(&method)?;
        let endpoint = move |params: Option<Path<HashMap<String, String>>>,
                             Query(query): Query<HashMap<String, String>>,
                             headers: HeaderMap,
                             body: Bytes| {
            let handler = handler.clone();
            let guards = guards.clone();
            async move {
                let item_id = params.and_then(|Path(mut p)| p.remove(ITEM_ID_PARAM));
                dispatch(handler, &guards, item_id, query, headers, body).await
            }
        };
        let method_router = self.routes.remove(&axum_path).unwrap_or_default();
        self.routes.insert(axum_path, method_router.on(filter, endpoint));
        Ok(())
    }
}

/// Guards run before the body is judged; a malformed body reaches them as `None`.
async fn dispatch(
    handler: RouteHandler,
    guards: &[SharedGuard],
    item_id: Option<String>,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let parsed = if body.iter().all(u8::is_ascii_whitespace) {
        Ok(None)
    } else {
        serde_json::from_slice::<serde_json::Value>(&body)
            .map(Some)
            .map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))
    };
    let mut request = CrudRequest {
        item_id,
        query,
        headers,
        body: None,
    };
    let body_error = match parsed {
        Ok(value) => {
            request.body = value;
            None
        }
        Err(e) => Some(e),
    };
    if let Err(e) = run_guards(guards, &request).await {
        return e.into_response();
    }
    if let Some(e) = body_error {
        return e.into_response();
    }
    match handler(request).await {
        Ok(resp) => resp.into_response(),
        Err(e) => e.into_response(),
    }
}
