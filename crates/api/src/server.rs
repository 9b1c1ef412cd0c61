//! Axum-based HTTP server for the Traffic Ops API.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;

use traffic_ops_core::{
    config::{AuthConfig, ServerConfig},
    traits::Datastore,
    types::{ApiEnvelope, ApiMethod, API_PATH},
    Error, Result,
};

use crate::auth::{login_handler, logout_handler, require_session, token_login_handler, SessionTokens};
use crate::dispatch::DispatchTable;
use crate::metrics::track_request;

const CORS_ALLOW_HEADERS: &str = "Origin, Authorization, X-Requested-With, Content-Type";

/// Shared application state.
pub struct AppState {
    pub table: Arc<DispatchTable>,
    pub store: Arc<dyn Datastore>,
    pub sessions: SessionTokens,
    pub auth: AuthConfig,
}

/// Traffic Ops API server.
pub struct ApiServer {
    config: ServerConfig,
    state: Arc<AppState>,
    metrics_handle: Option<PrometheusHandle>,
}

impl ApiServer {
    /// Create a new server over a built dispatch table.
    pub fn new(
        config: ServerConfig,
        auth: AuthConfig,
        table: DispatchTable,
        store: Arc<dyn Datastore>,
    ) -> Self {
        let sessions = SessionTokens::new(Duration::from_secs(auth.session_ttl_secs));
        Self {
            config,
            state: Arc::new(AppState {
                table: Arc::new(table),
                store,
                sessions,
                auth,
            }),
            metrics_handle: None,
        }
    }

    /// Set metrics handle.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Build the Axum router.
    ///
    /// Every path in the dispatch table is mounted under `/api/2.0/` behind
    /// the session check; ping, the login routes and logout are public.
    pub fn build_router(&self) -> Router {
        let mut protected = Router::new();
        for template in self.state.table.paths() {
            let route = format!("{}{}", API_PATH, axum_path(template));
            let template = template.to_string();
            protected = protected.route(
                &route,
                any(
                    move |State(state): State<Arc<AppState>>,
                          params: Option<Path<HashMap<String, String>>>,
                          method: Method,
                          body: Bytes| {
                        let template = template.clone();
                        async move {
                            let params = params.map(|Path(p)| p).unwrap_or_default();
                            handle_api(state, &template, method, params, body).await
                        }
                    },
                ),
            );
        }
        let protected = protected.route_layer(middleware::from_fn_with_state(
            self.state.clone(),
            require_session,
        ));

        let public = Router::new()
            .route(&format!("{}ping", API_PATH), get(ping_handler))
            .route(&format!("{}user/login", API_PATH), post(login_handler))
            .route(&format!("{}user/login/token", API_PATH), post(token_login_handler))
            .route(&format!("{}login", API_PATH), post(login_handler))
            .route(&format!("{}user/logout", API_PATH), post(logout_handler));

        let mut router = Router::new()
            .merge(protected)
            .merge(public)
            .fallback(not_found_handler)
            .with_state(self.state.clone());

        if let Some(handle) = &self.metrics_handle {
            let handle = handle.clone();
            router = router.route("/metrics", get(move || async move { handle.render() }));
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// Run the server, over TLS when configured.
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let router = self.build_router();

        if self.config.tls.enabled {
            let (cert, key) = match (&self.config.tls.cert_path, &self.config.tls.key_path) {
                (Some(cert), Some(key)) => (cert, key),
                _ => {
                    return Err(Error::internal(
                        "server.tls.cert_path and server.tls.key_path are required when TLS is enabled",
                    ))
                }
            };
            let socket: SocketAddr = addr
                .parse()
                .map_err(|e| Error::internal(format!("Invalid listen address {}: {}", addr, e)))?;
            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
                .await
                .map_err(|e| Error::internal(format!("Failed to load TLS material: {}", e)))?;

            tracing::info!(addr = %addr, "Traffic Ops API starting (TLS)");
            axum_server::bind_rustls(socket, tls)
                .serve(router.into_make_service())
                .await
                .map_err(|e| Error::internal(format!("Server error: {}", e)))?;
        } else {
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .map_err(|e| Error::internal(format!("Failed to bind: {}", e)))?;

            tracing::info!(addr = %addr, "Traffic Ops API starting");
            axum::serve(listener, router)
                .await
                .map_err(|e| Error::internal(format!("Server error: {}", e)))?;
        }

        Ok(())
    }
}

/// Convert a `{name}` path template into axum's `:name` capture syntax.
pub fn axum_path(template: &str) -> String {
    template
        .split('/')
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => format!(":{}", name),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

// =============================================================================
// Responses
// =============================================================================

fn with_cors(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

/// Error envelope with the status the error maps to.
pub fn error_response(err: &Error) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::error!(error = %err, "Request failed");
    } else {
        tracing::debug!(error = %err, status = status.as_u16(), "Request rejected");
    }
    with_cors((status, Json(ApiEnvelope::<()>::failure(err))).into_response())
}

fn preflight_response(allowed: &str) -> Response {
    let mut response = StatusCode::OK.into_response();
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
    if let Ok(value) = HeaderValue::from_str(allowed) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    response
}

fn method_not_allowed(method: &Method, allowed: &str) -> Response {
    let err = Error::invalid_request(format!("method {} not allowed", method));
    let mut response = (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ApiEnvelope::<()>::failure(&err)),
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(allowed) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    with_cors(response)
}

// =============================================================================
// Handlers
// =============================================================================

async fn handle_api(
    state: Arc<AppState>,
    template: &str,
    method: Method,
    params: HashMap<String, String>,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let allowed = state.table.allowed_methods(template).unwrap_or_default();

    let response = match method.as_str().parse::<ApiMethod>() {
        Ok(ApiMethod::Options) => preflight_response(&allowed.to_string()),
        // Methods without a handler come back from dispatch as not found.
        Ok(api_method) => match state
            .table
            .dispatch(template, api_method, params, body, state.store.clone())
            .await
        {
            Ok(output) => with_cors(Json(output.into_envelope()).into_response()),
            Err(e) => error_response(&e),
        },
        Err(_) => method_not_allowed(&method, &allowed.to_string()),
    };

    track_request(
        method.as_str(),
        template,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );
    response
}

async fn ping_handler() -> impl IntoResponse {
    Json(serde_json::json!({"ping": "pong"}))
}

async fn not_found_handler(method: Method, uri: axum::http::Uri) -> Response {
    error_response(&Error::not_found(format!("{} {}", method, uri.path())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_convert_to_axum_captures() {
        assert_eq!(axum_path("cdn"), "cdn");
        assert_eq!(axum_path("asn/{key}"), "asn/:key");
        assert_eq!(
            axum_path("deliveryservice_server/{key0}/{key1}"),
            "deliveryservice_server/:key0/:key1"
        );
    }
}
