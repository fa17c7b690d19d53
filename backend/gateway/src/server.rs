//! Main HTTP Gateway Server.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, Method,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use explica_core::LlmProvider;
use explica_understanding::{ImageAnalyzer, Translator};

use crate::functions;

/// Largest accepted request body. Images travel base64-encoded inside the
/// JSON body, so a camera photo takes several megabytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Application state shared across routes.
///
/// Both services are absent when the server has no AI gateway credentials;
/// the functions then answer 500 "server configuration incomplete".
#[derive(Clone)]
pub struct GatewayState {
    pub analyzer: Option<Arc<ImageAnalyzer>>,
    pub translator: Option<Arc<Translator>>,
    pub max_body_bytes: usize,
}

impl Default for GatewayState {
    fn default() -> Self {
        Self {
            analyzer: None,
            translator: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl GatewayState {
    pub fn new(provider: Arc<dyn LlmProvider>, model: &str) -> Self {
        Self {
            analyzer: Some(Arc::new(ImageAnalyzer::new(provider.clone(), model))),
            translator: Some(Arc::new(Translator::new(provider, model))),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn unconfigured() -> Self {
        warn!("Starting without AI gateway credentials; functions will fail");
        Self::default()
    }
}

/// Browsers call the functions directly, so any origin is allowed.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "explica-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Build the router with both functions, the health check and CORS.
pub fn build_router(state: GatewayState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    Router::new()
        .route(
            "/functions/v1/analyze-image",
            post(functions::analyze_image).options(functions::preflight),
        )
        .route(
            "/functions/v1/translate",
            post(functions::translate).options(functions::preflight),
        )
        .route("/api/health", get(health))
        .layer(body_limit)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the HTTP server for the backend functions.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state);

    info!("Gateway HTTP server listening on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
