//! Chirp Tracker HTTP Service
//!
//! Webhook ingestion and latency reporting over HTTP/JSON.
//!
//! ## Endpoints
//!
//! | method | path                     | purpose                                  |
//! |--------|--------------------------|------------------------------------------|
//! | POST   | `/github`                | push notification (HMAC signed)          |
//! | POST   | `/travis`                | build notification (token authenticated) |
//! | GET    | `/chirps`                | ranked push-to-build latencies           |
//! | POST   | `/stats`                 | forward script timings to the log stream |
//! | GET    | `/kb/:kb`                | stream `kb` kilobytes                    |
//! | POST   | `/kb/:kb`                | check a `kb` kilobyte upload             |
//! | GET    | `/health` `/live` `/ready` | probes                                 |
//! | GET    | `/metrics`               | Prometheus exposition                    |
//! | GET    | `/api-docs/openapi.json` | OpenAPI document                         |

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Json, Router,
};
use chirp_core::{EventRecorder, QueryEngine};
use chirp_store::KeyValueStore;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod reaper;
pub mod shutdown;
pub mod signature;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use shutdown::{shutdown_signal, ShutdownHandle, ShutdownSignal};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn KeyValueStore>,
    pub recorder: Arc<EventRecorder>,
    pub query: Arc<QueryEngine>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wire the recorder and query engine to `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, config: ServerConfig) -> Self {
        let config = Arc::new(config);
        let tracker = Arc::new(config.tracker.clone());

        Self {
            recorder: Arc::new(EventRecorder::new(store.clone(), tracker.clone())),
            query: Arc::new(QueryEngine::new(store.clone(), tracker)),
            store,
            config,
        }
    }
}

/// Create the router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let build_routes = Router::new()
        .route("/travis", post(handlers::travis::receive_build))
        .route_layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth::require_build_token,
        ));

    let upload_limit = usize::try_from(
        state
            .config
            .max_kb
            .saturating_mul(handlers::kb::KB as u64)
            .saturating_add(handlers::kb::MULTIPART_OVERHEAD),
    )
    .unwrap_or(usize::MAX);

    Router::new()
        .route("/github", post(handlers::github::receive_push))
        .merge(build_routes)
        .route("/chirps", get(handlers::chirps::list_chirps))
        .route("/stats", post(handlers::stats::receive_stats))
        .route(
            "/kb/:kb",
            get(handlers::kb::download_kb)
                .post(handlers::kb::upload_kb)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/health", get(handlers::health::health_check))
        .route("/live", get(handlers::health::liveness_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .merge(chirp_observability::exporter::create_metrics_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Start the server and run until `shutdown` is triggered
pub async fn serve(
    router: Router,
    addr: &str,
    mut shutdown: ShutdownHandle,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Chirp tracker listening on {}", addr);
    tracing::info!("   Chirps:  http://{}/chirps", addr);
    tracing::info!("   Health:  http://{}/health", addr);
    tracing::info!("   Metrics: http://{}/metrics", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let signal = shutdown.wait().await;
            tracing::info!("Received {}, initiating graceful shutdown", signal);
        })
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// OpenAPI specification
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::github::receive_push,
        handlers::travis::receive_build,
        handlers::chirps::list_chirps,
        handlers::stats::receive_stats,
        handlers::kb::download_kb,
        handlers::kb::upload_kb,
        handlers::health::health_check,
        handlers::health::liveness_check,
        handlers::health::readiness_check,
    ),
    components(schemas(
        models::OkResponse,
        models::HealthResponse,
        models::ChirpsParams,
        models::ChirpResponse,
        models::ChirpsMeta,
        models::ChirpsResponse,
        models::StatsRecord,
        models::StatsRequest,
        error::ErrorResponse,
    )),
    tags(
        (name = "webhooks", description = "Push and build notification ingestion"),
        (name = "chirps", description = "Push-to-build latency reports"),
        (name = "stats", description = "Build script timing samples"),
        (name = "kb", description = "Byte throughput testing"),
        (name = "health", description = "Health checks"),
    ),
    info(
        title = "Chirp Tracker API",
        version = "0.1.0",
        description = "Correlates pushes with build results and reports the latency between them"
    )
)]
pub struct ApiDoc;
