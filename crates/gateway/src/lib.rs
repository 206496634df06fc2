//! Foodgram API Gateway
//!
//! The HTTP surface for all external API requests.
//! Handles:
//! - Authentication
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics, tracing)

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod pagination;
pub mod views;

use axum::{
    extract::{DefaultBodyLimit, FromRef, Request},
    middleware::{from_fn, Next},
    routing::get,
    Router,
};
use foodgram_common::{
    auth::JwtManager, config::AppConfig, db::DbPool, media::ImageStore, Repository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Room for the JSON envelope around a base64 image
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
    pub images: Arc<dyn ImageStore>,
    /// Present when the Prometheus recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn repo(&self) -> Repository {
        Repository::new(self.db.clone())
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Base64 inflates images by a third
    let body_limit = config.media.max_image_bytes / 3 * 4 + BODY_OVERHEAD_BYTES;

    let mut app = Router::new()
        .nest("/api", handlers::api_routes())
        .route("/s/{short_link}", get(handlers::recipes::follow_short_link))
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .route("/metrics", get(handlers::health::metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(middleware::track_metrics));

    if config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );
        app = app.layer(from_fn(move |request: Request, next: Next| {
            middleware::rate_limit::rate_limit_middleware(request, next, limiter.clone())
        }));
    }

    app.layer(TimeoutLayer::new(config.request_timeout()))
        .layer(GlobalConcurrencyLimitLayer::new(config.server.max_concurrent_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}
