//! MasterForge API Gateway
//!
//! HTTP front end for masterfile generation.
//! Handles:
//! - Author search and query preview
//! - Single and batch masterfile generation
//! - Rate limiting, timeouts and concurrency limits
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    error_handling::HandleErrorLayer,
    http::StatusCode,
    routing::{get, post},
    BoxError, Router,
};
use masterforge_common::{
    config::{AppConfig, ObservabilityConfig},
    dblp::AuthorSearch,
    metrics, QueryExecutor, SparqlClient,
};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub executor: Arc<dyn QueryExecutor>,
    pub search: Arc<AuthorSearch>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);

    // Initialize tracing
    init_tracing(&config.observability);

    info!(
        service = %config.observability.service_name,
        "Starting MasterForge API Gateway v{}",
        masterforge_common::VERSION
    );

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        prometheus_builder(metrics_addr)?.install()?;
        info!(%metrics_addr, "Prometheus exporter listening");
    }
    metrics::register_metrics();

    // dblp clients
    let executor: Arc<dyn QueryExecutor> = Arc::new(SparqlClient::from_config(&config.dblp)?);
    let search = Arc::new(AuthorSearch::from_config(&config.dblp)?);
    info!(endpoint = %config.dblp.sparql_endpoint, "dblp client ready");

    // Create app state
    let state = AppState {
        config: config.clone(),
        executor,
        search,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Prometheus exporter with wide latency buckets for dblp queries
fn prometheus_builder(addr: SocketAddr) -> Result<PrometheusBuilder, BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(format!("{}_query_duration_seconds", metrics::METRICS_PREFIX)),
            metrics::QUERY_BUCKETS,
        )
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Timeout and concurrency limit
    let limits = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_service_error))
        .timeout(state.config.request_timeout())
        .concurrency_limit(state.config.server.max_concurrent_requests.max(1));

    // API routes
    let mut api_routes = Router::new()
        .route("/authors", get(handlers::authors::search_authors))
        .route("/query", post(handlers::query::build_query))
        .route("/masterfiles", post(handlers::masterfiles::generate_masterfile))
        .route("/masterfiles/batch", post(handlers::masterfiles::generate_batch));

    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        api_routes = api_routes.layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    // Compose the app
    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/v1", api_routes)
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests))
        .layer(limits)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

async fn handle_service_error(error: BoxError) -> (StatusCode, String) {
    if error.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unhandled internal error: {}", error),
        )
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use masterforge_common::dblp::{Binding, RawRow};

    pub fn row(pub_id: &str, year: &str, names: &str, ids: &str) -> RawRow {
        [
            ("pub", Binding::uri(pub_id)),
            ("title", Binding::literal("A Paper")),
            ("year", Binding::literal(year)),
            ("type", Binding::uri("https://dblp.org/rdf/schema#Article")),
            ("coauthors", Binding::literal(names)),
            ("coIds", Binding::literal(ids)),
            ("avgInSet", Binding::literal("1")),
            ("avgGlobal", Binding::literal("3")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    pub fn state(executor: impl QueryExecutor + 'static) -> AppState {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = false;
        config.server.max_batch_items = 3;
        config.batch.requests_per_second = 0;
        AppState {
            search: Arc::new(AuthorSearch::from_config(&config.dblp).unwrap()),
            config: Arc::new(config),
            executor: Arc::new(executor),
        }
    }

    pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
