use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    response::Json,
    routing::get,
    serve, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use abportal_database::{
    create_mongo_client, ensure_indexes, get_database, CampaignRepository, CourseRepository,
    LeadRepository, MongoClient, PaymentRepository, ProfileRepository, PromotionRepository,
    QuotationRepository, ResourceRepository, TrackRepository,
};
use abportal_utils::{init_logging, AppConfig};

mod clients;
mod handlers;
mod mailer;
mod middleware;
mod routes;

use clients::{PlaylistClient, StorageClient};
use mailer::Mailer;
use middleware::{metrics_middleware, request_id_middleware};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load().unwrap_or_else(|_| {
        eprintln!("Failed to load configuration, using defaults");
        AppConfig::default()
    });

    // Initialize logging
    init_logging(&config.logging)?;
    info!("Starting AB Partner Portal API");

    // Connect MongoDB and prepare collections
    let timeout = std::time::Duration::from_secs(config.database.connection_timeout_seconds);
    let mongo_client = create_mongo_client(&config.database.mongodb_url, timeout).await?;
    let database = get_database(&mongo_client, &config.database.database_name);
    ensure_indexes(&database).await?;
    info!("Database connection established");

    let repos = Arc::new(Repositories {
        profiles: ProfileRepository::new(&database),
        leads: LeadRepository::new(&database),
        quotations: QuotationRepository::new(&database),
        payments: PaymentRepository::new(&database),
        promotions: PromotionRepository::new(&database),
        courses: CourseRepository::new(&database),
        resources: ResourceRepository::new(&database),
        campaigns: CampaignRepository::new(&database),
        tracks: TrackRepository::new(&database),
    });

    let mailer = Arc::new(Mailer::new(&config.email)?);
    let storage = Arc::new(StorageClient::new(&config.storage)?);
    let playlist = Arc::new(PlaylistClient::new(&config.playlist)?);
    let http_requests = register_request_counter(&config)?;

    let state = AppState {
        config: config.clone(),
        mongo_client,
        repos,
        mailer,
        storage,
        playlist,
        http_requests,
    };

    // Build application router
    let app = create_app(state, &config);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = TcpListener::bind(&addr).await?;
    info!("Portal API listening on {}", addr);

    serve(listener, app).await?;

    Ok(())
}

fn create_app(state: AppState, config: &AppConfig) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        // API routes
        .nest("/api/v1", routes::create_api_routes(state.clone()))
        // Middleware stack
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                        .allow_headers(Any),
                )
                .layer(DefaultBodyLimit::max(config.server.max_request_size))
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                )),
        )
        // Application state
        .with_state(state)
}

fn register_request_counter(config: &AppConfig) -> Result<prometheus::IntCounterVec> {
    let opts = prometheus::Opts::new("http_requests_total", "HTTP requests processed")
        .namespace(config.monitoring.prometheus_namespace.clone());
    let counter = prometheus::IntCounterVec::new(opts, &["method", "path", "status"])?;
    prometheus::default_registry().register(Box::new(counter.clone()))?;
    Ok(counter)
}

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub mongo_client: MongoClient,
    pub repos: Arc<Repositories>,
    pub mailer: Arc<Mailer>,
    pub storage: Arc<StorageClient>,
    pub playlist: Arc<PlaylistClient>,
    pub http_requests: prometheus::IntCounterVec,
}

pub struct Repositories {
    pub profiles: ProfileRepository,
    pub leads: LeadRepository,
    pub quotations: QuotationRepository,
    pub payments: PaymentRepository,
    pub promotions: PromotionRepository,
    pub courses: CourseRepository,
    pub resources: ResourceRepository,
    pub campaigns: CampaignRepository,
    pub tracks: TrackRepository,
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": "abportal-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_handler() -> String {
    use prometheus::TextEncoder;

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_else(|_| "Error encoding metrics".to_string())
}
