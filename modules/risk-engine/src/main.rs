use axum::routing::get;
use axum::Router;
use event_bus::{EventBus, InMemoryBus, NatsBus};
use health::HealthState;
use risk_engine_rs::{
    config::Config,
    consumer,
    db,
    health::{health_simple, DatabaseCheck},
    http, velocity::VelocityCounters,
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting risk-engine service...");

    let config = Arc::new(Config::from_env().expect("Failed to load configuration from environment"));

    tracing::info!(
        "Configuration loaded: host={}, port={}, bus_type={}, review_threshold_cents={}",
        config.host,
        config.port,
        config.bus_type,
        config.review_threshold_cents
    );

    tracing::info!("Connecting to database...");
    let pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Running migrations...");
    sqlx::migrate!("./db/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let bus: Arc<dyn EventBus> = match config.bus_type.to_lowercase().as_str() {
        "inmemory" => {
            tracing::info!("Using InMemory event bus");
            Arc::new(InMemoryBus::new())
        }
        "nats" => {
            tracing::info!("Connecting to NATS at {}", config.nats_url);
            let client = async_nats::connect(&config.nats_url)
                .await
                .expect("Failed to connect to NATS");
            Arc::new(NatsBus::new(client))
        }
        other => panic!("Invalid BUS_TYPE: {other}. Must be 'inmemory' or 'nats'"),
    };

    let counters = VelocityCounters::new();

    tokio::spawn(outbox::run_publisher(
        pool.clone(),
        bus.clone(),
        outbox::OutboxConfig::default(),
    ));

    consumer::request_consumer::start(bus.clone(), pool.clone(), counters.clone(), config.clone()).await;
    consumer::failure_tracker::start(bus.clone(), counters).await;

    let health_state = HealthState::new(
        "risk-engine-rs",
        vec![Box::new(DatabaseCheck { pool: pool.clone() })],
    );

    let state = AppState { pool };

    let app = Router::new()
        .route("/api/health", get(health_simple))
        .route("/health/live", get(health::health_live))
        .route("/health/ready", get(health::health_ready))
        .with_state(health_state)
        .merge(http::routes::router(state))
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("risk-engine service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed to start");
}
