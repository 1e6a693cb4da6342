//! RideWithMeru backend entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Connect to Redis
//! 3. Build router with API routes
//! 4. Apply CORS + security headers middleware
//! 5. Start Axum server

use axum::http::{header, HeaderValue, Method};
use meru::{
    auth::middleware::AppState, config::Config, middleware::security_headers, routes,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Cross-origin policy from the configured allow-list.
///
/// The session cookie has to cross origins (the frontend is deployed
/// separately), so allowed origins get credentials; an empty list rejects
/// all cross-origin requests.
fn cors_layer(config: &Config) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        // CorsLayer::new() with no allowed origins rejects all CORS preflight requests
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .map(|o| o.parse().expect("Invalid origin in ALLOWED_ORIGINS"))
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting meru backend on {}", config.bind_addr);

    // Connect to Redis
    let redis_client = redis::Client::open(config.redis_url.as_str()).expect("Invalid Redis URL");

    // Verify Redis connection
    let mut con = redis_client
        .get_multiplexed_async_connection()
        .await
        .expect("Failed to connect to Redis");
    let _: () = redis::cmd("PING")
        .query_async(&mut con)
        .await
        .expect("Redis PING failed");
    tracing::info!("Redis connected");

    // Build shared state
    let cors = cors_layer(&config);
    let state = AppState {
        redis: redis_client,
        config: Arc::new(config.clone()),
    };

    let app = routes::api_router()
        .layer(cors)
        .layer(axum::middleware::from_fn(security_headers))
        .with_state(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    // Start server (with_connect_info required for ConnectInfo<SocketAddr> extractors)
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
