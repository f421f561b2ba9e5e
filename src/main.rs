use hubcontrol_gateway::{
    AppState,
    auth_api::{AuthApiState, HttpAuthApi},
    config::{AppConfig, Env},
    create_router,
    session::{FileSessionStore, MemorySessionStore, SessionState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Entry point: configuration, logging, session store, backend client and the HTTP
/// server.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging Filter Setup
    // RUST_LOG wins; otherwise sensible defaults for local development.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hubcontrol_gateway=debug,tower_http=info".into());

    // 3. Initialize Logging based on Environment
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            // JSON output for log aggregators.
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gateway starting in {:?} mode", config.env);

    if config.backend_jwt_secret.is_none() {
        tracing::warn!("BACKEND_JWT_SECRET not set; bearer tokens are only checked by the backend");
    }

    // 4. Session Store
    // Durable when SESSION_FILE is set, otherwise memory-only.
    let sessions: SessionState = match &config.session_file {
        Some(path) => Arc::new(
            FileSessionStore::open(path)
                .await
                .expect("FATAL: Failed to open SESSION_FILE."),
        ),
        None => Arc::new(MemorySessionStore::new()),
    };

    // 5. Backend Authentication Client
    let auth_api = Arc::new(
        HttpAuthApi::new(&config.auth_api_url, config.principal_lookup_timeout)
            .expect("FATAL: Failed to build the backend HTTP client."),
    ) as AuthApiState;

    tracing::info!(auth_api_url = %config.auth_api_url, "Backend authentication API configured");

    // 6. Unified State Assembly
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(sessions, auth_api, config));

    // 7. Server Startup
    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at /swagger-ui");

    axum::serve(listener, app)
        .await
        .expect("FATAL: HTTP server terminated unexpectedly.");
}
