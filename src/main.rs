use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use authgate::auth::handlers::configure_routes;
use authgate::{health_check, AppError, AppState, Settings};
use dotenv::dotenv;
use std::net::TcpListener;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> authgate::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    // Load configuration
    let config = Settings::new()?;
    info!("Configuration loaded successfully");

    // Initialize application state
    let state = AppState::new(config.clone()).await?;
    let state = web::Data::new(state);

    // Sweep expired sessions; stores already ignore them, this only reclaims space
    let sweep_store = state.session_store.clone();
    let purge_interval = Duration::from_secs(config.session_store.purge_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_interval);
        loop {
            interval.tick().await;
            match sweep_store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!("Purged {} expired sessions", purged),
                Err(e) => error!("Failed to purge expired sessions: {}", e),
            }
        }
    });

    // Create and bind TCP listener
    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))?;
    info!("Starting server at {}:{}", config.server.host, config.server.port);

    let server_state = state.clone();
    let cors_config = config.cors.clone();
    HttpServer::new(move || {
        let cors = if cors_config.enabled {
            Cors::default()
                .allowed_origin(&cors_config.allowed_origin)
                .allowed_methods(vec!["GET", "POST"])
                .allowed_headers(vec!["Authorization", "Content-Type"])
                .supports_credentials()
                .max_age(cors_config.max_age as usize)
        } else {
            // CORS disabled - use most restrictive settings
            Cors::default()
        };

        App::new()
            .wrap(cors)
            .app_data(server_state.clone())
            .route("/health", web::get().to(health_check))
            .configure(configure_routes)
    })
    .listen(listener)?
    .workers(config.server.workers as usize)
    .run()
    .await
    .map_err(|e| AppError::InternalError(e.to_string()))?;

    state.shutdown().await?;
    info!("Server stopped");

    Ok(())
}
