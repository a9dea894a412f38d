//! # Interview Monitor Backend - Main Application Entry Point
//!
//! HTTP + WebSocket server for live interview monitoring. Browsers POST
//! captured frames and audio blobs to the analysis endpoints; derived scores
//! flow back to observers through room-based WebSocket relays.
//!
//! ## Application Architecture:
//! - **config**: Configuration (TOML files + environment variables)
//! - **state**: Shared request state and metrics
//! - **detector**: Contracts for the external face/emotion/voice backends
//! - **analysis**: Pure scoring math (gaze, stability, emotion, vocal)
//! - **session**: Per-session state and the TTL-swept session store
//! - **relay**: Room membership and message fan-out
//! - **service**: The long-lived engine object tying the above together
//! - **signaling**: The WebSocket actor speaking the room protocol
//! - **handlers**: HTTP request handlers
//! - **middleware**: Request logging and metrics collection
//! - **error**: Error types and their HTTP responses

mod analysis;
mod config;
mod detector;
mod error;
mod handlers;
mod health;
mod middleware;
mod relay;
mod service;
mod session;
mod signaling;
mod state;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use anyhow::Result;
use config::AppConfig;
use service::MonitorService;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Global shutdown flag, set by the signal handler task.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!(
        "Starting interview-monitor-backend v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "Configuration loaded: {}:{}",
        config.server.host, config.server.port
    );

    let app_state = AppState::new(config.clone());
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    // Detector backends are registered here once an implementation crate is
    // linked in; without one the analysis endpoints answer 503 while the
    // relay and session surfaces stay fully functional.
    let service = Arc::new(MonitorService::new(Duration::from_millis(
        config.detector.timeout_ms,
    )));
    service.start_sweeper(
        Duration::from_secs(config.session.ttl_secs),
        Duration::from_secs(config.session.sweep_interval_secs),
    );
    let service_data = web::Data::from(Arc::clone(&service));

    setup_signal_handlers();

    info!("Starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(service_data.clone())
            .wrap(cors)
            .wrap(middleware::MetricsMiddleware)
            .wrap(middleware::RequestLogging)
            .service(
                web::scope("/api/v1")
                    .route("/analyze", web::post().to(handlers::analyze_frame))
                    .route("/analyze_audio", web::post().to(handlers::analyze_audio))
                    .route("/end_session", web::post().to(handlers::end_session))
                    .route("/status", web::get().to(handlers::status))
                    .route("/health", web::get().to(health::health_check))
                    .route("/metrics", web::get().to(health::detailed_metrics))
                    .route("/config", web::get().to(handlers::get_config))
                    .route("/config", web::put().to(handlers::update_config))
                    .route("/debug/latest", web::get().to(handlers::latest_result))
                    .route("/debug/sessions", web::get().to(handlers::sessions_overview)),
            )
            .route("/ws/signaling", web::get().to(signaling::signaling_websocket))
            // Root-level health check for load balancers.
            .route("/health", web::get().to(health::health_check))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("Server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("Server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    service.close();
    info!("Server stopped gracefully");
    Ok(())
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interview_monitor_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Listen for SIGTERM/SIGINT and flip the shutdown flag.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
