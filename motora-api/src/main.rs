use axum::{routing::{get, post, put}, Router};
use socketioxide::SocketIo;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod enums;
mod models;
mod plans;
mod routes;
mod schema;
mod services;
mod socket;

use config::AppConfig;
use motora_shared::clients::db::{create_pool, DbPool};
use plans::PlanCatalog;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub io: SocketIo,
    pub plans: PlanCatalog,
    pub metrics: metrics_exporter_prometheus::PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    motora_shared::middleware::init_tracing("motora-api");

    let config = AppConfig::load()?;
    let port = config.port;

    motora_shared::middleware::init_jwt_secret(&config.jwt_secret);

    let db = create_pool(&config.database_url, config.db_pool_size)?;
    let metrics_handle = motora_shared::middleware::init_metrics()?;

    // Build Socket.IO layer - we need io in AppState for emitting from REST routes
    let (sio_layer, io) = SocketIo::builder().build_layer();

    let state = Arc::new(AppState {
        db,
        config,
        io: io.clone(),
        plans: PlanCatalog::default(),
        metrics: metrics_handle,
    });

    io.ns("/", socket::handlers::on_connect);

    let app = Router::new()
        // Health & metrics
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(render_metrics))
        // Inquiries - public entry point
        .route("/listings/inquiry", post(routes::inquiries::submit_inquiry))
        // Inquiries - buyer side
        .route("/users/me/inquiries", get(routes::inquiries::list_user_inquiries))
        .route("/users/me/inquiries/:id/message", post(routes::inquiries::user_followup))
        .route("/users/me/inquiries/:id/archive", put(routes::inquiries::user_archive))
        .route("/users/me/inquiries/:id/read", put(routes::inquiries::user_mark_read))
        // Inquiries - dealer side
        .route("/dealers/me/inquiries", get(routes::inquiries::list_dealer_inquiries))
        .route("/dealers/me/inquiries/:id/status", put(routes::inquiries::dealer_update_status))
        .route("/dealers/me/inquiries/:id/archive", put(routes::inquiries::dealer_archive))
        .route("/dealers/me/inquiries/:id/read", put(routes::inquiries::dealer_mark_read))
        // Subscriptions & limits
        .route("/dealers/me/limits", get(routes::subscriptions::my_limits))
        .route("/admin/dealers/:id/subscription", post(routes::subscriptions::admin_upgrade_dealer))
        // Featured ranking
        .route("/listings/featured", get(routes::featured::featured_listings))
        .route("/admin/featured-listings", get(routes::featured::admin_featured_listings))
        .route("/admin/listings/:id/feature", post(routes::featured::feature_listing))
        .route("/admin/listings/:id/featured-order", put(routes::featured::reorder_listing))
        // Notifications
        .route("/notifications", get(routes::notifications::list_notifications))
        .route("/notifications/unread-count", get(routes::notifications::unread_count))
        .route("/notifications/mark-all-read", post(routes::notifications::mark_all_read))
        .route("/notifications/:id/read", post(routes::notifications::mark_read))
        .layer(sio_layer)
        .layer(axum::middleware::from_fn(motora_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "motora-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn render_metrics(
    axum::extract::State(state): axum::extract::State<Arc<AppState>>,
) -> String {
    state.metrics.render()
}
