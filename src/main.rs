// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::bike_service::BikeService;
use crate::application::carousel::PictureService;
use crate::application::chart_service::ChartService;
use crate::application::location_stream::LocationStreamService;
use crate::application::map_overlay::MapService;
use crate::application::upload_service::UploadService;
use crate::application::view_session::{CarouselSettings, ViewServices, ViewSession};
use crate::infrastructure::config::load_settings;
use crate::infrastructure::http_api::HttpBikingApi;
use crate::infrastructure::stomp_feed::StompWebSocketFeed;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let settings = load_settings()?;

    // Create adapters (infrastructure layer)
    let api = Arc::new(HttpBikingApi::new(
        settings.api_base_url(),
        settings.request_timeout(),
    )?);
    let feed = Arc::new(StompWebSocketFeed::new(settings.stream_url()));

    // Create services (application layer)
    let services = ViewServices {
        api: api.clone(),
        charts: ChartService::new(api.clone()),
        locations: LocationStreamService::new(api.clone(), feed, settings.stream.topic.clone()),
        pictures: PictureService::new(api.clone(), settings.carousel.source),
        map: MapService::new(api.clone(), settings.home()),
        bikes: BikeService::new(api.clone()),
        uploads: UploadService::new(api),
    };
    let session = Arc::new(ViewSession::new(
        services,
        CarouselSettings {
            base_url: settings.api_base_url().to_string(),
            period: settings.carousel_period(),
            max_slides: settings.carousel.max_slides,
        },
    ));
    session.enter().await;

    // Build router (presentation layer)
    // Responses are compressed by the handlers, so no CompressionLayer here
    let state = Arc::new(AppState {
        session: session.clone(),
    });
    let app = router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr = settings.server.listen;
    tracing::info!("Starting biking-live on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown_session = session.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("Shutting down");
            shutdown_session.teardown().await;
        })
        .await?;

    Ok(())
}
