use crate::application::carousel::PictureSelection;
use crate::domain::track::Coordinate;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub stream: StreamSettings,
    pub carousel: CarouselConfig,
    #[serde(default)]
    pub home: Option<HomeSettings>,
    pub server: ServerSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamSettings {
    pub path: String,
    pub topic: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CarouselConfig {
    pub interval_ms: u64,
    pub max_slides: usize,
    pub source: PictureSelection,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HomeSettings {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub listen: SocketAddr,
}

impl Settings {
    pub fn api_base_url(&self) -> &str {
        self.api.base_url.trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn carousel_period(&self) -> Duration {
        Duration::from_millis(self.carousel.interval_ms)
    }

    pub fn home(&self) -> Option<Coordinate> {
        self.home
            .as_ref()
            .map(|h| Coordinate::new(h.latitude, h.longitude))
    }

    /// WebSocket URL of the location topic endpoint, derived from the API base URL.
    pub fn stream_url(&self) -> String {
        let base = self.api_base_url();
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/{}", ws_base, self.stream.path.trim_start_matches('/'))
    }
}

fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
    config::Config::builder()
        .set_default("api.base_url", "http://localhost:8080")?
        .set_default("api.timeout_secs", 10)?
        .set_default("stream.path", "/api/ws/websocket")?
        .set_default("stream.topic", "/topic/currentLocation")?
        .set_default("carousel.interval_ms", 5000)?
        .set_default("carousel.max_slides", 15)?
        .set_default("carousel.source", "biking")?
        .set_default("server.listen", "0.0.0.0:8090")
}

/// Load `config/biking.toml` (optional) overlaid with `BIKING__SECTION__KEY` variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = builder()?
        .add_source(config::File::with_name("config/biking").required(false))
        .add_source(config::Environment::with_prefix("BIKING").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
