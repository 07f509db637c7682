// Biking REST API client
use crate::application::biking_api::{BikingApi, NewGalleryPicture};
use crate::application::error::{ApiError, ApiResult};
use crate::domain::bike::{Bike, Milage, NewBike, NewMilage, Summary};
use crate::domain::chart::{ChartKind, IncomingChart, YearRange};
use crate::domain::location::LocationPoint;
use crate::domain::picture::{BikingPicture, GalleryPicture};
use crate::domain::track::{Coordinate, NewTrack, Track};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpBikingApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBikingApi {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        self.execute(self.client.get(self.url(path))).await
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("Biking API answered {}: {}", status, body);
            return Err(ApiError::from_status(status.as_u16(), body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| ApiError::Schema(e.to_string()))
    }
}

#[async_trait]
impl BikingApi for HttpBikingApi {
    async fn summary(&self) -> ApiResult<Summary> {
        self.get("summary").await
    }

    async fn home(&self) -> ApiResult<Coordinate> {
        self.get("home").await
    }

    async fn chart(&self, kind: ChartKind, range: YearRange) -> ApiResult<IncomingChart> {
        let mut request = self.client.get(self.url(&format!("charts/{}", kind.as_str())));
        if kind == ChartKind::History {
            let mut query = Vec::new();
            if let Some(start) = range.start {
                query.push(("start", start));
            }
            if let Some(end) = range.end {
                query.push(("end", end));
            }
            request = request.query(&query);
        }
        self.execute(request).await
    }

    async fn bikes(&self, all: bool) -> ApiResult<Vec<Bike>> {
        let mut request = self.client.get(self.url("bikes"));
        if all {
            request = request.query(&[("all", "true")]);
        }
        self.execute(request).await
    }

    async fn create_bike(&self, bike: &NewBike) -> ApiResult<Bike> {
        self.execute(self.client.post(self.url("bikes")).json(bike)).await
    }

    async fn create_milage(&self, bike_id: i64, milage: &NewMilage) -> ApiResult<Milage> {
        let url = self.url(&format!("bikes/{}/milages", bike_id));
        self.execute(self.client.post(url).json(milage)).await
    }

    async fn tracks(&self) -> ApiResult<Vec<Track>> {
        self.get("tracks").await
    }

    async fn track(&self, id: &str) -> ApiResult<Track> {
        self.get(&format!("tracks/{}", urlencoding::encode(id))).await
    }

    async fn upload_track(&self, track: NewTrack) -> ApiResult<Track> {
        let mut form = Form::new()
            .text("name", track.name)
            .text("coveredOn", track.covered_on.to_string())
            .text("type", track.track_type.as_str());
        if let Some(description) = track.description {
            form = form.text("description", description);
        }
        let form = form.part("trackData", Part::bytes(track.track_data).file_name(track.file_name));

        self.execute(self.client.post(self.url("tracks")).multipart(form))
            .await
    }

    async fn gallery_pictures(&self) -> ApiResult<Vec<GalleryPicture>> {
        self.get("galleryPictures").await
    }

    async fn upload_gallery_picture(&self, picture: NewGalleryPicture) -> ApiResult<GalleryPicture> {
        let form = Form::new()
            .text("takenOn", picture.taken_on.to_string())
            .text("description", picture.description)
            .part(
                "imageData",
                Part::bytes(picture.image_data).file_name(picture.file_name),
            );

        self.execute(self.client.post(self.url("galleryPictures")).multipart(form))
            .await
    }

    async fn biking_pictures(&self) -> ApiResult<Vec<BikingPicture>> {
        self.get("bikingPictures").await
    }

    async fn locations(&self) -> ApiResult<Vec<LocationPoint>> {
        self.get("locations").await
    }

    async fn location_count(&self) -> ApiResult<u64> {
        self.get("locations/count").await
    }

    async fn system_info(&self) -> ApiResult<Value> {
        self.get("system/info").await
    }

    async fn system_env(&self, name: &str) -> ApiResult<Value> {
        self.get(&format!("system/env/{}", urlencoding::encode(name)))
            .await
    }

    async fn system_metrics(&self) -> ApiResult<Value> {
        self.get("system/metrics").await
    }

    async fn about(&self) -> ApiResult<Value> {
        self.get("about").await
    }
}
