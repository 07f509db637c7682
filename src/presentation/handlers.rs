// HTTP request handlers
use crate::application::biking_api::NewGalleryPicture;
use crate::application::error::{ApiError, ApiResult};
use crate::domain::bike::{NewBike, NewMilage};
use crate::domain::chart::{ChartKind, YearRange};
use crate::domain::track::{NewTrack, Track, TrackType};
use crate::infrastructure::chunked_json::stream_from_broadcast;
use crate::infrastructure::http_response::{accepts_brotli, json_response_with_status};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/views/summary", get(get_summary))
        .route("/views/charts/history/range", post(change_history_range))
        .route("/views/charts/:kind", get(get_chart))
        .route("/views/charts/:kind/refresh", post(refresh_chart))
        .route("/views/locations", get(get_locations))
        .route("/views/locations/stream", get(stream_locations))
        .route("/views/carousel", get(get_carousel))
        .route("/views/carousel/shuffle", post(shuffle_carousel))
        .route("/views/map", get(get_map))
        .route("/views/map/tracks/:id", post(show_track))
        .route("/views/bikes", get(get_bikes).post(create_bike))
        .route("/views/bikes/:id/milages", post(add_milage))
        .route("/views/tracks", get(list_tracks).post(upload_track))
        .route("/views/gallery", post(upload_gallery_picture))
        .route("/views/uploads", get(get_uploads))
        .route("/views/system/env/:name", get(system_env))
        .route("/views/system/:document", get(system_document))
        .with_state(state)
}

fn error_status(error: &ApiError) -> StatusCode {
    match error {
        ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        ApiError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

async fn respond<T: Serialize>(status: StatusCode, data: &T, headers: &HeaderMap) -> Response {
    match json_response_with_status(status, data, accepts_brotli(headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_summary(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let summary = state.session.summary.read().await.clone();
    respond(StatusCode::OK, &summary, &headers).await
}

pub async fn get_chart(
    Path(kind): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(kind) = ChartKind::parse(&kind) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let snapshot = state.session.chart(kind).read().await.snapshot();
    respond(StatusCode::OK, &snapshot, &headers).await
}

/// Fetch a chart again and merge the result into the displayed one.
pub async fn refresh_chart(
    Path(kind): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(kind) = ChartKind::parse(&kind) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let view = state.session.chart(kind);
    let status = match state.session.services().charts.refresh(&view).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Refreshing {} failed: {}", kind.as_str(), e);
            StatusCode::BAD_GATEWAY
        }
    };
    let snapshot = view.read().await.snapshot();
    respond(status, &snapshot, &headers).await
}

pub async fn change_history_range(
    Query(range): Query<YearRange>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let view = state.session.chart(ChartKind::History);
    let status = match state.session.services().charts.change_range(&view, range).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!("Loading history {:?} failed: {}", range, e);
            StatusCode::BAD_GATEWAY
        }
    };
    let snapshot = view.read().await.snapshot();
    respond(status, &snapshot, &headers).await
}

pub async fn get_locations(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.session.trail.read().await.snapshot();
    respond(StatusCode::OK, &snapshot, &headers).await
}

/// Stream locations as they are applied to the trail (progressive loading)
pub async fn stream_locations(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let rx = state.session.trail.read().await.subscribe_updates();
    stream_from_broadcast(rx, accepts_brotli(&headers))
}

pub async fn get_carousel(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.session.carousel.read().await.snapshot();
    respond(StatusCode::OK, &snapshot, &headers).await
}

pub async fn shuffle_carousel(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let snapshot = {
        let mut carousel = state.session.carousel.write().await;
        carousel.reshuffle(&mut rand::thread_rng());
        carousel.snapshot()
    };
    respond(StatusCode::OK, &snapshot, &headers).await
}

pub async fn get_map(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let scene = state.session.map.read().await.clone();
    respond(StatusCode::OK, &scene, &headers).await
}

pub async fn show_track(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let session = &state.session;
    let status = match session.services().map.show_track(&session.map, &id).await {
        Ok(_) => StatusCode::OK,
        Err(e) => error_status(&e),
    };
    let scene = session.map.read().await.clone();
    respond(status, &scene, &headers).await
}

pub async fn get_bikes(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let bikes = state.session.bikes.read().await.clone();
    respond(StatusCode::OK, &bikes, &headers).await
}

pub async fn create_bike(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(bike): Json<NewBike>,
) -> Response {
    let session = &state.session;
    match session.services().bikes.submit_bike(&session.bikes, bike).await {
        Ok(created) => respond(StatusCode::CREATED, &created, &headers).await,
        Err(e) => {
            let view = session.bikes.read().await.clone();
            respond(error_status(&e), &view, &headers).await
        }
    }
}

pub async fn add_milage(
    Path(id): Path<i64>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(milage): Json<NewMilage>,
) -> Response {
    let session = &state.session;
    match session
        .services()
        .bikes
        .record_milage(&session.bikes, id, milage)
        .await
    {
        Ok(created) => respond(StatusCode::CREATED, &created, &headers).await,
        Err(e) => {
            let view = session.bikes.read().await.clone();
            respond(error_status(&e), &view, &headers).await
        }
    }
}

/// List all tracks available for the map
pub async fn list_tracks(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    match state.session.services().api.tracks().await {
        Ok(tracks) => respond(StatusCode::OK, &tracks, &headers).await,
        Err(e) => {
            tracing::warn!("Fetching tracks failed: {}", e);
            // Error status with an empty list
            respond(error_status(&e), &Vec::<Track>::new(), &headers).await
        }
    }
}

/// Text fields and the single file part of an upload form.
#[derive(Default)]
struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<(String, Vec<u8>)>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, String> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
            let name = field.name().unwrap_or_default().to_string();
            if name == file_field {
                let file_name = field.file_name().unwrap_or(file_field).to_string();
                let data = field.bytes().await.map_err(|e| e.to_string())?;
                form.file = Some((file_name, data.to_vec()));
            } else {
                let value = field.text().await.map_err(|e| e.to_string())?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    fn required(&self, name: &str) -> Result<&str, String> {
        self.text(name).ok_or_else(|| format!("The field {} is required.", name))
    }

    fn date(&self, name: &str) -> Result<NaiveDate, String> {
        self.required(name)?
            .parse()
            .map_err(|_| format!("The field {} must be a date (yyyy-MM-dd).", name))
    }

    fn take_file(&mut self, name: &str) -> Result<(String, Vec<u8>), String> {
        self.file.take().ok_or_else(|| format!("The file {} is required.", name))
    }

    fn into_track(mut self) -> Result<NewTrack, String> {
        let track_type = match self.text("type") {
            None => TrackType::Biking,
            Some(value) => TrackType::parse(value)
                .ok_or_else(|| format!("Unknown track type {}.", value))?,
        };
        let (file_name, track_data) = self.take_file("trackData")?;
        Ok(NewTrack {
            name: self.required("name")?.to_string(),
            covered_on: self.date("coveredOn")?,
            description: self.text("description").map(str::to_string),
            track_type,
            file_name,
            track_data,
        })
    }

    fn into_gallery_picture(mut self) -> Result<NewGalleryPicture, String> {
        let (file_name, image_data) = self.take_file("imageData")?;
        Ok(NewGalleryPicture {
            taken_on: self.date("takenOn")?,
            description: self.required("description")?.to_string(),
            file_name,
            image_data,
        })
    }
}

async fn form_error(message: String, headers: &HeaderMap) -> Response {
    tracing::debug!("Rejecting upload form: {}", message);
    respond(StatusCode::BAD_REQUEST, &json!({ "message": message }), headers).await
}

pub async fn get_uploads(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let uploads = state.session.uploads.read().await.clone();
    respond(StatusCode::OK, &uploads, &headers).await
}

/// Upload a GPX or TCX file, sent in the `trackData` part.
pub async fn upload_track(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Response {
    let track = match UploadForm::read(multipart, "trackData")
        .await
        .and_then(UploadForm::into_track)
    {
        Ok(track) => track,
        Err(message) => return form_error(message, &headers).await,
    };

    let session = &state.session;
    match session.services().uploads.upload_track(&session.uploads, track).await {
        Ok(created) => respond(StatusCode::CREATED, &created, &headers).await,
        Err(e) => {
            let view = session.uploads.read().await.clone();
            respond(error_status(&e), &view, &headers).await
        }
    }
}

/// Upload a gallery picture, sent in the `imageData` part.
pub async fn upload_gallery_picture(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Response {
    let picture = match UploadForm::read(multipart, "imageData")
        .await
        .and_then(UploadForm::into_gallery_picture)
    {
        Ok(picture) => picture,
        Err(message) => return form_error(message, &headers).await,
    };

    let session = &state.session;
    match session
        .services()
        .uploads
        .upload_gallery_picture(&session.uploads, picture)
        .await
    {
        Ok(created) => respond(StatusCode::CREATED, &created, &headers).await,
        Err(e) => {
            let view = session.uploads.read().await.clone();
            respond(error_status(&e), &view, &headers).await
        }
    }
}

/// Pass through one of the free-form system documents.
pub async fn system_document(
    Path(document): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let api = &state.session.services().api;
    let result = match document.as_str() {
        "info" => api.system_info().await,
        "metrics" => api.system_metrics().await,
        "about" => api.about().await,
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    document_response(result, &headers).await
}

pub async fn system_env(
    Path(name): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let result = state.session.services().api.system_env(&name).await;
    document_response(result, &headers).await
}

async fn document_response(result: ApiResult<Value>, headers: &HeaderMap) -> Response {
    match result {
        Ok(document) => respond(StatusCode::OK, &document, headers).await,
        Err(e) => {
            tracing::warn!("Fetching system document failed: {}", e);
            respond(error_status(&e), &json!({ "message": e.user_message() }), headers).await
        }
    }
}
