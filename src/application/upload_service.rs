// Upload service - The track and gallery picture upload forms
use crate::application::biking_api::{BikingApi, NewGalleryPicture};
use crate::application::error::{ApiError, ApiResult};
use crate::domain::picture::GalleryPicture;
use crate::domain::track::{NewTrack, Track};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const TRACK_ALREADY_EXISTS: &str = "A track with that name already exists for that day.";
pub const TRACK_REJECTED: &str = "The track file could not be read.";
pub const PICTURE_REJECTED: &str = "The picture could not be stored.";

/// Everything uploaded during this session, plus the form message.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadsView {
    pub tracks: Vec<Track>,
    pub pictures: Vec<GalleryPicture>,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct UploadService {
    api: Arc<dyn BikingApi>,
}

impl UploadService {
    pub fn new(api: Arc<dyn BikingApi>) -> Self {
        Self { api }
    }

    pub async fn upload_track(&self, view: &RwLock<UploadsView>, track: NewTrack) -> ApiResult<Track> {
        let result = match track.validate() {
            Ok(()) => self.api.upload_track(track).await,
            Err(message) => Err(ApiError::Validation(message)),
        };

        let mut view = view.write().await;
        match &result {
            Ok(created) => {
                tracing::info!("Uploaded track {} as {}", created.name, created.id);
                view.tracks.push(created.clone());
                view.message = None;
            }
            Err(e) => {
                view.message = Some(match e {
                    ApiError::Validation(message) if message.is_empty() => TRACK_REJECTED.to_string(),
                    ApiError::Validation(message) => message.clone(),
                    ApiError::Conflict(_) => TRACK_ALREADY_EXISTS.to_string(),
                    other => other.user_message(),
                });
            }
        }
        result
    }

    pub async fn upload_gallery_picture(
        &self,
        view: &RwLock<UploadsView>,
        picture: NewGalleryPicture,
    ) -> ApiResult<GalleryPicture> {
        let result = match picture.validate() {
            Ok(()) => self.api.upload_gallery_picture(picture).await,
            Err(message) => Err(ApiError::Validation(message)),
        };

        let mut view = view.write().await;
        match &result {
            Ok(created) => {
                tracing::info!("Uploaded gallery picture {}", created.id);
                view.pictures.push(created.clone());
                view.message = None;
            }
            Err(e) => {
                view.message = Some(match e {
                    ApiError::Validation(message) if message.is_empty() => PICTURE_REJECTED.to_string(),
                    ApiError::Validation(message) => message.clone(),
                    other => other.user_message(),
                });
            }
        }
        result
    }
}
