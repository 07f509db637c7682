// Port for the biking REST API
use crate::application::error::ApiResult;
use crate::domain::bike::{Bike, Milage, NewBike, NewMilage, Summary};
use crate::domain::chart::{ChartKind, IncomingChart, YearRange};
use crate::domain::location::LocationPoint;
use crate::domain::picture::{BikingPicture, GalleryPicture};
use crate::domain::track::{Coordinate, NewTrack, Track};
use async_trait::async_trait;
use serde_json::Value;

/// Metadata of a gallery picture upload.
#[derive(Debug, Clone)]
pub struct NewGalleryPicture {
    pub taken_on: chrono::NaiveDate,
    pub description: String,
    pub file_name: String,
    pub image_data: Vec<u8>,
}

impl NewGalleryPicture {
    pub fn validate(&self) -> Result<(), String> {
        if self.description.trim().is_empty() {
            return Err("The description is required.".to_string());
        }
        if self.image_data.is_empty() {
            return Err("An image is required.".to_string());
        }
        Ok(())
    }
}

#[async_trait]
pub trait BikingApi: Send + Sync {
    async fn summary(&self) -> ApiResult<Summary>;

    async fn home(&self) -> ApiResult<Coordinate>;

    /// Fetch a chart; `range` is only sent for the history chart
    async fn chart(&self, kind: ChartKind, range: YearRange) -> ApiResult<IncomingChart>;

    /// List bikes, including decommissioned ones when `all` is set
    async fn bikes(&self, all: bool) -> ApiResult<Vec<Bike>>;

    async fn create_bike(&self, bike: &NewBike) -> ApiResult<Bike>;

    async fn create_milage(&self, bike_id: i64, milage: &NewMilage) -> ApiResult<Milage>;

    async fn tracks(&self) -> ApiResult<Vec<Track>>;

    async fn track(&self, id: &str) -> ApiResult<Track>;

    async fn upload_track(&self, track: NewTrack) -> ApiResult<Track>;

    async fn gallery_pictures(&self) -> ApiResult<Vec<GalleryPicture>>;

    async fn upload_gallery_picture(&self, picture: NewGalleryPicture) -> ApiResult<GalleryPicture>;

    async fn biking_pictures(&self) -> ApiResult<Vec<BikingPicture>>;

    /// Locations of the recent past, oldest first
    async fn locations(&self) -> ApiResult<Vec<LocationPoint>>;

    async fn location_count(&self) -> ApiResult<u64>;

    // The system and about documents are free-form JSON.
    async fn system_info(&self) -> ApiResult<Value>;

    async fn system_env(&self, name: &str) -> ApiResult<Value>;

    async fn system_metrics(&self) -> ApiResult<Value>;

    async fn about(&self) -> ApiResult<Value>;
}
