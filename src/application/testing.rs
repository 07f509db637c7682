// In-memory stand-ins for the API and the location topic, used by the unit tests
use crate::application::biking_api::{BikingApi, NewGalleryPicture};
use crate::application::error::{ApiError, ApiResult};
use crate::application::location_feed::{LocationFeed, Subscription};
use crate::domain::bike::{Bike, Milage, NewBike, NewMilage, Summary};
use crate::domain::chart::{ChartKind, IncomingChart, YearRange};
use crate::domain::location::LocationPoint;
use crate::domain::picture::{BikingPicture, GalleryPicture, PictureRef, PictureSource};
use crate::domain::track::{Coordinate, NewTrack, Track, TrackType};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

fn fixed_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2014, 5, 1, 12, 0, 0).unwrap()
}

pub fn location(latitude: f64, longitude: f64) -> LocationPoint {
    LocationPoint::new(latitude, longitude, fixed_instant())
}

pub fn picture(id: i64) -> PictureRef {
    PictureRef {
        id,
        source: PictureSource::Biking,
        link: Some(format!("https://dailyfratze.de/{}", id)),
        taken_on: fixed_instant(),
        description: None,
    }
}

/// Bounds are (minlat, minlon, maxlat, maxlon).
pub fn track(id: &str, name: &str, bounds: Option<(f64, f64, f64, f64)>) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        covered_on: fixed_instant(),
        description: None,
        minlat: bounds.map(|b| b.0),
        minlon: bounds.map(|b| b.1),
        maxlat: bounds.map(|b| b.2),
        maxlon: bounds.map(|b| b.3),
        track_type: TrackType::Biking,
    }
}

pub fn bike(id: i64, name: &str) -> Bike {
    Bike {
        id,
        name: name.to_string(),
        color: "CCCCCC".to_string(),
        bought_on: fixed_instant(),
        decommissioned_on: None,
        milage: None,
        last_milage: None,
    }
}

#[derive(Default)]
pub struct FakeBikingApi {
    charts: Mutex<VecDeque<ApiResult<IncomingChart>>>,
    bikes: Mutex<Vec<Bike>>,
    created_bikes: AtomicUsize,
    locations: Mutex<(Vec<LocationPoint>, u64)>,
    tracks: Mutex<Vec<Track>>,
    biking_pictures: Mutex<Vec<BikingPicture>>,
    fail_pictures: AtomicBool,
    uploads: AtomicUsize,
    reject_uploads: AtomicBool,
}

impl FakeBikingApi {
    pub fn push_chart(&self, chart: ApiResult<IncomingChart>) {
        self.charts.lock().unwrap().push_back(chart);
    }

    pub fn set_bikes(&self, bikes: Vec<Bike>) {
        *self.bikes.lock().unwrap() = bikes;
    }

    pub fn created_bikes(&self) -> usize {
        self.created_bikes.load(Ordering::SeqCst)
    }

    pub fn set_locations(&self, points: Vec<LocationPoint>, count: u64) {
        *self.locations.lock().unwrap() = (points, count);
    }

    pub fn add_track(&self, track: Track) {
        self.tracks.lock().unwrap().push(track);
    }

    pub fn add_biking_picture(&self, id: i64) {
        self.biking_pictures.lock().unwrap().push(BikingPicture {
            id,
            external_id: id * 10,
            pub_date: fixed_instant(),
            link: format!("https://dailyfratze.de/{}", id),
        });
    }

    pub fn fail_pictures(&self, fail: bool) {
        self.fail_pictures.store(fail, Ordering::SeqCst);
    }

    /// Answer uploads like the API answers a file it cannot store, with an empty 400.
    pub fn reject_uploads(&self, reject: bool) {
        self.reject_uploads.store(reject, Ordering::SeqCst);
    }

    pub fn uploads(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BikingApi for FakeBikingApi {
    async fn summary(&self) -> ApiResult<Summary> {
        Ok(Summary {
            date_of_first_record: Some(fixed_instant()),
            total: Some(1000.0),
            worst_period: None,
            best_period: None,
            average: Some(100.0),
        })
    }

    async fn home(&self) -> ApiResult<Coordinate> {
        Ok(Coordinate::new(50.751449, 6.179489))
    }

    async fn chart(&self, kind: ChartKind, _range: YearRange) -> ApiResult<IncomingChart> {
        self.charts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::NotFound(kind.as_str().to_string())))
    }

    async fn bikes(&self, _all: bool) -> ApiResult<Vec<Bike>> {
        Ok(self.bikes.lock().unwrap().clone())
    }

    async fn create_bike(&self, new_bike: &NewBike) -> ApiResult<Bike> {
        let mut bikes = self.bikes.lock().unwrap();
        if bikes.iter().any(|b| b.name == new_bike.name) {
            return Err(ApiError::Conflict(String::new()));
        }
        let created = bike(bikes.len() as i64 + 1, &new_bike.name);
        bikes.push(created.clone());
        self.created_bikes.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn create_milage(&self, bike_id: i64, milage: &NewMilage) -> ApiResult<Milage> {
        if !self.bikes.lock().unwrap().iter().any(|b| b.id == bike_id) {
            return Err(ApiError::NotFound(String::new()));
        }
        Ok(Milage {
            id: 1,
            recorded_on: fixed_instant(),
            amount: milage.amount,
        })
    }

    async fn tracks(&self) -> ApiResult<Vec<Track>> {
        Ok(self.tracks.lock().unwrap().clone())
    }

    async fn track(&self, id: &str) -> ApiResult<Track> {
        self.tracks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(id.to_string()))
    }

    async fn upload_track(&self, new_track: NewTrack) -> ApiResult<Track> {
        if self.reject_uploads.load(Ordering::SeqCst) {
            return Err(ApiError::Validation(String::new()));
        }
        let mut tracks = self.tracks.lock().unwrap();
        if tracks.iter().any(|t| t.name == new_track.name) {
            return Err(ApiError::Conflict(String::new()));
        }
        let created = track(&format!("u{}", tracks.len() + 1), &new_track.name, None);
        tracks.push(created.clone());
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(created)
    }

    async fn gallery_pictures(&self) -> ApiResult<Vec<GalleryPicture>> {
        if self.fail_pictures.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("offline".to_string()));
        }
        Ok(Vec::new())
    }

    async fn upload_gallery_picture(&self, picture: NewGalleryPicture) -> ApiResult<GalleryPicture> {
        if self.reject_uploads.load(Ordering::SeqCst) {
            return Err(ApiError::Validation(String::new()));
        }
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(GalleryPicture {
            id: 1,
            taken_on: fixed_instant(),
            filename: picture.file_name,
            description: picture.description,
        })
    }

    async fn biking_pictures(&self) -> ApiResult<Vec<BikingPicture>> {
        if self.fail_pictures.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("offline".to_string()));
        }
        Ok(self.biking_pictures.lock().unwrap().clone())
    }

    async fn locations(&self) -> ApiResult<Vec<LocationPoint>> {
        Ok(self.locations.lock().unwrap().0.clone())
    }

    async fn location_count(&self) -> ApiResult<u64> {
        Ok(self.locations.lock().unwrap().1)
    }

    async fn system_info(&self) -> ApiResult<Value> {
        Ok(json!({}))
    }

    async fn system_env(&self, name: &str) -> ApiResult<Value> {
        Ok(json!({ "name": name }))
    }

    async fn system_metrics(&self) -> ApiResult<Value> {
        Ok(json!({}))
    }

    async fn about(&self) -> ApiResult<Value> {
        Ok(json!({}))
    }
}

/// Location topic backed by a channel. The test keeps the sending half.
pub struct ChannelFeed {
    receiver: Mutex<Option<mpsc::Receiver<String>>>,
    failure: Option<String>,
}

impl ChannelFeed {
    pub fn new() -> (Self, mpsc::Sender<String>) {
        let (tx, rx) = mpsc::channel(16);
        let feed = Self {
            receiver: Mutex::new(Some(rx)),
            failure: None,
        };
        (feed, tx)
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            receiver: Mutex::new(None),
            failure: Some(reason.to_string()),
        }
    }
}

#[async_trait]
impl LocationFeed for ChannelFeed {
    async fn subscribe(&self, _topic: &str) -> ApiResult<Subscription> {
        if let Some(reason) = &self.failure {
            return Err(ApiError::Transport(reason.clone()));
        }
        let receiver = self
            .receiver
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ApiError::Transport("already subscribed".to_string()))?;
        let (close, _) = oneshot::channel();
        Ok(Subscription::new(receiver, close))
    }
}
