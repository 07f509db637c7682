// Map overlay - Track layer, home marker and viewport of the track map
use crate::application::biking_api::BikingApi;
use crate::application::error::ApiResult;
use crate::domain::track::{Coordinate, Track, TrackBounds};
use serde::Serialize;
use std::f64::consts::PI;
use std::sync::Arc;
use tokio::sync::RwLock;

const EARTH_RADIUS: f64 = 6_378_137.0;
const MAX_LATITUDE: f64 = 85.051_128_78;
/// Half the extent shown around a track whose bounding box collapsed to a line or point.
const DEGENERATE_PADDING: f64 = 250.0;

pub const DEFAULT_CENTER: Coordinate = Coordinate {
    latitude: 51.163375,
    longitude: 10.447683,
};
pub const DEFAULT_ZOOM: u8 = 6;

/// EPSG:4326 longitude/latitude to EPSG:3857 meters.
pub fn to_web_mercator(longitude: f64, latitude: f64) -> (f64, f64) {
    let latitude = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = longitude.to_radians() * EARTH_RADIUS;
    let y = (PI / 4.0 + latitude.to_radians() / 2.0).tan().ln() * EARTH_RADIUS;
    (x, y)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

/// Grows to contain every point it is extended with.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsAccumulator {
    extent: Option<Extent>,
}

impl BoundsAccumulator {
    pub fn extend(&mut self, longitude: f64, latitude: f64) {
        let (x, y) = to_web_mercator(longitude, latitude);
        self.extent = Some(match self.extent {
            None => Extent {
                left: x,
                bottom: y,
                right: x,
                top: y,
            },
            Some(e) => Extent {
                left: e.left.min(x),
                bottom: e.bottom.min(y),
                right: e.right.max(x),
                top: e.top.max(y),
            },
        });
    }

    /// The accumulated extent, padded on any axis where it has no size.
    pub fn extent(&self) -> Option<Extent> {
        self.extent.map(|mut e| {
            if e.left == e.right {
                e.left -= DEGENERATE_PADDING;
                e.right += DEGENERATE_PADDING;
            }
            if e.bottom == e.top {
                e.bottom -= DEGENERATE_PADDING;
                e.top += DEGENERATE_PADDING;
            }
            e
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Viewport {
    Center { x: f64, y: f64, zoom: u8 },
    Fit(Extent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayLayer {
    pub name: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub coordinate: Coordinate,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapScene {
    pub track_layer: Option<OverlayLayer>,
    pub bounds: Option<TrackBounds>,
    pub home: Option<Marker>,
    pub viewport: Viewport,
    pub redraws: u64,
    pub error: Option<String>,
}

impl Default for MapScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MapScene {
    pub fn new() -> Self {
        let (x, y) = to_web_mercator(DEFAULT_CENTER.longitude, DEFAULT_CENTER.latitude);
        Self {
            track_layer: None,
            bounds: None,
            home: None,
            viewport: Viewport::Center {
                x,
                y,
                zoom: DEFAULT_ZOOM,
            },
            redraws: 0,
            error: None,
        }
    }

    /// Place the home marker. Only the first call has an effect.
    pub fn set_home(&mut self, home: Coordinate) -> bool {
        if self.home.is_some() {
            tracing::debug!("Home marker already placed");
            return false;
        }
        let (x, y) = to_web_mercator(home.longitude, home.latitude);
        self.home = Some(Marker {
            coordinate: home,
            x,
            y,
        });
        self.redraws += 1;
        true
    }

    /// Draw `track` as the only track layer and fit the viewport to its bounding box.
    pub fn show_track(&mut self, track: &Track) {
        if let Some(old) = self.track_layer.take() {
            tracing::debug!("Removing track layer {}", old.name);
        }
        self.track_layer = Some(OverlayLayer {
            name: track.name.clone(),
            source: track.gpx_path(),
        });

        self.bounds = track.bounds();
        match self.bounds {
            Some(bounds) => {
                if bounds.is_degenerate() {
                    tracing::debug!("Track {} has a degenerate bounding box", track.id);
                }
                let mut accumulator = BoundsAccumulator::default();
                accumulator.extend(bounds.min_lon, bounds.min_lat);
                accumulator.extend(bounds.max_lon, bounds.max_lat);
                if let Some(extent) = accumulator.extent() {
                    self.viewport = Viewport::Fit(extent);
                }
            }
            None => tracing::warn!("Track {} has no bounding box, keeping viewport", track.id),
        }

        self.error = None;
        self.redraws += 1;
    }

    pub fn fail(&mut self, message: String) {
        self.error = Some(message);
    }
}

#[derive(Clone)]
pub struct MapService {
    api: Arc<dyn BikingApi>,
    home: Option<Coordinate>,
}

impl MapService {
    /// `home` overrides the coordinate published by the API.
    pub fn new(api: Arc<dyn BikingApi>, home: Option<Coordinate>) -> Self {
        Self { api, home }
    }

    pub async fn place_home(&self, scene: &RwLock<MapScene>) {
        let home = match self.home {
            Some(home) => Ok(home),
            None => self.api.home().await,
        };
        match home {
            Ok(home) => {
                scene.write().await.set_home(home);
            }
            Err(e) => {
                tracing::warn!("Fetching home coordinate failed: {}", e);
                scene.write().await.fail(e.user_message());
            }
        }
    }

    pub async fn show_track(&self, scene: &RwLock<MapScene>, id: &str) -> ApiResult<Track> {
        match self.api.track(id).await {
            Ok(track) => {
                scene.write().await.show_track(&track);
                Ok(track)
            }
            Err(e) => {
                tracing::warn!("Fetching track {} failed: {}", id, e);
                scene.write().await.fail(e.user_message());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::error::ApiError;
    use crate::application::testing::{FakeBikingApi, track};

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 0.01, "{} != {}", actual, expected);
    }

    #[test]
    fn test_web_mercator() {
        let (x, y) = to_web_mercator(0.0, 0.0);
        assert_close(x, 0.0);
        assert_close(y, 0.0);

        let (x, y) = to_web_mercator(180.0, 85.051_128_78);
        assert_close(x, 20_037_508.34);
        assert_close(y, 20_037_508.34);

        let (_, clamped) = to_web_mercator(0.0, 90.0);
        assert!(clamped.is_finite());
    }

    #[test]
    fn test_show_track_fits_both_corners() {
        let mut scene = MapScene::new();
        let t = track("a1", "Aachen", Some((50.7, 5.9, 50.8, 6.1)));

        scene.show_track(&t);

        let (left, bottom) = to_web_mercator(5.9, 50.7);
        let (right, top) = to_web_mercator(6.1, 50.8);
        assert_eq!(
            scene.viewport,
            Viewport::Fit(Extent {
                left,
                bottom,
                right,
                top
            })
        );
        assert_eq!(scene.track_layer.as_ref().unwrap().source, "/tracks/a1.gpx");
        assert_eq!(scene.redraws, 1);
    }

    #[test]
    fn test_only_one_track_layer() {
        let mut scene = MapScene::new();

        scene.show_track(&track("a1", "Aachen", Some((50.7, 5.9, 50.8, 6.1))));
        scene.show_track(&track("a1", "Aachen", Some((50.7, 5.9, 50.8, 6.1))));
        scene.show_track(&track("b2", "Eifel", Some((50.3, 6.2, 50.5, 6.6))));

        let layer = scene.track_layer.unwrap();
        assert_eq!(layer.name, "Eifel");
        assert_eq!(layer.source, "/tracks/b2.gpx");
    }

    #[test]
    fn test_degenerate_bounds_are_padded() {
        let mut scene = MapScene::new();

        scene.show_track(&track("p", "Point", Some((50.0, 6.0, 50.0, 6.0))));

        match scene.viewport {
            Viewport::Fit(extent) => {
                assert_close(extent.right - extent.left, 2.0 * DEGENERATE_PADDING);
                assert_close(extent.top - extent.bottom, 2.0 * DEGENERATE_PADDING);
            }
            other => panic!("unexpected viewport {:?}", other),
        }
    }

    #[test]
    fn test_track_without_bounds_keeps_viewport() {
        let mut scene = MapScene::new();
        let before = scene.viewport.clone();

        scene.show_track(&track("n", "No bounds", None));

        assert_eq!(scene.viewport, before);
        assert!(scene.track_layer.is_some());
    }

    #[test]
    fn test_home_marker_is_placed_once() {
        let mut scene = MapScene::new();

        assert!(scene.set_home(Coordinate::new(50.75, 6.18)));
        assert!(!scene.set_home(Coordinate::new(0.0, 0.0)));

        assert_eq!(scene.home.unwrap().coordinate, Coordinate::new(50.75, 6.18));
    }

    #[tokio::test]
    async fn test_service_surfaces_missing_track() {
        let api = Arc::new(FakeBikingApi::default());
        let service = MapService::new(api, Some(Coordinate::new(50.75, 6.18)));
        let scene = RwLock::new(MapScene::new());

        service.place_home(&scene).await;
        let result = service.show_track(&scene, "zz").await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
        let scene = scene.read().await;
        assert!(scene.home.is_some());
        assert!(scene.track_layer.is_none());
        assert!(scene.error.is_some());
    }
}
