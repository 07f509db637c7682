// Track domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    #[default]
    Biking,
    Running,
}

impl TrackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackType::Biking => "biking",
            TrackType::Running => "running",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        [TrackType::Biking, TrackType::Running]
            .into_iter()
            .find(|t| t.as_str() == value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Base-36 id as handed out by the API.
    pub id: String,
    pub name: String,
    #[serde(with = "super::timestamp")]
    pub covered_on: DateTime<Utc>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub minlat: Option<f64>,
    #[serde(default)]
    pub minlon: Option<f64>,
    #[serde(default)]
    pub maxlat: Option<f64>,
    #[serde(default)]
    pub maxlon: Option<f64>,
    #[serde(default, rename = "type")]
    pub track_type: TrackType,
}

impl Track {
    /// Bounding box of the track, if the API computed one.
    pub fn bounds(&self) -> Option<TrackBounds> {
        Some(TrackBounds {
            min_lat: self.minlat?,
            min_lon: self.minlon?,
            max_lat: self.maxlat?,
            max_lon: self.maxlon?,
        })
    }

    pub fn gpx_path(&self) -> String {
        format!("/tracks/{}.gpx", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackBounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl TrackBounds {
    pub fn is_degenerate(&self) -> bool {
        self.min_lat == self.max_lat || self.min_lon == self.max_lon
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Metadata sent along with a GPX or TCX upload.
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub name: String,
    pub covered_on: chrono::NaiveDate,
    pub description: Option<String>,
    pub track_type: TrackType,
    pub file_name: String,
    pub track_data: Vec<u8>,
}

impl NewTrack {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("The name is required.".to_string());
        }
        if self.name.chars().count() > 512 {
            return Err("The name must not exceed 512 characters.".to_string());
        }
        if self.track_data.is_empty() {
            return Err("A GPX or TCX file is required.".to_string());
        }
        Ok(())
    }
}
