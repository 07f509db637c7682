// Picture domain models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PictureSource {
    Biking,
    Gallery,
}

/// A picture reference as shown in the carousel, regardless of where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureRef {
    pub id: i64,
    pub source: PictureSource,
    pub link: Option<String>,
    #[serde(with = "super::timestamp")]
    pub taken_on: DateTime<Utc>,
    pub description: Option<String>,
}

impl PictureRef {
    /// URL of the image itself, served by the biking API.
    pub fn image_url(&self, base_url: &str) -> String {
        let collection = match self.source {
            PictureSource::Biking => "bikingPictures",
            PictureSource::Gallery => "galleryPictures",
        };
        format!("{}/api/{}/{}.jpg", base_url.trim_end_matches('/'), collection, self.id)
    }

    /// Where a click on the picture leads: the external page if known, the image otherwise.
    pub fn target_link(&self, base_url: &str) -> String {
        self.link.clone().unwrap_or_else(|| self.image_url(base_url))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikingPicture {
    pub id: i64,
    pub external_id: i64,
    #[serde(with = "super::timestamp")]
    pub pub_date: DateTime<Utc>,
    pub link: String,
}

impl From<BikingPicture> for PictureRef {
    fn from(picture: BikingPicture) -> Self {
        Self {
            id: picture.id,
            source: PictureSource::Biking,
            link: Some(picture.link),
            taken_on: picture.pub_date,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPicture {
    pub id: i64,
    #[serde(with = "super::timestamp")]
    pub taken_on: DateTime<Utc>,
    pub filename: String,
    pub description: String,
}

impl From<GalleryPicture> for PictureRef {
    fn from(picture: GalleryPicture) -> Self {
        Self {
            id: picture.id,
            source: PictureSource::Gallery,
            link: None,
            taken_on: picture.taken_on,
            description: Some(picture.description),
        }
    }
}
