// Picture carousel - Shuffled pictures rotated by a fixed period timer
use crate::application::biking_api::BikingApi;
use crate::application::error::ApiResult;
use crate::domain::picture::PictureRef;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Uniformly shuffled copy of `items`.
pub fn randomize<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub index: usize,
    pub picture: PictureRef,
    pub image_url: String,
    pub link: String,
}

#[derive(Debug)]
pub struct Carousel {
    base_url: String,
    max_slides: usize,
    pictures: Vec<PictureRef>,
    length: usize,
    count: usize,
    current: Option<Slide>,
    last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselSnapshot {
    pub current: Option<Slide>,
    pub slides: Vec<PictureRef>,
    pub count: usize,
    pub error: Option<String>,
}

impl Carousel {
    pub fn new(base_url: String, max_slides: usize) -> Self {
        Self {
            base_url,
            max_slides,
            pictures: Vec::new(),
            length: 0,
            count: 0,
            current: None,
            last_error: None,
        }
    }

    /// Replace the pictures with a fresh permutation and restart the rotation.
    pub fn load<R: Rng + ?Sized>(&mut self, pictures: Vec<PictureRef>, rng: &mut R) {
        self.pictures = randomize(&pictures, rng);
        self.length = self.pictures.len();
        self.count = 0;
        self.current = None;
        self.last_error = None;
    }

    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let pictures = std::mem::take(&mut self.pictures);
        self.load(pictures, rng);
    }

    pub fn fail(&mut self, message: String) {
        self.last_error = Some(message);
    }

    /// Advance to the next picture, wrapping at the end of the permutation.
    pub fn tick(&mut self) -> Option<&Slide> {
        if self.length == 0 {
            return None;
        }
        let index = self.count % self.length;
        self.count = self.count.wrapping_add(1);

        let picture = self.pictures[index].clone();
        self.current = Some(Slide {
            index,
            image_url: picture.image_url(&self.base_url),
            link: picture.target_link(&self.base_url),
            picture,
        });
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&Slide> {
        self.current.as_ref()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn pictures(&self) -> &[PictureRef] {
        &self.pictures
    }

    /// The first few pictures of the current permutation.
    pub fn slides(&self) -> &[PictureRef] {
        &self.pictures[..self.pictures.len().min(self.max_slides)]
    }

    pub fn snapshot(&self) -> CarouselSnapshot {
        CarouselSnapshot {
            current: self.current.clone(),
            slides: self.slides().to_vec(),
            count: self.count,
            error: self.last_error.clone(),
        }
    }
}

/// Recurring tick of a carousel. Cancelled by `cancel` or when dropped.
#[derive(Debug)]
pub struct CarouselTimer {
    task: Option<JoinHandle<()>>,
}

impl CarouselTimer {
    pub fn start(carousel: Arc<RwLock<Carousel>>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                let mut guard = carousel.write().await;
                if let Some(slide) = guard.tick() {
                    tracing::debug!("Carousel shows picture {}", slide.picture.id);
                }
            }
        });
        Self { task: Some(task) }
    }

    pub fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Carousel timer cancelled");
        }
    }
}

impl Drop for CarouselTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PictureSelection {
    #[default]
    Biking,
    Gallery,
    Both,
}

#[derive(Clone)]
pub struct PictureService {
    api: Arc<dyn BikingApi>,
    selection: PictureSelection,
}

impl PictureService {
    pub fn new(api: Arc<dyn BikingApi>, selection: PictureSelection) -> Self {
        Self { api, selection }
    }

    pub async fn load_pictures(&self) -> ApiResult<Vec<PictureRef>> {
        let mut pictures: Vec<PictureRef> = Vec::new();
        if matches!(self.selection, PictureSelection::Biking | PictureSelection::Both) {
            pictures.extend(self.api.biking_pictures().await?.into_iter().map(PictureRef::from));
        }
        if matches!(self.selection, PictureSelection::Gallery | PictureSelection::Both) {
            pictures.extend(self.api.gallery_pictures().await?.into_iter().map(PictureRef::from));
        }
        Ok(pictures)
    }

    /// Fetch the pictures and hand them to the carousel, or surface the failure on it.
    pub async fn fill(&self, carousel: &RwLock<Carousel>) {
        let result = self.load_pictures().await;
        let mut carousel = carousel.write().await;
        match result {
            Ok(pictures) => {
                tracing::info!("Loaded {} pictures into the carousel", pictures.len());
                carousel.load(pictures, &mut rand::thread_rng());
            }
            Err(e) => {
                tracing::warn!("Fetching pictures failed: {}", e);
                carousel.fail(e.user_message());
            }
        }
    }
}
