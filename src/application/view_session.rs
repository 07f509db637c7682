// View session - Entry and teardown of every live view
use crate::application::bike_service::{BikeService, BikesView};
use crate::application::biking_api::BikingApi;
use crate::application::carousel::{Carousel, CarouselTimer, PictureService};
use crate::application::chart_service::{ChartService, ChartView};
use crate::application::location_stream::{
    LocationStreamHandle, LocationStreamService, LocationTrail,
};
use crate::application::map_overlay::{MapScene, MapService};
use crate::application::upload_service::{UploadService, UploadsView};
use crate::domain::bike::Summary;
use crate::domain::chart::ChartKind;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryView {
    pub summary: Option<Summary>,
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct ViewServices {
    pub api: Arc<dyn BikingApi>,
    pub charts: ChartService,
    pub locations: LocationStreamService,
    pub pictures: PictureService,
    pub map: MapService,
    pub bikes: BikeService,
    pub uploads: UploadService,
}

#[derive(Debug, Clone)]
pub struct CarouselSettings {
    pub base_url: String,
    pub period: Duration,
    pub max_slides: usize,
}

#[derive(Default)]
struct Lifecycle {
    stream: Option<LocationStreamHandle>,
    timer: Option<CarouselTimer>,
    torn_down: bool,
}

pub struct ViewSession {
    services: ViewServices,
    carousel_period: Duration,
    charts: HashMap<ChartKind, Arc<RwLock<ChartView>>>,
    pub summary: Arc<RwLock<SummaryView>>,
    pub trail: Arc<RwLock<LocationTrail>>,
    pub carousel: Arc<RwLock<Carousel>>,
    pub map: Arc<RwLock<MapScene>>,
    pub bikes: Arc<RwLock<BikesView>>,
    pub uploads: Arc<RwLock<UploadsView>>,
    lifecycle: Mutex<Lifecycle>,
}

impl ViewSession {
    pub fn new(services: ViewServices, carousel: CarouselSettings) -> Self {
        let charts = ChartKind::ALL
            .into_iter()
            .map(|kind| (kind, Arc::new(RwLock::new(ChartView::new(kind)))))
            .collect();

        Self {
            services,
            carousel_period: carousel.period,
            charts,
            summary: Arc::new(RwLock::new(SummaryView::default())),
            trail: Arc::new(RwLock::new(LocationTrail::new())),
            carousel: Arc::new(RwLock::new(Carousel::new(
                carousel.base_url,
                carousel.max_slides,
            ))),
            map: Arc::new(RwLock::new(MapScene::new())),
            bikes: Arc::new(RwLock::new(BikesView::default())),
            uploads: Arc::new(RwLock::new(UploadsView::default())),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    pub fn services(&self) -> &ViewServices {
        &self.services
    }

    pub fn chart(&self, kind: ChartKind) -> Arc<RwLock<ChartView>> {
        // Every kind is inserted in `new`.
        self.charts[&kind].clone()
    }

    /// Run the initial fetches, subscribe to the location topic and start the carousel.
    /// Individual failures end up on their views.
    pub async fn enter(&self) {
        tracing::info!("Entering views");
        let charts = futures::future::join_all(
            self.charts
                .values()
                .map(|view| self.services.charts.refresh(view)),
        );

        let (_, _, _, _, _, stream) = tokio::join!(
            charts,
            self.load_summary(),
            self.services.map.place_home(&self.map),
            self.services.bikes.load(&self.bikes, false),
            self.services.pictures.fill(&self.carousel),
            self.services.locations.enter(self.trail.clone()),
        );

        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.torn_down {
            drop(lifecycle);
            stream.close().await;
            return;
        }
        lifecycle.stream = Some(stream);
        lifecycle.timer = Some(CarouselTimer::start(
            self.carousel.clone(),
            self.carousel_period,
        ));
    }

    async fn load_summary(&self) {
        let result = self.services.api.summary().await;
        let mut view = self.summary.write().await;
        match result {
            Ok(summary) => {
                view.summary = Some(summary);
                view.error = None;
            }
            Err(e) => {
                tracing::warn!("Fetching summary failed: {}", e);
                view.error = Some(e.user_message());
            }
        }
    }

    /// Cancel the carousel timer, close the location channel and stop chart updates.
    pub async fn teardown(&self) {
        let (stream, timer) = {
            let mut lifecycle = self.lifecycle.lock().await;
            if lifecycle.torn_down {
                return;
            }
            lifecycle.torn_down = true;
            (lifecycle.stream.take(), lifecycle.timer.take())
        };

        if let Some(timer) = timer {
            timer.cancel();
        }
        if let Some(stream) = stream {
            stream.close().await;
        }
        for view in self.charts.values() {
            view.write().await.teardown();
        }
        tracing::info!("Views torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::chart_service::ApplyOutcome;
    use crate::application::location_stream::StreamState;
    use crate::application::testing::{ChannelFeed, FakeBikingApi, bike, location};
    use crate::domain::chart::{ChartPoint, IncomingChart, IncomingSeries};
    use crate::application::carousel::PictureSelection;

    fn session(api: Arc<FakeBikingApi>, feed: ChannelFeed) -> ViewSession {
        let services = ViewServices {
            api: api.clone(),
            charts: ChartService::new(api.clone()),
            locations: LocationStreamService::new(
                api.clone(),
                Arc::new(feed),
                "/topic/currentLocation".to_string(),
            ),
            pictures: PictureService::new(api.clone(), PictureSelection::Biking),
            map: MapService::new(api.clone(), None),
            bikes: BikeService::new(api.clone()),
            uploads: UploadService::new(api),
        };
        ViewSession::new(
            services,
            CarouselSettings {
                base_url: "http://biking.example".to_string(),
                period: Duration::from_millis(5000),
                max_slides: 15,
            },
        )
    }

    #[tokio::test]
    async fn test_enter_fills_views() {
        let api = Arc::new(FakeBikingApi::default());
        api.set_bikes(vec![bike(1, "Bike 1")]);
        api.add_biking_picture(1);
        api.add_biking_picture(2);
        api.set_locations(vec![location(50.0, 6.0)], 1);
        let (feed, _sender) = ChannelFeed::new();
        let session = session(api, feed);

        session.enter().await;

        assert!(session.summary.read().await.summary.is_some());
        assert_eq!(session.bikes.read().await.bikes.len(), 1);
        assert_eq!(session.carousel.read().await.pictures().len(), 2);
        assert!(session.map.read().await.home.is_some());
        assert_eq!(session.trail.read().await.count(), 1);
        assert_eq!(session.trail.read().await.state(), &StreamState::Subscribed);
        // The fake has no charts queued, so every chart shows an error.
        let chart = session.chart(ChartKind::CurrentYear);
        assert!(chart.read().await.last_error().is_some());

        session.teardown().await;
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent_and_ignores_late_responses() {
        let api = Arc::new(FakeBikingApi::default());
        let (feed, _sender) = ChannelFeed::new();
        let session = session(api, feed);
        session.enter().await;

        session.teardown().await;
        session.teardown().await;

        let chart = session.chart(ChartKind::MonthlyAverage);
        let incoming = IncomingChart {
            series: Some(vec![IncomingSeries {
                id: Some("s1".to_string()),
                data: vec![ChartPoint::Value(1.0)],
                ..Default::default()
            }]),
            ..Default::default()
        };
        let generation = chart.read().await.generation();
        let outcome = chart.write().await.apply(generation, Ok(incoming));

        assert_eq!(outcome, ApplyOutcome::Ignored);
        assert!(session.trail.read().await.is_closed());
    }
}
