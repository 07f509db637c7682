// Live location stream - Snapshot plus topic subscription feeding the location trail
use crate::application::biking_api::BikingApi;
use crate::application::error::ApiError;
use crate::application::location_feed::{LocationFeed, Subscription};
use crate::domain::location::LocationPoint;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

const UPDATE_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum StreamState {
    Disconnected { reason: Option<String> },
    Connecting,
    Subscribed,
}

/// Locations shown on the live map, oldest first.
#[derive(Debug)]
pub struct LocationTrail {
    points: Vec<LocationPoint>,
    count: u64,
    total_recorded: Option<u64>,
    state: StreamState,
    last_error: Option<String>,
    closed: bool,
    updates: Option<broadcast::Sender<LocationPoint>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailSnapshot {
    pub points: Vec<LocationPoint>,
    pub count: u64,
    pub total_recorded: Option<u64>,
    pub connection: StreamState,
    pub error: Option<String>,
}

impl Default for LocationTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationTrail {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Self {
            points: Vec::new(),
            count: 0,
            total_recorded: None,
            state: StreamState::Disconnected { reason: None },
            last_error: None,
            closed: false,
            updates: Some(updates),
        }
    }

    pub fn points(&self) -> &[LocationPoint] {
        &self.points
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn total_recorded(&self) -> Option<u64> {
        self.total_recorded
    }

    pub fn state(&self) -> &StreamState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Points applied from now on. The receiver ends once the trail is closed.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<LocationPoint> {
        match &self.updates {
            Some(updates) => updates.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    fn load_snapshot(&mut self, points: Vec<LocationPoint>, total_recorded: Option<u64>) {
        self.count = points.len() as u64;
        self.points = points;
        self.total_recorded = total_recorded;
    }

    fn transition(&mut self, state: StreamState) {
        tracing::debug!("Location stream {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Append one point. Returns false once the trail has been closed.
    pub fn apply(&mut self, point: LocationPoint) -> bool {
        if self.closed {
            return false;
        }
        self.points.push(point.clone());
        self.count += 1;
        if let Some(total) = self.total_recorded.as_mut() {
            *total += 1;
        }
        if let Some(updates) = &self.updates {
            let _ = updates.send(point);
        }
        true
    }

    fn close(&mut self) {
        self.closed = true;
        self.updates = None;
        self.transition(StreamState::Disconnected { reason: None });
    }

    pub fn snapshot(&self) -> TrailSnapshot {
        TrailSnapshot {
            points: self.points.clone(),
            count: self.count,
            total_recorded: self.total_recorded,
            connection: self.state.clone(),
            error: self.last_error.clone(),
        }
    }
}

#[derive(Clone)]
pub struct LocationStreamService {
    api: Arc<dyn BikingApi>,
    feed: Arc<dyn LocationFeed>,
    topic: String,
}

impl LocationStreamService {
    pub fn new(api: Arc<dyn BikingApi>, feed: Arc<dyn LocationFeed>, topic: String) -> Self {
        Self { api, feed, topic }
    }

    /// Load the recent locations, then subscribe to the topic and keep appending.
    pub async fn enter(&self, trail: Arc<RwLock<LocationTrail>>) -> LocationStreamHandle {
        let (points, count) = tokio::join!(self.api.locations(), self.api.location_count());
        {
            let mut trail = trail.write().await;
            match points {
                Ok(points) => trail.load_snapshot(points, count.ok()),
                Err(e) => {
                    tracing::warn!("Fetching locations failed: {}", e);
                    trail.last_error = Some(e.user_message());
                }
            }
            trail.transition(StreamState::Connecting);
        }

        let subscription = self.feed.subscribe(&self.topic).await;

        let mut guard = trail.write().await;
        if guard.closed {
            return LocationStreamHandle::detached(trail.clone());
        }
        match subscription {
            Ok(subscription) => {
                tracing::info!("Subscribed to {}", self.topic);
                guard.transition(StreamState::Subscribed);
                drop(guard);
                let task = tokio::spawn(consume(subscription, trail.clone()));
                LocationStreamHandle {
                    trail,
                    task: Some(task),
                }
            }
            Err(e) => {
                tracing::warn!("Subscribing to {} failed: {}", self.topic, e);
                guard.transition(StreamState::Disconnected {
                    reason: Some(e.to_string()),
                });
                drop(guard);
                LocationStreamHandle::detached(trail)
            }
        }
    }
}

async fn consume(mut subscription: Subscription, trail: Arc<RwLock<LocationTrail>>) {
    while let Some(body) = subscription.recv().await {
        let point = match serde_json::from_str::<LocationPoint>(&body) {
            Ok(point) => point,
            Err(e) => {
                tracing::warn!("Dropping unreadable location message: {}", e);
                continue;
            }
        };
        if !trail.write().await.apply(point) {
            return;
        }
    }

    let mut trail = trail.write().await;
    if !trail.closed {
        let error = ApiError::StreamDisconnected("the server closed the connection".to_string());
        tracing::warn!("{}", error);
        trail.transition(StreamState::Disconnected {
            reason: Some(error.to_string()),
        });
    }
}

/// Owns the running subscription of a trail.
#[derive(Debug)]
pub struct LocationStreamHandle {
    trail: Arc<RwLock<LocationTrail>>,
    task: Option<JoinHandle<()>>,
}

impl LocationStreamHandle {
    fn detached(trail: Arc<RwLock<LocationTrail>>) -> Self {
        Self { trail, task: None }
    }

    /// Close the channel. Messages that were not applied yet are dropped.
    pub async fn close(mut self) {
        self.trail.write().await.close();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        tracing::info!("Location stream closed");
    }
}

impl Drop for LocationStreamHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
