// Chart service - Keeps displayed charts in sync with the charts API
use crate::application::biking_api::BikingApi;
use crate::application::error::{ApiError, ApiResult};
use crate::domain::chart::{
    ChartConfiguration, ChartKind, ChartSeries, IncomingChart, IncomingSeries, YearRange,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

/// Hands out ids for series that arrive without one.
#[derive(Debug, Default)]
pub struct SeriesIdAllocator {
    next: u64,
}

impl SeriesIdAllocator {
    pub fn assign(&mut self) -> String {
        let id = format!("series-{}", self.next);
        self.next += 1;
        id
    }
}

/// Merge a freshly fetched chart into the displayed one.
///
/// Series are matched by id. Matches are updated where they stand, new series
/// are appended in incoming order and series missing from the incoming list are
/// dropped. Duplicate incoming ids collapse onto their first position with the
/// last payload winning. Categories are only replaced when the payload has
/// them, either at the top level or under `options.xAxis`. Titles are never
/// touched. A payload without a `series` field leaves
/// the series alone.
pub fn reconcile(
    existing: &mut ChartConfiguration,
    mut incoming: IncomingChart,
    ids: &mut SeriesIdAllocator,
) {
    let categories = incoming.take_categories();

    if let Some(series) = incoming.series {
        let incoming_series = collapse_by_id(series, ids);

        existing
            .series
            .retain(|s| incoming_series.iter().any(|(id, _)| id == &s.id));

        for (id, update) in incoming_series {
            match existing.series.iter_mut().find(|s| s.id == id) {
                Some(current) => {
                    current.data = update.data;
                    if let Some(visible) = update.visible {
                        current.visible = visible;
                    }
                    if let Some(name) = update.name {
                        current.name = name;
                    }
                    if update.series_type.is_some() {
                        current.series_type = update.series_type;
                    }
                }
                None => {
                    let mut series =
                        ChartSeries::new(id, update.name.unwrap_or_default(), update.data);
                    series.visible = update.visible.unwrap_or(true);
                    series.series_type = update.series_type;
                    existing.series.push(series);
                }
            }
        }
    }

    if let Some(categories) = categories {
        existing.categories = categories;
    }

    for series in &existing.series {
        if series.data.len() > existing.categories.len() {
            tracing::debug!(
                "Series {} has {} points for {} categories",
                series.id,
                series.data.len(),
                existing.categories.len()
            );
        }
    }

    existing.loading = false;
}

fn collapse_by_id(
    series: Vec<IncomingSeries>,
    ids: &mut SeriesIdAllocator,
) -> Vec<(String, IncomingSeries)> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut collapsed: Vec<(String, IncomingSeries)> = Vec::with_capacity(series.len());

    for mut s in series {
        let id = s.id.take().unwrap_or_else(|| ids.assign());
        match positions.get(&id) {
            Some(&index) => collapsed[index].1 = s,
            None => {
                positions.insert(id.clone(), collapsed.len());
                collapsed.push((id, s));
            }
        }
    }

    collapsed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Ignored,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSnapshot {
    pub kind: &'static str,
    pub config: ChartConfiguration,
    pub error: Option<String>,
    pub redraws: u64,
}

/// One displayed chart: its configuration plus the bookkeeping around fetches.
#[derive(Debug)]
pub struct ChartView {
    kind: ChartKind,
    range: YearRange,
    config: ChartConfiguration,
    ids: SeriesIdAllocator,
    initialized: bool,
    generation: u64,
    last_error: Option<String>,
    torn_down: bool,
    redraw: watch::Sender<u64>,
}

impl ChartView {
    pub fn new(kind: ChartKind) -> Self {
        let (redraw, _) = watch::channel(0);
        Self {
            kind,
            range: YearRange::default(),
            config: ChartConfiguration::empty(),
            ids: SeriesIdAllocator::default(),
            initialized: false,
            generation: 0,
            last_error: None,
            torn_down: false,
            redraw,
        }
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    pub fn range(&self) -> YearRange {
        self.range
    }

    pub fn config(&self) -> &ChartConfiguration {
        &self.config
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn redraw_count(&self) -> u64 {
        *self.redraw.borrow()
    }

    pub fn subscribe_redraws(&self) -> watch::Receiver<u64> {
        self.redraw.subscribe()
    }

    /// Back to the loading state, e.g. when the date range changes. Responses of
    /// fetches started before the reset are ignored.
    pub fn reset(&mut self, range: YearRange) {
        self.range = range;
        self.config.loading = true;
        self.initialized = false;
        self.last_error = None;
        self.generation += 1;
    }

    /// Apply the outcome of a fetch started at `generation`.
    pub fn apply(&mut self, generation: u64, result: ApiResult<IncomingChart>) -> ApplyOutcome {
        if self.torn_down {
            tracing::debug!("Ignoring {} chart response after teardown", self.kind.as_str());
            return ApplyOutcome::Ignored;
        }
        if generation != self.generation {
            tracing::debug!(
                "Ignoring stale {} chart response (generation {} != {})",
                self.kind.as_str(),
                generation,
                self.generation
            );
            return ApplyOutcome::Ignored;
        }

        match result {
            Ok(incoming) => {
                if self.initialized {
                    reconcile(&mut self.config, incoming, &mut self.ids);
                } else {
                    let mut fresh = ChartConfiguration::empty();
                    fresh.title = incoming.title_text().unwrap_or_default().to_string();
                    fresh.subtitle = incoming.subtitle_text().unwrap_or_default().to_string();
                    reconcile(&mut fresh, incoming, &mut self.ids);
                    self.config = fresh;
                    self.initialized = true;
                }
                self.last_error = None;
                self.redraw.send_modify(|count| *count += 1);
            }
            Err(e) => {
                tracing::warn!("Fetching {} chart failed: {}", self.kind.as_str(), e);
                self.config.loading = false;
                self.last_error = Some(e.user_message());
            }
        }

        ApplyOutcome::Applied
    }

    pub fn teardown(&mut self) {
        self.torn_down = true;
    }

    pub fn snapshot(&self) -> ChartSnapshot {
        ChartSnapshot {
            kind: self.kind.as_str(),
            config: self.config.clone(),
            error: self.last_error.clone(),
            redraws: self.redraw_count(),
        }
    }
}

#[derive(Clone)]
pub struct ChartService {
    api: Arc<dyn BikingApi>,
}

impl ChartService {
    pub fn new(api: Arc<dyn BikingApi>) -> Self {
        Self { api }
    }

    /// Fetch the chart and merge it into the view. The lock is not held while fetching.
    pub async fn refresh(&self, view: &RwLock<ChartView>) -> Result<ApplyOutcome, ApiError> {
        let (kind, range, generation) = {
            let view = view.read().await;
            (view.kind(), view.range(), view.generation())
        };

        let result = self.api.chart(kind, range).await;
        let error = result.as_ref().err().cloned();
        let outcome = view.write().await.apply(generation, result);

        match (outcome, error) {
            (ApplyOutcome::Applied, Some(e)) => Err(e),
            (outcome, _) => Ok(outcome),
        }
    }

    /// Switch the history chart to another year range and fetch it again.
    pub async fn change_range(
        &self,
        view: &RwLock<ChartView>,
        range: YearRange,
    ) -> Result<ApplyOutcome, ApiError> {
        view.write().await.reset(range);
        self.refresh(view).await
    }
}
