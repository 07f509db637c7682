// Chart domain models
use serde::{Deserialize, Serialize};

/// One data point. Area range series carry `[low, high]` pairs instead of plain values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartPoint {
    Value(f64),
    Range([f64; 2]),
}

impl From<f64> for ChartPoint {
    fn from(value: f64) -> Self {
        ChartPoint::Value(value)
    }
}

impl PartialEq<f64> for ChartPoint {
    fn eq(&self, other: &f64) -> bool {
        matches!(self, ChartPoint::Value(v) if v == other)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub series_type: Option<String>,
    pub data: Vec<ChartPoint>,
    pub visible: bool,
}

impl ChartSeries {
    pub fn new(id: String, name: String, data: Vec<ChartPoint>) -> Self {
        Self {
            id,
            name,
            series_type: None,
            data,
            visible: true,
        }
    }
}

/// The chart state as displayed by a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfiguration {
    pub series: Vec<ChartSeries>,
    pub categories: Vec<String>,
    pub loading: bool,
    pub title: String,
    pub subtitle: String,
}

impl ChartConfiguration {
    /// Placeholder shown until the first fetch completes.
    pub fn empty() -> Self {
        Self {
            series: Vec::new(),
            categories: Vec::new(),
            loading: true,
            title: String::new(),
            subtitle: String::new(),
        }
    }

    #[cfg(test)]
    pub fn series_by_id(&self, id: &str) -> Option<&ChartSeries> {
        self.series.iter().find(|s| s.id == id)
    }
}

/// A series as delivered by the charts API. Every field except `data` may be missing.
/// Styling keys such as `color` or `linkedTo` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncomingSeries {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub series_type: Option<String>,
    #[serde(default)]
    pub data: Vec<ChartPoint>,
    #[serde(default)]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartText {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartAxis {
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

/// The `options` block of a Highcharts configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartOptions {
    #[serde(default)]
    pub title: Option<ChartText>,
    #[serde(default)]
    pub subtitle: Option<ChartText>,
    #[serde(default, rename = "xAxis")]
    pub x_axis: Option<ChartAxis>,
}

/// A partial chart configuration as delivered by the charts API.
///
/// The API answers with a Highcharts config where title and categories live
/// under `options`. Top-level `categories`, `title` and `subtitle` are read as
/// well and take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncomingChart {
    #[serde(default)]
    pub series: Option<Vec<IncomingSeries>>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub options: Option<ChartOptions>,
}

impl IncomingChart {
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref().or_else(|| {
            self.options.as_ref()?.title.as_ref()?.text.as_deref()
        })
    }

    pub fn subtitle_text(&self) -> Option<&str> {
        self.subtitle.as_deref().or_else(|| {
            self.options.as_ref()?.subtitle.as_ref()?.text.as_deref()
        })
    }

    /// Moves the categories out of the payload, wherever they were sent.
    pub fn take_categories(&mut self) -> Option<Vec<String>> {
        self.categories.take().or_else(|| {
            self.options.as_mut()?.x_axis.as_mut()?.categories.take()
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    CurrentYear,
    MonthlyAverage,
    History,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::CurrentYear,
        ChartKind::MonthlyAverage,
        ChartKind::History,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::CurrentYear => "currentYear",
            ChartKind::MonthlyAverage => "monthlyAverage",
            ChartKind::History => "history",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }
}

/// Year range for the history chart. Both ends are optional on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct YearRange {
    pub start: Option<i32>,
    pub end: Option<i32>,
}
