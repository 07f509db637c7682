// Bike, milage and summary domain models
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bike {
    pub id: i64,
    pub name: String,
    pub color: String,
    #[serde(with = "super::timestamp")]
    pub bought_on: DateTime<Utc>,
    #[serde(default, with = "super::timestamp::option")]
    pub decommissioned_on: Option<DateTime<Utc>>,
    #[serde(default)]
    pub milage: Option<f64>,
    #[serde(default)]
    pub last_milage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBike {
    pub name: String,
    pub bought_on: NaiveDate,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decommissioned_on: Option<NaiveDate>,
}

impl NewBike {
    /// Checks the constraints the API enforces, so obviously broken forms never leave the client.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("The name is required.".to_string());
        }
        if self.name.chars().count() > 255 {
            return Err("The name must not exceed 255 characters.".to_string());
        }
        if self.color.len() != 6 || !self.color.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("The color must be a 6 digit hex value.".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMilage {
    pub recorded_on: NaiveDate,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milage {
    pub id: i64,
    #[serde(with = "super::timestamp")]
    pub recorded_on: DateTime<Utc>,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulatedPeriod {
    #[serde(with = "super::timestamp")]
    pub start_of_period: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(default, with = "super::timestamp::option")]
    pub date_of_first_record: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub worst_period: Option<AccumulatedPeriod>,
    #[serde(default)]
    pub best_period: Option<AccumulatedPeriod>,
    #[serde(default)]
    pub average: Option<f64>,
}
