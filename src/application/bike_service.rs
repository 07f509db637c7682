// Bike service - Bike list and the forms for new bikes and milages
use crate::application::biking_api::BikingApi;
use crate::application::error::{ApiError, ApiResult};
use crate::domain::bike::{Bike, Milage, NewBike, NewMilage};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

pub const NAME_ALREADY_USED: &str = "The name is already used.";
pub const BIKE_NOT_FOUND: &str = "The bike doesn't exist.";

#[derive(Debug, Clone, Default, Serialize)]
pub struct BikesView {
    pub bikes: Vec<Bike>,
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct BikeService {
    api: Arc<dyn BikingApi>,
}

impl BikeService {
    pub fn new(api: Arc<dyn BikingApi>) -> Self {
        Self { api }
    }

    pub async fn load(&self, view: &RwLock<BikesView>, all: bool) {
        let result = self.api.bikes(all).await;
        let mut view = view.write().await;
        match result {
            Ok(bikes) => {
                view.bikes = bikes;
                view.message = None;
            }
            Err(e) => {
                tracing::warn!("Fetching bikes failed: {}", e);
                view.message = Some(e.user_message());
            }
        }
    }

    /// Submit the new bike form. The list only changes when the API accepted the bike.
    pub async fn submit_bike(&self, view: &RwLock<BikesView>, bike: NewBike) -> ApiResult<Bike> {
        let result = match bike.validate() {
            Ok(()) => self.api.create_bike(&bike).await,
            Err(message) => Err(ApiError::Validation(message)),
        };

        let mut view = view.write().await;
        match &result {
            Ok(created) => {
                tracing::info!("Created bike {}", created.name);
                view.bikes.push(created.clone());
                view.message = None;
            }
            Err(e) => {
                view.message = Some(match e {
                    ApiError::Conflict(_) => NAME_ALREADY_USED.to_string(),
                    other => other.user_message(),
                });
            }
        }
        result
    }

    pub async fn record_milage(
        &self,
        view: &RwLock<BikesView>,
        bike_id: i64,
        milage: NewMilage,
    ) -> ApiResult<Milage> {
        let result = self.api.create_milage(bike_id, &milage).await;

        let mut view = view.write().await;
        match &result {
            Ok(created) => {
                if let Some(bike) = view.bikes.iter_mut().find(|b| b.id == bike_id) {
                    bike.last_milage = Some(created.amount);
                }
                view.message = None;
            }
            Err(e) => {
                view.message = Some(match e {
                    ApiError::NotFound(_) => BIKE_NOT_FOUND.to_string(),
                    other => other.user_message(),
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{FakeBikingApi, bike};
    use chrono::NaiveDate;

    fn new_bike(name: &str) -> NewBike {
        NewBike {
            name: name.to_string(),
            bought_on: NaiveDate::from_ymd_opt(2014, 3, 1).unwrap(),
            color: "FF0000".to_string(),
            decommissioned_on: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_name_leaves_list_unchanged() {
        let api = Arc::new(FakeBikingApi::default());
        api.set_bikes(vec![bike(1, "Bike 1")]);
        let service = BikeService::new(api);
        let view = RwLock::new(BikesView::default());
        service.load(&view, false).await;

        let result = service.submit_bike(&view, new_bike("Bike 1")).await;

        assert!(matches!(result, Err(ApiError::Conflict(_))));
        let view = view.read().await;
        assert_eq!(view.message.as_deref(), Some(NAME_ALREADY_USED));
        assert_eq!(view.bikes, vec![bike(1, "Bike 1")]);
    }

    #[tokio::test]
    async fn test_created_bike_is_appended() {
        let api = Arc::new(FakeBikingApi::default());
        api.set_bikes(vec![bike(1, "Bike 1")]);
        let service = BikeService::new(api);
        let view = RwLock::new(BikesView::default());
        service.load(&view, false).await;

        let created = service.submit_bike(&view, new_bike("Bike 2")).await.unwrap();

        let view = view.read().await;
        assert_eq!(created.name, "Bike 2");
        assert_eq!(view.bikes.len(), 2);
        assert!(view.message.is_none());
    }

    #[tokio::test]
    async fn test_invalid_bike_is_not_sent() {
        let api = Arc::new(FakeBikingApi::default());
        let service = BikeService::new(api.clone());
        let view = RwLock::new(BikesView::default());

        let mut invalid = new_bike("Bike 3");
        invalid.color = "nope".to_string();
        let result = service.submit_bike(&view, invalid).await;

        assert!(matches!(result, Err(ApiError::Validation(_))));
        assert_eq!(api.created_bikes(), 0);
        assert!(view.read().await.bikes.is_empty());
    }

    #[tokio::test]
    async fn test_milage_for_unknown_bike() {
        let api = Arc::new(FakeBikingApi::default());
        let service = BikeService::new(api);
        let view = RwLock::new(BikesView::default());
        let milage = NewMilage {
            recorded_on: NaiveDate::from_ymd_opt(2014, 3, 1).unwrap(),
            amount: 120.0,
        };

        let result = service.record_milage(&view, 99, milage).await;

        assert!(matches!(result, Err(ApiError::NotFound(_))));
        assert_eq!(view.read().await.message.as_deref(), Some(BIKE_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_milage_updates_last_milage() {
        let api = Arc::new(FakeBikingApi::default());
        api.set_bikes(vec![bike(1, "Bike 1")]);
        let service = BikeService::new(api);
        let view = RwLock::new(BikesView::default());
        service.load(&view, true).await;
        let milage = NewMilage {
            recorded_on: NaiveDate::from_ymd_opt(2014, 4, 1).unwrap(),
            amount: 150.0,
        };

        service.record_milage(&view, 1, milage).await.unwrap();

        assert_eq!(view.read().await.bikes[0].last_milage, Some(150.0));
    }
}
