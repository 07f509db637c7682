// Application layer - View state and the use cases keeping it in sync
pub mod bike_service;
pub mod biking_api;
pub mod carousel;
pub mod chart_service;
pub mod error;
pub mod location_feed;
pub mod location_stream;
pub mod map_overlay;
pub mod upload_service;
pub mod view_session;

#[cfg(test)]
pub mod testing;
