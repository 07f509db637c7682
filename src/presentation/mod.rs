// Presentation layer - HTTP surface over the live views
pub mod app_state;
pub mod handlers;
