// Domain layer - Biking data models shared by every view
pub mod bike;
pub mod chart;
pub mod location;
pub mod picture;
pub mod timestamp;
pub mod track;
