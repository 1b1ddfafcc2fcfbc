pub mod auth;
pub mod health;
pub mod uploads;
pub mod videos;
