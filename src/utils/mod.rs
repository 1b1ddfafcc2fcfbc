pub mod asset_key;
pub mod auth;
