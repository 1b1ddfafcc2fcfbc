pub mod assets;
pub mod database;
pub mod media;
pub mod storage;
