pub mod ingest;
pub mod media;
pub mod storage;
pub mod videos;
