pub mod download_registry;
pub mod downloader;
pub mod json_request;
pub mod multipart;
pub mod stream_copy;
pub mod transport;
pub mod upload_coordinator;
