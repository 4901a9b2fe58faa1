pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::config::UploaderConfig;
pub use crate::error::{DownloadError, ErrorKind, UploadError};
pub use crate::models::{JsonObject, MultipartFraming, UploadKind, UploadTaskId};
pub use crate::services::download_registry::DownloadRegistry;
pub use crate::services::downloader::Downloader;
pub use crate::services::json_request::JsonClient;
pub use crate::services::multipart::build_framing;
pub use crate::services::stream_copy::{StagedUploadFile, StreamCopier};
pub use crate::services::transport::{
    BackgroundSessionFactory, ReqwestTransport, TransportSessionFactory, UploadEvent,
    UploadTransport,
};
pub use crate::services::upload_coordinator::UploadCoordinator;

use std::sync::Arc;

/// Everything a process needs to upload and download files, wired from one
/// configuration.
pub struct AppState {
    pub config: UploaderConfig,
    pub transport: Arc<ReqwestTransport>,
    pub coordinator: Arc<UploadCoordinator>,
    pub downloader: Arc<Downloader>,
    pub json: Arc<JsonClient>,
    pub registry: Arc<DownloadRegistry>,
}

/// Each HTTP concern gets its own client: uploads and downloads only bound
/// connecting and idle reads, JSON requests get a total deadline.
pub fn create_app(config: UploaderConfig) -> anyhow::Result<AppState> {
    let transport = Arc::new(ReqwestTransport::from_config(&config)?);
    let registry = Arc::new(DownloadRegistry::new());
    let downloader = Arc::new(Downloader::from_config(&config, registry.clone())?);
    let json = Arc::new(JsonClient::from_config(&config)?);
    let coordinator = Arc::new(UploadCoordinator::new(config.clone(), transport.clone()));

    Ok(AppState {
        config,
        transport,
        coordinator,
        downloader,
        json,
        registry,
    })
}
