use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::models::{JsonObject, UploadKind, UploadPhase, UploadTaskId};
use crate::services::multipart::{build_framing, content_type_for, make_boundary};
use crate::services::stream_copy::{StagedUploadFile, StreamCopier};
use crate::services::transport::{
    TransportSessionFactory, UploadRequest, UploadTaskHandle, UploadTransport,
};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use url::Url;

/// Builds multipart bodies on disk and hands them to a transport.
///
/// Each call owns its own framing and staged file; nothing is shared between
/// concurrent uploads.
pub struct UploadCoordinator {
    config: UploaderConfig,
    copier: StreamCopier,
    transport: Arc<dyn UploadTransport>,
}

impl UploadCoordinator {
    pub fn new(config: UploaderConfig, transport: Arc<dyn UploadTransport>) -> Self {
        let copier = StreamCopier::from_config(&config);
        Self {
            config,
            copier,
            transport,
        }
    }

    /// Frame and stage `local` as a single multipart part.
    async fn stage(
        &self,
        local: &Path,
        kind: UploadKind,
        field: &str,
        filename: &str,
    ) -> Result<(String, StagedUploadFile), UploadError> {
        let boundary = make_boundary();

        debug!("{}: {} as {}", UploadPhase::Building, local.display(), kind.mime());
        let framing = build_framing(&boundary, kind, field, filename)?;

        debug!("{}: {}", UploadPhase::Staging, local.display());
        let staged = self.copier.stage(local, framing).await?;

        Ok((boundary, staged))
    }

    /// Upload a JPEG, PNG or QuickTime file and return the endpoint's JSON
    /// response.
    pub async fn upload_media(
        &self,
        destination: &Url,
        field: &str,
        local: &Path,
    ) -> Result<JsonObject, UploadError> {
        self.upload_media_with_cancel(destination, field, local, &CancellationToken::new())
            .await
    }

    pub async fn upload_media_with_cancel(
        &self,
        destination: &Url,
        field: &str,
        local: &Path,
        cancel: &CancellationToken,
    ) -> Result<JsonObject, UploadError> {
        let result = self.run_media_upload(destination, field, local, cancel).await;
        match &result {
            Ok(_) => info!("{}: {} -> {}", UploadPhase::Completed, local.display(), destination),
            Err(e) => error!("{}: {} -> {}: {}", UploadPhase::Failed, local.display(), destination, e),
        }
        result
    }

    /// Like [`upload_media`](Self::upload_media) but collapses every failure
    /// into `None`.
    pub async fn upload_media_opt(
        &self,
        destination: &Url,
        field: &str,
        local: &Path,
    ) -> Option<JsonObject> {
        self.upload_media(destination, field, local).await.ok()
    }

    async fn run_media_upload(
        &self,
        destination: &Url,
        field: &str,
        local: &Path,
        cancel: &CancellationToken,
    ) -> Result<JsonObject, UploadError> {
        let kind = UploadKind::from_path(local)
            .ok_or_else(|| UploadError::UnsupportedFileType(local.display().to_string()))?;
        let filename = kind.upload_filename("image");

        let (boundary, staged) = self.stage(local, kind, field, &filename).await?;
        let request =
            UploadRequest::for_staged(destination.clone(), content_type_for(&boundary), &staged);

        info!(
            "{}: {} bytes to {}",
            UploadPhase::Submitted,
            staged.len(),
            destination
        );
        let response = self.transport.upload_file(&request, cancel).await;
        if let Err(e) = staged.close() {
            debug!("Could not remove staged upload file: {}", e);
        }

        let response = response?;
        if !response.is_success() {
            return Err(UploadError::Status(response.status));
        }
        response.json_object()
    }

    /// Stage a QuickTime video and submit it through a background session.
    ///
    /// Returns the task identifier immediately; completion is reported by the
    /// session created from `sessions`.
    pub async fn upload_video(
        &self,
        local: &Path,
        sessions: &dyn TransportSessionFactory,
    ) -> Result<UploadTaskId, UploadError> {
        self.submit_video(local, sessions).await.map(|handle| handle.id)
    }

    /// Like [`upload_video`](Self::upload_video) but returns the full handle
    /// so the caller can cancel the task.
    pub async fn submit_video(
        &self,
        local: &Path,
        sessions: &dyn TransportSessionFactory,
    ) -> Result<UploadTaskHandle, UploadError> {
        let destination = Url::parse(&self.config.video_endpoint)
            .map_err(|e| UploadError::Transport(format!("Invalid video endpoint: {}", e)))?;
        let kind = UploadKind::QuickTime;
        let filename = kind.upload_filename(&self.config.video_field);

        let (boundary, staged) = self
            .stage(local, kind, &self.config.video_field, &filename)
            .await
            .inspect_err(|e| error!("{}: {}: {}", UploadPhase::Failed, local.display(), e))?;

        let request = UploadRequest::for_staged(destination, content_type_for(&boundary), &staged);
        let session = sessions.create_session();
        let handle = session.submit(request, staged);

        info!(
            "{}: video {} as task {}",
            UploadPhase::Submitted,
            local.display(),
            handle.id
        );
        Ok(handle)
    }
}
