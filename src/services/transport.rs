use crate::config::UploaderConfig;
use crate::error::UploadError;
use crate::models::{JsonObject, UploadTaskId};
use crate::services::stream_copy::StagedUploadFile;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Client};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A POST of a staged body file.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub url: Url,
    pub content_type: String,
    pub file: PathBuf,
    pub content_length: u64,
}

impl UploadRequest {
    pub fn for_staged(url: Url, content_type: String, staged: &StagedUploadFile) -> Self {
        Self {
            url,
            content_type,
            file: staged.path().to_path_buf(),
            content_length: staged.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as a top level JSON object.
    pub fn json_object(&self) -> Result<JsonObject, UploadError> {
        match serde_json::from_slice::<serde_json::Value>(&self.body) {
            Ok(serde_json::Value::Object(map)) => Ok(map),
            Ok(other) => Err(UploadError::InvalidResponse(format!(
                "expected a JSON object, got {}",
                other
            ))),
            Err(e) => Err(UploadError::InvalidResponse(e.to_string())),
        }
    }
}

/// HTTP layer that sends a staged file and returns the raw response.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn upload_file(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, UploadError>;
}

/// Transport streaming the staged file with reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Only the connect phase is bounded: a total deadline or a read timeout
    /// would also cover the time spent streaming the request body.
    pub fn from_config(config: &UploaderConfig) -> Result<Self, UploadError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self::new(client))
    }

    async fn send(&self, request: &UploadRequest) -> Result<TransportResponse, UploadError> {
        let file = tokio::fs::File::open(&request.file).await?;
        let body = Body::wrap_stream(ReaderStream::new(file));

        let response = self
            .client
            .post(request.url.clone())
            .header(CONTENT_TYPE, &request.content_type)
            .header(CONTENT_LENGTH, request.content_length)
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl UploadTransport for ReqwestTransport {
    async fn upload_file(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<TransportResponse, UploadError> {
        tokio::select! {
            _ = cancel.cancelled() => Err(UploadError::Cancelled),
            res = self.send(request) => res,
        }
    }
}

/// Completion notice for a background upload.
#[derive(Debug)]
pub enum UploadEvent {
    Completed {
        task_id: UploadTaskId,
        response: TransportResponse,
    },
    Failed {
        task_id: UploadTaskId,
        error: UploadError,
    },
}

impl UploadEvent {
    pub fn task_id(&self) -> UploadTaskId {
        match self {
            UploadEvent::Completed { task_id, .. } | UploadEvent::Failed { task_id, .. } => *task_id,
        }
    }
}

/// Handle to an in-flight background upload.
#[derive(Debug, Clone)]
pub struct UploadTaskHandle {
    pub id: UploadTaskId,
    cancel: CancellationToken,
}

impl UploadTaskHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Transport session that runs uploads detached from the caller.
pub trait BackgroundUploadSession: Send + Sync {
    /// Start uploading. The session owns `staged` until the task finishes.
    fn submit(&self, request: UploadRequest, staged: StagedUploadFile) -> UploadTaskHandle;
}

pub trait TransportSessionFactory: Send + Sync {
    fn create_session(&self) -> Arc<dyn BackgroundUploadSession>;
}

/// Session spawning one tokio task per upload and reporting on a channel.
pub struct BackgroundSession {
    transport: Arc<dyn UploadTransport>,
    events: mpsc::UnboundedSender<UploadEvent>,
    next_id: Arc<AtomicU64>,
}

impl BackgroundUploadSession for BackgroundSession {
    fn submit(&self, request: UploadRequest, staged: StagedUploadFile) -> UploadTaskHandle {
        let id = UploadTaskId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let cancel = CancellationToken::new();

        let transport = Arc::clone(&self.transport);
        let events = self.events.clone();
        let token = cancel.clone();

        tokio::spawn(async move {
            let result = transport.upload_file(&request, &token).await;
            // Staged body is no longer needed once the transport is done with it
            drop(staged);

            let event = match result {
                Ok(response) => {
                    tracing::info!("Upload task {} finished with status {}", id, response.status);
                    UploadEvent::Completed {
                        task_id: id,
                        response,
                    }
                }
                Err(error) => {
                    tracing::error!("Upload task {} failed: {}", id, error);
                    UploadEvent::Failed { task_id: id, error }
                }
            };

            if events.send(event).is_err() {
                tracing::debug!("No listener for upload task {}", id);
            }
        });

        UploadTaskHandle { id, cancel }
    }
}

/// Creates [`BackgroundSession`]s that share one event channel and one
/// task identifier sequence.
pub struct BackgroundSessionFactory {
    transport: Arc<dyn UploadTransport>,
    events: mpsc::UnboundedSender<UploadEvent>,
    next_id: Arc<AtomicU64>,
}

impl BackgroundSessionFactory {
    pub fn new(
        transport: Arc<dyn UploadTransport>,
    ) -> (Self, mpsc::UnboundedReceiver<UploadEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let factory = Self {
            transport,
            events: tx,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        (factory, rx)
    }
}

impl TransportSessionFactory for BackgroundSessionFactory {
    fn create_session(&self) -> Arc<dyn BackgroundUploadSession> {
        Arc::new(BackgroundSession {
            transport: Arc::clone(&self.transport),
            events: self.events.clone(),
            next_id: Arc::clone(&self.next_id),
        })
    }
}
