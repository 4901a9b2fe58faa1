use thiserror::Error;
use url::Url;

/// Coarse classification of an upload failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    FramingEncodingFailure,
    UnsupportedFileType,
    StreamIoFailure,
    TransportFailure,
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Could not create prefix and append data for multipart body")]
    FramingEncoding,

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Stream copy failed: {0}")]
    StreamIo(#[from] std::io::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response status: {0}")]
    Status(u16),

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    #[error("Upload cancelled")]
    Cancelled,
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UploadError::FramingEncoding => ErrorKind::FramingEncodingFailure,
            UploadError::UnsupportedFileType(_) => ErrorKind::UnsupportedFileType,
            UploadError::StreamIo(_) => ErrorKind::StreamIoFailure,
            UploadError::Transport(_)
            | UploadError::Status(_)
            | UploadError::InvalidResponse(_)
            | UploadError::Cancelled => ErrorKind::TransportFailure,
        }
    }
}

impl From<reqwest::Error> for UploadError {
    fn from(e: reqwest::Error) -> Self {
        UploadError::Transport(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Download already in flight: {0}")]
    AlreadyInFlight(Url),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response status: {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        DownloadError::Transport(e.to_string())
    }
}
