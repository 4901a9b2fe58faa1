use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default copy chunk size (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Configuration for staging, uploading and downloading files
#[derive(Debug, Clone)]
pub struct UploaderConfig {
    /// Chunk size used by the stream copier in bytes (default: 64 KiB)
    pub chunk_size: usize,

    /// Directory where staged upload bodies are created (default: system temp dir)
    pub temp_dir: PathBuf,

    /// Endpoint receiving video uploads
    pub video_endpoint: String,

    /// Form field name used for video uploads (default: "video")
    pub video_field: String,

    /// Total deadline for JSON requests (default: 5 seconds)
    pub request_timeout: Duration,

    /// Connect timeout for upload and download connections (default: 10 seconds)
    pub connect_timeout: Duration,

    /// Longest a download may wait for the next bytes (default: 60 seconds)
    pub read_timeout: Duration,

    /// Directory where completed downloads are moved (default: system temp dir)
    pub download_dir: PathBuf,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            temp_dir: env::temp_dir(),
            video_endpoint: "https://www.somewebsite/anEndpoint".to_string(),
            video_field: "video".to_string(),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
            download_dir: env::temp_dir(),
        }
    }
}

impl UploaderConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            chunk_size: env::var("UPLOAD_CHUNK_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&v: &usize| v > 0)
                .unwrap_or(default.chunk_size),

            temp_dir: env::var("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.temp_dir),

            video_endpoint: env::var("VIDEO_UPLOAD_ENDPOINT").unwrap_or(default.video_endpoint),

            video_field: env::var("VIDEO_UPLOAD_FIELD").unwrap_or(default.video_field),

            request_timeout: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.request_timeout),

            connect_timeout: env::var("CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.connect_timeout),

            read_timeout: env::var("READ_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(default.read_timeout),

            download_dir: env::var("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(default.download_dir),
        }
    }

    /// Create config for local development (local endpoint, generous timeout)
    pub fn development() -> Self {
        Self {
            video_endpoint: "http://127.0.0.1:3000/upload".to_string(),
            request_timeout: Duration::from_secs(60),
            ..Self::default()
        }
    }
}
