use bytes::Bytes;
use std::fmt;
use std::path::Path;

/// Top level JSON object returned by upload endpoints.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// Media types accepted by the upload endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadKind {
    Jpeg,
    Png,
    QuickTime,
}

impl UploadKind {
    pub fn file_extension(self) -> &'static str {
        match self {
            UploadKind::Jpeg => ".jpg",
            UploadKind::Png => ".png",
            UploadKind::QuickTime => ".mov",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            UploadKind::Jpeg => "image/jpeg",
            UploadKind::Png => "image/png",
            UploadKind::QuickTime => "video/quicktime",
        }
    }

    /// Guess the upload kind from the last component of a local path.
    ///
    /// Matching is a substring test on the lowercased file name: `.jpg` or
    /// `jpeg` selects JPEG, `png` selects PNG and `.mov` selects QuickTime.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();

        if name.contains(".jpg") || name.contains("jpeg") {
            return Some(UploadKind::Jpeg);
        }
        if name.contains("png") {
            return Some(UploadKind::Png);
        }
        if name.contains(".mov") {
            return Some(UploadKind::QuickTime);
        }
        None
    }

    /// File name sent in the Content-Disposition header, e.g. `image.jpg`.
    pub fn upload_filename(self, stem: &str) -> String {
        format!("{}{}", stem, self.file_extension())
    }
}

/// Bytes that surround the raw file content of a single multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartFraming {
    pub prefix: Bytes,
    pub suffix: Bytes,
}

/// Identifier correlating a submitted background upload with its events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UploadTaskId(pub u64);

impl fmt::Display for UploadTaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a single upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Building,
    Staging,
    Submitted,
    Completed,
    Failed,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadPhase::Building => "building",
            UploadPhase::Staging => "staging",
            UploadPhase::Submitted => "submitted",
            UploadPhase::Completed => "completed",
            UploadPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Options,
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Trace,
    Connect,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Connect => "CONNECT",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Trace => reqwest::Method::TRACE,
            HttpMethod::Connect => reqwest::Method::CONNECT,
        }
    }
}
