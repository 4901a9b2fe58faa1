use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use url::Url;

/// Set of URLs whose download is currently in flight.
///
/// Every read and mutation goes through one mutex and no I/O happens while it
/// is held. Construct one per process (or per test) and share it via `Arc`.
#[derive(Debug, Default)]
pub struct DownloadRegistry {
    in_flight: Mutex<HashSet<Url>>,
}

impl DownloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashSet<Url>> {
        // The set stays consistent even if a holder panicked
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically claim `url`. Returns `true` only for the caller that
    /// inserted it.
    pub fn try_begin(&self, url: &Url) -> bool {
        let inserted = self.entries().insert(url.clone());
        if !inserted {
            tracing::debug!("Download already in flight: {}", url);
        }
        inserted
    }

    /// Release `url`. Releasing an absent URL is a no-op.
    pub fn end(&self, url: &Url) {
        self.entries().remove(url);
    }

    pub fn contains(&self, url: &Url) -> bool {
        self.entries().contains(url)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Claim `url` and return a guard that releases it on drop.
    pub fn acquire(self: &Arc<Self>, url: &Url) -> Option<DownloadGuard> {
        self.try_begin(url).then(|| DownloadGuard {
            registry: Arc::clone(self),
            url: url.clone(),
        })
    }
}

/// Releases its URL from the registry when dropped.
#[derive(Debug)]
pub struct DownloadGuard {
    registry: Arc<DownloadRegistry>,
    url: Url,
}

impl DownloadGuard {
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Drop for DownloadGuard {
    fn drop(&mut self) {
        self.registry.end(&self.url);
    }
}
