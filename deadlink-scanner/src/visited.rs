use std::collections::HashSet;
use tokio::sync::Mutex;

/// Per-scan set of URLs that have been claimed by a worker.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically mark `url` as visited. Only the first caller for a given URL
    /// gets `true`.
    pub async fn try_claim(&self, url: &str) -> bool {
        let mut urls = self.urls.lock().await;
        if urls.contains(url) {
            return false;
        }
        urls.insert(url.to_string())
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.urls.lock().await.contains(url)
    }

    pub async fn len(&self) -> usize {
        self.urls.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.urls.lock().await.is_empty()
    }
}
