use crate::result::LinkOutcome;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Collects one outcome per checked URL for the lifetime of a scan.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    outcomes: Mutex<HashMap<String, LinkOutcome>>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an outcome. The visited set guarantees a single writer per URL;
    /// a second record for the same URL keeps the first one.
    pub async fn record(&self, outcome: LinkOutcome) {
        let mut outcomes = self.outcomes.lock().await;
        outcomes.entry(outcome.url.clone()).or_insert(outcome);
    }

    pub async fn len(&self) -> usize {
        self.outcomes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.outcomes.lock().await.is_empty()
    }

    /// Take every recorded outcome, leaving the aggregator empty.
    pub async fn drain(&self) -> Vec<LinkOutcome> {
        let mut outcomes = self.outcomes.lock().await;
        outcomes.drain().map(|(_, outcome)| outcome).collect()
    }
}
