use crate::result::{LinkOutcome, RequesterId, ScanResult};
use tracing::{info, warn};

/// Durable destination for scan findings. Implemented outside the scanner
/// (database, file, remote service).
pub trait ResultSink {
    fn persist(
        &self,
        requester: &RequesterId,
        seed_url: &str,
        outcome: &LinkOutcome,
    ) -> anyhow::Result<()>;
}

/// Summary of a [`persist_all`] run.
#[derive(Debug, Default)]
pub struct PersistReport {
    pub persisted: usize,
    /// `(url, error)` for every outcome the sink rejected.
    pub failures: Vec<(String, String)>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Hand every outcome of `result` to `sink`. A failed write is logged and
/// recorded; it never stops the remaining writes.
pub fn persist_all<S: ResultSink + ?Sized>(sink: &S, result: &ScanResult) -> PersistReport {
    let mut report = PersistReport::default();

    for outcome in &result.outcomes {
        match sink.persist(&result.requester, &result.seed_url, outcome) {
            Ok(()) => report.persisted += 1,
            Err(e) => {
                warn!("Failed to save result for {}: {:#}", outcome.url, e);
                report.failures.push((outcome.url.clone(), format!("{:#}", e)));
            }
        }
    }

    info!(
        "Persisted {}/{} outcomes for {}",
        report.persisted,
        result.outcomes.len(),
        result.seed_url
    );
    report
}
