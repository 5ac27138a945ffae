use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; DeadlinkScanner/0.1; +https://github.com/trapdoorsec/deadlink)";

/// Tunables for a single scan. Every threshold is configurable; the defaults
/// are what an unconfigured deployment gets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub max_workers: usize,
    pub max_depth: usize,
    pub scan_deadline: Duration,
    pub request_timeout: Duration,
    pub max_redirects: usize,
    pub max_response_bytes: usize,
    pub frontier_capacity: usize,
    pub poll_interval: Duration,
    pub user_agent: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            max_depth: 10,
            scan_deadline: Duration::from_secs(30),
            request_timeout: Duration::from_secs(5),
            max_redirects: 5,
            max_response_bytes: 1024 * 1024, // 1 MiB
            frontier_capacity: 1000,
            poll_interval: Duration::from_millis(100),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ScanConfig {
    /// Load from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Unparseable values are logged and
    /// replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(workers) = parse_var(&lookup, "MAX_SCANNER_WORKERS") {
            config.max_workers = workers;
        }

        if let Some(depth) = parse_var(&lookup, "SCAN_MAX_DEPTH") {
            config.max_depth = depth;
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "SCAN_DEADLINE_SECS") {
            config.scan_deadline = Duration::from_secs(secs);
        }

        if let Some(secs) = parse_var::<u64, _>(&lookup, "SCAN_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }

        if let Some(redirects) = parse_var(&lookup, "SCAN_MAX_REDIRECTS") {
            config.max_redirects = redirects;
        }

        if let Some(bytes) = parse_var(&lookup, "SCAN_MAX_RESPONSE_BYTES") {
            config.max_response_bytes = bytes;
        }

        if let Some(capacity) = parse_var(&lookup, "SCAN_FRONTIER_CAPACITY") {
            config.frontier_capacity = capacity;
        }

        if let Some(user_agent) = lookup("SCAN_USER_AGENT")
            && !user_agent.trim().is_empty()
        {
            config.user_agent = user_agent;
        }

        config
    }

    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_scan_deadline(mut self, deadline: Duration) -> Self {
        self.scan_deadline = deadline;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_redirects(mut self, redirects: usize) -> Self {
        self.max_redirects = redirects;
        self
    }

    pub fn with_frontier_capacity(mut self, capacity: usize) -> Self {
        self.frontier_capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(ScanError::InvalidConfig(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.frontier_capacity == 0 {
            return Err(ScanError::InvalidConfig(
                "frontier_capacity must be at least 1".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(ScanError::InvalidConfig(
                "poll_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("invalid {} '{}', falling back to default", key, raw);
            None
        }
    }
}
