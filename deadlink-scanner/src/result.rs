use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of whoever asked for a scan. Opaque to the scanner; only handed
/// back to the caller and to result sinks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequesterId(pub String);

impl RequesterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of a single liveness probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkStatus {
    Alive,
    NotFound,
    ClientError { code: u16 },
    ServerError { code: u16 },
    /// A final 1xx/3xx response that the client did not follow.
    Redirect { code: u16 },
    TooManyRedirects,
    Dead,
}

impl LinkStatus {
    /// Classify a final HTTP status code.
    pub fn from_status_code(code: u16) -> Self {
        match code {
            200..=299 => LinkStatus::Alive,
            404 => LinkStatus::NotFound,
            400..=499 => LinkStatus::ClientError { code },
            500..=599 => LinkStatus::ServerError { code },
            _ => LinkStatus::Redirect { code },
        }
    }

    pub fn is_alive(&self) -> bool {
        matches!(self, LinkStatus::Alive)
    }

    /// Short machine-friendly name, used for storage and CSV output.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkStatus::Alive => "alive",
            LinkStatus::NotFound => "not_found",
            LinkStatus::ClientError { .. } => "client_error",
            LinkStatus::ServerError { .. } => "server_error",
            LinkStatus::Redirect { .. } => "redirect",
            LinkStatus::TooManyRedirects => "too_many_redirects",
            LinkStatus::Dead => "dead",
        }
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Alive => write!(f, "alive"),
            LinkStatus::NotFound => write!(f, "not found"),
            LinkStatus::ClientError { code } => write!(f, "client error ({})", code),
            LinkStatus::ServerError { code } => write!(f, "server error ({})", code),
            LinkStatus::Redirect { code } => write!(f, "redirect ({})", code),
            LinkStatus::TooManyRedirects => write!(f, "too many redirects"),
            LinkStatus::Dead => write!(f, "dead"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub url: String,
    pub status: LinkStatus,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub error: Option<String>,
    pub depth: usize,
}

impl LinkOutcome {
    pub fn new(url: String, status: LinkStatus) -> Self {
        Self {
            url,
            status,
            status_code: None,
            content_type: None,
            error: None,
            depth: 0,
        }
    }

    pub fn with_error(url: String, status: LinkStatus, error: String) -> Self {
        Self {
            url,
            status,
            status_code: None,
            content_type: None,
            error: Some(error),
            depth: 0,
        }
    }

    /// True when the response body is worth handing to the link extractor.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_ref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(false)
    }
}

/// How a scan came to an end. Both variants are successful scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    Completed,
    DeadlineExceeded,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Completed => "completed",
            Termination::DeadlineExceeded => "deadline_exceeded",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub seed_url: String,
    pub requester: RequesterId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub termination: Termination,
    /// Links discovered but never queued because the frontier was full.
    pub dropped_links: usize,
    pub outcomes: Vec<LinkOutcome>,
}

impl ScanResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn get(&self, url: &str) -> Option<&LinkOutcome> {
        self.outcomes.iter().find(|o| o.url == url)
    }

    pub fn broken(&self) -> impl Iterator<Item = &LinkOutcome> {
        self.outcomes.iter().filter(|o| !o.status.is_alive())
    }
}
