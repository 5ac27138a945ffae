use crate::result::{LinkOutcome, LinkStatus};
use reqwest::{Client, Method, Response};
use tracing::debug;

/// Liveness probe for a single URL.
#[derive(Debug, Clone)]
pub struct LinkChecker {
    client: Client,
}

impl LinkChecker {
    /// The client is expected to carry the user agent, per-request timeout
    /// and redirect limit.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// HEAD the URL, falling back to a single GET when the HEAD request fails
    /// at the transport level. Never fails; problems become the outcome.
    pub async fn check(&self, url: &str) -> LinkOutcome {
        let response = match self.request(Method::HEAD, url).await {
            Ok(response) => Ok(response),
            Err(e) if is_retryable(&e) => {
                debug!("HEAD {} failed ({}), retrying with GET", url, e);
                self.request(Method::GET, url).await
            }
            Err(e) => Err(e),
        };

        match response {
            Ok(response) => classify_response(url, &response),
            Err(e) => classify_error(url, &e),
        }
    }

    async fn request(&self, method: Method, url: &str) -> reqwest::Result<Response> {
        self.client.request(method, url).send().await
    }
}

/// Transport-level failures that a GET might get past. Status codes never
/// reach here, and a redirect loop will not improve with another method.
fn is_retryable(error: &reqwest::Error) -> bool {
    !error.is_redirect() && !error.is_builder()
}

fn classify_response(url: &str, response: &Response) -> LinkOutcome {
    let code = response.status().as_u16();
    let status = LinkStatus::from_status_code(code);

    let mut outcome = LinkOutcome::new(url.to_string(), status);
    outcome.status_code = Some(code);

    if outcome.status.is_alive() {
        outcome.content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
    }

    outcome
}

fn classify_error(url: &str, error: &reqwest::Error) -> LinkOutcome {
    let status = if error.is_redirect() {
        LinkStatus::TooManyRedirects
    } else {
        LinkStatus::Dead
    };

    debug!("{} classified as {}: {}", url, status, error);
    LinkOutcome::with_error(url.to_string(), status, error.to_string())
}
