use crate::aggregator::ResultAggregator;
use crate::checker::LinkChecker;
use crate::config::ScanConfig;
use crate::error::{Result, ScanError};
use crate::extractor::LinkExtractor;
use crate::frontier::{CrawlJob, Frontier, PushError};
use crate::normalize::parse_seed;
use crate::result::{RequesterId, ScanResult, Termination};
use crate::visited::VisitedSet;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(usize, String) + Send + Sync>;

/// Entry point for scans. One `Scanner` can run any number of scans, each
/// with its own visited set, frontier and results.
pub struct Scanner {
    config: ScanConfig,
    checker: LinkChecker,
    extractor: LinkExtractor,
    progress_callback: Option<ProgressCallback>,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let client = build_client(&config)?;

        Ok(Self {
            checker: LinkChecker::new(client.clone()),
            extractor: LinkExtractor::new(client, config.max_response_bytes),
            config,
            progress_callback: None,
        })
    }

    /// Called with `(worker_id, url)` each time a worker starts on a URL.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Crawl `seed_url` and check every same-domain link found.
    ///
    /// Only an unusable seed is an error. Unreachable pages, bad statuses and
    /// an expired deadline all produce a normal [`ScanResult`].
    pub async fn scan(&self, seed_url: &str, requester: RequesterId) -> Result<ScanResult> {
        let mut base_url = parse_seed(seed_url).map_err(ScanError::InvalidSeedUrl)?;
        base_url.set_fragment(None);

        info!(
            "Starting scan of {} for {} with {} workers",
            base_url, requester, self.config.max_workers
        );

        let session = Arc::new(ScanSession::new(
            base_url.clone(),
            requester,
            &self.config,
            self.checker.clone(),
            self.extractor.clone(),
            self.progress_callback.clone(),
        ));

        let worker_handles: Vec<_> = (0..self.config.max_workers)
            .map(|worker_id| tokio::spawn(run_worker(worker_id, session.clone())))
            .collect();

        session
            .dispatch(CrawlJob {
                url: base_url.to_string(),
                base_url,
                depth: 0,
            })
            .await;

        let termination = tokio::select! {
            _ = session.wait_until_idle(self.config.poll_interval) => {
                session.frontier.close().await;
                Termination::Completed
            }
            _ = tokio::time::sleep_until(session.deadline) => {
                let discarded = session.frontier.close_and_discard().await;
                warn!(
                    "Scan of {} timed out after {:?}, discarded {} queued jobs",
                    session.seed_url, self.config.scan_deadline, discarded
                );
                Termination::DeadlineExceeded
            }
        };

        for handle in join_all(worker_handles).await {
            handle?;
        }

        let result = session.finish(termination).await;
        info!(
            "Scan of {} {}. Found {} links",
            result.seed_url,
            termination.as_str(),
            result.outcomes.len()
        );
        Ok(result)
    }
}

/// Builds the shared HTTP client: user agent, per-request timeout and
/// redirect cap all live here.
pub fn build_client(config: &ScanConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout)
        .connect_timeout(config.request_timeout)
        .pool_max_idle_per_host(config.max_workers)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .build()?;
    Ok(client)
}

/// State owned by exactly one scan.
struct ScanSession {
    seed_url: String,
    requester: RequesterId,
    started_at: DateTime<Utc>,
    deadline: Instant,
    max_depth: usize,
    checker: LinkChecker,
    extractor: LinkExtractor,
    progress_callback: Option<ProgressCallback>,
    visited: VisitedSet,
    frontier: Frontier,
    aggregator: ResultAggregator,
    /// Jobs queued or being processed. Zero means the crawl is done.
    active_jobs: AtomicUsize,
    dropped_links: AtomicUsize,
}

impl ScanSession {
    fn new(
        base_url: Url,
        requester: RequesterId,
        config: &ScanConfig,
        checker: LinkChecker,
        extractor: LinkExtractor,
        progress_callback: Option<ProgressCallback>,
    ) -> Self {
        Self {
            seed_url: base_url.to_string(),
            requester,
            started_at: Utc::now(),
            deadline: Instant::now() + config.scan_deadline,
            max_depth: config.max_depth,
            checker,
            extractor,
            progress_callback,
            visited: VisitedSet::new(),
            frontier: Frontier::new(config.frontier_capacity),
            aggregator: ResultAggregator::new(),
            active_jobs: AtomicUsize::new(0),
            dropped_links: AtomicUsize::new(0),
        }
    }

    /// Queue a job, counting it as active before it becomes visible to
    /// workers. Returns false when the job was dropped.
    async fn dispatch(&self, job: CrawlJob) -> bool {
        self.active_jobs.fetch_add(1, Ordering::AcqRel);
        let url = job.url.clone();

        match self.frontier.try_push(job).await {
            Ok(()) => true,
            Err(PushError::Full) => {
                self.active_jobs.fetch_sub(1, Ordering::AcqRel);
                self.dropped_links.fetch_add(1, Ordering::Relaxed);
                debug!("Frontier full, dropping {}", url);
                false
            }
            Err(PushError::Closed) => {
                self.active_jobs.fetch_sub(1, Ordering::AcqRel);
                false
            }
        }
    }

    async fn process(&self, worker_id: usize, job: CrawlJob) {
        if !self.visited.try_claim(&job.url).await {
            debug!("Worker {}: {} already claimed", worker_id, job.url);
            return;
        }

        if let Some(ref callback) = self.progress_callback {
            callback(worker_id, job.url.clone());
        }

        debug!(
            "Worker {}: checking {} (depth: {})",
            worker_id, job.url, job.depth
        );

        let mut outcome = self.checker.check(&job.url).await;
        outcome.depth = job.depth;
        let expand = outcome.status.is_alive() && outcome.is_html() && job.depth < self.max_depth;
        self.aggregator.record(outcome).await;

        if !expand || self.frontier.is_closed() {
            return;
        }

        // A deadline hit mid-extraction makes the dispatches below return Closed.

        let links = self.extractor.extract(&job.url, &job.base_url).await;
        let mut queued = 0;
        for link in links {
            if self.visited.contains(&link).await {
                continue;
            }
            let child = CrawlJob {
                url: link,
                base_url: job.base_url.clone(),
                depth: job.depth + 1,
            };
            if self.dispatch(child).await {
                queued += 1;
            }
        }

        debug!("Worker {}: queued {} links from {}", worker_id, queued, job.url);
    }

    /// Resolves once no job is queued or in flight.
    async fn wait_until_idle(&self, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        loop {
            ticker.tick().await;
            if self.active_jobs.load(Ordering::Acquire) == 0 {
                return;
            }
        }
    }

    async fn finish(&self, termination: Termination) -> ScanResult {
        ScanResult {
            seed_url: self.seed_url.clone(),
            requester: self.requester.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            termination,
            dropped_links: self.dropped_links.load(Ordering::Relaxed),
            outcomes: self.aggregator.drain().await,
        }
    }
}

async fn run_worker(worker_id: usize, session: Arc<ScanSession>) {
    debug!("Worker {} started", worker_id);

    while let Some(job) = session.frontier.pop().await {
        session.process(worker_id, job).await;
        session.active_jobs.fetch_sub(1, Ordering::AcqRel);
    }

    debug!("Worker {} finished", worker_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::LinkStatus;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex as StdMutex;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    /// Mount a page answering both HEAD (headers only) and GET (with body).
    async fn mount_page(server: &MockServer, route: &str, status: u16, content_type: &str, body: &str) {
        Mock::given(method("HEAD"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).insert_header("content-type", content_type))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(status).set_body_raw(body.to_string(), content_type),
            )
            .mount(server)
            .await;
    }

    fn scanner(config: ScanConfig) -> Scanner {
        Scanner::new(config.with_request_timeout(Duration::from_secs(2))).unwrap()
    }

    fn requester() -> RequesterId {
        RequesterId::new("tester")
    }

    fn assert_unique(result: &ScanResult) {
        let unique: HashSet<&str> = result.outcomes.iter().map(|o| o.url.as_str()).collect();
        assert_eq!(unique.len(), result.outcomes.len(), "duplicate outcomes");
    }

    /// Seed links to /a (alive) and /b (404); /a links on to /c.
    #[tokio::test]
    async fn test_alive_and_not_found_scenario() {
        let mock_server = MockServer::start().await;
        let uri = mock_server.uri();

        mount_page(
            &mock_server,
            "/",
            200,
            "text/html",
            r#"<html><body><a href="/a">A</a><a href="/b">B</a></body></html>"#,
        )
        .await;
        mount_page(&mock_server, "/a", 200, "text/html", r#"<a href="/c">C</a>"#).await;
        mount_page(&mock_server, "/c", 200, "text/plain", "leaf").await;

        Mock::given(method("HEAD"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(404))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = scanner(ScanConfig::default().with_max_workers(4))
            .scan(&uri, requester())
            .await
            .unwrap();

        assert_eq!(result.termination, Termination::Completed);
        assert_eq!(result.len(), 4);
        assert_unique(&result);

        let root = result.get(&format!("{}/", uri)).unwrap();
        assert_eq!(root.status, LinkStatus::Alive);
        assert_eq!(root.depth, 0);

        let a = result.get(&format!("{}/a", uri)).unwrap();
        assert_eq!(a.status, LinkStatus::Alive);
        assert_eq!(a.depth, 1);

        let b = result.get(&format!("{}/b", uri)).unwrap();
        assert_eq!(b.status, LinkStatus::NotFound);
        assert_eq!(b.status_code, Some(404));

        let c = result.get(&format!("{}/c", uri)).unwrap();
        assert_eq!(c.status, LinkStatus::Alive);
        assert_eq!(c.depth, 2);
    }

    #[tokio::test]
    async fn test_self_link_processed_once() {
        let mock_server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    r##"<a href="/">home</a><a href="">again</a><a href="/#top">top</a>"##,
                    "text/html",
                ),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = scanner(ScanConfig::default().with_max_workers(3))
            .scan(&mock_server.uri(), requester())
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.outcomes[0].status, LinkStatus::Alive);
    }

    #[tokio::test]
    async fn test_non_navigable_links_yield_no_jobs() {
        let mock_server = MockServer::start().await;
        mount_page(
            &mock_server,
            "/",
            200,
            "text/html",
            r##"<a href="#section">s</a><a href="mailto:a@b.com">m</a><a href="tel:123">t</a>"##,
        )
        .await;

        let result = scanner(ScanConfig::default())
            .scan(&mock_server.uri(), requester())
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.dropped_links, 0);
    }

    #[tokio::test]
    async fn test_cross_domain_links_are_never_checked() {
        let mock_server = MockServer::start().await;
        let uri = mock_server.uri();
        let port = Url::parse(&uri).unwrap().port().unwrap();

        let html = format!(
            r#"<a href="/local">local</a>
               <a href="http://localhost:{port}/same-server-other-host">other host</a>
               <a href="http://other.invalid/x">elsewhere</a>"#
        );
        mount_page(&mock_server, "/", 200, "text/html", &html).await;
        mount_page(&mock_server, "/local", 200, "text/plain", "ok").await;

        let result = scanner(ScanConfig::default())
            .scan(&uri, requester())
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        for outcome in &result.outcomes {
            let host = Url::parse(&outcome.url).unwrap().host_str().unwrap().to_string();
            assert_eq!(host, "127.0.0.1", "unexpected outcome for {}", outcome.url);
        }
    }

    #[tokio::test]
    async fn test_off_domain_redirect_target_is_not_expanded() {
        let mock_server = MockServer::start().await;
        let uri = mock_server.uri();
        let port = Url::parse(&uri).unwrap().port().unwrap();

        mount_page(&mock_server, "/", 200, "text/html", r#"<a href="/out">out</a>"#).await;
        Mock::given(path("/out"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("http://localhost:{port}/foreign")),
            )
            .mount(&mock_server)
            .await;
        mount_page(
            &mock_server,
            "/foreign",
            200,
            "text/html",
            &format!(r#"<a href="{uri}/only-linked-from-foreign">x</a>"#),
        )
        .await;
        Mock::given(path("/only-linked-from-foreign"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = scanner(ScanConfig::default())
            .scan(&uri, requester())
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        let out = result.get(&format!("{}/out", uri)).unwrap();
        assert_eq!(out.status, LinkStatus::Alive);
        assert!(result.get(&format!("{}/only-linked-from-foreign", uri)).is_none());
    }

    #[tokio::test]
    async fn test_max_depth_zero_checks_only_seed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = scanner(ScanConfig::default().with_max_depth(0))
            .scan(&mock_server.uri(), requester())
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.outcomes[0].status, LinkStatus::Alive);
    }

    #[tokio::test]
    async fn test_unreachable_seed_is_dead_and_terminates() {
        let result = scanner(ScanConfig::default())
            .scan("http://127.0.0.1:1/", requester())
            .await
            .unwrap();

        assert_eq!(result.termination, Termination::Completed);
        assert_eq!(result.len(), 1);
        assert_eq!(result.outcomes[0].status, LinkStatus::Dead);
    }

    #[tokio::test]
    async fn test_invalid_seed_starts_no_workers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let scanner = scanner(ScanConfig::default()).with_progress_callback(Arc::new(
            move |_worker_id: usize, _url: String| {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            },
        ));

        for seed in ["not a url", "example.com/no-scheme", "mailto:a@b.com", ""] {
            let result = scanner.scan(seed, requester()).await;
            assert!(
                matches!(result, Err(ScanError::InvalidSeedUrl(_))),
                "{:?} should be rejected",
                seed
            );
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_full_frontier_drops_links() {
        let mock_server = MockServer::start().await;

        let mut html = String::new();
        for i in 1..=5 {
            html.push_str(&format!(r#"<a href="/page{i}">{i}</a>"#));
        }
        mount_page(&mock_server, "/", 200, "text/html", &html).await;
        for i in 1..=5 {
            mount_page(&mock_server, &format!("/page{i}"), 200, "text/plain", "leaf").await;
        }

        let config = ScanConfig::default()
            .with_max_workers(1)
            .with_frontier_capacity(2);
        let result = scanner(config)
            .scan(&mock_server.uri(), requester())
            .await
            .unwrap();

        assert_eq!(result.termination, Termination::Completed);
        assert_eq!(result.len(), 3);
        assert_eq!(result.dropped_links, 3);
    }

    #[tokio::test]
    async fn test_deadline_returns_partial_results() {
        let mock_server = MockServer::start().await;

        let mut html = String::new();
        for i in 1..=5 {
            html.push_str(&format!(r#"<a href="/slow{i}">{i}</a>"#));
        }
        mount_page(&mock_server, "/", 200, "text/html", &html).await;
        for i in 1..=5 {
            Mock::given(method("HEAD"))
                .and(path(format!("/slow{i}")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/plain")
                        .set_delay(Duration::from_millis(400)),
                )
                .mount(&mock_server)
                .await;
        }

        let config = ScanConfig::default()
            .with_max_workers(1)
            .with_scan_deadline(Duration::from_millis(500));
        let result = scanner(config)
            .scan(&mock_server.uri(), requester())
            .await
            .unwrap();

        assert_eq!(result.termination, Termination::DeadlineExceeded);
        assert!(!result.is_empty());
        assert!(result.len() < 6, "expected a partial result, got {}", result.len());
        assert_unique(&result);
    }

    #[tokio::test]
    async fn test_scans_do_not_share_state() {
        let mock_server = MockServer::start().await;
        mount_page(&mock_server, "/", 200, "text/html", r#"<a href="/a">A</a>"#).await;
        mount_page(&mock_server, "/a", 200, "text/plain", "leaf").await;

        let scanner = scanner(ScanConfig::default());
        let first = scanner.scan(&mock_server.uri(), requester()).await.unwrap();
        let second = scanner
            .scan(&mock_server.uri(), RequesterId::new("someone-else"))
            .await
            .unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(second.requester, RequesterId::new("someone-else"));

        let mut first_urls: Vec<_> = first.outcomes.iter().map(|o| &o.url).collect();
        let mut second_urls: Vec<_> = second.outcomes.iter().map(|o| &o.url).collect();
        first_urls.sort();
        second_urls.sort();
        assert_eq!(first_urls, second_urls);
    }

    /// Test that multiple workers are actually used during scanning
    #[tokio::test]
    async fn test_multiple_workers_are_used() {
        let worker_activity: Arc<StdMutex<HashMap<usize, Vec<String>>>> =
            Arc::new(StdMutex::new(HashMap::new()));
        let worker_activity_clone = worker_activity.clone();

        let mock_server = MockServer::start().await;

        let mut root_html = String::from("<html><body>");
        for i in 1..=10 {
            root_html.push_str(&format!(r#"<a href="/page{}">Page {}</a>"#, i, i));
        }
        root_html.push_str("</body></html>");
        mount_page(&mock_server, "/", 200, "text/html", &root_html).await;

        for i in 1..=10 {
            Mock::given(method("HEAD"))
                .and(path(format!("/page{}", i)))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "text/plain")
                        .set_delay(Duration::from_millis(50)),
                )
                .mount(&mock_server)
                .await;
        }

        let scanner = scanner(ScanConfig::default().with_max_workers(4)).with_progress_callback(
            Arc::new(move |worker_id: usize, url: String| {
                worker_activity_clone
                    .lock()
                    .unwrap()
                    .entry(worker_id)
                    .or_default()
                    .push(url);
            }),
        );

        let result = scanner.scan(&mock_server.uri(), requester()).await.unwrap();
        assert_eq!(result.len(), 11);

        let activity = worker_activity.lock().unwrap();
        let processed: usize = activity.values().map(|urls| urls.len()).sum();
        assert_eq!(processed, 11);
        assert!(
            activity.len() > 1,
            "Expected multiple workers to be used, got distribution {:?}",
            activity.iter().map(|(k, v)| (k, v.len())).collect::<Vec<_>>()
        );
    }
}
