use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, Notify};
use url::Url;

/// A unit of crawl work: check `url`, and maybe expand it.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlJob {
    pub url: String,
    pub base_url: Url,
    pub depth: usize,
}

/// Why a job was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    /// The queue is at capacity; the job is dropped, not retried.
    Full,
    Closed,
}

/// Bounded multi-producer, multi-consumer job queue.
///
/// Producers never wait: when the queue is full the job is rejected and the
/// caller drops it. Consumers wait in [`Frontier::pop`] until a job arrives or
/// the frontier is closed.
#[derive(Debug)]
pub struct Frontier {
    queue: Mutex<VecDeque<CrawlJob>>,
    capacity: usize,
    closed: AtomicBool,
    notify: Notify,
}

impl Frontier {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn try_push(&self, job: CrawlJob) -> Result<(), PushError> {
        {
            let mut queue = self.queue.lock().await;
            if self.closed.load(Ordering::Acquire) {
                return Err(PushError::Closed);
            }
            if queue.len() >= self.capacity {
                return Err(PushError::Full);
            }
            queue.push_back(job);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Next job, or `None` once the frontier is closed and drained.
    pub async fn pop(&self) -> Option<CrawlJob> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register interest before checking state so a concurrent
            // push/close between the check and the await is not missed.
            notified.as_mut().enable();

            {
                let mut queue = self.queue.lock().await;
                if let Some(job) = queue.pop_front() {
                    return Some(job);
                }
                if self.closed.load(Ordering::Acquire) {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Stop accepting jobs. Queued jobs are still handed out.
    pub async fn close(&self) {
        // Taken so close cannot interleave with a push's closed check.
        let _queue = self.queue.lock().await;
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Stop accepting jobs and throw away whatever is queued. Returns the
    /// number of discarded jobs.
    pub async fn close_and_discard(&self) -> usize {
        let mut queue = self.queue.lock().await;
        self.closed.store(true, Ordering::Release);
        let discarded = queue.len();
        queue.clear();
        self.notify.notify_waiters();
        discarded
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }
}
