use deadlink_scanner::{RequesterId, ScanConfig, ScanResult, Scanner};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

/// Options for configuring a scan run
pub struct ScanOptions {
    pub urls: Vec<String>,
    pub requester: RequesterId,
    pub config: ScanConfig,
    pub show_progress_bars: bool,
}

/// Callback for reporting scan progress
pub type ScanProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback for receiving each seed's result as soon as its scan finishes
pub type ScanResultCallback = Arc<dyn Fn(&ScanResult) + Send + Sync>;

/// Extract the path component from a URL
pub fn extract_url_path(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| {
            let path = u.path().to_string();
            if path.is_empty() || path == "/" {
                "/".to_string()
            } else {
                path
            }
        })
        .unwrap_or_else(|| url.to_string())
}

/// Scan every seed in `options.urls`, one after the other.
///
/// A seed that fails validation is reported through `progress_callback` and
/// skipped; the remaining seeds still run.
pub async fn execute_scan(
    options: ScanOptions,
    progress_callback: Option<ScanProgressCallback>,
    result_callback: Option<ScanResultCallback>,
) -> Result<Vec<ScanResult>, String> {
    let ScanOptions {
        urls,
        requester,
        config,
        show_progress_bars,
    } = options;

    if urls.is_empty() {
        return Err("No seed URLs provided".to_string());
    }

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .map_err(|e| format!("Invalid progress template: {}", e))?,
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("Starting scan...");
        Some(Arc::new(pb))
    } else {
        None
    };

    let checked_count = Arc::new(AtomicUsize::new(0));

    let mut scanner =
        Scanner::new(config).map_err(|e| format!("Failed to create scanner: {}", e))?;

    if let Some(ref pb) = progress_bar {
        let pb_clone = pb.clone();
        let count_clone = checked_count.clone();
        scanner = scanner.with_progress_callback(Arc::new(move |_worker_id: usize, url: String| {
            let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
            pb_clone.set_message(format!(
                "Checking... {} links checked ({})",
                count,
                extract_url_path(&url)
            ));
        }));
    }

    let mut all_results = Vec::new();
    for (idx, url_str) in urls.iter().enumerate() {
        if let Some(ref callback) = progress_callback
            && urls.len() > 1
        {
            callback(format!(
                "Scanning site {}/{}: {}",
                idx + 1,
                urls.len(),
                url_str
            ));
        }

        match scanner.scan(url_str, requester.clone()).await {
            Ok(result) => {
                if let Some(ref callback) = result_callback {
                    callback(&result);
                }
                all_results.push(result);
            }
            Err(e) => {
                if let Some(ref callback) = progress_callback {
                    callback(format!("[!]  Failed to scan {}: {}", url_str, e));
                }
            }
        }
    }

    if let Some(ref pb) = progress_bar {
        let total = checked_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!("Scan complete! {} links checked", total));
    }

    Ok(all_results)
}
