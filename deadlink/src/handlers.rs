use clap::ArgMatches;
use colored::Colorize;
use deadlink_core::data::Database;
use deadlink_core::report::{ReportFormat, render_report, write_report};
use deadlink_core::scan::{ScanOptions, ScanResultCallback, execute_scan};
use deadlink_scanner::{RequesterId, ScanConfig, ScanResult, Termination, persist_all};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use url::Url;

const DB_FILE_NAME: &str = "deadlink.db";

/// Install the fmt subscriber. `RUST_LOG` wins over the default `warn` filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

// Helper functions for scan handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| parse_url_line(line.trim()))
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && url.has_host()
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if Url::parse(&with_scheme).is_ok() {
        return Some(with_scheme);
    }

    eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow(), line);
    None
}

/// Expand `~` in a user supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> String {
    print!("{} ", msg.bright_cyan().bold());
    let _ = io::stdout().flush();
    let mut response = String::new();
    if io::stdin().read_line(&mut response).is_err() {
        return String::new();
    }
    response.trim().to_lowercase()
}

pub fn handle_init(args: &ArgMatches) -> Result<(), String> {
    print_divider();
    println!("{}", "  DEADLINK INITIALIZATION".bright_white().bold());
    print_divider();
    println!();

    let config_dir = args
        .get_one::<String>("PATH")
        .map(|p| expand_path(p))
        .ok_or("No database location given")?;
    let force = args.get_flag("force");
    let db_path = config_dir.join(DB_FILE_NAME);

    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    if Database::exists(&db_path) {
        let overwrite = if force {
            println!(
                "{} Deleting existing database (force mode)",
                "→".yellow().bold()
            );
            true
        } else {
            println!("{}", "⚠ WARNING".yellow().bold());
            println!("Database already exists at:");
            println!(
                "  {} {}",
                "•".yellow(),
                db_path.display().to_string().bright_white()
            );
            println!();
            println!("{}", "Overwriting deletes every stored result.".yellow());

            let response = print_prompt("Do you want to overwrite it? [y/N]:");
            println!();
            response == "y" || response == "yes"
        };

        if !overwrite {
            println!("{} Keeping existing database", "→".blue());
            return Ok(());
        }

        Database::drop(&db_path)
            .map_err(|e| format!("Failed to remove {}: {}", db_path.display(), e))?;
        println!("{} Existing database removed", "✓".green().bold());
        println!();
    }

    println!("{} Creating directory structure...", "→".blue());
    fs::create_dir_all(&config_dir)
        .map_err(|e| format!("Failed to create {}: {}", config_dir.display(), e))?;

    println!("{} Creating database...", "→".blue());
    Database::new(&db_path).map_err(|e| format!("Failed to create database: {}", e))?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!();

    Ok(())
}

/// Build the scan configuration from the environment, then apply CLI overrides.
pub fn scan_config_from_args(sub_matches: &ArgMatches) -> ScanConfig {
    let mut config = ScanConfig::from_env();

    if let Some(workers) = sub_matches.get_one::<usize>("workers") {
        config = config.with_max_workers(*workers);
    }
    if let Some(depth) = sub_matches.get_one::<usize>("max-depth") {
        config = config.with_max_depth(*depth);
    }
    if let Some(secs) = sub_matches.get_one::<u64>("deadline") {
        config = config.with_scan_deadline(Duration::from_secs(*secs));
    }
    if let Some(secs) = sub_matches.get_one::<u64>("timeout") {
        config = config.with_request_timeout(Duration::from_secs(*secs));
    }
    if let Some(redirects) = sub_matches.get_one::<usize>("max-redirects") {
        config = config.with_max_redirects(*redirects);
    }

    config
}

fn open_database(path: &Path) -> Result<Database, String> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    Database::new(path).map_err(|e| format!("Failed to open database {}: {}", path.display(), e))
}

fn store_results(db: &Database, results: &[ScanResult]) {
    for result in results {
        let report = persist_all(db, result);
        if let Err(e) = db.record_scan(result) {
            warn!("failed to record scan of {}: {}", result.seed_url, e);
        }

        if report.is_complete() {
            println!(
                "{} Stored {} results for {}",
                "✓".green().bold(),
                report.persisted,
                result.seed_url
            );
        } else {
            eprintln!(
                "{} Stored {} results for {}, {} failed",
                "⚠".yellow().bold(),
                report.persisted,
                result.seed_url,
                report.failures.len()
            );
        }
    }
}

pub async fn handle_scan(sub_matches: &ArgMatches, quiet: bool) -> Result<(), String> {
    let url = sub_matches.get_one::<Url>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");
    let urls = load_urls_from_source(url, hosts_file)?;

    let requester = sub_matches
        .get_one::<String>("requester")
        .map(|r| RequesterId::new(r.as_str()))
        .unwrap_or_else(|| RequesterId::new("local"));
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = sub_matches.get_one::<PathBuf>("output");
    let no_store = sub_matches.get_flag("no-store");

    let config = scan_config_from_args(sub_matches);
    config.validate().map_err(|e| e.to_string())?;

    if !quiet {
        println!("\n{} Scanning {} site(s)", "→".blue().bold(), urls.len());
        println!("Workers: {}", config.max_workers);
        println!("Max depth: {}", config.max_depth);
        println!("Deadline: {}s\n", config.scan_deadline.as_secs());
    }

    let options = ScanOptions {
        urls,
        requester,
        config,
        show_progress_bars: !quiet,
    };

    let progress_callback = Arc::new(|msg: String| {
        eprintln!("{}", msg);
    });

    let result_callback: ScanResultCallback = Arc::new(move |result: &ScanResult| {
        if quiet {
            return;
        }
        let broken = result.broken().count();
        let marker = if broken == 0 {
            "✓".green().bold()
        } else {
            "✗".red().bold()
        };
        let partial = match result.termination {
            Termination::Completed => "",
            Termination::DeadlineExceeded => " (deadline exceeded)",
        };
        eprintln!(
            "{} {}: {} links, {} broken{}",
            marker,
            result.seed_url,
            result.len(),
            broken,
            partial
        );
    });

    let results = execute_scan(options, Some(progress_callback), Some(result_callback))
        .await
        .map_err(|e| format!("Scan failed: {}", e))?;

    if !no_store {
        let db_path = sub_matches
            .get_one::<String>("db")
            .map(|p| expand_path(p))
            .ok_or("No database path given")?;
        match open_database(&db_path) {
            Ok(db) => store_results(&db, &results),
            Err(e) => eprintln!("{} {}", "⚠".yellow().bold(), e),
        }
    }

    let report = render_report(&results, format)?;
    match output {
        Some(path) => {
            write_report(path, &report)
                .map_err(|e| format!("Failed to write report to {}: {}", path.display(), e))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", report),
    }

    Ok(())
}

pub fn handle_results(sub_matches: &ArgMatches) -> Result<(), String> {
    let requester = sub_matches
        .get_one::<String>("requester")
        .map(|r| RequesterId::new(r.as_str()))
        .unwrap_or_else(|| RequesterId::new("local"));
    let broken_only = sub_matches.get_flag("broken");
    let db_path = sub_matches
        .get_one::<String>("db")
        .map(|p| expand_path(p))
        .ok_or("No database path given")?;

    if !Database::exists(&db_path) {
        return Err(format!(
            "No database at {}. Run `deadlink init` first.",
            db_path.display()
        ));
    }

    let db = Database::new(&db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    let scans = db
        .get_scans_for_requester(&requester)
        .map_err(|e| format!("Failed to load scans: {}", e))?;
    let results = db
        .get_results_for_requester(&requester)
        .map_err(|e| format!("Failed to load results: {}", e))?;

    println!(
        "{} {} scan(s), {} result(s) for {}",
        "→".blue().bold(),
        scans.len(),
        results.len(),
        requester.as_str().bright_white()
    );
    println!();

    for result in results
        .iter()
        .filter(|r| !broken_only || r.status != "alive")
    {
        let label = if result.status == "alive" {
            result.status_label.green()
        } else {
            result.status_label.red()
        };
        println!("  {} {} {}", label, result.link_url, result.page_url.bright_black());
    }

    Ok(())
}
