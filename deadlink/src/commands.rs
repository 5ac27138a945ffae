use crate::CLAP_STYLING;
use clap::{arg, command};
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("deadlink")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("deadlink")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Initializes the deadlink database on your filesystem")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Location to store the deadlink database")
                        .default_value("~/.config/deadlink/"),
                )
                .arg(
                    arg!(-f - -"force")
                        .help(
                            "Forces the overwriting of any existing database at the specified \
                        location.",
                        )
                        .required(false),
                ),
        )
        .subcommand(
            command!("scan")
                .about(
                    "Crawl a site or collection of sites, checking every same-domain link for \
                dead ends.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The seed URL to scan")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of seed URLs to scan")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-r --"requester" <ID>)
                        .required(false)
                        .help("Identity the results are recorded under")
                        .default_value("local"),
                )
                .arg(
                    arg!(-t --"workers" <NUM_WORKERS>)
                        .required(false)
                        .help("The number of async workers per scan (default: MAX_SCANNER_WORKERS or 10)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-d --"max-depth" <DEPTH>)
                        .required(false)
                        .help("Maximum link depth from the seed page (default: SCAN_MAX_DEPTH or 10)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"deadline" <SECONDS>)
                        .required(false)
                        .help("Wall-clock budget for each scan in seconds (default: SCAN_DEADLINE_SECS or 30)")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-request timeout in seconds (default: SCAN_REQUEST_TIMEOUT_SECS or 5)")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(--"max-redirects" <COUNT>)
                        .required(false)
                        .help("Redirects followed per request before giving up (default: SCAN_MAX_REDIRECTS or 5)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, csv, markdown")
                        .value_parser(["text", "json", "csv", "markdown"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"no-store")
                        .required(false)
                        .help("Do not persist results to the database")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"db" <PATH>)
                        .required(false)
                        .help("Path to the results database")
                        .default_value("~/.config/deadlink/deadlink.db"),
                ),
        )
        .subcommand(
            command!("results")
                .about("List stored link findings for a requester")
                .arg(
                    arg!(-r --"requester" <ID>)
                        .required(false)
                        .help("Identity the results were recorded under")
                        .default_value("local"),
                )
                .arg(
                    arg!(--"broken")
                        .required(false)
                        .help("Only show broken links")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"db" <PATH>)
                        .required(false)
                        .help("Path to the results database")
                        .default_value("~/.config/deadlink/deadlink.db"),
                ),
        )
}
