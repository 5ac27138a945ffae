use colored::Colorize;

pub mod data;
pub mod report;
pub mod scan;

pub fn print_banner() {
    println!(
        "{} {}",
        "deadlink".bright_red().bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black()
    );
    println!("{}", "same-domain dead link scanner".bright_black());
    println!();
}
