use std::path::PathBuf;

use anyhow::Result;
use breakout_scanner::{
    config::{AppConfig, load_config_path},
    logging::init_logging,
    scanner::{ScanReport, Scanner},
};
use clap::Parser;
use market_data_ingestor::{
    models::report::{CombinedRecord, ReportKind},
    providers::{twse_openapi::TwseOpenApiProvider, yahoo_chart::YahooChartProvider},
};

#[derive(Parser)]
#[command(version, about = "Scan exchange securities for explosive volume breakouts")]
struct Cli {
    /// TOML configuration; defaults apply when omitted.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Only evaluate these security codes (repeatable).
    #[arg(long = "code", value_name = "CODE")]
    codes: Vec<String>,
    /// List the liquid universe without fetching any history.
    #[arg(long)]
    dry_run: bool,
}

fn print_record(record: &CombinedRecord) {
    let close = record
        .trade
        .closing_price
        .map_or_else(|| "-".to_string(), |c| format!("{c:.2}"));
    let volume = record
        .trade
        .trade_volume
        .map_or_else(|| "-".to_string(), |v| v.to_string());
    println!("{}\t{}\t{close}\t{volume}", record.code(), record.name());
}

fn print_missing(missing: &[ReportKind]) {
    if !missing.is_empty() {
        println!("# missing reports");
        missing.iter().for_each(|kind| println!("{kind}"));
    }
}

fn print_report(report: &ScanReport) {
    print_missing(&report.missing_reports);
    println!("# candidates");
    report.candidates().for_each(print_record);
    println!("# indeterminate");
    report.indeterminate().for_each(print_record);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config_path(path)?,
        None => AppConfig::default(),
    };
    let _guard = init_logging(&config.log)?;

    let mut scanner = Scanner::new(
        TwseOpenApiProvider::new()?,
        YahooChartProvider::new()?,
        config.scan,
    );
    if !cli.codes.is_empty() {
        scanner = scanner.with_codes(&cli.codes);
    }

    let universe = scanner.load_universe().await?;

    if cli.dry_run {
        print_missing(&universe.missing_reports);
        universe.securities.iter().for_each(print_record);
        return Ok(());
    }

    let report = scanner.evaluate(universe).await;
    print_report(&report);
    Ok(())
}
