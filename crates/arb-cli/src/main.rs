use arb_analysis::ranker::{ReportEntry, ReportSummary};
use arb_analysis::roi::{default_scenarios, evaluate, Scenario, ScenarioOutcome};
use arb_analysis::{analyze, AnalysisConfig, OpportunityReport, RateTable};
use arb_data::frankfurter::FrankfurterClient;
use arb_data::snapshot::{load_snapshot, save_snapshot};
use arb_data::{parse_instrument_list, Instrument, RateSnapshot};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{eyre, Context, Result};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

const DEFAULT_INSTRUMENTS: &str = "USD,EUR,GBP,MXN,JPY,CHF,CAD,AUD";

#[derive(Debug, Clone)]
struct AppContext {
    rates: FrankfurterClient,
}

#[derive(Parser, Debug)]
#[command(name = "arb-scan")]
#[command(about = "Cross-rate arbitrage detection over a snapshot of exchange rates")]
#[command(version)]
struct Cli {
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch or replay rates and rank every arbitrage opportunity.
    Scan(ScanArgs),
    /// Fetch a live rate snapshot and write it to disk.
    Fetch(FetchArgs),
    /// Compare deployment scenarios by break-even and ROI.
    Roi(RoiArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// Arguments for the `scan` subcommand.
///
/// Without `--snapshot` the rates are fetched live for `--instruments`.
/// With a snapshot, `--instruments` narrows the replay to a subset.
#[derive(Args, Debug)]
struct ScanArgs {
    /// Comma-separated instrument codes.
    #[arg(long)]
    instruments: Option<String>,

    /// Starting amount used for absolute profit figures.
    #[arg(long, default_value_t = 10_000.0)]
    notional: f64,

    /// Minimum |deviation| for a single-leg opportunity (0.00005 = 0.005%).
    #[arg(long, default_value_t = 0.00005)]
    threshold: f64,

    /// Replay a saved snapshot instead of fetching.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Write the rates used for this scan to a snapshot file.
    #[arg(long)]
    save_snapshot: Option<PathBuf>,

    /// Number of ranked opportunities to print.
    #[arg(long, default_value_t = 20)]
    top: usize,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Args, Debug)]
struct FetchArgs {
    #[arg(long, default_value = DEFAULT_INSTRUMENTS)]
    instruments: String,

    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct RoiArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    let ctx = AppContext {
        rates: FrankfurterClient::from_env()?,
    };

    match cli.command {
        Commands::Scan(args) => handle_scan(&ctx, args).await,
        Commands::Fetch(args) => handle_fetch(&ctx, args).await,
        Commands::Roi(args) => handle_roi(args),
    }
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        Level::WARN
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.as_str()))
        .wrap_err("failed to initialize tracing filter")?;

    // Reports go to stdout; keep logs off it so JSON and CSV stay parseable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn handle_scan(ctx: &AppContext, args: ScanArgs) -> Result<()> {
    if !(args.notional.is_finite() && args.notional > 0.0) {
        return Err(eyre!("--notional must be positive, got {}", args.notional));
    }
    if !(args.threshold.is_finite() && args.threshold >= 0.0) {
        return Err(eyre!("--threshold must be non-negative, got {}", args.threshold));
    }

    let (snapshot, instruments) = match &args.snapshot {
        Some(path) => {
            let snapshot = load_snapshot(path)?;
            let instruments = match &args.instruments {
                Some(list) => parse_instrument_list(list),
                None => snapshot.instruments.clone(),
            };
            (snapshot, instruments)
        }
        None => {
            let instruments =
                parse_instrument_list(args.instruments.as_deref().unwrap_or(DEFAULT_INSTRUMENTS));
            let snapshot = fetch_with_spinner(ctx, &instruments).await?;
            (snapshot, instruments)
        }
    };

    if let Some(path) = &args.save_snapshot {
        save_snapshot(&snapshot, path)?;
    }

    let table = RateTable::new(
        instruments,
        snapshot
            .quotes()
            .map(|(from, to, rate)| (from.clone(), to.clone(), rate)),
    )
    .wrap_err_with(|| format!("snapshot from {} cannot form a rate table", snapshot.source))?;

    let config = AnalysisConfig {
        notional: args.notional,
        leg_threshold: args.threshold,
    };
    let report = analyze(&table, &config);

    if !report.summary.corroboration.is_consistent() {
        warn!(
            evaluator_only = report.summary.corroboration.evaluator_only.len(),
            detector_only = report.summary.corroboration.detector_only.len(),
            "cycle evaluator and negative-cycle detector disagree"
        );
    }

    match args.output {
        OutputFormat::Table => print_scan_table(&snapshot, &table, &report, args.top),
        OutputFormat::Json => print_scan_json(&snapshot, &report, args.top),
        OutputFormat::Csv => print_scan_csv(&report, args.top),
    }
}

async fn handle_fetch(ctx: &AppContext, args: FetchArgs) -> Result<()> {
    let instruments = parse_instrument_list(&args.instruments);
    if instruments.len() < 2 {
        return Err(eyre!(
            "at least two instruments are required, got {:?}",
            args.instruments
        ));
    }

    let snapshot = fetch_with_spinner(ctx, &instruments).await?;
    save_snapshot(&snapshot, &args.out)?;

    info!(
        instruments = instruments.len(),
        quotes = snapshot.quote_count(),
        out = %args.out.display(),
        "fetch command finished"
    );
    Ok(())
}

fn handle_roi(args: RoiArgs) -> Result<()> {
    let scenarios = default_scenarios();
    let outcomes: Vec<ScenarioOutcome> = scenarios.iter().map(evaluate).collect();

    match args.output {
        OutputFormat::Table => {
            for (scenario, outcome) in scenarios.iter().zip(&outcomes) {
                print_scenario(scenario, outcome);
            }
            print_roi_comparison(&scenarios, &outcomes);
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct JsonScenario<'a> {
                scenario: &'a Scenario,
                outcome: &'a ScenarioOutcome,
            }

            let rows: Vec<JsonScenario<'_>> = scenarios
                .iter()
                .zip(&outcomes)
                .map(|(scenario, outcome)| JsonScenario { scenario, outcome })
                .collect();
            let json = serde_json::to_string_pretty(&rows).wrap_err("failed to serialize JSON")?;
            println!("{json}");
        }
        OutputFormat::Csv => {
            println!("scenario,upfront,monthly_costs,monthly_revenue,monthly_profit,capital,breakeven_months,first_year_roi,ongoing_roi");
            for (scenario, outcome) in scenarios.iter().zip(&outcomes) {
                println!(
                    "{},{},{},{},{},{},{},{},{}",
                    scenario.name,
                    scenario.upfront,
                    scenario.monthly_costs,
                    scenario.monthly_revenue,
                    outcome.monthly_profit,
                    scenario.capital,
                    optional(outcome.breakeven_months),
                    optional(outcome.first_year_roi),
                    optional(outcome.ongoing_roi),
                );
            }
        }
    }

    Ok(())
}

async fn fetch_with_spinner(ctx: &AppContext, instruments: &[Instrument]) -> Result<RateSnapshot> {
    let client = &ctx.rates;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .wrap_err("failed to create progress style")?,
    );
    pb.set_message(format!(
        "fetching {} bases from {}",
        instruments.len(),
        client.base_url()
    ));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = client.fetch_snapshot(instruments).await;
    match &result {
        Ok(snapshot) => pb.finish_with_message(format!("fetched {} quotes", snapshot.quote_count())),
        Err(_) => pb.abandon_with_message("fetch failed"),
    }

    result.wrap_err("failed to fetch rate snapshot")
}

fn print_scan_table(
    snapshot: &RateSnapshot,
    table: &RateTable,
    report: &OpportunityReport,
    top: usize,
) -> Result<()> {
    let mut matrix = Table::new();
    matrix.load_preset(UTF8_BORDERS_ONLY);
    let mut header = vec![String::from("from \\ to")];
    header.extend(table.instruments().iter().map(ToString::to_string));
    matrix.set_header(header);

    for (i, from) in table.instruments().iter().enumerate() {
        let mut row = vec![from.to_string()];
        row.extend((0..table.len()).map(|j| {
            if i == j {
                "-".to_string()
            } else {
                format!("{:.6}", table.rate_at(i, j))
            }
        }));
        matrix.add_row(row);
    }

    let as_of = snapshot
        .date
        .map(|date| date.to_string())
        .unwrap_or_else(|| "unknown date".to_string());
    println!("\nRates ({}, {as_of}):", snapshot.source);
    println!("{matrix}\n");

    if report.is_empty() {
        println!("No opportunities found.\n");
    } else {
        let mut ranked = Table::new();
        ranked.load_preset(UTF8_BORDERS_ONLY);
        ranked.set_header(vec![
            "#",
            "Kind",
            "Route",
            "Magnitude",
            "Profit @ Notional",
            "Legs",
        ]);

        for (rank, entry) in report.top(top).iter().enumerate() {
            ranked.add_row(vec![
                (rank + 1).to_string(),
                entry.kind.as_str().to_string(),
                entry.route(),
                format!("{:+.4}%", entry.magnitude * 100.0),
                format!("{:.2}", entry.absolute_profit),
                format_legs(entry),
            ]);
        }

        println!("{ranked}\n");
    }

    print_summary(&report.summary);
    Ok(())
}

fn print_summary(summary: &ReportSummary) {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Metric", "Value"]);

    let corroboration = &summary.corroboration;
    table.add_row(vec!["Instruments".to_string(), summary.instrument_count.to_string()]);
    table.add_row(vec!["Notional".to_string(), format!("{:.2}", summary.notional)]);
    table.add_row(vec![
        "Single-leg threshold".to_string(),
        format!("{:.4}%", summary.leg_threshold * 100.0),
    ]);
    table.add_row(vec![
        "Cycles evaluated".to_string(),
        summary.evaluated_cycles.to_string(),
    ]);
    table.add_row(vec![
        "Profitable cycles".to_string(),
        summary.cycle_opportunities.to_string(),
    ]);
    table.add_row(vec![
        "Bellman-Ford indicators (not deduplicated)".to_string(),
        format!(
            "{} across {} sources",
            summary.indicator_count, summary.sources_scanned
        ),
    ]);
    table.add_row(vec![
        "Unique negative cycles".to_string(),
        summary.unique_negative_cycles.to_string(),
    ]);
    table.add_row(vec![
        "Single-leg opportunities".to_string(),
        format!(
            "{} of {} pairs",
            summary.single_leg_opportunities, summary.single_leg_pairs
        ),
    ]);
    table.add_row(vec![
        "Detector agreement".to_string(),
        if corroboration.is_consistent() {
            format!(
                "consistent ({} agreed, {} within rounding tolerance)",
                corroboration.agreed.len(),
                corroboration.within_tolerance.len()
            )
        } else {
            format!(
                "MISMATCH ({} evaluator-only, {} detector-only)",
                corroboration.evaluator_only.len(),
                corroboration.detector_only.len()
            )
        },
    ]);

    println!("{table}\n");
}

fn print_scan_json(snapshot: &RateSnapshot, report: &OpportunityReport, top: usize) -> Result<()> {
    #[derive(Serialize)]
    struct JsonOutput<'a> {
        source: &'a str,
        date: Option<String>,
        instruments: &'a [Instrument],
        summary: &'a ReportSummary,
        opportunities: &'a [ReportEntry],
    }

    let output = JsonOutput {
        source: &snapshot.source,
        date: snapshot.date.map(|date| date.to_string()),
        instruments: &snapshot.instruments,
        summary: &report.summary,
        opportunities: report.top(top),
    };
    let json = serde_json::to_string_pretty(&output).wrap_err("failed to serialize JSON")?;
    println!("{json}");

    Ok(())
}

fn print_scan_csv(report: &OpportunityReport, top: usize) -> Result<()> {
    println!("rank,kind,instruments,magnitude,absolute_profit,via,direction,legs");

    for (rank, entry) in report.top(top).iter().enumerate() {
        let instruments = entry
            .instruments
            .iter()
            .map(Instrument::code)
            .collect::<Vec<_>>()
            .join("|");
        let direction = entry
            .direction
            .map(|d| format!("{d:?}").to_lowercase())
            .unwrap_or_default();
        println!(
            "{},{},{},{},{},{},{},{}",
            rank + 1,
            entry.kind.as_str(),
            instruments,
            entry.magnitude,
            entry.absolute_profit,
            entry.via.as_ref().map(Instrument::code).unwrap_or_default(),
            direction,
            format_legs(entry).replace(", ", "|"),
        );
    }

    Ok(())
}

fn print_scenario(scenario: &Scenario, outcome: &ScenarioOutcome) {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![scenario.name.as_str(), ""]);

    table.add_row(vec!["Upfront investment".to_string(), format_usd(scenario.upfront)]);
    table.add_row(vec![
        "Monthly operating costs".to_string(),
        format_usd(scenario.monthly_costs),
    ]);
    table.add_row(vec![
        "Total first year cost".to_string(),
        format_usd(outcome.first_year_cost),
    ]);
    table.add_row(vec![
        "Monthly revenue (est)".to_string(),
        format_usd(scenario.monthly_revenue),
    ]);
    table.add_row(vec!["Monthly profit".to_string(), format_usd(outcome.monthly_profit)]);
    table.add_row(vec![
        "First year profit".to_string(),
        format_usd(outcome.first_year_profit),
    ]);
    table.add_row(vec![
        "Annual profit (year 2+)".to_string(),
        format_usd(outcome.annual_profit),
    ]);
    table.add_row(vec![
        "Months to break even".to_string(),
        format_breakeven(outcome.breakeven_months),
    ]);
    table.add_row(vec![
        "First year ROI".to_string(),
        format_percent(outcome.first_year_roi),
    ]);
    table.add_row(vec![
        "Ongoing annual ROI".to_string(),
        format_percent(outcome.ongoing_roi),
    ]);
    table.add_row(vec!["Trading capital".to_string(), format_usd(scenario.capital)]);

    println!("\n{table}");
    for note in &scenario.notes {
        println!("  - {note}");
    }
}

fn print_roi_comparison(scenarios: &[Scenario], outcomes: &[ScenarioOutcome]) {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec![
        "Scenario",
        "Upfront",
        "Monthly Cost",
        "Monthly Revenue",
        "Monthly Profit",
        "Capital",
        "Break Even",
    ]);

    for (scenario, outcome) in scenarios.iter().zip(outcomes) {
        table.add_row(vec![
            scenario.name.clone(),
            format_usd(scenario.upfront),
            format_usd(scenario.monthly_costs),
            format_usd(scenario.monthly_revenue),
            format_usd(outcome.monthly_profit),
            format_usd(scenario.capital),
            format_breakeven(outcome.breakeven_months),
        ]);
    }

    println!("\nComparison:");
    println!("{table}\n");
}

fn format_legs(entry: &ReportEntry) -> String {
    entry
        .legs
        .iter()
        .map(|leg| format!("{}->{} {:.6}", leg.from, leg.to, leg.rate))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formats a dollar amount with thousands separators, e.g. `$135,000.00`.
fn format_usd(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (ix, digit) in whole.chars().enumerate() {
        if ix > 0 && (whole.len() - ix) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}${grouped}.{:02}", cents % 100)
}

fn format_breakeven(months: Option<f64>) -> String {
    months.map_or_else(|| "NEVER".to_string(), |m| format!("{m:.1} mo"))
}

fn format_percent(ratio: Option<f64>) -> String {
    ratio.map_or_else(|| "n/a".to_string(), |r| format!("{:.1}%", r * 100.0))
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usd_groups_thousands() {
        assert_eq!(format_usd(135_000.0), "$135,000.00");
        assert_eq!(format_usd(1_800.5), "$1,800.50");
        assert_eq!(format_usd(999.999), "$1,000.00");
        assert_eq!(format_usd(-117_000.0), "-$117,000.00");
        assert_eq!(format_usd(0.0), "$0.00");
    }

    #[test]
    fn breakeven_formats_never() {
        assert_eq!(format_breakeven(None), "NEVER");
        assert_eq!(format_breakeven(Some(90.0)), "90.0 mo");
    }

    #[test]
    fn cli_parses_scan_defaults() {
        let cli = Cli::try_parse_from(["arb-scan", "-v", "scan"]).expect("valid args");
        assert_eq!(cli.verbose, 1);
        let Commands::Scan(args) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.notional, 10_000.0);
        assert_eq!(args.threshold, 0.00005);
        assert_eq!(args.top, 20);
        assert_eq!(args.output, OutputFormat::Table);
        assert!(args.snapshot.is_none());
    }

    #[test]
    fn cli_parses_output_format() {
        let cli = Cli::try_parse_from(["arb-scan", "roi", "--output", "json"]).expect("valid args");
        let Commands::Roi(args) = cli.command else {
            panic!("expected roi");
        };
        assert_eq!(args.output, OutputFormat::Json);
    }
}
