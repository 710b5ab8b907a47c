use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use draw_layout::{
    ExtractOptions, ExtractionReport, GameProfile, ValueDomain, extract_draws_from_dump,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "tokens2draws",
    version,
    about = "Rebuild lottery draw rows from positioned PDF text tokens"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract draw rows from a token dump and print them as JSON.
    Extract(ExtractArgs),
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Token dump path (CSV `page,text,x,y`, or a `.json` array).
    #[arg(short, long)]
    input: PathBuf,

    /// Built-in game preset, e.g. pick3, lucky-day, keno.
    #[arg(short, long)]
    game: Option<String>,

    /// Values per draw row.
    #[arg(long)]
    arity: Option<usize>,

    /// Main value domain like 1-45.
    #[arg(long)]
    domain: Option<String>,

    /// Special value domain like 0-9; enables tag search.
    #[arg(long, conflicts_with = "no_special")]
    special: Option<String>,

    /// Disable the special tag search.
    #[arg(long)]
    no_special: bool,

    /// Rows carry no session marker; one draw per date.
    #[arg(long)]
    daily: bool,

    /// Page selection like 1-3,5.
    #[arg(long)]
    pages: Option<String>,

    /// Pretty-print the JSON report.
    #[arg(long)]
    pretty: bool,

    /// Enable verbose skip output.
    #[arg(short, long)]
    verbose: bool,
}

fn parse_domain(value: &str, flag: &str) -> Result<ValueDomain> {
    ValueDomain::from_str(value)
        .map_err(|error| anyhow!("{error}"))
        .with_context(|| format!("failed to parse {flag} '{value}'"))
}

fn parse_profile(args: &ExtractArgs) -> Result<GameProfile> {
    let mut profile = match args.game.as_deref() {
        Some(name) => GameProfile::from_str(name)
            .map_err(|error| anyhow!("{error}"))
            .context("failed to parse --game")?,
        None => {
            let (Some(arity), Some(domain)) = (args.arity, args.domain.as_deref()) else {
                anyhow::bail!("either --game or both --arity and --domain are required");
            };
            GameProfile::new("custom", arity, parse_domain(domain, "--domain")?)
        }
    };

    if let Some(arity) = args.arity {
        profile.arity = arity;
    }
    if let Some(domain) = args.domain.as_deref() {
        profile.domain = parse_domain(domain, "--domain")?;
    }
    if let Some(special) = args.special.as_deref() {
        profile.special = Some(parse_domain(special, "--special")?);
    }
    if args.no_special {
        profile.special = None;
    }
    if args.daily {
        profile = profile.daily();
    }
    Ok(profile)
}

fn parse_options(args: &ExtractArgs) -> Result<ExtractOptions> {
    let options = ExtractOptions::default();
    match args.pages.as_deref() {
        Some(spec) => options
            .with_page_spec(spec)
            .context("failed to parse --pages"),
        None => Ok(options),
    }
}

fn log_report(report: &ExtractionReport, verbose: bool) {
    if report.skips.is_empty() {
        return;
    }

    eprintln!("warning: {} row(s) skipped", report.skips.len());
    if verbose {
        for skip in &report.skips {
            let (x, y) = skip.session_position;
            eprintln!(
                "  - {:?} page={} pane={} at=({x:.1},{y:.1}): {}",
                skip.reason,
                skip.page,
                skip.pane,
                skip.reason.message()
            );
        }
        for page in &report.pages {
            eprintln!(
                "  page {}: built={} skipped={} attempts={} chosen={} skip_rate={:.2}",
                page.page,
                page.built,
                page.skipped,
                page.attempts,
                page.chosen_attempt,
                page.skip_rate
            );
        }
    }
}

fn write_report(report: &ExtractionReport, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)
    } else {
        serde_json::to_string(report)
    }
    .context("failed to serialize report")?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}").context("failed to write report")?;
    Ok(())
}

fn run_extract(args: &ExtractArgs) -> Result<ExtractionReport> {
    let profile = parse_profile(args)?;
    let options = parse_options(args)?;
    let report = extract_draws_from_dump(&args.input, &profile, &options)
        .with_context(|| format!("failed to extract draws from '{}'", args.input.display()))?;
    write_report(&report, args.pretty)?;
    Ok(report)
}

fn main() -> ExitCode {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("draw_layout=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Extract(args) => match run_extract(&args) {
            Ok(report) => {
                log_report(&report, args.verbose);
                if report.row_count > 0 {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            Err(error) => {
                eprintln!("error: {error:#}");
                ExitCode::from(1)
            }
        },
    }
}
