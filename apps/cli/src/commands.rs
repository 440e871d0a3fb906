//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use dealscout_core::pipeline::{self, PipelineReport, ProgressReporter};
use dealscout_core::{RunState, score_card};
use dealscout_shared::{AppConfig, CompanyId, CompanyRecord, Field, init_config, load_config};
use dealscout_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DealScout: private-equity deal sourcing from the command line.
#[derive(Parser)]
#[command(
    name = "dealscout",
    version,
    about = "Discover, enrich, and score small-business acquisition targets.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Database path (overrides `defaults.database_path`).
    #[arg(long, global = true, env = "DEALSCOUT_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the configured places queries and store new companies.
    Discover,

    /// Run one enrichment pass over pending and partial companies.
    Enrich {
        /// Records fetched per page (defaults to `defaults.batch_size`).
        #[arg(long)]
        batch_size: Option<u32>,
    },

    /// Score every stored company.
    Score,

    /// Discover, enrich, then score.
    Run,

    /// Show one company with its score breakdown.
    Show {
        /// Company id (UUID).
        id: String,
    },

    /// List companies, best score first.
    List {
        /// Maximum rows to print.
        #[arg(long, default_value = "25")]
        limit: u32,
    },

    /// Show how many companies are in each enrichment status.
    Status,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "dealscout=info",
        1 => "dealscout=debug",
        _ => "dealscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let db = cli.db.as_deref();
    match cli.command {
        Command::Discover => cmd_discover(db).await,
        Command::Enrich { batch_size } => cmd_enrich(db, batch_size).await,
        Command::Score => cmd_score(db).await,
        Command::Run => cmd_run(db).await,
        Command::Show { id } => cmd_show(db, &id).await,
        Command::List { limit } => cmd_list(db, limit).await,
        Command::Status => cmd_status(db).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

fn database_path(config: &AppConfig, db: Option<&Path>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(config.defaults.resolve_database_path()?),
    }
}

async fn open_storage(config: &AppConfig, db: Option<&Path>) -> Result<Storage> {
    let path = database_path(config, db)?;
    info!(path = %path.display(), "opening database");
    Ok(Storage::open(&path).await?)
}

async fn open_storage_readonly(config: &AppConfig, db: Option<&Path>) -> Result<Storage> {
    let path = database_path(config, db)?;
    if !path.exists() {
        return Err(eyre!(
            "no database at '{}'. Run `dealscout discover` first.",
            path.display()
        ));
    }
    Ok(Storage::open_readonly(&path).await?)
}

/// Forward Ctrl-C to the run state. A second Ctrl-C while a stop is pending exits.
fn stop_on_ctrl_c(run_state: &Arc<RunState>) -> JoinHandle<()> {
    let state = Arc::clone(run_state);
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if state.should_stop() {
                eprintln!("\nForced exit.");
                std::process::exit(130);
            }
            if state.request_stop() {
                eprintln!("\nStopping after the current record... (Ctrl-C again to force)");
            } else {
                eprintln!("\nNo job running yet, nothing to stop.");
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Job commands
// ---------------------------------------------------------------------------

async fn cmd_discover(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let run_state = RunState::shared();
    let signals = stop_on_ctrl_c(&run_state);
    let reporter = CliProgress::new();

    let result = pipeline::run_discovery(&config, &storage, &run_state, &reporter).await;
    signals.abort();
    reporter.finish();
    let summary = result?;

    println!();
    println!("  Discovery {}", finished_or_stopped(summary.stopped));
    println!("  Queries:  {}", summary.queries);
    println!("  New:      {}", summary.inserted);
    println!("  Updated:  {}", summary.updated);
    if summary.failed_queries > 0 {
        println!("  Failed:   {}", summary.failed_queries);
    }
    println!();
    Ok(())
}

async fn cmd_enrich(db: Option<&Path>, batch_size: Option<u32>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let run_state = RunState::shared();
    let signals = stop_on_ctrl_c(&run_state);
    let reporter = CliProgress::new();

    let result =
        pipeline::run_enrichment(&config, &storage, &run_state, batch_size, &reporter).await;
    signals.abort();
    reporter.finish();
    let summary = result?;

    println!();
    println!("  Enrichment {}", finished_or_stopped(summary.stopped));
    println!("  Processed:       {}", summary.processed);
    println!("  Complete:        {}", summary.completed);
    println!("  Partial:         {}", summary.partial);
    println!("  Module failures: {}", summary.module_failures);
    println!();
    Ok(())
}

async fn cmd_score(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let run_state = RunState::shared();
    let signals = stop_on_ctrl_c(&run_state);
    let reporter = CliProgress::new();

    let result = pipeline::run_scoring(&storage, &run_state, &reporter).await;
    signals.abort();
    reporter.finish();
    let summary = result?;

    println!();
    println!("  Scoring {}", finished_or_stopped(summary.stopped));
    println!("  Scored: {}", summary.scored);
    println!();
    Ok(())
}

async fn cmd_run(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config, db).await?;
    let run_state = RunState::shared();
    let signals = stop_on_ctrl_c(&run_state);
    let reporter = CliProgress::new();

    let result = pipeline::run_full(&config, &storage, &run_state, &reporter).await;
    signals.abort();
    reporter.finish();
    let report = result?;

    println!();
    println!("  Pipeline {}", finished_or_stopped(report.stopped()));
    println!(
        "  Discovered: {} new, {} updated",
        report.discovery.inserted, report.discovery.updated
    );
    if let Some(enrichment) = &report.enrichment {
        println!(
            "  Enriched:   {} ({} complete, {} partial)",
            enrichment.processed, enrichment.completed, enrichment.partial
        );
    }
    if let Some(scoring) = &report.scoring {
        println!("  Scored:     {}", scoring.scored);
    }
    println!("  Time:       {:.1}s", report.elapsed.as_secs_f64());
    println!();
    Ok(())
}

fn finished_or_stopped(stopped: bool) -> &'static str {
    if stopped { "stopped." } else { "finished." }
}

// ---------------------------------------------------------------------------
// Read-only commands
// ---------------------------------------------------------------------------

async fn cmd_show(db: Option<&Path>, id: &str) -> Result<()> {
    let company_id: CompanyId = id
        .parse()
        .map_err(|e| eyre!("invalid company id '{id}': {e}"))?;
    let config = load_config()?;
    let storage = open_storage_readonly(&config, db).await?;

    let company = storage
        .get_company(&company_id)
        .await?
        .ok_or_else(|| eyre!("no company with id {company_id}"))?;

    println!("{}", serde_json::to_string_pretty(&company)?);

    let card = score_card(&company);
    println!();
    println!("  Score: {} / 100", card.score);
    for signal in &card.signals {
        println!("    {:+4}  {}", signal.points, signal.label);
    }
    if card.raw != i32::from(card.score) {
        println!("    (raw {} clamped)", card.raw);
    }
    Ok(())
}

async fn cmd_list(db: Option<&Path>, limit: u32) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(&config, db).await?;
    let companies = storage.list_companies(Some(limit)).await?;

    if companies.is_empty() {
        println!("No companies yet.");
        return Ok(());
    }

    println!("{:>5}  {:<9}  {:<36}  {:<40}  LOCATION", "SCORE", "STATUS", "ID", "NAME");
    for company in &companies {
        println!(
            "{:>5}  {:<9}  {:<36}  {:<40}  {}",
            company
                .integer(Field::BuyabilityScore)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".into()),
            company.status,
            company.id,
            truncate(&company.display_name(), 40),
            location(company),
        );
    }
    Ok(())
}

async fn cmd_status(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage_readonly(&config, db).await?;
    let counts = storage.status_counts().await?;

    println!();
    println!("  Pending:  {}", counts.pending);
    println!("  Partial:  {}", counts.partial);
    println!("  Complete: {}", counts.complete);
    println!("  Total:    {}", counts.total());
    println!();
    Ok(())
}

fn location(company: &CompanyRecord) -> String {
    [company.text(Field::City), company.text(Field::State)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        match ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            Ok(style) => spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            ),
            Err(e) => warn!(error = %e, "invalid spinner template"),
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn discovered(&self, name: &str, count: usize) {
        self.spinner
            .set_message(format!("Discovering [{count}] {name}"));
    }

    fn enriched(&self, name: &str, count: usize) {
        self.spinner.set_message(format!("Enriching [{count}] {name}"));
    }

    fn scored(&self, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Scoring [{current}/{total}]"));
    }

    fn done(&self, _report: &PipelineReport) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Config commands
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_enrich_with_batch_size() {
        let cli = Cli::try_parse_from(["dealscout", "-vv", "enrich", "--batch-size", "10"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Command::Enrich {
                batch_size: Some(10)
            }
        ));
    }

    #[test]
    fn db_flag_is_global() {
        let cli = Cli::try_parse_from(["dealscout", "status", "--db", "/tmp/x.db"]).unwrap();
        assert_eq!(cli.db.as_deref(), Some(Path::new("/tmp/x.db")));
    }

    #[test]
    fn truncates_long_names() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
