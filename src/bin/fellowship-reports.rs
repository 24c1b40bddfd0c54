use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use fellowship_reports::report::{render_json, render_preview, render_print_html};
use fellowship_reports::storage::repository;
use fellowship_reports::{ClientConfig, Database, FellowshipReports, PeriodSelection};

#[derive(Parser)]
#[command(name = "fellowship-reports", about = "Fellowship attendance reports")]
struct Cli {
    /// Database path (default: ~/.fellowship-reports/reports.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Reporting API base URL (overrides config and FELLOWSHIP_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Timeout for generating a report, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a report and show or export it
    Report {
        /// Period: current-month, last-3-months, last-6-months, this-year, custom
        #[arg(long, default_value = "current-month")]
        period: String,
        /// Custom start date (YYYY-MM-DD), used with --period custom
        #[arg(long)]
        start: Option<String>,
        /// Custom end date (YYYY-MM-DD), used with --period custom
        #[arg(long)]
        end: Option<String>,
        /// Write the print-ready HTML document to this path
        #[arg(long, value_name = "PATH")]
        html: Option<PathBuf>,
        /// Output the whole report as JSON
        #[arg(long)]
        json: bool,
        /// Don't print the preview table
        #[arg(long)]
        no_preview: bool,
    },
    /// Show the date window a period resolves to
    Range {
        #[arg(long, default_value = "current-month")]
        period: String,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List previous report runs
    History {
        /// Maximum results
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show configuration and run status
    Status,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// Set a config value
    Set { key: String, value: String },
    /// Remove a config value
    Unset { key: String },
    /// List all config values
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let db = match &cli.db {
        Some(path) => Database::open_at(path).await?,
        None => Database::open().await?,
    };

    match cli.command {
        Commands::Report {
            period,
            start,
            end,
            html,
            json,
            no_preview,
        } => {
            let mut config = ClientConfig::load(&db).await?;
            if let Some(url) = cli.api_url {
                config.api_base_url = Some(url);
            }
            if let Some(secs) = cli.timeout {
                config.request_timeout = Duration::from_secs(secs);
            }
            let period = PeriodSelection::parse(&period)?;
            warn_unused_custom(period, start.as_deref(), end.as_deref());

            let mut reports: FellowshipReports = FellowshipReports::from_config(db, &config)?;
            let snapshot = reports
                .generate_report(period, start.as_deref(), end.as_deref())
                .await?;

            if json {
                println!("{}", render_json(&snapshot)?);
            } else if !no_preview {
                print!("{}", render_preview(&snapshot));
            }
            if let Some(path) = html {
                std::fs::write(&path, render_print_html(&snapshot))?;
                eprintln!("Wrote print report to {}", path.display());
            }
        }
        Commands::Range {
            period,
            start,
            end,
            json,
        } => {
            let period = PeriodSelection::parse(&period)?;
            let resolved = fellowship_reports::resolve(period, start.as_deref(), end.as_deref());
            if json {
                println!("{}", serde_json::to_string_pretty(&resolved)?);
            } else {
                println!("{}: {}", period.label(), resolved.range);
                for warning in &resolved.warnings {
                    println!("  warning: {warning}");
                }
            }
        }
        Commands::History { limit, json } => {
            let runs = db
                .reader()
                .call(move |conn| repository::list_report_runs(conn, limit))
                .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&runs)?);
            } else if runs.is_empty() {
                println!("No reports generated yet.");
            } else {
                for run in runs {
                    let detail = match (&run.event_count, &run.error_message) {
                        (Some(n), _) => format!("{n} events"),
                        (None, Some(err)) => err.clone(),
                        (None, None) => String::new(),
                    };
                    println!(
                        "#{} {} {} [{}] {}",
                        run.id, run.started_at, run.period_key, run.status, detail
                    );
                }
            }
        }
        Commands::Config { action } => {
            handle_config(&db, action).await?;
        }
        Commands::Status => {
            print_status(&db).await?;
        }
    }

    Ok(())
}

fn warn_unused_custom(period: PeriodSelection, start: Option<&str>, end: Option<&str>) {
    if period != PeriodSelection::Custom && (start.is_some() || end.is_some()) {
        log::warn!("--start/--end only apply to --period custom; ignoring them");
    }
}

async fn print_status(db: &Database) -> anyhow::Result<()> {
    let config = ClientConfig::load(db).await?;
    let (runs, failed, last_run) = db
        .reader()
        .call(|conn| {
            let runs: i64 =
                conn.query_row("SELECT COUNT(*) FROM report_runs", [], |row| row.get(0))?;
            let failed: i64 = conn.query_row(
                "SELECT COUNT(*) FROM report_runs WHERE status = 'failed'",
                [],
                |row| row.get(0),
            )?;
            let last_run: Option<String> = conn
                .query_row(
                    "SELECT MAX(completed_at) FROM report_runs WHERE status = 'completed'",
                    [],
                    |row| row.get(0),
                )
                .ok()
                .flatten();
            Ok::<_, rusqlite::Error>((runs, failed, last_run))
        })
        .await?;

    println!("Report Status");
    println!(
        "  API URL:     {}",
        config.api_base_url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  API token:   {}",
        if config.api_token.is_some() { "set" } else { "not set" }
    );
    println!("  Timeout:     {}s", config.request_timeout.as_secs());
    println!("  Event limit: {}", config.event_limit);
    println!("  Runs:        {runs} ({failed} failed)");
    println!(
        "  Last report: {}",
        last_run.unwrap_or_else(|| "never".to_string())
    );
    Ok(())
}

async fn handle_config(db: &Database, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let val: Option<String> = db
                .reader()
                .call({
                    let key = key.clone();
                    move |conn| repository::get_config(conn, &key)
                })
                .await?;
            match val {
                Some(v) => println!("{key} = {v}"),
                None => println!("{key} is not set"),
            }
        }
        ConfigAction::Set { key, value } => {
            // Values must parse the same way they will on load.
            let mut probe = ClientConfig::default();
            probe.apply_stored(&[(key.clone(), value.clone())])?;

            db.writer()
                .call(move |conn| {
                    repository::set_config(conn, &key, &value)?;
                    Ok::<(), rusqlite::Error>(())
                })
                .await?;
            println!("Config updated.");
        }
        ConfigAction::Unset { key } => {
            let removed = db
                .writer()
                .call({
                    let key = key.clone();
                    move |conn| repository::unset_config(conn, &key)
                })
                .await?;
            if removed {
                println!("Removed: {key}");
            } else {
                println!("{key} is not set");
            }
        }
        ConfigAction::List => {
            let items: Vec<(String, String)> = db
                .reader()
                .call(|conn| repository::list_config(conn))
                .await?;
            if items.is_empty() {
                println!("No configuration set.");
            } else {
                for (k, v) in items {
                    if k == fellowship_reports::config::KEY_API_TOKEN {
                        println!("{k} = ********");
                    } else {
                        println!("{k} = {v}");
                    }
                }
            }
        }
    }
    Ok(())
}
