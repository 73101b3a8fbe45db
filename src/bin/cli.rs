use clap::{Parser, Subcommand};
use server_stats_engine::{
    logging, providers::SteamServerList, Config, Database, ServiceOptions, Source, StatsService,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "server-stats")]
#[command(about = "Game server stats poller", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database path (overrides config)
    #[arg(short, long)]
    db: Option<String>,

    /// Exit with status 1 on errors or when only the placeholder could be served
    #[arg(long)]
    strict: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one fetch-and-persist cycle (default)
    Run,

    /// Show current stats and where they came from
    Current,

    /// Hourly average players
    Hourly {
        /// Trailing window in hours
        #[arg(long, default_value = "24")]
        hours: u32,
    },

    /// Daily maximum players
    Daily {
        /// Trailing window in days
        #[arg(long, default_value = "7")]
        days: u32,
    },

    /// Delete old history rows and cache entries
    Cleanup {
        /// History retention in days (defaults to config)
        #[arg(short, long)]
        retention_days: Option<u32>,
    },

    /// Row counts of the cache and history tables
    Stats,
}

/// What a successful invocation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    /// The default cycle ran and served from this source
    Cycle(Source),
    /// Any other subcommand completed
    Done,
}

/// Only `--strict` turns errors or a placeholder-only cycle into a failure
fn failed(strict: bool, outcome: &anyhow::Result<Outcome>) -> bool {
    strict
        && matches!(
            outcome,
            Err(_) | Ok(Outcome::Cycle(Source::Default))
        )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let strict = cli.strict;

    // Scheduler contract: failures are reported, not turned into exit codes
    let outcome = run(cli).await;
    if let Err(e) = &outcome {
        tracing::error!("Stats run failed: {:#}", e);
        println!("❌ Error: {:#}", e);
    }

    if failed(strict, &outcome) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

async fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    let db = Database::open(&config.db_path)?;
    let fetcher = Arc::new(SteamServerList::new(&config)?);
    let service = StatsService::with_database(db, fetcher, ServiceOptions::from(&config));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let report = service.run_cycle().await;
            println!("{}", report.status_line());
            return Ok(Outcome::Cycle(report.served.source));
        }

        Commands::Current => {
            let served = service.get_server_info().await;
            let s = &served.snapshot;

            println!("🎮 {}", s.server_name);
            println!("   Players: {}/{}", s.players, s.max_players);
            println!("   Map: {}", s.map);
            println!(
                "   Taken at: {}",
                s.taken_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "N/A".to_string())
            );
            println!("   Source: {}", served.source);
        }

        Commands::Hourly { hours } => {
            let buckets = service.hourly_history(hours).await;

            println!("📈 Hourly average over the last {} hours:", hours);
            if buckets.is_empty() {
                println!("   (no data)");
            }
            for bucket in buckets {
                let hour = chrono::DateTime::from_timestamp(bucket.hour, 0)
                    .map(|t| t.format("%Y-%m-%d %H:00").to_string())
                    .unwrap_or_else(|| bucket.hour.to_string());
                println!("   {}  {}", hour, bucket.players);
            }
        }

        Commands::Daily { days } => {
            println!("📊 Daily max over the last {} days:", days);
            for day in service.daily_max(days).await {
                println!("   {}  {}", day.date, day.players);
            }
        }

        Commands::Cleanup { retention_days } => {
            let retention_days = retention_days.unwrap_or(config.retention_days);
            println!("🧹 Cleaning up history older than {} days...", retention_days);

            match service.cleanup_report(retention_days).await {
                Some(report) => println!(
                    "✅ Deleted {} history rows, {} cache entries",
                    report.history_deleted, report.cache_deleted
                ),
                None => println!("❌ Cleanup failed, see log"),
            }
        }

        Commands::Stats => {
            let (cache, history) = service.table_stats().await?;

            println!("📊 Storage Statistics:");
            for (label, stats) in [("Cache", cache), ("History", history)] {
                println!("   {} entries: {}", label, stats.total_entries);
                if let Some(oldest) = stats.oldest_entry.and_then(|t| chrono::DateTime::from_timestamp(t, 0)) {
                    println!("   {} oldest: {}", label, oldest.format("%Y-%m-%d %H:%M:%S"));
                }
                if let Some(newest) = stats.newest_entry.and_then(|t| chrono::DateTime::from_timestamp(t, 0)) {
                    println!("   {} newest: {}", label, newest.format("%Y-%m-%d %H:%M:%S"));
                }
            }
        }
    }

    Ok(Outcome::Done)
}
