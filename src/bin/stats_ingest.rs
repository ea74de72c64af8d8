use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

use cfb_stats::SqliteStore;
use cfb_stats::config::{self, StatsConfig};
use cfb_stats::snapshot::{self, Snapshot};

fn main() -> Result<()> {
    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cfb_stats=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let files = parse_snapshot_args(&args);
    if files.is_empty() {
        return Err(anyhow!(
            "usage: stats_ingest [--db <path>] [--timeout-ms <n>] <snapshot.json>..."
        ));
    }

    let cfg = StatsConfig::from_env()
        .with_db_path(parse_flag(&args, "--db").map(PathBuf::from))
        .with_timeout_ms(parse_timeout(&args)?);
    let db_path = cfg.db_path.clone().context("unable to resolve sqlite path")?;
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("open sqlite db {}", db_path.display()))?
        .with_timeout(cfg.store_timeout)?;

    println!("DB: {}", db_path.display());
    for file in &files {
        let raw = std::fs::read_to_string(file)
            .with_context(|| format!("read snapshot {}", file.display()))?;
        let snapshot = Snapshot::from_json(&raw)?;
        let source = file.display().to_string();
        let summary = snapshot::load_snapshot(&store, &snapshot, &source)
            .with_context(|| format!("load snapshot {source}"))?;

        println!("snapshot {} (run {})", summary.source, summary.run_id);
        println!(
            "  teams={} games={} players={} stat_rows={} polls={}",
            summary.teams_upserted,
            summary.games_upserted,
            summary.players_upserted,
            summary.stat_rows_upserted,
            summary.polls_upserted
        );
        if !summary.errors.is_empty() {
            println!("  skipped: {}", summary.errors.len());
            for err in summary.errors.iter().take(6) {
                println!("   - {err}");
            }
        }
    }
    Ok(())
}

fn parse_flag(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_timeout(args: &[String]) -> Result<Option<u64>> {
    parse_flag(args, "--timeout-ms")
        .map(|raw| {
            raw.parse::<u64>()
                .with_context(|| format!("--timeout-ms {raw:?} is not a number"))
        })
        .transpose()
}

/// Positional arguments, skipping flags and their values.
fn parse_snapshot_args(args: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--db" || arg == "--timeout-ms" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(PathBuf::from(arg));
    }
    out
}
