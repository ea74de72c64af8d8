use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cfb_stats::aggregate::parse_id_list;
use cfb_stats::config::{self, StatsConfig};
use cfb_stats::models::PollKind;
use cfb_stats::report::{self, PlayerMetric, TeamMetric};
use cfb_stats::{Anchor, Period, RecordStore, SqliteStore};

type Lookup = fn(&dyn RecordStore, &str) -> cfb_stats::Result<Value>;
type Windowed = fn(&dyn RecordStore, &str, Anchor, Period) -> cfb_stats::Result<Value>;
type History = fn(&dyn RecordStore, &str, Anchor) -> cfb_stats::Result<Value>;

enum Handler {
    /// `<metric> <player_id> <season> <week> <period>`
    PlayerMetric,
    /// `<metric> <team_id> <season> <week> <period>`
    TeamMetric,
    /// `<team_id> <season> <week> <period>`
    TeamWindow(Windowed),
    /// `<player_id> <season> <week>`
    PlayerHistory(History),
    TeamLookup(Lookup),
    PlayerLookup(Lookup),
    Roster,
    PlayerBatch,
    TeamBatch,
    Report,
    Matchup,
    /// `<team_id> <season> <week> <AP|FCS>`
    PollVotes,
}

struct CommandSpec {
    name: &'static str,
    usage: &'static str,
    handler: Handler,
}

fn json<T: Serialize>(value: T) -> cfb_stats::Result<Value> {
    serde_json::to_value(value).map_err(|err| cfb_stats::StatsError::malformed(err.to_string()))
}

const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "player-metric",
        usage: "<metric> <player_id> <season> <week> <period>",
        handler: Handler::PlayerMetric,
    },
    CommandSpec {
        name: "team-metric",
        usage: "<metric> <team_id> <season> <week> <period>",
        handler: Handler::TeamMetric,
    },
    CommandSpec {
        name: "strength-of-record",
        usage: "<team_id> <season> <week> <period>",
        handler: Handler::TeamWindow(|s, id, anchor, period| {
            json(report::strength_of_record(s, id, anchor, period)?)
        }),
    },
    CommandSpec {
        name: "fcs-ratio",
        usage: "<team_id> <season> <week> <period>",
        handler: Handler::TeamWindow(|s, id, anchor, period| {
            json(report::fcs_opponent_ratio(s, id, anchor, period)?)
        }),
    },
    CommandSpec {
        name: "win-loss",
        usage: "<team_id> <season> <week> <period>",
        handler: Handler::TeamWindow(|s, id, anchor, period| {
            json(report::team_win_loss(s, id, anchor, period)?)
        }),
    },
    CommandSpec {
        name: "qb-experience",
        usage: "<player_id> <season> <week>",
        handler: Handler::PlayerHistory(|s, id, anchor| json(report::qb_experience(s, id, anchor)?)),
    },
    CommandSpec {
        name: "division",
        usage: "<team_id>",
        handler: Handler::TeamLookup(|s, id| json(report::division_for_team(s, id)?)),
    },
    CommandSpec {
        name: "recruiting-score",
        usage: "<player_id>",
        handler: Handler::PlayerLookup(|s, id| json(report::recruiting_score(s, id)?)),
    },
    CommandSpec {
        name: "roster",
        usage: "<team_id> <season>",
        handler: Handler::Roster,
    },
    CommandSpec {
        name: "player-batch",
        usage: "<ids: json array or a,b,c> <season> <week> <period>",
        handler: Handler::PlayerBatch,
    },
    CommandSpec {
        name: "team-batch",
        usage: "<ids: json array or a,b,c> <season> <week> <period>",
        handler: Handler::TeamBatch,
    },
    CommandSpec {
        name: "team-report",
        usage: "<team_id> <season> <week> <period>",
        handler: Handler::Report,
    },
    CommandSpec {
        name: "matchup",
        usage: "<game_id>",
        handler: Handler::Matchup,
    },
    CommandSpec {
        name: "poll-votes",
        usage: "<team_id> <season> <week> <AP|FCS>",
        handler: Handler::PollVotes,
    },
];

fn main() -> Result<()> {
    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cfb_stats=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (overrides, args) = split_global_flags(std::env::args().skip(1).collect())?;
    let Some((name, rest)) = args.split_first() else {
        print_usage();
        return Ok(());
    };
    if name == "help" || name == "--help" {
        print_usage();
        return Ok(());
    }
    let Some(spec) = COMMANDS.iter().find(|c| c.name == name) else {
        print_usage();
        bail!("unknown command {name:?}");
    };

    let cfg = StatsConfig::from_env()
        .with_db_path(overrides.db)
        .with_timeout_ms(overrides.timeout_ms);
    let db_path = cfg.db_path.clone().context("unable to resolve sqlite path")?;
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("open sqlite db {}", db_path.display()))?
        .with_timeout(cfg.store_timeout)
        .context("set store timeout")?;
    info!(command = spec.name, db = %db_path.display(), "running");

    let out = dispatch(spec, &store, rest)
        .with_context(|| format!("usage: cfb_stats {} {}", spec.name, spec.usage))?;
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn dispatch(spec: &CommandSpec, store: &dyn RecordStore, args: &[String]) -> Result<Value> {
    let value = match &spec.handler {
        Handler::PlayerMetric => {
            let [metric, id, season, week, period] = expect_args::<5>(args)?;
            let metric: PlayerMetric = metric.parse()?;
            let anchor = parse_anchor(season, week)?;
            json(report::player_metric(store, id, anchor, period.parse()?, metric)?)?
        }
        Handler::TeamMetric => {
            let [metric, id, season, week, period] = expect_args::<5>(args)?;
            let metric: TeamMetric = metric.parse()?;
            let anchor = parse_anchor(season, week)?;
            json(report::team_metric(store, id, anchor, period.parse()?, metric)?)?
        }
        Handler::TeamWindow(f) => {
            let [id, season, week, period] = expect_args::<4>(args)?;
            f(store, id, parse_anchor(season, week)?, period.parse()?)?
        }
        Handler::PlayerHistory(f) => {
            let [id, season, week] = expect_args::<3>(args)?;
            f(store, id, parse_anchor(season, week)?)?
        }
        Handler::TeamLookup(f) | Handler::PlayerLookup(f) => {
            let [id] = expect_args::<1>(args)?;
            f(store, id)?
        }
        Handler::Roster => {
            let [id, season] = expect_args::<2>(args)?;
            json(report::team_roster(store, id, parse_int(season, "season")?)?)?
        }
        Handler::PlayerBatch => {
            let [ids, season, week, period] = expect_args::<4>(args)?;
            let ids = parse_id_list(ids)?;
            let anchor = parse_anchor(season, week)?;
            json(report::player_period_stats_batch(store, &ids, anchor, period.parse()?)?)?
        }
        Handler::TeamBatch => {
            let [ids, season, week, period] = expect_args::<4>(args)?;
            let ids = parse_id_list(ids)?;
            let anchor = parse_anchor(season, week)?;
            json(report::team_period_stats_batch(store, &ids, anchor, period.parse()?)?)?
        }
        Handler::Report => {
            let [id, season, week, period] = expect_args::<4>(args)?;
            let anchor = parse_anchor(season, week)?;
            json(report::team_report(store, id, anchor, period.parse()?)?)?
        }
        Handler::Matchup => {
            let [id] = expect_args::<1>(args)?;
            json(report::matchup(store, id)?)?
        }
        Handler::PollVotes => {
            let [id, season, week, kind] = expect_args::<4>(args)?;
            let kind = PollKind::parse(kind)
                .ok_or_else(|| cfb_stats::StatsError::malformed(format!("unknown poll {kind:?}")))?;
            let (season, week) = (parse_int(season, "season")?, parse_int(week, "week")?);
            json(report::team_poll_votes(store, id, season, week, kind)?)?
        }
    };
    Ok(value)
}

fn expect_args<const N: usize>(args: &[String]) -> Result<[&str; N]> {
    if args.len() != N {
        return Err(anyhow!("expected {N} arguments, got {}", args.len()));
    }
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

fn parse_int(raw: &str, what: &str) -> Result<i32> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| cfb_stats::StatsError::malformed(format!("{what} {raw:?} is not a number")).into())
}

fn parse_anchor(season: &str, week: &str) -> Result<Anchor> {
    Ok(Anchor::new(parse_int(season, "season")?, parse_int(week, "week")?))
}

#[derive(Debug, Default)]
struct GlobalFlags {
    db: Option<PathBuf>,
    timeout_ms: Option<u64>,
}

/// Pulls `--db` and `--timeout-ms` (either `--flag value` or `--flag=value`) out of `args`.
fn split_global_flags(args: Vec<String>) -> Result<(GlobalFlags, Vec<String>)> {
    let mut flags = GlobalFlags::default();
    let mut rest = Vec::new();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        let (key, inline) = match arg.split_once('=') {
            Some((k, v)) if k.starts_with("--") => (k.to_string(), Some(v.to_string())),
            _ => (arg.clone(), None),
        };
        match key.as_str() {
            "--db" | "--timeout-ms" => {
                let value = match inline {
                    Some(v) => v,
                    None => iter.next().with_context(|| format!("{key} needs a value"))?,
                };
                if key == "--db" {
                    if !value.trim().is_empty() {
                        flags.db = Some(PathBuf::from(value.trim()));
                    }
                } else {
                    let ms = value
                        .trim()
                        .parse::<u64>()
                        .with_context(|| format!("--timeout-ms {value:?} is not a number"))?;
                    flags.timeout_ms = Some(ms);
                }
            }
            _ => rest.push(arg),
        }
    }
    Ok((flags, rest))
}

fn print_usage() {
    eprintln!("usage: cfb_stats [--db <path>] [--timeout-ms <n>] <command> <args...>");
    eprintln!();
    for spec in COMMANDS {
        eprintln!("  {:<20} {}", spec.name, spec.usage);
    }
    eprintln!();
    eprintln!(
        "periods: {}",
        Period::ALL.map(|p| p.as_str()).join(", ")
    );
    eprintln!(
        "player metrics: {}",
        PlayerMetric::ALL.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
    );
    eprintln!(
        "team metrics: {}",
        TeamMetric::ALL.iter().map(|m| m.name()).collect::<Vec<_>>().join(", ")
    );
}

#[cfg(test)]
mod tests {
    use cfb_stats::SqliteStore;
    use cfb_stats::models::{PollEntry, PollKind};
    use cfb_stats::store;
    use serde_json::json;

    use super::{COMMANDS, dispatch, split_global_flags};

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn global_flags_are_removed_from_command_args() {
        let (flags, rest) =
            split_global_flags(args(&["--db", "/tmp/x.sqlite", "roster", "t1", "--timeout-ms=250", "2019"]))
                .unwrap();
        assert_eq!(flags.db.unwrap().to_str(), Some("/tmp/x.sqlite"));
        assert_eq!(flags.timeout_ms, Some(250));
        assert_eq!(rest, args(&["roster", "t1", "2019"]));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        assert!(split_global_flags(args(&["--timeout-ms", "soon"])).is_err());
        assert!(split_global_flags(args(&["--db"])).is_err());
    }

    #[test]
    fn command_names_are_unique() {
        let mut names: Vec<_> = COMMANDS.iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), COMMANDS.len());
    }

    #[test]
    fn poll_votes_command_reads_the_requested_poll() {
        let db = SqliteStore::open_in_memory().unwrap();
        db.write(|tx| {
            store::upsert_poll(
                tx,
                &PollEntry {
                    team_id: "t1".to_string(),
                    season: 2019,
                    week: 6,
                    kind: PollKind::Fcs,
                    points: 640.0,
                },
            )
        })
        .unwrap();
        let spec = COMMANDS.iter().find(|c| c.name == "poll-votes").unwrap();
        let hit = dispatch(spec, &db, &args(&["t1", "2019", "6", "fcs"])).unwrap();
        assert_eq!(hit, json!(640.0));
        let miss = dispatch(spec, &db, &args(&["t1", "2019", "6", "AP"])).unwrap();
        assert_eq!(miss, json!(0.0));
        assert!(dispatch(spec, &db, &args(&["t1", "2019", "6", "coaches"])).is_err());
    }
}
