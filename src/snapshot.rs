use std::collections::HashMap;

use chrono::Utc;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, StatsError};
use crate::models::{Game, Player, PlayerGameStat, PollEntry, Team};
use crate::store::{self, SqliteStore, StoreResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub games: Vec<Game>,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub player_game_stats: Vec<PlayerGameStat>,
    #[serde(default)]
    pub polls: Vec<PollEntry>,
}

impl Snapshot {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| StatsError::malformed(format!("snapshot: {err}")))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadSummary {
    pub run_id: i64,
    pub source: String,
    pub teams_upserted: usize,
    pub games_upserted: usize,
    pub players_upserted: usize,
    pub stat_rows_upserted: usize,
    pub polls_upserted: usize,
    /// Rows skipped because they failed validation.
    pub errors: Vec<String>,
}

fn blank(id: &str) -> bool {
    id.trim().is_empty()
}

fn check_game(game: &Game) -> std::result::Result<(), String> {
    if blank(&game.game_id) {
        return Err("game with blank game_id".to_string());
    }
    if blank(&game.home_team_id) || blank(&game.away_team_id) {
        return Err(format!("game {}: missing team id", game.game_id));
    }
    if game.home_team_id == game.away_team_id {
        return Err(format!("game {}: team plays itself", game.game_id));
    }
    if game.home_points < 0 || game.away_points < 0 {
        return Err(format!("game {}: negative score", game.game_id));
    }
    Ok(())
}

fn check_stat_row(
    row: &PlayerGameStat,
    games: &HashMap<&str, &Game>,
) -> std::result::Result<(), String> {
    if blank(&row.player_id) || blank(&row.game_id) || blank(&row.team_id) {
        return Err(format!(
            "stat row {}/{}: blank key",
            row.player_id, row.game_id
        ));
    }
    if let Some(game) = games.get(row.game_id.as_str())
        && game.side_of(&row.team_id).is_none()
    {
        return Err(format!(
            "stat row {}/{}: team {} did not play in this game",
            row.player_id, row.game_id, row.team_id
        ));
    }
    Ok(())
}

fn check_poll(entry: &PollEntry) -> std::result::Result<(), String> {
    if blank(&entry.team_id) {
        return Err(format!("{} poll entry with blank team_id", entry.kind.as_str()));
    }
    if !entry.points.is_finite() || entry.points < 0.0 {
        return Err(format!(
            "{} poll entry {} {}w{}: points must be a non-negative number",
            entry.kind.as_str(),
            entry.team_id,
            entry.season,
            entry.week
        ));
    }
    Ok(())
}

/// Upserts every valid row of `snapshot` in one transaction and records the run in
/// `ingest_runs`. Invalid rows are skipped and reported in the summary.
pub fn load_snapshot(store: &SqliteStore, snapshot: &Snapshot, source: &str) -> StoreResult<LoadSummary> {
    let started_at = Utc::now().to_rfc3339();
    let run_id = store.write(|tx| {
        tx.execute(
            "INSERT INTO ingest_runs(started_at, finished_at, source, teams_upserted, games_upserted, players_upserted, stat_rows_upserted, errors_json)
             VALUES (?1, NULL, ?2, 0, 0, 0, 0, '[]')",
            params![started_at, source],
        )?;
        Ok(tx.last_insert_rowid())
    })?;

    let games_by_id: HashMap<&str, &Game> = snapshot
        .games
        .iter()
        .map(|g| (g.game_id.as_str(), g))
        .collect();

    let mut summary = LoadSummary {
        run_id,
        source: source.to_string(),
        ..LoadSummary::default()
    };

    store.write(|tx| {
        for team in &snapshot.teams {
            if blank(&team.team_id) {
                summary.errors.push("team with blank team_id".to_string());
                continue;
            }
            store::upsert_team(tx, team)?;
            summary.teams_upserted += 1;
        }
        for game in &snapshot.games {
            if let Err(msg) = check_game(game) {
                summary.errors.push(msg);
                continue;
            }
            store::upsert_game(tx, game)?;
            summary.games_upserted += 1;
        }
        for player in &snapshot.players {
            if blank(&player.player_id) {
                summary.errors.push("player with blank player_id".to_string());
                continue;
            }
            store::upsert_player(tx, player)?;
            summary.players_upserted += 1;
        }
        for row in &snapshot.player_game_stats {
            if let Err(msg) = check_stat_row(row, &games_by_id) {
                summary.errors.push(msg);
                continue;
            }
            store::upsert_player_game_stat(tx, row)?;
            summary.stat_rows_upserted += 1;
        }
        for entry in &snapshot.polls {
            if let Err(msg) = check_poll(entry) {
                summary.errors.push(msg);
                continue;
            }
            store::upsert_poll(tx, entry)?;
            summary.polls_upserted += 1;
        }
        Ok(())
    })?;

    for msg in &summary.errors {
        warn!(source, "skipped snapshot row: {msg}");
    }

    let finished_at = Utc::now().to_rfc3339();
    let errors_json = serde_json::to_string(&summary.errors).unwrap_or_else(|_| "[]".to_string());
    store.write(|tx| {
        tx.execute(
            "UPDATE ingest_runs
             SET finished_at = ?1, teams_upserted = ?2, games_upserted = ?3,
                 players_upserted = ?4, stat_rows_upserted = ?5, polls_upserted = ?6,
                 errors_json = ?7
             WHERE run_id = ?8",
            params![
                finished_at,
                summary.teams_upserted as i64,
                summary.games_upserted as i64,
                summary.players_upserted as i64,
                summary.stat_rows_upserted as i64,
                summary.polls_upserted as i64,
                errors_json,
                run_id
            ],
        )?;
        Ok(())
    })?;

    info!(
        source,
        run_id,
        teams = summary.teams_upserted,
        games = summary.games_upserted,
        players = summary.players_upserted,
        stat_rows = summary.stat_rows_upserted,
        polls = summary.polls_upserted,
        skipped = summary.errors.len(),
        "snapshot loaded"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::{Snapshot, load_snapshot};
    use crate::models::PollKind;
    use crate::store::{RecordStore, SqliteStore};

    const SNAPSHOT: &str = r#"{
        "teams": [
            {"team_id": "a", "name": "Alpha", "division": "FBS"},
            {"team_id": "", "name": "Nobody"}
        ],
        "games": [
            {"game_id": "g1", "season": 2019, "week": 1, "home_team_id": "a", "away_team_id": "b",
             "home_points": 24, "away_points": 10,
             "home_box": {"TotalYards": 402, "AvgGain": 5.8}}
        ],
        "players": [
            {"player_id": "p1", "name": "Q One", "position": "QB", "team_id": "a"}
        ],
        "player_game_stats": [
            {"player_id": "p1", "game_id": "g1", "team_id": "a", "stats": {"PassingYards": 250}},
            {"player_id": "p1", "game_id": "g1", "team_id": "z", "stats": {}}
        ],
        "polls": [
            {"team_id": "a", "season": 2019, "week": 2, "kind": "AP", "points": 212},
            {"team_id": "b", "season": 2019, "week": 2, "kind": "FCS", "points": -4}
        ]
    }"#;

    #[test]
    fn loads_valid_rows_and_reports_the_rest() {
        let store = SqliteStore::open_in_memory().unwrap();
        let snapshot = Snapshot::from_json(SNAPSHOT).unwrap();
        let summary = load_snapshot(&store, &snapshot, "inline").unwrap();
        assert_eq!(summary.teams_upserted, 1);
        assert_eq!(summary.games_upserted, 1);
        assert_eq!(summary.stat_rows_upserted, 1);
        assert_eq!(summary.polls_upserted, 1);
        assert_eq!(summary.errors.len(), 3);
        assert_eq!(store.poll_points("a", 2019, 2, PollKind::Ap).unwrap(), Some(212.0));
        assert_eq!(store.poll_points("b", 2019, 2, PollKind::Fcs).unwrap(), None);
        assert!(store.team("a").unwrap().is_some());
        assert!(store.player("p1").unwrap().is_some());
    }

    #[test]
    fn unknown_stat_names_are_rejected() {
        let raw = r#"{"player_game_stats": [
            {"player_id": "p1", "game_id": "g1", "team_id": "a", "stats": {"PassingYardz": 1}}
        ]}"#;
        let err = Snapshot::from_json(raw).unwrap_err();
        assert!(err.to_string().contains("PassingYardz"));
    }
}
