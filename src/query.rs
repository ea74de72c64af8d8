use once_cell::sync::Lazy;
use rusqlite::types::Value;

use crate::period::GameFilter;
use crate::stat_keys::{PlayerStat, TeamStat};

/// Ids per `IN (...)` list. Two lists per statement stay well under SQLite's parameter cap.
pub const MAX_IN_PARAMS: usize = 400;

#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Column list of the `games` table, in decode order.
pub static GAME_COLUMNS: Lazy<Vec<String>> = Lazy::new(|| {
    let mut cols: Vec<String> = [
        "game_id",
        "season",
        "week",
        "home_team_id",
        "away_team_id",
        "home_points",
        "away_points",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect();
    for prefix in ["home", "away"] {
        cols.extend(TeamStat::box_score().map(|s| format!("{prefix}_{}", s.column())));
    }
    cols
});

/// Leading columns of `games` before the box scores.
pub const GAME_FIXED_COLUMNS: usize = 7;

pub static PLAYER_STAT_COLUMNS: Lazy<Vec<&'static str>> =
    Lazy::new(|| PlayerStat::ALL.iter().map(|s| s.column()).collect());

pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn text_values(ids: &[String]) -> impl Iterator<Item = Value> + '_ {
    ids.iter().map(|id| Value::Text(id.clone()))
}

fn game_select_list() -> String {
    GAME_COLUMNS
        .iter()
        .map(|c| format!("g.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_game_filter(sql: &mut String, params: &mut Vec<Value>, filter: &GameFilter) {
    if let Some(season) = filter.season {
        sql.push_str(" AND g.season = ?");
        params.push(Value::Integer(i64::from(season)));
    }
    if let Some(anchor) = filter.before {
        sql.push_str(" AND (g.season < ? OR (g.season = ? AND g.week < ?))");
        params.push(Value::Integer(i64::from(anchor.season)));
        params.push(Value::Integer(i64::from(anchor.season)));
        params.push(Value::Integer(i64::from(anchor.week)));
    }
    if filter.completed_only {
        sql.push_str(" AND NOT (g.home_points = 0 AND g.away_points = 0)");
    }
}

const RECENT_FIRST: &str = " ORDER BY g.season DESC, g.week DESC, g.game_id ASC";

pub fn game_by_id() -> String {
    format!("SELECT {} FROM games g WHERE g.game_id = ?1", game_select_list())
}

/// Games where either side is one of `team_ids`.
pub fn games_for_teams(team_ids: &[String], filter: &GameFilter) -> SqlQuery {
    let list = placeholders(team_ids.len());
    let mut sql = format!(
        "SELECT {} FROM games g WHERE (g.home_team_id IN ({list}) OR g.away_team_id IN ({list}))",
        game_select_list()
    );
    let mut params: Vec<Value> = text_values(team_ids).chain(text_values(team_ids)).collect();
    push_game_filter(&mut sql, &mut params, filter);
    sql.push_str(RECENT_FIRST);
    SqlQuery { sql, params }
}

/// Games in which any of `player_ids` has a stat row. The two leading columns are the player id
/// and the team the player appeared for.
pub fn appearances(player_ids: &[String], filter: &GameFilter) -> SqlQuery {
    let mut sql = format!(
        "SELECT s.player_id, s.team_id, {} FROM player_game_stats s \
         JOIN games g ON g.game_id = s.game_id WHERE s.player_id IN ({})",
        game_select_list(),
        placeholders(player_ids.len())
    );
    let mut params: Vec<Value> = text_values(player_ids).collect();
    push_game_filter(&mut sql, &mut params, filter);
    sql.push_str(RECENT_FIRST);
    sql.push_str(", s.player_id ASC");
    SqlQuery { sql, params }
}

fn stat_select_list() -> String {
    let mut cols = vec![
        "s.player_id".to_string(),
        "s.game_id".to_string(),
        "s.team_id".to_string(),
        "s.position".to_string(),
    ];
    cols.extend(PLAYER_STAT_COLUMNS.iter().map(|c| format!("s.{c}")));
    cols.join(", ")
}

/// Leading columns of a stat row before the counting stats.
pub const STAT_FIXED_COLUMNS: usize = 4;

pub fn stats_for_players(player_ids: &[String], game_ids: &[String]) -> SqlQuery {
    let sql = format!(
        "SELECT {} FROM player_game_stats s WHERE s.player_id IN ({}) AND s.game_id IN ({}) \
         ORDER BY s.player_id ASC, s.game_id ASC",
        stat_select_list(),
        placeholders(player_ids.len()),
        placeholders(game_ids.len())
    );
    let params = text_values(player_ids).chain(text_values(game_ids)).collect();
    SqlQuery { sql, params }
}

pub fn stats_for_team(team_id: &str, game_ids: &[String]) -> SqlQuery {
    let sql = format!(
        "SELECT {} FROM player_game_stats s WHERE s.team_id = ? AND s.game_id IN ({}) \
         ORDER BY s.player_id ASC, s.game_id ASC",
        stat_select_list(),
        placeholders(game_ids.len())
    );
    let params = std::iter::once(Value::Text(team_id.to_string()))
        .chain(text_values(game_ids))
        .collect();
    SqlQuery { sql, params }
}

pub fn upsert_game() -> String {
    upsert_sql("games", &GAME_COLUMNS, "game_id")
}

pub fn upsert_player_game_stat() -> String {
    let mut cols = vec![
        "player_id".to_string(),
        "game_id".to_string(),
        "team_id".to_string(),
        "position".to_string(),
    ];
    cols.extend(PLAYER_STAT_COLUMNS.iter().map(|c| c.to_string()));
    upsert_sql("player_game_stats", &cols, "player_id, game_id")
}

/// `INSERT ... ON CONFLICT DO UPDATE` over `columns` plus a trailing `updated_at`.
fn upsert_sql(table: &str, columns: &[String], key: &str) -> String {
    let key_cols: Vec<&str> = key.split(", ").collect();
    let updates = columns
        .iter()
        .filter(|c| !key_cols.contains(&c.as_str()))
        .map(|c| format!("{c} = excluded.{c}"))
        .chain(std::iter::once("updated_at = excluded.updated_at".to_string()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO {table} ({}, updated_at) VALUES ({}) ON CONFLICT({key}) DO UPDATE SET {updates}",
        columns.join(", "),
        placeholders(columns.len() + 1)
    )
}

pub fn schema() -> String {
    let game_box_cols = ["home", "away"]
        .iter()
        .flat_map(|prefix| {
            TeamStat::box_score().map(move |s| format!("            {prefix}_{} REAL NULL,", s.column()))
        })
        .collect::<Vec<_>>()
        .join("\n");
    let stat_cols = PLAYER_STAT_COLUMNS
        .iter()
        .map(|c| format!("            {c} REAL NOT NULL DEFAULT 0,"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            team_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            market TEXT NOT NULL,
            alias TEXT NOT NULL,
            division TEXT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS games (
            game_id TEXT PRIMARY KEY,
            season INTEGER NOT NULL,
            week INTEGER NOT NULL,
            home_team_id TEXT NOT NULL,
            away_team_id TEXT NOT NULL,
            home_points INTEGER NOT NULL,
            away_points INTEGER NOT NULL,
{game_box_cols}
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_games_season_week ON games(season, week);
        CREATE INDEX IF NOT EXISTS idx_games_home ON games(home_team_id);
        CREATE INDEX IF NOT EXISTS idx_games_away ON games(away_team_id);

        CREATE TABLE IF NOT EXISTS players (
            player_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            position TEXT NOT NULL,
            team_id TEXT NULL,
            recruiting_score REAL NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_players_team ON players(team_id);

        CREATE TABLE IF NOT EXISTS player_game_stats (
            player_id TEXT NOT NULL,
            game_id TEXT NOT NULL,
            team_id TEXT NOT NULL,
            position TEXT NULL,
{stat_cols}
            updated_at TEXT NOT NULL,
            PRIMARY KEY (player_id, game_id)
        );
        CREATE INDEX IF NOT EXISTS idx_pgs_game ON player_game_stats(game_id);
        CREATE INDEX IF NOT EXISTS idx_pgs_team ON player_game_stats(team_id);

        CREATE TABLE IF NOT EXISTS polls (
            team_id TEXT NOT NULL,
            season INTEGER NOT NULL,
            week INTEGER NOT NULL,
            kind TEXT NOT NULL,
            points REAL NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (team_id, season, week, kind)
        );

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            source TEXT NOT NULL,
            teams_upserted INTEGER NOT NULL,
            games_upserted INTEGER NOT NULL,
            players_upserted INTEGER NOT NULL,
            stat_rows_upserted INTEGER NOT NULL,
            polls_upserted INTEGER NOT NULL DEFAULT 0,
            errors_json TEXT NOT NULL
        );
        "#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::{Anchor, Period};

    #[test]
    fn team_query_binds_ids_twice_and_filters() {
        let ids = vec!["t1".to_string(), "t2".to_string()];
        let q = games_for_teams(&ids, &Period::Season(None).game_filter(Anchor::new(2019, 5)));
        assert_eq!(q.sql.matches('?').count(), q.params.len());
        // 2 ids twice, season, then the three before-anchor parameters.
        assert_eq!(q.params.len(), 8);
        assert_eq!(q.params[4], Value::Integer(2019));
        assert!(q.sql.contains("NOT (g.home_points = 0 AND g.away_points = 0)"));
        assert!(q.sql.ends_with("g.game_id ASC"));
    }

    #[test]
    fn caller_values_never_reach_the_sql_text() {
        let ids = vec!["x'); DROP TABLE games; --".to_string()];
        let q = appearances(&ids, &GameFilter::default());
        assert!(!q.sql.contains("DROP"));
        assert_eq!(q.params, vec![Value::Text(ids[0].clone())]);
    }

    #[test]
    fn game_columns_cover_both_box_scores() {
        assert_eq!(GAME_COLUMNS.len(), GAME_FIXED_COLUMNS + 2 * (TeamStat::COUNT - 1));
        assert!(GAME_COLUMNS.contains(&"away_third_down_attempts".to_string()));
        assert!(!GAME_COLUMNS.iter().any(|c| c == "home_points_"));
    }

    #[test]
    fn upsert_updates_every_non_key_column() {
        let sql = upsert_player_game_stat();
        assert!(sql.contains("ON CONFLICT(player_id, game_id)"));
        assert!(sql.contains("passing_yards = excluded.passing_yards"));
        assert!(!sql.contains("game_id = excluded.game_id"));
        assert_eq!(sql.matches('?').count(), STAT_FIXED_COLUMNS + PlayerStat::COUNT + 1);
    }
}
