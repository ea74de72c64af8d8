use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, Transaction, params, params_from_iter};

use crate::error::StoreError;
use crate::models::{Appearance, Division, Game, Player, PlayerGameStat, PollEntry, PollKind, Position, Team};
use crate::period::GameFilter;
use crate::query::{self, GAME_FIXED_COLUMNS, MAX_IN_PARAMS, STAT_FIXED_COLUMNS, SqlQuery};
use crate::stat_keys::{PlayerStat, StatLine, TeamLine, TeamStat};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Whose stat rows to fetch.
#[derive(Debug, Clone, Copy)]
pub enum StatSubject<'a> {
    Players(&'a [String]),
    Team(&'a str),
}

/// Point and range lookups over teams, games, players and per-game player stats.
///
/// Range lookups return games most recent first. Callers re-check every window rule, so an
/// implementation may over-return but must not drop qualifying rows.
pub trait RecordStore: Send + Sync {
    fn team(&self, team_id: &str) -> StoreResult<Option<Team>>;
    fn teams(&self, team_ids: &[String]) -> StoreResult<Vec<Team>>;
    fn player(&self, player_id: &str) -> StoreResult<Option<Player>>;
    fn players(&self, player_ids: &[String]) -> StoreResult<Vec<Player>>;
    fn game(&self, game_id: &str) -> StoreResult<Option<Game>>;
    fn games_for_teams(&self, team_ids: &[String], filter: &GameFilter) -> StoreResult<Vec<Game>>;
    fn appearances(&self, player_ids: &[String], filter: &GameFilter)
    -> StoreResult<Vec<Appearance>>;
    fn player_game_stats(
        &self,
        subject: StatSubject<'_>,
        game_ids: &[String],
    ) -> StoreResult<Vec<PlayerGameStat>>;
    /// Poll points (or votes) for a team in one poll week. `None` when the team got none.
    fn poll_points(
        &self,
        team_id: &str,
        season: i32,
        week: i32,
        kind: PollKind,
    ) -> StoreResult<Option<f64>>;
}

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5_000);

/// VM instructions between deadline checks.
const PROGRESS_INTERVAL: i32 = 1_000;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    timeout: Duration,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> StoreResult<Self> {
        init_schema(&conn)?;
        conn.busy_timeout(DEFAULT_TIMEOUT)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Bounds every later call, busy waits included.
    pub fn with_timeout(mut self, timeout: Duration) -> StoreResult<Self> {
        self.conn
            .get_mut()
            .map_err(|_| StoreError::Poisoned)?
            .busy_timeout(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    /// Runs `f` under the store deadline; statements still running past it are interrupted.
    fn read<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> StoreResult<T> {
        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let deadline = Instant::now() + self.timeout;
        conn.progress_handler(PROGRESS_INTERVAL, Some(move || Instant::now() >= deadline))
            .into_store()?;
        let res = f(&conn).map_err(|err| classify(err, self.timeout_ms()));
        let cleared = conn
            .progress_handler(PROGRESS_INTERVAL, None::<fn() -> bool>)
            .into_store();
        let out = res?;
        cleared?;
        Ok(out)
    }

    /// Runs `f` inside one transaction, committing on success.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = conn.transaction()?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    fn fetch<T>(
        &self,
        q: &SqlQuery,
        decode: impl Fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> StoreResult<Vec<T>> {
        self.read(|conn| {
            let mut stmt = conn.prepare(&q.sql)?;
            let rows = stmt.query_map(params_from_iter(q.params.iter()), |row| decode(row))?;
            rows.collect()
        })
    }
}

/// Installing a hook is fallible on newer rusqlite releases and infallible on older ones.
trait HookOutcome {
    fn into_store(self) -> StoreResult<()>;
}

impl HookOutcome for () {
    fn into_store(self) -> StoreResult<()> {
        Ok(())
    }
}

impl HookOutcome for rusqlite::Result<()> {
    fn into_store(self) -> StoreResult<()> {
        self.map_err(StoreError::from)
    }
}

fn classify(err: rusqlite::Error, timeout_ms: u64) -> StoreError {
    if err.sqlite_error_code() == Some(ErrorCode::OperationInterrupted) {
        StoreError::Timeout { timeout_ms }
    } else {
        StoreError::Sqlite(err)
    }
}

pub fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(&query::schema())?;
    Ok(())
}

fn decode_team(row: &Row<'_>) -> rusqlite::Result<Team> {
    let division: Option<String> = row.get(4)?;
    Ok(Team {
        team_id: row.get(0)?,
        name: row.get(1)?,
        market: row.get(2)?,
        alias: row.get(3)?,
        division: division.as_deref().and_then(Division::parse),
    })
}

fn decode_player(row: &Row<'_>) -> rusqlite::Result<Player> {
    let position: String = row.get(2)?;
    Ok(Player {
        player_id: row.get(0)?,
        name: row.get(1)?,
        position: Position::parse(&position),
        team_id: row.get(3)?,
        recruiting_score: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
    })
}

/// Reads a side's box score starting at column `start`. All-NULL means no recorded row.
fn decode_box(row: &Row<'_>, start: usize) -> rusqlite::Result<Option<TeamLine>> {
    let mut line = TeamLine::default();
    let mut recorded = false;
    for (offset, stat) in TeamStat::box_score().enumerate() {
        if let Some(value) = row.get::<_, Option<f64>>(start + offset)? {
            line.set(stat, value);
            recorded = true;
        }
    }
    Ok(recorded.then_some(line))
}

/// Decodes the game columns starting at `start`.
fn decode_game_at(row: &Row<'_>, start: usize) -> rusqlite::Result<Game> {
    let box_len = TeamStat::COUNT - 1;
    let home_start = start + GAME_FIXED_COLUMNS;
    Ok(Game {
        game_id: row.get(start)?,
        season: row.get(start + 1)?,
        week: row.get(start + 2)?,
        home_team_id: row.get(start + 3)?,
        away_team_id: row.get(start + 4)?,
        home_points: row.get(start + 5)?,
        away_points: row.get(start + 6)?,
        home_box: decode_box(row, home_start)?,
        away_box: decode_box(row, home_start + box_len)?,
    })
}

fn decode_stat_row(row: &Row<'_>) -> rusqlite::Result<PlayerGameStat> {
    let position: Option<String> = row.get(3)?;
    let mut stats = StatLine::default();
    for (offset, stat) in PlayerStat::ALL.iter().enumerate() {
        let value = row
            .get::<_, Option<f64>>(STAT_FIXED_COLUMNS + offset)?
            .unwrap_or(0.0);
        stats.set(*stat, value);
    }
    Ok(PlayerGameStat {
        player_id: row.get(0)?,
        game_id: row.get(1)?,
        team_id: row.get(2)?,
        position: position.filter(|p| !p.trim().is_empty()).map(|p| Position::parse(&p)),
        stats,
    })
}

fn dedup_by<T>(items: Vec<T>, key: impl Fn(&T) -> String) -> Vec<T> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|item| seen.insert(key(item))).collect()
}

fn unique_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| !id.trim().is_empty() && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

impl RecordStore for SqliteStore {
    fn team(&self, team_id: &str) -> StoreResult<Option<Team>> {
        self.read(|conn| {
            conn.query_row(
                "SELECT team_id, name, market, alias, division FROM teams WHERE team_id = ?1",
                params![team_id],
                decode_team,
            )
            .optional()
        })
    }

    fn teams(&self, team_ids: &[String]) -> StoreResult<Vec<Team>> {
        let mut out = Vec::new();
        for chunk in unique_ids(team_ids).chunks(MAX_IN_PARAMS) {
            let q = SqlQuery {
                sql: format!(
                    "SELECT team_id, name, market, alias, division FROM teams WHERE team_id IN ({}) ORDER BY team_id",
                    query::placeholders(chunk.len())
                ),
                params: chunk.iter().map(|id| Value::Text(id.clone())).collect(),
            };
            out.extend(self.fetch(&q, decode_team)?);
        }
        Ok(out)
    }

    fn player(&self, player_id: &str) -> StoreResult<Option<Player>> {
        self.read(|conn| {
            conn.query_row(
                "SELECT player_id, name, position, team_id, recruiting_score FROM players WHERE player_id = ?1",
                params![player_id],
                decode_player,
            )
            .optional()
        })
    }

    fn players(&self, player_ids: &[String]) -> StoreResult<Vec<Player>> {
        let mut out = Vec::new();
        for chunk in unique_ids(player_ids).chunks(MAX_IN_PARAMS) {
            let q = SqlQuery {
                sql: format!(
                    "SELECT player_id, name, position, team_id, recruiting_score FROM players WHERE player_id IN ({}) ORDER BY player_id",
                    query::placeholders(chunk.len())
                ),
                params: chunk.iter().map(|id| Value::Text(id.clone())).collect(),
            };
            out.extend(self.fetch(&q, decode_player)?);
        }
        Ok(out)
    }

    fn game(&self, game_id: &str) -> StoreResult<Option<Game>> {
        self.read(|conn| {
            conn.query_row(&query::game_by_id(), params![game_id], |row| decode_game_at(row, 0))
                .optional()
        })
    }

    fn games_for_teams(&self, team_ids: &[String], filter: &GameFilter) -> StoreResult<Vec<Game>> {
        let ids = unique_ids(team_ids);
        let mut out = Vec::new();
        for chunk in ids.chunks(MAX_IN_PARAMS) {
            let q = query::games_for_teams(chunk, filter);
            out.extend(self.fetch(&q, |row| decode_game_at(row, 0))?);
        }
        if ids.len() > MAX_IN_PARAMS {
            out = dedup_by(out, |g| g.game_id.clone());
        }
        Ok(out)
    }

    fn appearances(
        &self,
        player_ids: &[String],
        filter: &GameFilter,
    ) -> StoreResult<Vec<Appearance>> {
        let mut out = Vec::new();
        for chunk in unique_ids(player_ids).chunks(MAX_IN_PARAMS) {
            let q = query::appearances(chunk, filter);
            out.extend(self.fetch(&q, |row| {
                Ok(Appearance {
                    player_id: row.get(0)?,
                    team_id: row.get(1)?,
                    game: decode_game_at(row, 2)?,
                })
            })?);
        }
        Ok(out)
    }

    fn player_game_stats(
        &self,
        subject: StatSubject<'_>,
        game_ids: &[String],
    ) -> StoreResult<Vec<PlayerGameStat>> {
        let games = unique_ids(game_ids);
        let mut out = Vec::new();
        for game_chunk in games.chunks(MAX_IN_PARAMS) {
            match subject {
                StatSubject::Team(team_id) => {
                    let q = query::stats_for_team(team_id, game_chunk);
                    out.extend(self.fetch(&q, decode_stat_row)?);
                }
                StatSubject::Players(player_ids) => {
                    for player_chunk in unique_ids(player_ids).chunks(MAX_IN_PARAMS) {
                        let q = query::stats_for_players(player_chunk, game_chunk);
                        out.extend(self.fetch(&q, decode_stat_row)?);
                    }
                }
            }
        }
        Ok(out)
    }

    fn poll_points(
        &self,
        team_id: &str,
        season: i32,
        week: i32,
        kind: PollKind,
    ) -> StoreResult<Option<f64>> {
        self.read(|conn| {
            conn.query_row(
                "SELECT points FROM polls WHERE team_id = ?1 AND season = ?2 AND week = ?3 AND kind = ?4",
                params![team_id, season, week, kind.as_str()],
                |row| row.get(0),
            )
            .optional()
        })
    }
}

pub fn upsert_team(tx: &Transaction<'_>, team: &Team) -> StoreResult<()> {
    tx.execute(
        r#"
        INSERT INTO teams (team_id, name, market, alias, division, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(team_id) DO UPDATE SET
            name = excluded.name,
            market = excluded.market,
            alias = excluded.alias,
            division = excluded.division,
            updated_at = excluded.updated_at
        "#,
        params![
            team.team_id,
            team.name,
            team.market,
            team.alias,
            team.division.map(Division::as_str),
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

pub fn upsert_player(tx: &Transaction<'_>, player: &Player) -> StoreResult<()> {
    tx.execute(
        r#"
        INSERT INTO players (player_id, name, position, team_id, recruiting_score, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(player_id) DO UPDATE SET
            name = excluded.name,
            position = excluded.position,
            team_id = excluded.team_id,
            recruiting_score = excluded.recruiting_score,
            updated_at = excluded.updated_at
        "#,
        params![
            player.player_id,
            player.name,
            player.position.as_str(),
            player.team_id,
            player.recruiting_score,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn box_values(line: Option<&TeamLine>) -> impl Iterator<Item = Value> + '_ {
    TeamStat::box_score().map(move |stat| match line {
        Some(line) => Value::Real(line.get(stat)),
        None => Value::Null,
    })
}

pub fn upsert_game(tx: &Transaction<'_>, game: &Game) -> StoreResult<()> {
    let mut values = vec![
        Value::Text(game.game_id.clone()),
        Value::Integer(i64::from(game.season)),
        Value::Integer(i64::from(game.week)),
        Value::Text(game.home_team_id.clone()),
        Value::Text(game.away_team_id.clone()),
        Value::Integer(i64::from(game.home_points)),
        Value::Integer(i64::from(game.away_points)),
    ];
    values.extend(box_values(game.home_box.as_ref()));
    values.extend(box_values(game.away_box.as_ref()));
    values.push(Value::Text(Utc::now().to_rfc3339()));
    tx.execute(&query::upsert_game(), params_from_iter(values))?;
    Ok(())
}

pub fn upsert_player_game_stat(tx: &Transaction<'_>, row: &PlayerGameStat) -> StoreResult<()> {
    let mut values = vec![
        Value::Text(row.player_id.clone()),
        Value::Text(row.game_id.clone()),
        Value::Text(row.team_id.clone()),
        row.position
            .as_ref()
            .map(|p| Value::Text(p.as_str().to_string()))
            .unwrap_or(Value::Null),
    ];
    values.extend(PlayerStat::ALL.iter().map(|s| Value::Real(row.stats.get(*s))));
    values.push(Value::Text(Utc::now().to_rfc3339()));
    tx.execute(&query::upsert_player_game_stat(), params_from_iter(values))?;
    Ok(())
}

pub fn upsert_poll(tx: &Transaction<'_>, entry: &PollEntry) -> StoreResult<()> {
    tx.execute(
        r#"
        INSERT INTO polls (team_id, season, week, kind, points, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(team_id, season, week, kind) DO UPDATE SET
            points = excluded.points,
            updated_at = excluded.updated_at
        "#,
        params![
            entry.team_id,
            entry.season,
            entry.week,
            entry.kind.as_str(),
            entry.points,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}
