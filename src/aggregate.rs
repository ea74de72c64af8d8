use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, StatsError};
use crate::metrics::{PlayerRates, TeamRates, WinLossRecord};
use crate::models::PlayerGameStat;
use crate::period::{Anchor, Period};
use crate::stat_keys::{PlayerStat, StatLine, TeamLine, TeamStat, TeamStatRef};
use crate::store::{RecordStore, StatSubject};
use crate::window::{self, EntityRef, WindowGame};

/// Sums for the requested stats over one entity's window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTotals<K: Ord> {
    /// Qualifying games in the window.
    pub games_found: usize,
    /// Window games with a recorded row for the entity.
    pub games_played: usize,
    pub totals: BTreeMap<K, f64>,
}

impl<K: Ord + Copy> RawTotals<K> {
    pub fn empty(stats: &[K]) -> Self {
        Self {
            games_found: 0,
            games_played: 0,
            totals: stats.iter().map(|k| (*k, 0.0)).collect(),
        }
    }

    pub fn get(&self, key: K) -> f64 {
        self.totals.get(&key).copied().unwrap_or(0.0)
    }
}

/// `lastGame` counts its game as played even without a recorded row.
fn games_played(period: Period, window_len: usize, recorded: usize) -> usize {
    if period == Period::LastGame {
        window_len.min(1)
    } else {
        recorded
    }
}

pub fn period_completed(period: Period, games_found: usize) -> bool {
    games_found >= period.min_games_for_completion()
}

/// Full stat line over the window plus the number of window games with a row.
fn player_line<'a>(
    window: &[WindowGame],
    rows: impl IntoIterator<Item = &'a PlayerGameStat>,
) -> (StatLine, usize) {
    let in_window: HashSet<&str> = window.iter().map(|wg| wg.game.game_id.as_str()).collect();
    let mut counted = HashSet::new();
    let mut line = StatLine::default();
    for row in rows {
        if !in_window.contains(row.game_id.as_str()) || !counted.insert(row.game_id.as_str()) {
            continue;
        }
        for stat in PlayerStat::ALL {
            line.set(*stat, line.get(*stat) + row.stats.get(*stat));
        }
    }
    (line, counted.len())
}

pub fn sum_player_rows(
    window: &[WindowGame],
    rows: &[PlayerGameStat],
    stats: &[PlayerStat],
) -> RawTotals<PlayerStat> {
    let (line, recorded) = player_line(window, rows);
    RawTotals {
        games_found: window.len(),
        games_played: recorded,
        totals: stats.iter().map(|s| (*s, line.get(*s))).collect(),
    }
}

/// Both sides' sums over a team window. Points go in the `Points` slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamSums {
    pub own: TeamLine,
    pub opponent: TeamLine,
    pub own_box_games: usize,
    pub opponent_box_games: usize,
}

impl TeamSums {
    pub fn from_window(window: &[WindowGame]) -> Self {
        let mut sums = TeamSums::default();
        for wg in window {
            let opp = wg.side.other();
            for stat in TeamStat::ALL {
                sums.own.set(*stat, sums.own.get(*stat) + wg.game.team_value(wg.side, *stat));
                sums.opponent
                    .set(*stat, sums.opponent.get(*stat) + wg.game.team_value(opp, *stat));
            }
            if wg.game.box_score(wg.side).is_some() {
                sums.own_box_games += 1;
            }
            if wg.game.box_score(opp).is_some() {
                sums.opponent_box_games += 1;
            }
        }
        sums
    }

    pub fn get(&self, key: TeamStatRef) -> f64 {
        if key.opponent {
            self.opponent.get(key.stat)
        } else {
            self.own.get(key.stat)
        }
    }
}

pub fn sum_team_games(window: &[WindowGame], stats: &[TeamStatRef]) -> RawTotals<TeamStatRef> {
    let sums = TeamSums::from_window(window);
    RawTotals {
        games_found: window.len(),
        games_played: sums.own_box_games,
        totals: stats.iter().map(|k| (*k, sums.get(*k))).collect(),
    }
}

fn window_game_ids<'a>(windows: impl IntoIterator<Item = &'a Vec<WindowGame>>) -> Vec<String> {
    let mut seen = HashSet::new();
    windows
        .into_iter()
        .flatten()
        .filter(|wg| seen.insert(wg.game.game_id.as_str()))
        .map(|wg| wg.game.game_id.clone())
        .collect()
}

fn fetch_player_rows(
    store: &dyn RecordStore,
    player_ids: &[String],
    game_ids: &[String],
    anchor: Anchor,
    period: Period,
) -> Result<Vec<PlayerGameStat>> {
    if player_ids.is_empty() || game_ids.is_empty() {
        return Ok(Vec::new());
    }
    store
        .player_game_stats(StatSubject::Players(player_ids), game_ids)
        .map_err(|err| {
            StatsError::store(
                err,
                format!("stat rows for {} players {period} as of {anchor}", player_ids.len()),
            )
        })
}

pub fn aggregate_player(
    store: &dyn RecordStore,
    player_id: &str,
    anchor: Anchor,
    period: Period,
    stats: &[PlayerStat],
) -> Result<RawTotals<PlayerStat>> {
    let window = window::resolve_window(store, EntityRef::Player(player_id), anchor, period)?;
    if window.is_empty() {
        return Ok(RawTotals::empty(stats));
    }
    let ids = [player_id.to_string()];
    let rows = fetch_player_rows(store, &ids, &window_game_ids([&window]), anchor, period)?;
    let mut totals = sum_player_rows(&window, &rows, stats);
    totals.games_played = games_played(period, window.len(), totals.games_played);
    Ok(totals)
}

pub fn aggregate_team(
    store: &dyn RecordStore,
    team_id: &str,
    anchor: Anchor,
    period: Period,
    stats: &[TeamStatRef],
) -> Result<RawTotals<TeamStatRef>> {
    let window = window::resolve_window(store, EntityRef::Team(team_id), anchor, period)?;
    let mut totals = sum_team_games(&window, stats);
    totals.games_played = games_played(period, window.len(), totals.games_played);
    Ok(totals)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerPeriodStats {
    pub player_id: String,
    pub period_completed: bool,
    pub games_found: usize,
    pub games_played: usize,
    pub totals: StatLine,
    pub rates: PlayerRates,
}

impl PlayerPeriodStats {
    pub fn empty(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            period_completed: false,
            games_found: 0,
            games_played: 0,
            totals: StatLine::default(),
            rates: PlayerRates::default(),
        }
    }

    fn compute(player_id: &str, period: Period, window: &[WindowGame], rows: &[&PlayerGameStat]) -> Self {
        if window.is_empty() {
            return Self::empty(player_id);
        }
        let (totals, recorded) = player_line(window, rows.iter().copied());
        let played = games_played(period, window.len(), recorded);
        Self {
            player_id: player_id.to_string(),
            period_completed: period_completed(period, window.len()),
            games_found: window.len(),
            games_played: played,
            rates: PlayerRates::from_totals(&totals, played),
            totals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamPeriodStats {
    pub team_id: String,
    pub period_completed: bool,
    pub games_found: usize,
    /// Window games with the team's own box score.
    pub games_played: usize,
    /// Window games with the opponent's box score.
    pub opponent_games_played: usize,
    pub points: f64,
    pub opponent_points: f64,
    pub totals: TeamLine,
    pub opponent_totals: TeamLine,
    pub record: WinLossRecord,
    pub rates: TeamRates,
}

impl TeamPeriodStats {
    pub fn empty(team_id: &str) -> Self {
        Self {
            team_id: team_id.to_string(),
            period_completed: false,
            games_found: 0,
            games_played: 0,
            opponent_games_played: 0,
            points: 0.0,
            opponent_points: 0.0,
            totals: TeamLine::default(),
            opponent_totals: TeamLine::default(),
            record: WinLossRecord::default(),
            rates: TeamRates::default(),
        }
    }

    pub fn compute(team_id: &str, period: Period, window: &[WindowGame]) -> Self {
        if window.is_empty() {
            return Self::empty(team_id);
        }
        let sums = TeamSums::from_window(window);
        let record = WinLossRecord::from_window(window);
        Self {
            team_id: team_id.to_string(),
            period_completed: period_completed(period, window.len()),
            games_found: window.len(),
            games_played: games_played(period, window.len(), sums.own_box_games),
            opponent_games_played: sums.opponent_box_games,
            points: sums.own.get(TeamStat::Points),
            opponent_points: sums.opponent.get(TeamStat::Points),
            rates: TeamRates::from_totals(
                &sums.own,
                &sums.opponent,
                window.len(),
                sums.own_box_games,
                sums.opponent_box_games,
                &record,
            ),
            totals: sums.own,
            opponent_totals: sums.opponent,
            record,
        }
    }
}

/// One record per input id, same order. Blank ids get the empty record without a store call;
/// unknown ids get the empty record keyed by the id.
pub fn player_period_stats_batch(
    store: &dyn RecordStore,
    player_ids: &[String],
    anchor: Anchor,
    period: Period,
) -> Result<Vec<PlayerPeriodStats>> {
    let windows = window::resolve_player_windows(store, player_ids, anchor, period)?;
    let active: Vec<String> = windows
        .iter()
        .filter(|(_, w)| !w.is_empty())
        .map(|(id, _)| id.clone())
        .collect();
    let rows = fetch_player_rows(store, &active, &window_game_ids(windows.values()), anchor, period)?;
    let mut rows_by_player: HashMap<&str, Vec<&PlayerGameStat>> = HashMap::new();
    for row in &rows {
        rows_by_player.entry(row.player_id.as_str()).or_default().push(row);
    }
    debug!(
        requested = player_ids.len(),
        active = active.len(),
        rows = rows.len(),
        %anchor,
        %period,
        "player batch"
    );

    let no_rows: Vec<&PlayerGameStat> = Vec::new();
    Ok(player_ids
        .par_iter()
        .map(|id| match windows.get(id.as_str()) {
            Some(window) => {
                let rows = rows_by_player.get(id.as_str()).unwrap_or(&no_rows);
                PlayerPeriodStats::compute(id, period, window, rows)
            }
            None => PlayerPeriodStats::empty(id),
        })
        .collect())
}

pub fn team_period_stats_batch(
    store: &dyn RecordStore,
    team_ids: &[String],
    anchor: Anchor,
    period: Period,
) -> Result<Vec<TeamPeriodStats>> {
    let windows = window::resolve_team_windows(store, team_ids, anchor, period)?;
    debug!(requested = team_ids.len(), resolved = windows.len(), %anchor, %period, "team batch");
    Ok(team_ids
        .par_iter()
        .map(|id| match windows.get(id.as_str()) {
            Some(window) => TeamPeriodStats::compute(id, period, window),
            None => TeamPeriodStats::empty(id),
        })
        .collect())
}

/// Parses a batch id list given as a JSON array (`["a","b"]`) or a comma list (`a,b`).
/// Blank entries are kept so output stays aligned with input.
pub fn parse_id_list(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(trimmed)
            .map_err(|err| StatsError::malformed(format!("id list: {err}")))?;
        return values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s.trim().to_string()),
                Value::Number(n) => Ok(n.to_string()),
                Value::Null => Ok(String::new()),
                other => Err(StatsError::malformed(format!("id list entry {other}"))),
            })
            .collect();
    }
    Ok(trimmed.split(',').map(|s| s.trim().to_string()).collect())
}
