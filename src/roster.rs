use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, StatsError};
use crate::models::{Player, PlayerGameStat, Position, PositionGroup};
use crate::period::GameFilter;
use crate::stat_keys::{PlayerStat, StatLine};
use crate::store::{RecordStore, StatSubject};

/// Id carried by padding entries. Blank, so downstream lookups resolve it to defaults.
pub const PLACEHOLDER_PLAYER_ID: &str = "";

pub const ROSTER_SIZE: usize = 29;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    pub group: PositionGroup,
    pub player_id: String,
    pub name: Option<String>,
    pub position: Option<Position>,
    /// The group's ranking value: a season stat total, or recruiting score for linemen.
    pub value: f64,
}

impl RosterEntry {
    pub fn placeholder(group: PositionGroup) -> Self {
        Self {
            group,
            player_id: PLACEHOLDER_PLAYER_ID.to_string(),
            name: None,
            position: None,
            value: 0.0,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.player_id == PLACEHOLDER_PLAYER_ID
    }
}

/// A player who appeared for the team during the season.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterCandidate {
    pub player_id: String,
    pub name: Option<String>,
    pub position: Option<Position>,
    pub recruiting_score: f64,
    pub season: StatLine,
}

impl RosterCandidate {
    fn ranking_value(&self, group: PositionGroup) -> f64 {
        match group.ranking_stat() {
            Some(stat) => self.season.get(stat),
            None => self.recruiting_score,
        }
    }
}

/// Builds candidates from season stat rows, one per player in ascending id order.
pub fn candidates_from_rows(rows: &[PlayerGameStat], players: &[Player]) -> Vec<RosterCandidate> {
    let by_id: HashMap<&str, &Player> = players.iter().map(|p| (p.player_id.as_str(), p)).collect();
    let mut grouped: BTreeMap<&str, (StatLine, Option<&Position>)> = BTreeMap::new();
    for row in rows {
        let entry = grouped
            .entry(row.player_id.as_str())
            .or_insert_with(|| (StatLine::default(), None));
        for stat in PlayerStat::ALL {
            entry.0.set(*stat, entry.0.get(*stat) + row.stats.get(*stat));
        }
        if let Some(pos) = &row.position {
            entry.1 = Some(pos);
        }
    }
    grouped
        .into_iter()
        .map(|(id, (season, row_position))| {
            let player = by_id.get(id);
            RosterCandidate {
                player_id: id.to_string(),
                name: player.map(|p| p.name.clone()),
                position: player.map(|p| p.position.clone()).or_else(|| row_position.cloned()),
                recruiting_score: player.map(|p| p.recruiting_score).unwrap_or(0.0),
                season,
            }
        })
        .collect()
}

/// Ranks candidates within each group (stable, so ties keep candidate order), keeps each
/// group's quota and pads short groups with placeholders.
pub fn rank_roster(candidates: &[RosterCandidate]) -> Vec<RosterEntry> {
    let mut roster = Vec::with_capacity(ROSTER_SIZE);
    for group in PositionGroup::ALL {
        let mut ranked: Vec<RosterEntry> = candidates
            .iter()
            .filter(|c| c.position.as_ref().and_then(Position::group) == Some(group))
            .map(|c| RosterEntry {
                group,
                player_id: c.player_id.clone(),
                name: c.name.clone(),
                position: c.position.clone(),
                value: c.ranking_value(group),
            })
            .collect();
        ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
        ranked.truncate(group.quota());
        while ranked.len() < group.quota() {
            ranked.push(RosterEntry::placeholder(group));
        }
        roster.extend(ranked);
    }
    roster
}

pub fn build_roster(store: &dyn RecordStore, team_id: &str, season: i32) -> Result<Vec<RosterEntry>> {
    if team_id.trim().is_empty() {
        return Ok(rank_roster(&[]));
    }
    let context = || format!("roster for team {team_id} season {season}");
    let games = store
        .games_for_teams(&[team_id.to_string()], &GameFilter::whole_season(season))
        .map_err(|err| StatsError::store(err, context()))?;
    let game_ids: Vec<String> = games
        .iter()
        .filter(|g| g.season == season && g.is_completed() && g.side_of(team_id).is_some())
        .map(|g| g.game_id.clone())
        .collect();
    let rows = if game_ids.is_empty() {
        Vec::new()
    } else {
        store
            .player_game_stats(StatSubject::Team(team_id), &game_ids)
            .map_err(|err| StatsError::store(err, context()))?
    };
    let mut player_ids: Vec<String> = rows.iter().map(|r| r.player_id.clone()).collect();
    player_ids.sort();
    player_ids.dedup();
    let players = if player_ids.is_empty() {
        Vec::new()
    } else {
        store
            .players(&player_ids)
            .map_err(|err| StatsError::store(err, context()))?
    };
    let candidates = candidates_from_rows(&rows, &players);
    let roster = rank_roster(&candidates);
    debug!(
        team_id,
        season,
        candidates = candidates.len(),
        filled = roster.iter().filter(|e| !e.is_placeholder()).count(),
        "built roster"
    );
    Ok(roster)
}
