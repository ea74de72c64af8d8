use std::collections::HashMap;

use tracing::debug;

use crate::error::{Result, StatsError};
use crate::metrics::WinLossRecord;
use crate::models::{Division, GameOutcome, Team};
use crate::period::{Anchor, Period};
use crate::store::RecordStore;
use crate::window::{self, EntityRef, WindowGame};

fn opponent_ids(window: &[WindowGame]) -> Vec<String> {
    let mut ids: Vec<String> = window.iter().map(|wg| wg.opponent_id().to_string()).collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Anchor at which opponent records are read: one week before the query anchor.
pub fn record_anchor(anchor: Anchor) -> Anchor {
    anchor.week_before()
}

/// Each opponent's `season` record as of `at`, from a single store call.
pub fn opponent_records(
    store: &dyn RecordStore,
    opponents: &[String],
    at: Anchor,
) -> Result<HashMap<String, WinLossRecord>> {
    let windows = window::resolve_team_windows(store, opponents, at, Period::Season(None))?;
    Ok(windows
        .into_iter()
        .map(|(id, window)| (id, WinLossRecord::from_window(&window)))
        .collect())
}

/// Beating an opponent credits its wins; losing or drawing charges its losses.
/// `None` for an empty window, `Some(0.0)` when both totals are zero.
pub fn sor_from_records(
    window: &[WindowGame],
    records: &HashMap<String, WinLossRecord>,
) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    let mut total_wins = 0u32;
    let mut total_losses = 0u32;
    for wg in window {
        let record = records.get(wg.opponent_id()).copied().unwrap_or_default();
        match wg.game.outcome_for(wg.side) {
            GameOutcome::Win => total_wins += record.wins,
            GameOutcome::Loss | GameOutcome::Draw => total_losses += record.losses,
        }
    }
    let total = total_wins + total_losses;
    if total == 0 {
        return Some(0.0);
    }
    Some(f64::from(total_wins) / f64::from(total))
}

pub fn strength_of_record(
    store: &dyn RecordStore,
    team_id: &str,
    anchor: Anchor,
    period: Period,
) -> Result<Option<f64>> {
    let window = window::resolve_window(store, EntityRef::Team(team_id), anchor, period)?;
    if window.is_empty() {
        return Ok(None);
    }
    let opponents = opponent_ids(&window);
    let records = opponent_records(store, &opponents, record_anchor(anchor))?;
    let sor = sor_from_records(&window, &records);
    debug!(team_id, %anchor, %period, opponents = opponents.len(), ?sor, "strength of record");
    Ok(sor)
}

/// `fcs / (fcs + fbs)` over classified opponents; 0 when none are classified.
pub fn fcs_ratio(window: &[WindowGame], divisions: &HashMap<String, Division>) -> f64 {
    let (mut fcs, mut fbs) = (0u32, 0u32);
    for wg in window {
        match divisions.get(wg.opponent_id()) {
            Some(Division::Fcs) => fcs += 1,
            Some(Division::Fbs) => fbs += 1,
            None => {}
        }
    }
    if fcs + fbs == 0 {
        return 0.0;
    }
    f64::from(fcs) / f64::from(fcs + fbs)
}

pub fn fcs_opponent_ratio(
    store: &dyn RecordStore,
    team_id: &str,
    anchor: Anchor,
    period: Period,
) -> Result<f64> {
    let window = window::resolve_window(store, EntityRef::Team(team_id), anchor, period)?;
    if window.is_empty() {
        return Ok(0.0);
    }
    let opponents = opponent_ids(&window);
    let teams = store.teams(&opponents).map_err(|err| {
        StatsError::store(err, format!("opponents of team {team_id} {period} as of {anchor}"))
    })?;
    let divisions: HashMap<String, Division> = teams
        .into_iter()
        .filter_map(|Team { team_id, division, .. }| division.map(|d| (team_id, d)))
        .collect();
    Ok(fcs_ratio(&window, &divisions))
}

/// `None` when the team is unknown or unclassified.
pub fn division_for_team(store: &dyn RecordStore, team_id: &str) -> Result<Option<Division>> {
    if team_id.trim().is_empty() {
        return Ok(None);
    }
    let team = store
        .team(team_id)
        .map_err(|err| StatsError::store(err, format!("team {team_id}")))?;
    Ok(team.and_then(|t| t.division))
}
