use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Result, StatsError};
use crate::models::{Appearance, Game};
use crate::period::{Anchor, Period, Side};
use crate::store::RecordStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef<'a> {
    Player(&'a str),
    Team(&'a str),
}

impl EntityRef<'_> {
    pub fn id(&self) -> &str {
        match self {
            EntityRef::Player(id) | EntityRef::Team(id) => id,
        }
    }
}

/// A game in an entity's window, with the side the entity's team played on.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowGame {
    pub game: Game,
    pub side: Side,
}

impl WindowGame {
    pub fn team_id(&self) -> &str {
        self.game.team_id(self.side)
    }

    pub fn opponent_id(&self) -> &str {
        self.game.team_id(self.side.other())
    }
}

/// Candidate window games for `team_id` among `games`; games the team did not play are dropped.
pub fn team_candidates<'a>(team_id: &str, games: impl IntoIterator<Item = &'a Game>) -> Vec<WindowGame> {
    games
        .into_iter()
        .filter_map(|game| {
            game.side_of(team_id).map(|side| WindowGame {
                game: game.clone(),
                side,
            })
        })
        .collect()
}

fn player_candidate(app: &Appearance) -> Option<WindowGame> {
    match app.game.side_of(&app.team_id) {
        Some(side) => Some(WindowGame {
            game: app.game.clone(),
            side,
        }),
        None => {
            warn!(
                player_id = %app.player_id,
                game_id = %app.game.game_id,
                team_id = %app.team_id,
                "stat row team did not play in game, ignoring"
            );
            None
        }
    }
}

/// Applies `period` at `anchor` to `candidates`.
///
/// Keeps completed games the period admits, on the requested side, most recent first, capped at
/// the period limit. A game id appearing twice is kept once.
pub fn select(candidates: Vec<WindowGame>, anchor: Anchor, period: Period) -> Vec<WindowGame> {
    let side = period.side();
    let mut picked: Vec<WindowGame> = candidates
        .into_iter()
        .filter(|wg| wg.game.is_completed())
        .filter(|wg| period.admits(anchor, wg.game.season, wg.game.week))
        .filter(|wg| side.is_none_or(|s| s == wg.side))
        .collect();
    picked.sort_by(|a, b| {
        b.game
            .sort_key()
            .cmp(&a.game.sort_key())
            .then_with(|| a.game.game_id.cmp(&b.game.game_id))
    });
    let mut seen = HashSet::new();
    picked.retain(|wg| seen.insert(wg.game.game_id.clone()));
    if let Some(limit) = period.limit() {
        picked.truncate(limit);
    }
    picked
}

fn context(kind: &str, ids: &[String], anchor: Anchor, period: Period) -> String {
    match ids {
        [one] => format!("{kind} {one} {period} as of {anchor}"),
        _ => format!("{} {kind}s {period} as of {anchor}", ids.len()),
    }
}

/// Windows for many teams from one store call. Keys are the non-blank input ids.
pub fn resolve_team_windows(
    store: &dyn RecordStore,
    team_ids: &[String],
    anchor: Anchor,
    period: Period,
) -> Result<HashMap<String, Vec<WindowGame>>> {
    let ids: Vec<String> = team_ids
        .iter()
        .filter(|id| !id.trim().is_empty())
        .cloned()
        .collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let games = store
        .games_for_teams(&ids, &period.game_filter(anchor))
        .map_err(|err| StatsError::store(err, context("team", &ids, anchor, period)))?;
    let windows: HashMap<String, Vec<WindowGame>> = ids
        .iter()
        .map(|id| (id.clone(), select(team_candidates(id, &games), anchor, period)))
        .collect();
    debug!(teams = ids.len(), candidates = games.len(), %anchor, %period, "resolved team windows");
    Ok(windows)
}

/// Windows for many players from one store call. Keys are the non-blank input ids.
pub fn resolve_player_windows(
    store: &dyn RecordStore,
    player_ids: &[String],
    anchor: Anchor,
    period: Period,
) -> Result<HashMap<String, Vec<WindowGame>>> {
    let ids: Vec<String> = player_ids
        .iter()
        .filter(|id| !id.trim().is_empty())
        .cloned()
        .collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let appearances = store
        .appearances(&ids, &period.game_filter(anchor))
        .map_err(|err| StatsError::store(err, context("player", &ids, anchor, period)))?;
    let mut candidates: HashMap<String, Vec<WindowGame>> =
        ids.iter().map(|id| (id.clone(), Vec::new())).collect();
    for app in &appearances {
        if let (Some(list), Some(wg)) = (candidates.get_mut(&app.player_id), player_candidate(app)) {
            list.push(wg);
        }
    }
    let windows = candidates
        .into_iter()
        .map(|(id, games)| (id, select(games, anchor, period)))
        .collect();
    debug!(players = ids.len(), candidates = appearances.len(), %anchor, %period, "resolved player windows");
    Ok(windows)
}

pub fn resolve_window(
    store: &dyn RecordStore,
    entity: EntityRef<'_>,
    anchor: Anchor,
    period: Period,
) -> Result<Vec<WindowGame>> {
    let ids = [entity.id().to_string()];
    let mut windows = match entity {
        EntityRef::Player(_) => resolve_player_windows(store, &ids, anchor, period)?,
        EntityRef::Team(_) => resolve_team_windows(store, &ids, anchor, period)?,
    };
    Ok(windows.remove(entity.id()).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::{WindowGame, select, team_candidates};
    use crate::models::Game;
    use crate::period::{Anchor, Period, Side};

    fn game(id: &str, season: i32, week: i32, home: &str, away: &str) -> Game {
        Game {
            game_id: id.to_string(),
            season,
            week,
            home_team_id: home.to_string(),
            away_team_id: away.to_string(),
            home_points: 17,
            away_points: 10,
            home_box: None,
            away_box: None,
        }
    }

    fn ids(window: &[WindowGame]) -> Vec<&str> {
        window.iter().map(|wg| wg.game.game_id.as_str()).collect()
    }

    fn schedule() -> Vec<Game> {
        vec![
            game("a1", 2018, 11, "t", "x"),
            game("a2", 2018, 12, "y", "t"),
            game("b1", 2019, 1, "t", "x"),
            game("b2", 2019, 2, "z", "t"),
            game("b3", 2019, 3, "t", "y"),
            game("b4", 2019, 4, "t", "z"),
            game("b5", 2019, 5, "x", "t"),
        ]
    }

    #[test]
    fn last3_crosses_seasons_and_excludes_anchor_week() {
        let cands = team_candidates("t", &schedule());
        let w = select(cands, Anchor::new(2019, 3), Period::Last3Games(None));
        assert_eq!(ids(&w), vec!["b2", "b1", "a2"]);
    }

    #[test]
    fn never_returns_games_at_or_after_anchor() {
        let anchor = Anchor::new(2019, 4);
        for period in Period::ALL {
            let w = select(team_candidates("t", &schedule()), anchor, period);
            assert!(w.iter().all(|wg| (wg.game.season, wg.game.week) < (2019, 4)), "{period}");
            if let Some(limit) = period.limit() {
                assert!(w.len() <= limit);
            }
        }
    }

    #[test]
    fn side_filters_apply() {
        let anchor = Anchor::new(2019, 6);
        let home = select(team_candidates("t", &schedule()), anchor, Period::Season(Some(Side::Home)));
        assert_eq!(ids(&home), vec!["b4", "b3", "b1"]);
        let away = select(
            team_candidates("t", &schedule()),
            anchor,
            Period::LastSeason(Some(Side::Away)),
        );
        assert_eq!(ids(&away), vec!["a2"]);
    }

    #[test]
    fn unplayed_games_are_skipped() {
        let mut games = schedule();
        games[5].home_points = 0;
        games[5].away_points = 0;
        let w = select(team_candidates("t", &games), Anchor::new(2019, 5), Period::LastGame);
        assert_eq!(ids(&w), vec!["b3"]);
    }

    #[test]
    fn week_one_season_window_is_empty() {
        let w = select(team_candidates("t", &schedule()), Anchor::new(2019, 1), Period::Season(None));
        assert!(w.is_empty());
    }
}
