use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::aggregate::{self, PlayerPeriodStats, RawTotals, TeamPeriodStats};
use crate::error::{EntityKind, Result, StatsError, or_default_on_missing};
use crate::metrics::{self, PlayerRates, TeamRates, WinLossRecord};
use crate::models::{Division, Game, Player, PollKind, Team};
use crate::opponent;
use crate::period::{Anchor, GameFilter, Period};
use crate::roster::{self, RosterEntry};
use crate::stat_keys::{PlayerStat, StatLine, TeamStatRef};
use crate::store::{RecordStore, StatSubject};
use crate::window::{self, EntityRef};

macro_rules! metric_names {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => ($label:literal, $field:ident)),+ $(,)? }
        over $rates:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn pick(self, rates: &$rates) -> f64 {
                match self {
                    $($name::$variant => rates.$field),+
                }
            }
        }

        impl FromStr for $name {
            type Err = StatsError;

            fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|m| m.name() == raw.trim())
                    .ok_or_else(|| StatsError::malformed(format!("unknown metric {raw:?}")))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

metric_names! {
    pub enum PlayerMetric {
        CompletionPercentage => ("completion-percentage", completion_pct),
        PassingYardsPerGame => ("passing-yards-per-game", passing_yards_per_game),
        PassingTdsPerGame => ("passing-tds-per-game", passing_tds_per_game),
        TdIntRatio => ("td-int-ratio", td_int_ratio),
        Qbr => ("qbr", qbr),
        YardsPerCarry => ("yards-per-carry", yards_per_carry),
        RushingYardsPerGame => ("rushing-yards-per-game", rushing_yards_per_game),
        RushingTdsPerGame => ("rushing-tds-per-game", rushing_tds_per_game),
        FumblesPerGame => ("fumbles-per-game", fumbles_per_game),
        ReceptionsPerGame => ("receptions-per-game", receptions_per_game),
        ReceivingYardsPerGame => ("receiving-yards-per-game", receiving_yards_per_game),
        ReceivingTdsPerGame => ("receiving-tds-per-game", receiving_tds_per_game),
        YardsPerCatch => ("yards-per-catch", yards_per_catch),
        TacklesPerGame => ("tackles-per-game", tackles_per_game),
        SacksPerGame => ("sacks-per-game", sacks_per_game),
        InterceptionsPerGame => ("interceptions-per-game", interceptions_per_game),
        PassesDefendedPerGame => ("passes-defended-per-game", passes_defended_per_game),
        ForcedFumblesPerGame => ("forced-fumbles-per-game", forced_fumbles_per_game),
    }
    over PlayerRates
}

metric_names! {
    pub enum TeamMetric {
        YardsPerPlay => ("yards-per-play", yards_per_play),
        YardsPerGame => ("yards-per-game", yards_per_game),
        TurnoversPerGame => ("turnovers-per-game", turnovers_per_game),
        PenaltiesPerGame => ("penalties-per-game", penalties_per_game),
        ThirdDownRate => ("third-down-rate", third_down_rate),
        RedZoneRate => ("red-zone-rate", red_zone_rate),
        ForcedFumblesPerGame => ("forced-fumbles-per-game", forced_fumbles_per_game),
        SacksPerGame => ("sacks-per-game", sacks_per_game),
        InterceptionsPerGame => ("interceptions-per-game", interceptions_per_game),
        PointsPerGame => ("points-per-game", points_per_game),
        OpponentPointsPerGame => ("opponent-points-per-game", opponent_points_per_game),
        OpponentYardsPerGame => ("opponent-yards-per-game", opponent_yards_per_game),
        OpponentYardsPerPlay => ("opponent-yards-per-play", opponent_yards_per_play),
        WinPercentage => ("win-percentage", win_pct),
    }
    over TeamRates
}

fn require_player(store: &dyn RecordStore, player_id: &str) -> Result<Player> {
    store
        .player(player_id)
        .map_err(|err| StatsError::store(err, format!("player {player_id}")))?
        .ok_or_else(|| StatsError::not_found(EntityKind::Player, player_id))
}

fn require_team(store: &dyn RecordStore, team_id: &str) -> Result<Team> {
    store
        .team(team_id)
        .map_err(|err| StatsError::store(err, format!("team {team_id}")))?
        .ok_or_else(|| StatsError::not_found(EntityKind::Team, team_id))
}

fn require_game(store: &dyn RecordStore, game_id: &str) -> Result<Game> {
    store
        .game(game_id)
        .map_err(|err| StatsError::store(err, format!("game {game_id}")))?
        .ok_or_else(|| StatsError::not_found(EntityKind::Game, game_id))
}

fn line_from_totals(totals: &RawTotals<PlayerStat>) -> StatLine {
    let mut line = StatLine::default();
    for (stat, value) in &totals.totals {
        line.set(*stat, *value);
    }
    line
}

pub fn player_totals(
    store: &dyn RecordStore,
    player_id: &str,
    anchor: Anchor,
    period: Period,
    stats: &[PlayerStat],
) -> Result<RawTotals<PlayerStat>> {
    aggregate::aggregate_player(store, player_id, anchor, period, stats)
}

pub fn player_rates(
    store: &dyn RecordStore,
    player_id: &str,
    anchor: Anchor,
    period: Period,
) -> Result<PlayerRates> {
    let totals = player_totals(store, player_id, anchor, period, PlayerStat::ALL)?;
    Ok(PlayerRates::from_totals(&line_from_totals(&totals), totals.games_played))
}

pub fn player_metric(
    store: &dyn RecordStore,
    player_id: &str,
    anchor: Anchor,
    period: Period,
    metric: PlayerMetric,
) -> Result<f64> {
    Ok(metric.pick(&player_rates(store, player_id, anchor, period)?))
}

pub fn yards_per_carry(s: &dyn RecordStore, id: &str, anchor: Anchor, period: Period) -> Result<f64> {
    player_metric(s, id, anchor, period, PlayerMetric::YardsPerCarry)
}

pub fn completion_percentage(
    s: &dyn RecordStore,
    id: &str,
    anchor: Anchor,
    period: Period,
) -> Result<f64> {
    player_metric(s, id, anchor, period, PlayerMetric::CompletionPercentage)
}

pub fn qbr(s: &dyn RecordStore, id: &str, anchor: Anchor, period: Period) -> Result<f64> {
    player_metric(s, id, anchor, period, PlayerMetric::Qbr)
}

pub fn td_int_ratio(s: &dyn RecordStore, id: &str, anchor: Anchor, period: Period) -> Result<f64> {
    player_metric(s, id, anchor, period, PlayerMetric::TdIntRatio)
}

/// 0 for unknown players.
pub fn recruiting_score(store: &dyn RecordStore, player_id: &str) -> Result<f64> {
    or_default_on_missing(
        require_player(store, player_id).map(|p| p.recruiting_score),
        || 0.0,
    )
}

pub fn team_totals(
    store: &dyn RecordStore,
    team_id: &str,
    anchor: Anchor,
    period: Period,
    stats: &[TeamStatRef],
) -> Result<RawTotals<TeamStatRef>> {
    aggregate::aggregate_team(store, team_id, anchor, period, stats)
}

pub fn team_period_stats(
    store: &dyn RecordStore,
    team_id: &str,
    anchor: Anchor,
    period: Period,
) -> Result<TeamPeriodStats> {
    let window = window::resolve_window(store, EntityRef::Team(team_id), anchor, period)?;
    Ok(TeamPeriodStats::compute(team_id, period, &window))
}

pub fn team_metric(
    store: &dyn RecordStore,
    team_id: &str,
    anchor: Anchor,
    period: Period,
    metric: TeamMetric,
) -> Result<f64> {
    Ok(metric.pick(&team_period_stats(store, team_id, anchor, period)?.rates))
}

pub fn team_yards_per_play(s: &dyn RecordStore, id: &str, anchor: Anchor, period: Period) -> Result<f64> {
    team_metric(s, id, anchor, period, TeamMetric::YardsPerPlay)
}

pub fn team_win_loss(
    store: &dyn RecordStore,
    team_id: &str,
    anchor: Anchor,
    period: Period,
) -> Result<WinLossRecord> {
    let window = window::resolve_window(store, EntityRef::Team(team_id), anchor, period)?;
    Ok(WinLossRecord::from_window(&window))
}

pub fn team_win_percentage(
    store: &dyn RecordStore,
    team_id: &str,
    anchor: Anchor,
    period: Period,
) -> Result<f64> {
    Ok(team_win_loss(store, team_id, anchor, period)?.win_pct())
}

pub fn division_for_team(store: &dyn RecordStore, team_id: &str) -> Result<Option<Division>> {
    opponent::division_for_team(store, team_id)
}

pub fn fcs_opponent_ratio(
    store: &dyn RecordStore,
    team_id: &str,
    anchor: Anchor,
    period: Period,
) -> Result<f64> {
    opponent::fcs_opponent_ratio(store, team_id, anchor, period)
}

pub fn strength_of_record(
    store: &dyn RecordStore,
    team_id: &str,
    anchor: Anchor,
    period: Period,
) -> Result<Option<f64>> {
    opponent::strength_of_record(store, team_id, anchor, period)
}

/// Poll points or votes `team_id` received in the `kind` poll of `(season, week)`. 0 when the
/// team received none or the id is blank.
pub fn team_poll_votes(
    store: &dyn RecordStore,
    team_id: &str,
    season: i32,
    week: i32,
    kind: PollKind,
) -> Result<f64> {
    if team_id.trim().is_empty() {
        return Ok(0.0);
    }
    let points = store.poll_points(team_id, season, week, kind).map_err(|err| {
        StatsError::store(err, format!("{} poll for team {team_id} {season}w{week}", kind.as_str()))
    })?;
    Ok(points.unwrap_or(0.0))
}

pub fn team_roster(store: &dyn RecordStore, team_id: &str, season: i32) -> Result<Vec<RosterEntry>> {
    roster::build_roster(store, team_id, season)
}

pub fn player_period_stats_batch(
    store: &dyn RecordStore,
    player_ids: &[String],
    anchor: Anchor,
    period: Period,
) -> Result<Vec<PlayerPeriodStats>> {
    aggregate::player_period_stats_batch(store, player_ids, anchor, period)
}

pub fn team_period_stats_batch(
    store: &dyn RecordStore,
    team_ids: &[String],
    anchor: Anchor,
    period: Period,
) -> Result<Vec<TeamPeriodStats>> {
    aggregate::team_period_stats_batch(store, team_ids, anchor, period)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterSlot {
    #[serde(flatten)]
    pub entry: RosterEntry,
    pub stats: PlayerPeriodStats,
}

/// A team's period stats alongside its season roster and each rostered player's period stats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamReport {
    pub team_id: String,
    pub name: Option<String>,
    pub division: Option<Division>,
    pub anchor: Anchor,
    pub period: String,
    pub stats: TeamPeriodStats,
    pub roster: Vec<RosterSlot>,
}

pub fn team_report(
    store: &dyn RecordStore,
    team_id: &str,
    anchor: Anchor,
    period: Period,
) -> Result<TeamReport> {
    let team = or_default_on_missing(require_team(store, team_id).map(Some), || None)?;
    let stats = team_period_stats(store, team_id, anchor, period)?;
    let entries = team_roster(store, team_id, anchor.season)?;
    let ids: Vec<String> = entries.iter().map(|e| e.player_id.clone()).collect();
    let player_stats = player_period_stats_batch(store, &ids, anchor, period)?;
    Ok(TeamReport {
        team_id: team_id.to_string(),
        name: team.as_ref().map(|t| t.name.clone()),
        division: team.and_then(|t| t.division),
        anchor,
        period: period.to_string(),
        stats,
        roster: entries
            .into_iter()
            .zip(player_stats)
            .map(|(entry, stats)| RosterSlot { entry, stats })
            .collect(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QbExperience {
    pub player_id: String,
    pub prior_games: usize,
    /// Completion fraction in the most recent prior game.
    pub last_game_completion_pct: Option<f64>,
    pub is_first_game: bool,
    pub is_first_3_games: bool,
    pub is_first_season: bool,
}

impl QbExperience {
    fn without_history(player_id: &str) -> Self {
        Self {
            player_id: player_id.to_string(),
            prior_games: 0,
            last_game_completion_pct: None,
            is_first_game: false,
            is_first_3_games: true,
            is_first_season: true,
        }
    }
}

/// Experience flags over every completed game the player appeared in before `anchor`.
pub fn qb_experience(store: &dyn RecordStore, player_id: &str, anchor: Anchor) -> Result<QbExperience> {
    if player_id.trim().is_empty() {
        return Ok(QbExperience::without_history(player_id));
    }
    let context = || format!("qb experience for player {player_id} as of {anchor}");
    let filter = GameFilter {
        season: None,
        before: Some(anchor),
        completed_only: true,
    };
    let ids = [player_id.to_string()];
    let mut prior: Vec<Game> = store
        .appearances(&ids, &filter)
        .map_err(|err| StatsError::store(err, context()))?
        .into_iter()
        .map(|app| app.game)
        .filter(|g| g.is_completed() && anchor.is_after(g.season, g.week))
        .collect();
    prior.sort_by(|a, b| {
        b.sort_key()
            .cmp(&a.sort_key())
            .then_with(|| a.game_id.cmp(&b.game_id))
    });
    prior.dedup_by(|a, b| a.game_id == b.game_id);
    let Some(last) = prior.first() else {
        return Ok(QbExperience::without_history(player_id));
    };

    let rows = store
        .player_game_stats(StatSubject::Players(&ids), std::slice::from_ref(&last.game_id))
        .map_err(|err| StatsError::store(err, context()))?;
    let last_game_completion_pct = rows.first().map(|row| {
        metrics::completion_percentage(
            row.stats.get(PlayerStat::PassingCompletions),
            row.stats.get(PlayerStat::PassingAttempts),
        )
    });
    let first_season = prior.iter().map(|g| g.season).min().unwrap_or(anchor.season);
    Ok(QbExperience {
        player_id: player_id.to_string(),
        prior_games: prior.len(),
        last_game_completion_pct,
        is_first_game: prior.len() == 1,
        is_first_3_games: prior.len() <= 3,
        is_first_season: first_season == anchor.season,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchupSide {
    pub team_id: String,
    pub name: Option<String>,
    pub points: i32,
    pub ap_votes: f64,
    pub fcs_votes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matchup {
    pub game_id: String,
    pub season: i32,
    pub week: i32,
    pub completed: bool,
    pub home: MatchupSide,
    pub away: MatchupSide,
}

/// `None` for an unknown game id.
pub fn matchup(store: &dyn RecordStore, game_id: &str) -> Result<Option<Matchup>> {
    let game = or_default_on_missing(require_game(store, game_id).map(Some), || None)?;
    let Some(game) = game else {
        return Ok(None);
    };
    let ids = vec![game.home_team_id.clone(), game.away_team_id.clone()];
    let teams = store
        .teams(&ids)
        .map_err(|err| StatsError::store(err, format!("teams for game {game_id}")))?;
    let name_of = |team_id: &str| {
        teams
            .iter()
            .find(|t| t.team_id == team_id)
            .map(|t| t.name.clone())
    };
    let side = |team_id: &str, points: i32| -> Result<MatchupSide> {
        Ok(MatchupSide {
            team_id: team_id.to_string(),
            name: name_of(team_id),
            points,
            ap_votes: team_poll_votes(store, team_id, game.season, game.week, PollKind::Ap)?,
            fcs_votes: team_poll_votes(store, team_id, game.season, game.week, PollKind::Fcs)?,
        })
    };
    Ok(Some(Matchup {
        home: side(&game.home_team_id, game.home_points)?,
        away: side(&game.away_team_id, game.away_points)?,
        completed: game.is_completed(),
        season: game.season,
        week: game.week,
        game_id: game.game_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::{PlayerMetric, TeamMetric};
    use crate::metrics::TeamRates;

    #[test]
    fn metric_names_round_trip() {
        for m in PlayerMetric::ALL {
            assert_eq!(m.name().parse::<PlayerMetric>().unwrap(), *m);
        }
        for m in TeamMetric::ALL {
            assert_eq!(m.to_string().parse::<TeamMetric>().unwrap(), *m);
        }
        assert!("yards-per-punt".parse::<PlayerMetric>().is_err());
    }

    #[test]
    fn team_metric_picks_its_field() {
        let rates = TeamRates {
            win_pct: 0.75,
            red_zone_rate: 0.5,
            ..TeamRates::default()
        };
        assert_eq!(TeamMetric::WinPercentage.pick(&rates), 0.75);
        assert_eq!(TeamMetric::RedZoneRate.pick(&rates), 0.5);
    }
}
