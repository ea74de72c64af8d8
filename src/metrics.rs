use serde::Serialize;

use crate::models::GameOutcome;
use crate::stat_keys::{PlayerStat, StatLine, TeamLine, TeamStat};
use crate::window::WindowGame;

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() { x } else { 0.0 }
}

/// `num / max(den, 1)`.
pub fn ratio(num: f64, den: f64) -> f64 {
    finite_or_zero(num / den.max(1.0))
}

pub fn per_game(total: f64, games: usize) -> f64 {
    ratio(total, games as f64)
}

/// Completion fraction in [0, 1]; 0 without attempts.
pub fn completion_percentage(completions: f64, attempts: f64) -> f64 {
    if attempts <= 0.0 {
        return 0.0;
    }
    finite_or_zero(completions / attempts)
}

pub fn td_int_ratio(touchdowns: f64, interceptions: f64) -> f64 {
    ratio(touchdowns, interceptions)
}

const QBR_COMPONENT_MAX: f64 = 2.375;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassingLine {
    pub attempts: f64,
    pub completions: f64,
    pub touchdowns: f64,
    pub interceptions: f64,
    pub yards: f64,
}

impl PassingLine {
    pub fn from_totals(line: &StatLine) -> Self {
        Self {
            attempts: line.get(PlayerStat::PassingAttempts),
            completions: line.get(PlayerStat::PassingCompletions),
            touchdowns: line.get(PlayerStat::PassingTouchdowns),
            interceptions: line.get(PlayerStat::PassingInterceptions),
            yards: line.get(PlayerStat::PassingYards),
        }
    }
}

/// Passer-rating style composite: four components clamped to [0, 2.375], summed, / 6 * 100.
pub fn qbr(line: PassingLine) -> f64 {
    let a = line.attempts;
    if a <= 0.0 {
        return 0.0;
    }
    let clamp = |x: f64| x.clamp(0.0, QBR_COMPONENT_MAX);
    let completion = clamp(((line.completions / a * 100.0) - 30.0) / 20.0);
    let yards = clamp((line.yards / a - 3.0) / 4.0);
    let touchdowns = clamp(line.touchdowns / a * 20.0);
    let interceptions = clamp(QBR_COMPONENT_MAX - line.interceptions / a * 25.0);
    finite_or_zero((completion + yards + touchdowns + interceptions) / 6.0 * 100.0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WinLossRecord {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

impl WinLossRecord {
    pub fn from_window(window: &[WindowGame]) -> Self {
        let mut record = WinLossRecord::default();
        for wg in window {
            record.add(wg.game.outcome_for(wg.side));
        }
        record
    }

    pub fn add(&mut self, outcome: GameOutcome) {
        match outcome {
            GameOutcome::Win => self.wins += 1,
            GameOutcome::Loss => self.losses += 1,
            GameOutcome::Draw => self.draws += 1,
        }
    }

    pub fn games(&self) -> u32 {
        self.wins + self.losses + self.draws
    }

    pub fn win_pct(&self) -> f64 {
        if self.games() == 0 {
            return 0.0;
        }
        f64::from(self.wins) / f64::from(self.games())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayerRates {
    pub completion_pct: f64,
    pub passing_yards_per_game: f64,
    pub passing_tds_per_game: f64,
    pub td_int_ratio: f64,
    pub qbr: f64,
    pub yards_per_carry: f64,
    pub rushing_yards_per_game: f64,
    pub rushing_tds_per_game: f64,
    pub fumbles_per_game: f64,
    pub receptions_per_game: f64,
    pub receiving_yards_per_game: f64,
    pub receiving_tds_per_game: f64,
    pub yards_per_catch: f64,
    pub tackles_per_game: f64,
    pub sacks_per_game: f64,
    pub interceptions_per_game: f64,
    pub passes_defended_per_game: f64,
    pub forced_fumbles_per_game: f64,
}

impl PlayerRates {
    pub fn from_totals(line: &StatLine, games: usize) -> Self {
        let g = |stat: PlayerStat| per_game(line.get(stat), games);
        let passing = PassingLine::from_totals(line);
        Self {
            completion_pct: completion_percentage(passing.completions, passing.attempts),
            passing_yards_per_game: g(PlayerStat::PassingYards),
            passing_tds_per_game: g(PlayerStat::PassingTouchdowns),
            td_int_ratio: td_int_ratio(passing.touchdowns, passing.interceptions),
            qbr: qbr(passing),
            yards_per_carry: ratio(
                line.get(PlayerStat::RushingYards),
                line.get(PlayerStat::RushingAttempts),
            ),
            rushing_yards_per_game: g(PlayerStat::RushingYards),
            rushing_tds_per_game: g(PlayerStat::RushingTds),
            fumbles_per_game: g(PlayerStat::Fumbles),
            receptions_per_game: g(PlayerStat::Receptions),
            receiving_yards_per_game: g(PlayerStat::ReceivingYards),
            receiving_tds_per_game: g(PlayerStat::ReceivingTds),
            yards_per_catch: ratio(
                line.get(PlayerStat::ReceivingYards),
                line.get(PlayerStat::Receptions),
            ),
            tackles_per_game: g(PlayerStat::Combined),
            sacks_per_game: g(PlayerStat::Sacks),
            interceptions_per_game: g(PlayerStat::Interceptions),
            passes_defended_per_game: g(PlayerStat::PassesDefended),
            forced_fumbles_per_game: g(PlayerStat::ForcedFumbles),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamRates {
    pub yards_per_play: f64,
    pub yards_per_game: f64,
    pub turnovers_per_game: f64,
    pub penalties_per_game: f64,
    pub third_down_rate: f64,
    pub red_zone_rate: f64,
    pub forced_fumbles_per_game: f64,
    pub sacks_per_game: f64,
    pub interceptions_per_game: f64,
    pub points_per_game: f64,
    pub opponent_points_per_game: f64,
    pub opponent_yards_per_game: f64,
    pub opponent_yards_per_play: f64,
    pub win_pct: f64,
}

impl TeamRates {
    /// Each per-game rate divides by the games that recorded its inputs: scores exist for all
    /// `window_games`, own box stats for `box_games`, opponent box stats for
    /// `opponent_box_games`.
    pub fn from_totals(
        own: &TeamLine,
        opponent: &TeamLine,
        window_games: usize,
        box_games: usize,
        opponent_box_games: usize,
        record: &WinLossRecord,
    ) -> Self {
        let g = |stat: TeamStat| per_game(own.get(stat), box_games);
        let og = |stat: TeamStat| per_game(opponent.get(stat), opponent_box_games);
        Self {
            yards_per_play: g(TeamStat::AvgGain),
            yards_per_game: g(TeamStat::TotalYards),
            turnovers_per_game: g(TeamStat::Turnovers),
            penalties_per_game: g(TeamStat::Penalties),
            third_down_rate: ratio(
                own.get(TeamStat::ThirdDownSuccesses),
                own.get(TeamStat::ThirdDownAttempts),
            ),
            red_zone_rate: ratio(
                own.get(TeamStat::RedZoneSuccesses),
                own.get(TeamStat::RedZoneAttempts),
            ),
            forced_fumbles_per_game: g(TeamStat::ForcedFumbles),
            sacks_per_game: g(TeamStat::Sacks),
            interceptions_per_game: g(TeamStat::Interceptions),
            points_per_game: per_game(own.get(TeamStat::Points), window_games),
            opponent_points_per_game: per_game(opponent.get(TeamStat::Points), window_games),
            opponent_yards_per_game: og(TeamStat::TotalYards),
            opponent_yards_per_play: og(TeamStat::AvgGain),
            win_pct: record.win_pct(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_denominators_give_zero() {
        assert_eq!(completion_percentage(5.0, 0.0), 0.0);
        assert_eq!(per_game(0.0, 0), 0.0);
        assert_eq!(ratio(0.0, 0.0), 0.0);
        assert_eq!(WinLossRecord::default().win_pct(), 0.0);
        let rates = PlayerRates::from_totals(&StatLine::default(), 0);
        assert_eq!(rates, PlayerRates::default());
    }

    #[test]
    fn completion_percentage_is_a_fraction() {
        let pct = completion_percentage(20.0, 30.0);
        assert!((pct - 0.6667).abs() < 1e-3);
    }

    #[test]
    fn td_int_ratio_floors_interceptions_at_one() {
        assert_eq!(td_int_ratio(3.0, 0.0), 3.0);
        assert_eq!(td_int_ratio(3.0, 2.0), 1.5);
    }

    #[test]
    fn qbr_zero_without_attempts_and_bounded_on_real_lines() {
        assert_eq!(qbr(PassingLine::default()), 0.0);
        let lines = [
            (30.0, 18.0, 1.0, 1.0, 210.0),
            (35.0, 21.0, 1.0, 1.0, 230.0),
            (12.0, 4.0, 0.0, 3.0, 31.0),
            (25.0, 15.0, 1.0, 2.0, 170.0),
        ];
        for (attempts, completions, touchdowns, interceptions, yards) in lines {
            let v = qbr(PassingLine {
                attempts,
                completions,
                touchdowns,
                interceptions,
                yards,
            });
            assert!((0.0..=100.0).contains(&v), "{v}");
        }
    }

    #[test]
    fn qbr_never_negative_even_for_awful_lines() {
        let v = qbr(PassingLine {
            attempts: 10.0,
            completions: 0.0,
            touchdowns: 0.0,
            interceptions: 10.0,
            yards: -20.0,
        });
        assert_eq!(v, 0.0);
    }

    #[test]
    fn win_pct_counts_draws_in_denominator() {
        let mut r = WinLossRecord::default();
        r.add(GameOutcome::Win);
        r.add(GameOutcome::Draw);
        assert_eq!(r.win_pct(), 0.5);
    }
}
