use std::fmt;

use serde::{Deserialize, Serialize};

use crate::period::Side;
use crate::stat_keys::{PlayerStat, StatLine, TeamLine, TeamStat};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Division {
    Fbs,
    Fcs,
}

impl Division {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FBS" => Some(Division::Fbs),
            "FCS" => Some(Division::Fcs),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Division::Fbs => "FBS",
            Division::Fcs => "FCS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub team_id: String,
    pub name: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub division: Option<Division>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Win,
    Loss,
    Draw,
}

pub fn classify_outcome(own_points: i32, opponent_points: i32) -> GameOutcome {
    if own_points > opponent_points {
        GameOutcome::Win
    } else if own_points < opponent_points {
        GameOutcome::Loss
    } else {
        GameOutcome::Draw
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub game_id: String,
    pub season: i32,
    pub week: i32,
    pub home_team_id: String,
    pub away_team_id: String,
    #[serde(default)]
    pub home_points: i32,
    #[serde(default)]
    pub away_points: i32,
    /// `None` when no box score was recorded for that side.
    #[serde(default)]
    pub home_box: Option<TeamLine>,
    #[serde(default)]
    pub away_box: Option<TeamLine>,
}

impl Game {
    /// A 0-0 score means the game has not been played yet.
    pub fn is_completed(&self) -> bool {
        !(self.home_points == 0 && self.away_points == 0)
    }

    pub fn side_of(&self, team_id: &str) -> Option<Side> {
        if self.home_team_id == team_id {
            Some(Side::Home)
        } else if self.away_team_id == team_id {
            Some(Side::Away)
        } else {
            None
        }
    }

    pub fn team_id(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team_id,
            Side::Away => &self.away_team_id,
        }
    }

    pub fn points(&self, side: Side) -> i32 {
        match side {
            Side::Home => self.home_points,
            Side::Away => self.away_points,
        }
    }

    pub fn box_score(&self, side: Side) -> Option<&TeamLine> {
        match side {
            Side::Home => self.home_box.as_ref(),
            Side::Away => self.away_box.as_ref(),
        }
    }

    /// Value of `stat` for `side`. `Points` comes from the score; box-score stats default to 0
    /// when the side has no recorded box score.
    pub fn team_value(&self, side: Side, stat: TeamStat) -> f64 {
        if stat == TeamStat::Points {
            return f64::from(self.points(side));
        }
        self.box_score(side).map(|line| line.get(stat)).unwrap_or(0.0)
    }

    pub fn outcome_for(&self, side: Side) -> GameOutcome {
        classify_outcome(self.points(side), self.points(side.other()))
    }

    pub fn sort_key(&self) -> (i32, i32) {
        (self.season, self.week)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Position {
    Qb,
    Rb,
    Fb,
    Wr,
    Te,
    Cb,
    Db,
    De,
    Dl,
    Dt,
    Lb,
    Saf,
    Olb,
    Ol,
    C,
    G,
    Ot,
    Og,
    T,
    K,
    P,
    Ls,
    Other(String),
}

impl Position {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "QB" => Position::Qb,
            "RB" => Position::Rb,
            "FB" => Position::Fb,
            "WR" => Position::Wr,
            "TE" => Position::Te,
            "CB" => Position::Cb,
            "DB" => Position::Db,
            "DE" => Position::De,
            "DL" => Position::Dl,
            "DT" => Position::Dt,
            "LB" => Position::Lb,
            "SAF" | "S" => Position::Saf,
            "OLB" => Position::Olb,
            "OL" => Position::Ol,
            "C" => Position::C,
            "G" => Position::G,
            "OT" => Position::Ot,
            "OG" => Position::Og,
            "T" => Position::T,
            "K" => Position::K,
            "P" => Position::P,
            "LS" => Position::Ls,
            _ => Position::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Position::Qb => "QB",
            Position::Rb => "RB",
            Position::Fb => "FB",
            Position::Wr => "WR",
            Position::Te => "TE",
            Position::Cb => "CB",
            Position::Db => "DB",
            Position::De => "DE",
            Position::Dl => "DL",
            Position::Dt => "DT",
            Position::Lb => "LB",
            Position::Saf => "SAF",
            Position::Olb => "OLB",
            Position::Ol => "OL",
            Position::C => "C",
            Position::G => "G",
            Position::Ot => "OT",
            Position::Og => "OG",
            Position::T => "T",
            Position::K => "K",
            Position::P => "P",
            Position::Ls => "LS",
            Position::Other(raw) => raw,
        }
    }

    pub fn group(&self) -> Option<PositionGroup> {
        match self {
            Position::Qb => Some(PositionGroup::Quarterback),
            Position::Rb | Position::Fb => Some(PositionGroup::RunningBack),
            Position::Wr | Position::Te => Some(PositionGroup::Receiver),
            Position::Cb
            | Position::Db
            | Position::De
            | Position::Dl
            | Position::Dt
            | Position::Lb
            | Position::Saf
            | Position::Olb => Some(PositionGroup::Defender),
            Position::Ol | Position::C | Position::G | Position::Ot | Position::Og | Position::T => {
                Some(PositionGroup::OffensiveLine)
            }
            Position::K | Position::P | Position::Ls | Position::Other(_) => None,
        }
    }
}

impl From<String> for Position {
    fn from(raw: String) -> Self {
        Position::parse(&raw)
    }
}

impl From<Position> for String {
    fn from(position: Position) -> Self {
        position.as_str().to_string()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roster groups, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PositionGroup {
    Quarterback,
    RunningBack,
    Receiver,
    Defender,
    OffensiveLine,
}

impl PositionGroup {
    pub const ALL: [PositionGroup; 5] = [
        PositionGroup::Quarterback,
        PositionGroup::RunningBack,
        PositionGroup::Receiver,
        PositionGroup::Defender,
        PositionGroup::OffensiveLine,
    ];

    pub fn quota(self) -> usize {
        match self {
            PositionGroup::Quarterback => 1,
            PositionGroup::RunningBack => 4,
            PositionGroup::Receiver => 7,
            PositionGroup::Defender => 12,
            PositionGroup::OffensiveLine => 5,
        }
    }

    /// The season stat used to rank the group. `None` means rank by recruiting score, since no
    /// in-game stat exists for linemen.
    pub fn ranking_stat(self) -> Option<PlayerStat> {
        match self {
            PositionGroup::Quarterback => Some(PlayerStat::PassingYards),
            PositionGroup::RunningBack => Some(PlayerStat::RushingYards),
            PositionGroup::Receiver => Some(PlayerStat::ReceivingYards),
            PositionGroup::Defender => Some(PlayerStat::Combined),
            PositionGroup::OffensiveLine => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PositionGroup::Quarterback => "QB",
            PositionGroup::RunningBack => "RBs",
            PositionGroup::Receiver => "WRs/TEs",
            PositionGroup::Defender => "Defenders",
            PositionGroup::OffensiveLine => "OLs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub player_id: String,
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub recruiting_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerGameStat {
    pub player_id: String,
    pub game_id: String,
    pub team_id: String,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub stats: StatLine,
}

/// Weekly top-25 polls. Ranked teams carry poll points, others the votes they received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PollKind {
    Ap,
    Fcs,
}

impl PollKind {
    pub const ALL: [PollKind; 2] = [PollKind::Ap, PollKind::Fcs];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AP" | "AP25" => Some(PollKind::Ap),
            "FCS" | "FCS25" => Some(PollKind::Fcs),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PollKind::Ap => "AP",
            PollKind::Fcs => "FCS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollEntry {
    pub team_id: String,
    pub season: i32,
    pub week: i32,
    pub kind: PollKind,
    #[serde(default)]
    pub points: f64,
}

/// A game in which a player has a stat row, plus the team they played for.
#[derive(Debug, Clone, PartialEq)]
pub struct Appearance {
    pub player_id: String,
    pub team_id: String,
    pub game: Game,
}
