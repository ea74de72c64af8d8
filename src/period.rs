use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StatsError;

/// The as-of point of a query. Field order gives the `(season, week)` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Anchor {
    pub season: i32,
    pub week: i32,
}

impl Anchor {
    pub fn new(season: i32, week: i32) -> Self {
        Self { season, week }
    }

    /// True when a game played at `(season, week)` lies strictly before this anchor.
    pub fn is_after(&self, season: i32, week: i32) -> bool {
        (season, week) < (self.season, self.week)
    }

    /// `None` at the bottom of the `i32` range.
    pub fn previous_season(&self) -> Option<i32> {
        self.season.checked_sub(1)
    }

    /// The anchor one week earlier, clamped at the bottom of the `i32` range.
    pub fn week_before(&self) -> Anchor {
        Anchor::new(self.season, self.week.saturating_sub(1))
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}w{}", self.season, self.week)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    LastGame,
    Last3Games(Option<Side>),
    Season(Option<Side>),
    LastSeason(Option<Side>),
}

impl Period {
    pub const ALL: [Period; 10] = [
        Period::LastGame,
        Period::Last3Games(None),
        Period::Last3Games(Some(Side::Home)),
        Period::Last3Games(Some(Side::Away)),
        Period::Season(None),
        Period::Season(Some(Side::Home)),
        Period::Season(Some(Side::Away)),
        Period::LastSeason(None),
        Period::LastSeason(Some(Side::Home)),
        Period::LastSeason(Some(Side::Away)),
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::LastGame => "lastGame",
            Period::Last3Games(None) => "last3Games",
            Period::Last3Games(Some(Side::Home)) => "last3GamesHome",
            Period::Last3Games(Some(Side::Away)) => "last3GamesAway",
            Period::Season(None) => "season",
            Period::Season(Some(Side::Home)) => "seasonHome",
            Period::Season(Some(Side::Away)) => "seasonAway",
            Period::LastSeason(None) => "lastSeason",
            Period::LastSeason(Some(Side::Home)) => "lastSeasonHome",
            Period::LastSeason(Some(Side::Away)) => "lastSeasonAway",
        }
    }

    pub fn side(self) -> Option<Side> {
        match self {
            Period::LastGame => None,
            Period::Last3Games(side) | Period::Season(side) | Period::LastSeason(side) => side,
        }
    }

    /// Upper bound on games in the window, for the "most recent N" policies.
    pub fn limit(self) -> Option<usize> {
        match self {
            Period::LastGame => Some(1),
            Period::Last3Games(_) => Some(3),
            Period::Season(_) | Period::LastSeason(_) => None,
        }
    }

    /// Games needed before a window counts as complete for downstream rate use.
    pub fn min_games_for_completion(self) -> usize {
        match self {
            Period::LastGame => 1,
            Period::Last3Games(_) => 3,
            Period::Season(_) | Period::LastSeason(_) => 2,
        }
    }

    /// Whether a completed game at `(season, week)` may appear in this window.
    pub fn admits(self, anchor: Anchor, season: i32, week: i32) -> bool {
        match self {
            Period::LastGame | Period::Last3Games(_) => anchor.is_after(season, week),
            Period::Season(_) => season == anchor.season && week < anchor.week,
            Period::LastSeason(_) => anchor.previous_season() == Some(season),
        }
    }

    /// Store-side pre-filter for this window.
    pub fn game_filter(self, anchor: Anchor) -> GameFilter {
        match self {
            Period::LastGame | Period::Last3Games(_) => GameFilter {
                season: None,
                before: Some(anchor),
                completed_only: true,
            },
            Period::Season(_) => GameFilter {
                season: Some(anchor.season),
                before: Some(anchor),
                completed_only: true,
            },
            Period::LastSeason(_) => GameFilter {
                season: Some(anchor.previous_season().unwrap_or(anchor.season)),
                before: Some(anchor),
                completed_only: true,
            },
        }
    }
}

impl FromStr for Period {
    type Err = StatsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Period::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == raw.trim())
            .ok_or_else(|| StatsError::InvalidWindowPolicy {
                period: raw.to_string(),
            })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameterised game-range query passed to the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GameFilter {
    pub season: Option<i32>,
    /// Only games strictly before this anchor.
    pub before: Option<Anchor>,
    pub completed_only: bool,
}

impl GameFilter {
    pub fn whole_season(season: i32) -> Self {
        Self {
            season: Some(season),
            before: None,
            completed_only: true,
        }
    }
}
