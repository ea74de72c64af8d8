//! Closed vocabularies of countable stats.
//!
//! Every stat a caller can ask for is a variant here, carrying both its public name (the
//! collaborator's column vocabulary, e.g. `PassingYards`) and its SQLite column. SQL is only ever
//! built from these constant column names, never from caller text.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::StatsError;

macro_rules! stat_vocabulary {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => ($label:literal, $column:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
            pub const COUNT: usize = Self::ALL.len();

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn column(self) -> &'static str {
                match self {
                    $($name::$variant => $column),+
                }
            }

            pub fn index(self) -> usize {
                self as usize
            }

            pub fn from_name(raw: &str) -> Option<Self> {
                static BY_NAME: Lazy<HashMap<&'static str, $name>> =
                    Lazy::new(|| $name::ALL.iter().map(|s| (s.name(), *s)).collect());
                let raw = raw.trim();
                BY_NAME.get(raw).copied().or_else(|| {
                    $name::ALL
                        .iter()
                        .copied()
                        .find(|s| s.name().eq_ignore_ascii_case(raw))
                })
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }
    };
}

stat_vocabulary! {
    /// Per-player, per-game counting stats.
    pub enum PlayerStat {
        RushingAttempts => ("RushingAttempts", "rushing_attempts"),
        RushingYards => ("RushingYards", "rushing_yards"),
        RushingAvgYards => ("RushingAvgYards", "rushing_avg_yards"),
        RushingLongest => ("RushingLongest", "rushing_longest"),
        RushingLongestTd => ("RushingLongestTD", "rushing_longest_td"),
        RushingTds => ("RushingTDs", "rushing_tds"),
        RushingRedZoneAttempts => ("RushingRedZoneAttempts", "rushing_red_zone_attempts"),
        RushingTlost => ("RushingTlost", "rushing_tlost"),
        RushingTlostYards => ("RushingTlostYards", "rushing_tlost_yards"),
        ReceivingTargets => ("ReceivingTargets", "receiving_targets"),
        Receptions => ("Receptions", "receptions"),
        ReceivingYards => ("ReceivingYards", "receiving_yards"),
        ReceivingAvgYards => ("ReceivingAvgYards", "receiving_avg_yards"),
        ReceivingLongest => ("ReceivingLongest", "receiving_longest"),
        ReceivingLongestTd => ("ReceivingLongestTD", "receiving_longest_td"),
        ReceivingTds => ("ReceivingTDs", "receiving_tds"),
        YardsAfterCatch => ("YardsAfterCatch", "yards_after_catch"),
        RedZoneTargets => ("RedZoneTargets", "red_zone_targets"),
        AirYards => ("AirYards", "air_yards"),
        PassingAttempts => ("PassingAttempts", "passing_attempts"),
        PassingCompletions => ("PassingCompletions", "passing_completions"),
        PassingYards => ("PassingYards", "passing_yards"),
        PassingTouchdowns => ("PassingTouchdowns", "passing_touchdowns"),
        PassingInterceptions => ("PassingInterceptions", "passing_interceptions"),
        PassingLongest => ("PassingLongest", "passing_longest"),
        PassingSacks => ("PassingSacks", "passing_sacks"),
        PassingSackYards => ("PassingSackYards", "passing_sack_yards"),
        PassingLongestTouchdown => ("PassingLongestTouchdown", "passing_longest_touchdown"),
        KickReturns => ("KickReturns", "kick_returns"),
        KickReturnYards => ("KickReturnYards", "kick_return_yards"),
        KickReturnAvgYards => ("KickReturnAvgYards", "kick_return_avg_yards"),
        KickReturnLongest => ("KickReturnLongest", "kick_return_longest"),
        KickReturnTds => ("KickReturnTDs", "kick_return_tds"),
        KickReturnLongestTd => ("KickReturnLongestTD", "kick_return_longest_td"),
        Faircatches => ("Faircatches", "faircatches"),
        PuntReturns => ("PuntReturns", "punt_returns"),
        PuntReturnYards => ("PuntReturnYards", "punt_return_yards"),
        PuntReturnAvgYards => ("PuntReturnAvgYards", "punt_return_avg_yards"),
        PuntReturnLongest => ("PuntReturnLongest", "punt_return_longest"),
        PuntReturnTds => ("PuntReturnTDs", "punt_return_tds"),
        PuntReturnLongestTd => ("PuntReturnLongestTD", "punt_return_longest_td"),
        IntReturns => ("INTReturns", "int_returns"),
        IntReturnYards => ("INTReturnYards", "int_return_yards"),
        IntReturnAvgYards => ("INTReturnAvgYards", "int_return_avg_yards"),
        IntReturnLongest => ("INTReturnLongest", "int_return_longest"),
        IntReturnTds => ("INTReturnTDs", "int_return_tds"),
        IntReturnLongestTd => ("INTReturnLongestTD", "int_return_longest_td"),
        Fumbles => ("Fumbles", "fumbles"),
        LostFumbles => ("LostFumbles", "lost_fumbles"),
        OwnRec => ("OwnRec", "own_rec"),
        OwnRecYards => ("OwnRecYards", "own_rec_yards"),
        OppRec => ("OppRec", "opp_rec"),
        OppRecYards => ("OppRecYards", "opp_rec_yards"),
        OutOfBounds => ("OutOfBounds", "out_of_bounds"),
        ForcedFumbles => ("ForcedFumbles", "forced_fumbles"),
        OwnRecTds => ("OwnRecTDs", "own_rec_tds"),
        OppRecTds => ("OppRecTDs", "opp_rec_tds"),
        EzRecTds => ("EZRecTDs", "ez_rec_tds"),
        Tackles => ("Tackles", "tackles"),
        Assists => ("Assists", "assists"),
        Combined => ("Combined", "combined"),
        Sacks => ("Sacks", "sacks"),
        SackYards => ("SackYards", "sack_yards"),
        Interceptions => ("Interceptions", "interceptions"),
        PassesDefended => ("PassesDefended", "passes_defended"),
        QbHits => ("QBHits", "qb_hits"),
        TLoss => ("TLoss", "tloss"),
        TLossYards => ("TLossYards", "tloss_yards"),
        Safeties => ("Safeties", "safeties"),
        SpTackles => ("SP_Tackles", "sp_tackles"),
        SpAssists => ("SP_Assists", "sp_assists"),
        SpForcedFumbles => ("SP_ForcedFumbles", "sp_forced_fumbles"),
        SpFumbleRecoveries => ("SP_FumbleRecoveries", "sp_fumble_recoveries"),
        SpBlocks => ("SP_Blocks", "sp_blocks"),
        MiscTackles => ("MiscTackles", "misc_tackles"),
        MiscAssists => ("MiscAssists", "misc_assists"),
        MiscForcedFumbles => ("MiscForcedFumbles", "misc_forced_fumbles"),
        MiscFumbleRecoveries => ("MiscFumbleRecoveries", "misc_fumble_recoveries"),
        MiscReturns => ("MiscReturns", "misc_returns"),
        MiscReturnYards => ("MiscReturnYards", "misc_return_yards"),
        MiscReturnTds => ("MiscReturnTDs", "misc_return_tds"),
        MiscReturnLongestTd => ("MiscReturnLongestTD", "misc_return_longest_td"),
        BlkFgTds => ("BlkFGTDs", "blk_fg_tds"),
        BlkPuntTds => ("BlkPuntTDs", "blk_punt_tds"),
        FgReturnTds => ("FGReturnTDs", "fg_return_tds"),
        ConversionsPassAttempts => ("ConversionsPassAttempts", "conversions_pass_attempts"),
        ConversionsPassSuccesses => ("ConversionsPassSuccesses", "conversions_pass_successes"),
        ConversionsRushAttempts => ("ConversionsRushAttempts", "conversions_rush_attempts"),
        ConversionsRushSuccesses => ("ConversionsRushSuccesses", "conversions_rush_successes"),
        ConversionsReceiveAttempts => ("ConversionsReceiveAttempts", "conversions_receive_attempts"),
        ConversionsReceiveSuccesses => ("ConversionsReceiveSuccesses", "conversions_receive_successes"),
        ConversionsDefenseAttempts => ("ConversionsDefenseAttempts", "conversions_defense_attempts"),
        ConversionsDefenseSuccesses => ("ConversionsDefenseSuccesses", "conversions_defense_successes"),
        ConversionsTurnoverSuccesses => ("ConversionsTurnoverSuccesses", "conversions_turnover_successes"),
    }
}

stat_vocabulary! {
    /// Per-team, per-game aggregates. Stored as `home_<column>` / `away_<column>`.
    pub enum TeamStat {
        Points => ("Points", "points"),
        TotalYards => ("TotalYards", "total_yards"),
        RushingYards => ("RushingYards", "rushing_yards"),
        PassingYards => ("PassingYards", "passing_yards"),
        FirstDowns => ("FirstDowns", "first_downs"),
        Plays => ("Plays", "plays"),
        AvgGain => ("AvgGain", "avg_gain"),
        Turnovers => ("Turnovers", "turnovers"),
        FumblesLost => ("FumblesLost", "fumbles_lost"),
        Penalties => ("Penalties", "penalties"),
        PenaltyYards => ("PenaltyYards", "penalty_yards"),
        ThirdDownSuccesses => ("ThirdDownSuccesses", "third_down_successes"),
        ThirdDownAttempts => ("ThirdDownAttempts", "third_down_attempts"),
        FourthDownSuccesses => ("FourthDownSuccesses", "fourth_down_successes"),
        FourthDownAttempts => ("FourthDownAttempts", "fourth_down_attempts"),
        RedZoneSuccesses => ("RedZoneSuccesses", "red_zone_successes"),
        RedZoneAttempts => ("RedZoneAttempts", "red_zone_attempts"),
        Sacks => ("Sacks", "sacks"),
        Interceptions => ("Interceptions", "interceptions"),
        ForcedFumbles => ("ForcedFumbles", "forced_fumbles"),
    }
}

impl PlayerStat {
    pub fn parse(raw: &str) -> Result<Self, StatsError> {
        Self::from_name(raw)
            .ok_or_else(|| StatsError::malformed(format!("unknown player stat {raw:?}")))
    }
}

impl TeamStat {
    /// Stats carried by the box-score columns (everything but the score itself).
    pub fn box_score() -> impl Iterator<Item = TeamStat> {
        TeamStat::ALL.iter().copied().filter(|s| *s != TeamStat::Points)
    }
}

/// A requested team stat, optionally read from the opponent's side of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TeamStatRef {
    pub stat: TeamStat,
    pub opponent: bool,
}

impl TeamStatRef {
    pub const fn own(stat: TeamStat) -> Self {
        Self {
            stat,
            opponent: false,
        }
    }

    pub const fn opponent(stat: TeamStat) -> Self {
        Self {
            stat,
            opponent: true,
        }
    }

    /// Parses `TotalYards` or `OpponentTotalYards`.
    pub fn parse(raw: &str) -> Result<Self, StatsError> {
        let trimmed = raw.trim();
        if let Some(stat) = TeamStat::from_name(trimmed) {
            return Ok(Self::own(stat));
        }
        trimmed
            .strip_prefix("Opponent")
            .and_then(TeamStat::from_name)
            .map(Self::opponent)
            .ok_or_else(|| StatsError::malformed(format!("unknown team stat {raw:?}")))
    }
}

impl fmt::Display for TeamStatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.opponent {
            write!(f, "Opponent{}", self.stat.name())
        } else {
            f.write_str(self.stat.name())
        }
    }
}

impl Serialize for TeamStatRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row of player counting stats, indexed by [`PlayerStat`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct StatLine {
    values: [f64; PlayerStat::COUNT],
}

impl Default for StatLine {
    fn default() -> Self {
        Self {
            values: [0.0; PlayerStat::COUNT],
        }
    }
}

impl StatLine {
    pub fn get(&self, stat: PlayerStat) -> f64 {
        self.values[stat.index()]
    }

    pub fn set(&mut self, stat: PlayerStat, value: f64) {
        self.values[stat.index()] = value;
    }

    pub fn with(mut self, stat: PlayerStat, value: f64) -> Self {
        self.set(stat, value);
        self
    }
}

impl TryFrom<BTreeMap<String, f64>> for StatLine {
    type Error = String;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut line = StatLine::default();
        for (name, value) in map {
            let stat =
                PlayerStat::from_name(&name).ok_or_else(|| format!("unknown player stat {name:?}"))?;
            line.set(stat, value);
        }
        Ok(line)
    }
}

impl From<StatLine> for BTreeMap<String, f64> {
    fn from(line: StatLine) -> Self {
        PlayerStat::ALL
            .iter()
            .filter(|s| line.get(**s) != 0.0)
            .map(|s| (s.name().to_string(), line.get(*s)))
            .collect()
    }
}

/// One side's box score for a game, indexed by [`TeamStat`]. The `Points` slot is unused; the
/// score lives on the game itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct TeamLine {
    values: [f64; TeamStat::COUNT],
}

impl Default for TeamLine {
    fn default() -> Self {
        Self {
            values: [0.0; TeamStat::COUNT],
        }
    }
}

impl TeamLine {
    pub fn get(&self, stat: TeamStat) -> f64 {
        self.values[stat.index()]
    }

    pub fn set(&mut self, stat: TeamStat, value: f64) {
        self.values[stat.index()] = value;
    }

    pub fn with(mut self, stat: TeamStat, value: f64) -> Self {
        self.set(stat, value);
        self
    }
}

impl TryFrom<BTreeMap<String, f64>> for TeamLine {
    type Error = String;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut line = TeamLine::default();
        for (name, value) in map {
            match TeamStat::from_name(&name) {
                Some(TeamStat::Points) => {
                    return Err("points belong on the game, not the box score".to_string());
                }
                Some(stat) => line.set(stat, value),
                None => return Err(format!("unknown team stat {name:?}")),
            }
        }
        Ok(line)
    }
}

impl From<TeamLine> for BTreeMap<String, f64> {
    fn from(line: TeamLine) -> Self {
        TeamStat::box_score()
            .map(|s| (s.name().to_string(), line.get(s)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{PlayerStat, StatLine, TeamLine, TeamStat, TeamStatRef};
    use std::collections::BTreeMap;

    #[test]
    fn player_stat_names_round_trip_to_variants() {
        assert_eq!(PlayerStat::from_name("PassingYards"), Some(PlayerStat::PassingYards));
        assert_eq!(PlayerStat::from_name("combined"), Some(PlayerStat::Combined));
        assert_eq!(PlayerStat::from_name("SP_Tackles"), Some(PlayerStat::SpTackles));
        assert!(PlayerStat::parse("PassingYards; DROP TABLE players").is_err());
        assert_eq!(PlayerStat::ALL.len(), PlayerStat::COUNT);
        assert_eq!(PlayerStat::ALL[PlayerStat::Combined.index()], PlayerStat::Combined);
    }

    #[test]
    fn columns_are_plain_identifiers() {
        for stat in PlayerStat::ALL {
            assert!(stat.column().chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
        for stat in TeamStat::ALL {
            assert!(stat.column().chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }

    #[test]
    fn opponent_prefix_resolves_to_opponent_ref() {
        let r = TeamStatRef::parse("OpponentTotalYards").unwrap();
        assert_eq!(r, TeamStatRef::opponent(TeamStat::TotalYards));
        assert_eq!(r.to_string(), "OpponentTotalYards");
        assert_eq!(
            TeamStatRef::parse("Points").unwrap(),
            TeamStatRef::own(TeamStat::Points)
        );
        assert!(TeamStatRef::parse("OpponentNothing").is_err());
    }

    #[test]
    fn stat_line_rejects_unknown_names() {
        let mut map = BTreeMap::new();
        map.insert("PassingYards".to_string(), 250.0);
        let line = StatLine::try_from(map.clone()).unwrap();
        assert_eq!(line.get(PlayerStat::PassingYards), 250.0);

        map.insert("Bogus".to_string(), 1.0);
        assert!(StatLine::try_from(map).is_err());
    }

    #[test]
    fn team_line_refuses_points() {
        let mut map = BTreeMap::new();
        map.insert("Points".to_string(), 21.0);
        assert!(TeamLine::try_from(map).is_err());
    }
}
