mod common;

use cfb_stats::models::{Game, Player, PlayerGameStat, Position, PositionGroup, Team};
use cfb_stats::period::{Anchor, Period};
use cfb_stats::report;
use cfb_stats::roster::{PLACEHOLDER_PLAYER_ID, ROSTER_SIZE, RosterEntry};
use cfb_stats::stat_keys::{PlayerStat, StatLine};
use cfb_stats::store::{self, SqliteStore};

use common::seeded_store;

fn group(roster: &[RosterEntry], group: PositionGroup) -> Vec<&RosterEntry> {
    roster.iter().filter(|e| e.group == group).collect()
}

#[test]
fn roster_is_padded_to_fixed_quotas() {
    let store = seeded_store();
    let roster = report::team_roster(&store, "t-ala", 2019).unwrap();
    assert_eq!(roster.len(), ROSTER_SIZE);
    for g in PositionGroup::ALL {
        assert_eq!(group(&roster, g).len(), g.quota(), "{}", g.label());
    }

    let qb = group(&roster, PositionGroup::Quarterback);
    assert_eq!(qb[0].player_id, "p-qb1");
    assert_eq!(qb[0].value, 960.0);

    let rbs = group(&roster, PositionGroup::RunningBack);
    assert_eq!(rbs[0].player_id, "p-rb1");
    assert!(rbs[1..].iter().all(|e| e.is_placeholder()));

    let receivers = group(&roster, PositionGroup::Receiver);
    assert_eq!(receivers[0].player_id, "p-wr1");
    assert_eq!(receivers.iter().filter(|e| e.is_placeholder()).count(), 6);

    let defenders = group(&roster, PositionGroup::Defender);
    assert_eq!(defenders[0].player_id, "p-lb1");
    assert_eq!(defenders[0].value, 31.0);

    assert!(group(&roster, PositionGroup::OffensiveLine).iter().all(|e| e.is_placeholder()));
    assert!(!roster.iter().any(|e| e.player_id == "p-k1" || e.player_id == "p-ol1"));
}

#[test]
fn unknown_team_roster_is_all_placeholders() {
    let store = seeded_store();
    let roster = report::team_roster(&store, "t-ghost", 2019).unwrap();
    assert_eq!(roster.len(), ROSTER_SIZE);
    assert!(roster.iter().all(|e| e.player_id == PLACEHOLDER_PLAYER_ID && e.value == 0.0));

    let empty_season = report::team_roster(&store, "t-ala", 2017).unwrap();
    assert!(empty_season.iter().all(RosterEntry::is_placeholder));
}

#[test]
fn equal_values_rank_by_player_id() {
    let store = SqliteStore::open_in_memory().unwrap();
    let game = Game {
        game_id: "g".to_string(),
        season: 2020,
        week: 1,
        home_team_id: "t".to_string(),
        away_team_id: "o".to_string(),
        home_points: 10,
        away_points: 7,
        home_box: None,
        away_box: None,
    };
    store
        .write(|tx| {
            for id in ["t", "o"] {
                store::upsert_team(
                    tx,
                    &Team {
                        team_id: id.to_string(),
                        name: id.to_string(),
                        market: String::new(),
                        alias: String::new(),
                        division: None,
                    },
                )?;
            }
            store::upsert_game(tx, &game)?;
            for id in ["rb-c", "rb-a", "rb-b"] {
                store::upsert_player(
                    tx,
                    &Player {
                        player_id: id.to_string(),
                        name: id.to_string(),
                        position: Position::parse("RB"),
                        team_id: Some("t".to_string()),
                        recruiting_score: 0.0,
                    },
                )?;
                store::upsert_player_game_stat(
                    tx,
                    &PlayerGameStat {
                        player_id: id.to_string(),
                        game_id: "g".to_string(),
                        team_id: "t".to_string(),
                        position: None,
                        stats: StatLine::default().with(PlayerStat::RushingYards, 50.0),
                    },
                )?;
            }
            Ok(())
        })
        .unwrap();

    let roster = report::team_roster(&store, "t", 2020).unwrap();
    let rbs: Vec<&str> = group(&roster, PositionGroup::RunningBack)
        .iter()
        .map(|e| e.player_id.as_str())
        .collect();
    assert_eq!(rbs, vec!["rb-a", "rb-b", "rb-c", PLACEHOLDER_PLAYER_ID]);
}

#[test]
fn team_report_pairs_roster_with_period_stats() {
    let store = seeded_store();
    let report = report::team_report(&store, "t-ala", Anchor::new(2019, 5), Period::Season(None)).unwrap();
    assert_eq!(report.name.as_deref(), Some("Alabama"));
    assert_eq!(report.period, "season");
    assert_eq!(report.stats.games_found, 4);
    assert_eq!(report.roster.len(), ROSTER_SIZE);

    let qb = &report.roster[0];
    assert_eq!(qb.entry.player_id, "p-qb1");
    assert_eq!(qb.stats.player_id, "p-qb1");
    assert_eq!(qb.stats.games_played, 4);
    for slot in report.roster.iter().filter(|s| s.entry.is_placeholder()) {
        assert_eq!(slot.stats.games_played, 0);
        assert!(!slot.stats.period_completed);
    }

    let ghost = report::team_report(&store, "t-ghost", Anchor::new(2019, 5), Period::LastGame).unwrap();
    assert_eq!(ghost.name, None);
    assert_eq!(ghost.stats.games_found, 0);
}
