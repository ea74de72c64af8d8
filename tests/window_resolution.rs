mod common;

use cfb_stats::period::{Anchor, Period, Side};
use cfb_stats::window::{EntityRef, WindowGame, resolve_window};
use cfb_stats::StatsError;

use common::seeded_store;

fn ids(window: &[WindowGame]) -> Vec<&str> {
    window.iter().map(|wg| wg.game.game_id.as_str()).collect()
}

#[test]
fn season_window_stops_before_anchor_week_and_skips_unplayed() {
    let store = seeded_store();
    let w = resolve_window(&store, EntityRef::Team("t-ala"), Anchor::new(2019, 5), Period::Season(None)).unwrap();
    assert_eq!(ids(&w), vec!["g4", "g3", "g2", "g1"]);

    let w = resolve_window(&store, EntityRef::Team("t-ala"), Anchor::new(2019, 6), Period::Season(None)).unwrap();
    assert!(!ids(&w).contains(&"g5"));
}

#[test]
fn no_window_ever_reaches_the_anchor() {
    let store = seeded_store();
    let anchors = [
        Anchor::new(2018, 13),
        Anchor::new(2019, 1),
        Anchor::new(2019, 2),
        Anchor::new(2019, 3),
        Anchor::new(2019, 4),
        Anchor::new(2019, 5),
        Anchor::new(2020, 1),
    ];
    let entities = [
        EntityRef::Team("t-ala"),
        EntityRef::Team("t-lsu"),
        EntityRef::Player("p-qb1"),
        EntityRef::Player("p-lb1"),
    ];
    for anchor in anchors {
        for entity in entities {
            for period in Period::ALL {
                let w = resolve_window(&store, entity, anchor, period).unwrap();
                for wg in &w {
                    assert!(
                        (wg.game.season, wg.game.week) < (anchor.season, anchor.week),
                        "{entity:?} {period} at {anchor} returned {}",
                        wg.game.game_id
                    );
                }
                if let Some(limit) = period.limit() {
                    assert!(w.len() <= limit);
                }
                let keys: Vec<_> = w.iter().map(|wg| wg.game.sort_key()).collect();
                let mut sorted = keys.clone();
                sorted.sort_by(|a, b| b.cmp(a));
                assert_eq!(keys, sorted, "{period} not most recent first");
            }
        }
    }
}

#[test]
fn last3_windows_cross_season_boundary() {
    let store = seeded_store();
    let w = resolve_window(&store, EntityRef::Team("t-ala"), Anchor::new(2019, 2), Period::Last3Games(None)).unwrap();
    assert_eq!(ids(&w), vec!["g1", "g18b", "g18a"]);

    let w = resolve_window(
        &store,
        EntityRef::Team("t-ala"),
        Anchor::new(2019, 5),
        Period::Last3Games(Some(Side::Home)),
    )
    .unwrap();
    assert_eq!(ids(&w), vec!["g4", "g3", "g1"]);
}

#[test]
fn last_season_ignores_anchor_week() {
    let store = seeded_store();
    let w = resolve_window(&store, EntityRef::Team("t-ala"), Anchor::new(2019, 1), Period::LastSeason(None)).unwrap();
    assert_eq!(ids(&w), vec!["g18b", "g18a"]);
    let w = resolve_window(
        &store,
        EntityRef::Team("t-ala"),
        Anchor::new(2019, 1),
        Period::LastSeason(Some(Side::Away)),
    )
    .unwrap();
    assert_eq!(ids(&w), vec!["g18b"]);
}

#[test]
fn player_side_follows_the_team_played_for() {
    let store = seeded_store();
    let w = resolve_window(
        &store,
        EntityRef::Player("p-qb1"),
        Anchor::new(2019, 5),
        Period::Season(Some(Side::Away)),
    )
    .unwrap();
    assert_eq!(ids(&w), vec!["g2"]);
    assert_eq!(w[0].team_id(), "t-ala");
    assert_eq!(w[0].opponent_id(), "t-aub");

    let w = resolve_window(&store, EntityRef::Player("p-lsu-qb"), Anchor::new(2019, 5), Period::LastGame).unwrap();
    assert_eq!(w[0].side, Side::Away);
}

#[test]
fn unknown_entities_have_empty_windows() {
    let store = seeded_store();
    let w = resolve_window(&store, EntityRef::Team("t-ghost"), Anchor::new(2019, 5), Period::Season(None)).unwrap();
    assert!(w.is_empty());
    let w = resolve_window(&store, EntityRef::Player(""), Anchor::new(2019, 5), Period::LastGame).unwrap();
    assert!(w.is_empty());
}

#[test]
fn unknown_period_is_rejected() {
    let err = "currentSeason".parse::<Period>().unwrap_err();
    assert!(matches!(err, StatsError::InvalidWindowPolicy { ref period } if period == "currentSeason"));
}
