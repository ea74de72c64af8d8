use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use cfb_stats::models::{Game, Player, PlayerGameStat, Position, Team};
use cfb_stats::period::{Anchor, Period};
use cfb_stats::report;
use cfb_stats::stat_keys::{PlayerStat, StatLine, TeamLine, TeamStat};
use cfb_stats::store::{self, SqliteStore};
use cfb_stats::window;

const TEAMS: usize = 40;
const PLAYERS_PER_TEAM: usize = 30;
const POSITIONS: [&str; 6] = ["QB", "RB", "WR", "TE", "LB", "OT"];

fn random_box(rng: &mut StdRng) -> TeamLine {
    TeamLine::default()
        .with(TeamStat::TotalYards, rng.gen_range(200..600) as f64)
        .with(TeamStat::AvgGain, rng.gen_range(30..80) as f64 / 10.0)
        .with(TeamStat::ThirdDownAttempts, rng.gen_range(10..18) as f64)
        .with(TeamStat::ThirdDownSuccesses, rng.gen_range(2..10) as f64)
}

fn synthetic_games(rng: &mut StdRng) -> Vec<Game> {
    let mut games = Vec::new();
    for season in 2017..=2019 {
        for week in 1..=12 {
            for pair in 0..TEAMS / 2 {
                let home = (pair + week as usize) % TEAMS;
                let away = (home + TEAMS / 2) % TEAMS;
                games.push(Game {
                    game_id: format!("g{season}-{week}-{pair}"),
                    season,
                    week,
                    home_team_id: format!("t{home}"),
                    away_team_id: format!("t{away}"),
                    home_points: rng.gen_range(0..50),
                    away_points: rng.gen_range(1..50),
                    home_box: Some(random_box(rng)),
                    away_box: Some(random_box(rng)),
                });
            }
        }
    }
    games
}

fn seeded_store() -> SqliteStore {
    let mut rng = StdRng::seed_from_u64(7);
    let games = synthetic_games(&mut rng);
    let store = SqliteStore::open_in_memory().expect("open store");
    store
        .write(|tx| {
            for t in 0..TEAMS {
                store::upsert_team(
                    tx,
                    &Team {
                        team_id: format!("t{t}"),
                        name: format!("Team {t}"),
                        market: String::new(),
                        alias: String::new(),
                        division: None,
                    },
                )?;
                for p in 0..PLAYERS_PER_TEAM {
                    store::upsert_player(
                        tx,
                        &Player {
                            player_id: format!("p{t}-{p}"),
                            name: format!("Player {t}-{p}"),
                            position: Position::parse(POSITIONS[p % POSITIONS.len()]),
                            team_id: Some(format!("t{t}")),
                            recruiting_score: rng.gen_range(0..100) as f64 / 100.0,
                        },
                    )?;
                }
            }
            for game in &games {
                store::upsert_game(tx, game)?;
                for team_id in [&game.home_team_id, &game.away_team_id] {
                    for p in 0..PLAYERS_PER_TEAM {
                        let stats = StatLine::default()
                            .with(PlayerStat::PassingAttempts, rng.gen_range(0..40) as f64)
                            .with(PlayerStat::PassingCompletions, rng.gen_range(0..25) as f64)
                            .with(PlayerStat::RushingYards, rng.gen_range(0..120) as f64)
                            .with(PlayerStat::Combined, rng.gen_range(0..10) as f64);
                        store::upsert_player_game_stat(
                            tx,
                            &PlayerGameStat {
                                player_id: format!("p{}-{p}", &team_id[1..]),
                                game_id: game.game_id.clone(),
                                team_id: team_id.clone(),
                                position: None,
                                stats,
                            },
                        )?;
                    }
                }
            }
            Ok(())
        })
        .expect("seed store");
    store
}

fn bench_window_select(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let games = synthetic_games(&mut rng);
    let anchor = Anchor::new(2019, 9);
    c.bench_function("window_select_season", |b| {
        b.iter(|| {
            let candidates = window::team_candidates("t3", games.iter());
            let w = window::select(candidates, anchor, black_box(Period::Season(None)));
            black_box(w.len());
        })
    });
}

fn bench_player_batch(c: &mut Criterion) {
    let store = seeded_store();
    let ids: Vec<String> = (0..TEAMS)
        .flat_map(|t| (0..PLAYERS_PER_TEAM).map(move |p| format!("p{t}-{p}")))
        .take(500)
        .collect();
    let anchor = Anchor::new(2019, 9);
    c.bench_function("player_batch_last3", |b| {
        b.iter(|| {
            let out =
                report::player_period_stats_batch(&store, black_box(&ids), anchor, Period::Last3Games(None))
                    .unwrap();
            black_box(out.len());
        })
    });
}

fn bench_team_batch(c: &mut Criterion) {
    let store = seeded_store();
    let ids: Vec<String> = (0..TEAMS).map(|t| format!("t{t}")).collect();
    let anchor = Anchor::new(2019, 9);
    c.bench_function("team_batch_season", |b| {
        b.iter(|| {
            let out = report::team_period_stats_batch(&store, black_box(&ids), anchor, Period::Season(None))
                .unwrap();
            black_box(out.len());
        })
    });
}

fn bench_roster(c: &mut Criterion) {
    let store = seeded_store();
    c.bench_function("team_roster", |b| {
        b.iter(|| {
            let roster = report::team_roster(&store, black_box("t5"), 2019).unwrap();
            black_box(roster.len());
        })
    });
}

criterion_group!(
    benches,
    bench_window_select,
    bench_player_batch,
    bench_team_batch,
    bench_roster
);
criterion_main!(benches);
