#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use cfb_stats::models::{Appearance, Game, Player, PlayerGameStat, PollKind, Team};
use cfb_stats::period::GameFilter;
use cfb_stats::snapshot::{Snapshot, load_snapshot};
use cfb_stats::store::{RecordStore, StatSubject, StoreResult};
use cfb_stats::{SqliteStore, StoreError};

pub fn read_fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("read {}: {err}", path.display()))
}

pub fn seeded_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("open store");
    let snapshot = Snapshot::from_json(&read_fixture("season_snapshot.json")).expect("parse fixture");
    let summary = load_snapshot(&store, &snapshot, "season_snapshot.json").expect("load fixture");
    assert!(summary.errors.is_empty(), "{:?}", summary.errors);
    store
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// Wraps a store and counts range lookups.
pub struct CountingStore<S> {
    pub inner: S,
    pub range_calls: AtomicUsize,
    pub stat_calls: AtomicUsize,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            range_calls: AtomicUsize::new(0),
            stat_calls: AtomicUsize::new(0),
        }
    }

    pub fn range_calls(&self) -> usize {
        self.range_calls.load(Ordering::SeqCst)
    }

    pub fn stat_calls(&self) -> usize {
        self.stat_calls.load(Ordering::SeqCst)
    }
}

impl<S: RecordStore> RecordStore for CountingStore<S> {
    fn team(&self, team_id: &str) -> StoreResult<Option<Team>> {
        self.inner.team(team_id)
    }

    fn teams(&self, team_ids: &[String]) -> StoreResult<Vec<Team>> {
        self.inner.teams(team_ids)
    }

    fn player(&self, player_id: &str) -> StoreResult<Option<Player>> {
        self.inner.player(player_id)
    }

    fn players(&self, player_ids: &[String]) -> StoreResult<Vec<Player>> {
        self.inner.players(player_ids)
    }

    fn game(&self, game_id: &str) -> StoreResult<Option<Game>> {
        self.inner.game(game_id)
    }

    fn games_for_teams(&self, team_ids: &[String], filter: &GameFilter) -> StoreResult<Vec<Game>> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.games_for_teams(team_ids, filter)
    }

    fn appearances(&self, player_ids: &[String], filter: &GameFilter) -> StoreResult<Vec<Appearance>> {
        self.range_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.appearances(player_ids, filter)
    }

    fn player_game_stats(
        &self,
        subject: StatSubject<'_>,
        game_ids: &[String],
    ) -> StoreResult<Vec<PlayerGameStat>> {
        self.stat_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.player_game_stats(subject, game_ids)
    }

    fn poll_points(
        &self,
        team_id: &str,
        season: i32,
        week: i32,
        kind: PollKind,
    ) -> StoreResult<Option<f64>> {
        self.inner.poll_points(team_id, season, week, kind)
    }
}

/// A store whose every call fails, as if the database had gone away.
pub struct FailingStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Timeout { timeout_ms: 25 })
}

impl RecordStore for FailingStore {
    fn team(&self, _team_id: &str) -> StoreResult<Option<Team>> {
        down()
    }

    fn teams(&self, _team_ids: &[String]) -> StoreResult<Vec<Team>> {
        down()
    }

    fn player(&self, _player_id: &str) -> StoreResult<Option<Player>> {
        down()
    }

    fn players(&self, _player_ids: &[String]) -> StoreResult<Vec<Player>> {
        down()
    }

    fn game(&self, _game_id: &str) -> StoreResult<Option<Game>> {
        down()
    }

    fn games_for_teams(&self, _team_ids: &[String], _filter: &GameFilter) -> StoreResult<Vec<Game>> {
        down()
    }

    fn appearances(&self, _player_ids: &[String], _filter: &GameFilter) -> StoreResult<Vec<Appearance>> {
        down()
    }

    fn player_game_stats(
        &self,
        _subject: StatSubject<'_>,
        _game_ids: &[String],
    ) -> StoreResult<Vec<PlayerGameStat>> {
        down()
    }

    fn poll_points(
        &self,
        _team_id: &str,
        _season: i32,
        _week: i32,
        _kind: PollKind,
    ) -> StoreResult<Option<f64>> {
        down()
    }
}
