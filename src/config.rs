use std::env;
use std::path::PathBuf;
use std::time::Duration;

const CACHE_DIR: &str = "cfb_stats";
const DB_FILE: &str = "cfb_stats.sqlite";
const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const MIN_TIMEOUT_MS: u64 = 100;
const MAX_TIMEOUT_MS: u64 = 300_000;

#[derive(Debug, Clone, PartialEq)]
pub struct StatsConfig {
    /// `None` when neither `CFB_STATS_DB` nor a cache directory is available.
    pub db_path: Option<PathBuf>,
    pub store_timeout: Duration,
}

impl StatsConfig {
    pub fn from_env() -> Self {
        let db_path = env::var("CFB_STATS_DB")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .or_else(default_db_path);
        let timeout_ms = env::var("CFB_STATS_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Self {
            db_path,
            store_timeout: clamp_timeout(timeout_ms),
        }
    }

    pub fn with_db_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.db_path = path;
        }
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        if let Some(ms) = timeout_ms {
            self.store_timeout = clamp_timeout(ms);
        }
        self
    }
}

/// Loads `.env.local` then `.env` if present. Already-set variables win.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

pub fn clamp_timeout(timeout_ms: u64) -> Duration {
    Duration::from_millis(timeout_ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS))
}

pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR).join(DB_FILE));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR).join(DB_FILE))
}
