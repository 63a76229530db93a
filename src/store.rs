use crate::app_dirs::AppDirs;
use crate::session::GameMode;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const HIGH_SCORE_KEY: &str = "tap_speed_high_score";
pub const GAME_MODE_KEY: &str = "tap_speed_game_mode";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// String key-value persistence.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Key-value table in a local SQLite database
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens the database under the state directory, creating it if needed
    pub fn new() -> Result<Self, StoreError> {
        let db_path = AppDirs::db_path().unwrap_or_else(|| PathBuf::from("tapr.db"));
        Self::open(db_path)
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY NOT NULL,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO kv (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key, value],
        )?;
        Ok(())
    }
}

/// Volatile store, used when the database cannot be opened and in tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<K: KeyValueStore + ?Sized> KeyValueStore for Box<K> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Best-effort access to the high score and preferred game mode.
/// Read failures yield defaults; write failures are logged and dropped.
#[derive(Debug)]
pub struct Storage<K: KeyValueStore> {
    kv: K,
}

impl<K: KeyValueStore> Storage<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn high_score(&self) -> f64 {
        match self.kv.get(HIGH_SCORE_KEY) {
            Ok(Some(raw)) => raw
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite())
                .unwrap_or(0.0),
            Ok(None) => 0.0,
            Err(e) => {
                warn!(error = %e, "error reading high score");
                0.0
            }
        }
    }

    pub fn save_high_score(&self, score: f64) {
        if let Err(e) = self.kv.set(HIGH_SCORE_KEY, &score.to_string()) {
            warn!(error = %e, "error saving high score");
        }
    }

    pub fn game_mode(&self) -> GameMode {
        match self.kv.get(GAME_MODE_KEY) {
            Ok(Some(raw)) => raw.parse::<GameMode>().unwrap_or_default(),
            Ok(None) => GameMode::default(),
            Err(e) => {
                warn!(error = %e, "error reading game mode");
                GameMode::default()
            }
        }
    }

    pub fn save_game_mode(&self, mode: GameMode) {
        if let Err(e) = self.kv.set(GAME_MODE_KEY, &mode.to_string()) {
            warn!(error = %e, "error saving game mode");
        }
    }

    /// Stores `speed` if it strictly beats the stored best. Returns true when it did.
    pub fn update_high_score(&self, speed: f64) -> bool {
        if !speed.is_finite() || speed <= self.high_score() {
            return false;
        }
        info!(speed, "new high score");
        self.save_high_score(speed);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable("disk on fire".into()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk on fire".into()))
        }
    }

    #[test]
    fn test_defaults_when_empty() {
        let storage = Storage::new(MemoryStore::new());
        assert_eq!(storage.high_score(), 0.0);
        assert_eq!(storage.game_mode(), GameMode::Fifteen);
    }

    #[test]
    fn test_defaults_on_failure() {
        let storage = Storage::new(BrokenStore);
        assert_eq!(storage.high_score(), 0.0);
        assert_eq!(storage.game_mode(), GameMode::Fifteen);
        storage.save_high_score(3.0);
        storage.save_game_mode(GameMode::Five);
        assert!(storage.update_high_score(2.0));
    }

    #[test]
    fn test_invalid_stored_values_fall_back() {
        let kv = MemoryStore::new();
        kv.set(HIGH_SCORE_KEY, "fast").unwrap();
        kv.set(GAME_MODE_KEY, "7").unwrap();
        let storage = Storage::new(kv);
        assert_eq!(storage.high_score(), 0.0);
        assert_eq!(storage.game_mode(), GameMode::Fifteen);
    }

    #[test]
    fn test_update_high_score_is_monotonic() {
        let storage = Storage::new(MemoryStore::new());

        assert!(storage.update_high_score(4.7));
        assert_eq!(storage.high_score(), 4.7);

        assert!(!storage.update_high_score(4.7));
        assert!(!storage.update_high_score(3.2));
        assert_eq!(storage.high_score(), 4.7);

        assert!(storage.update_high_score(5.1));
        assert_eq!(storage.high_score(), 5.1);

        assert!(!storage.update_high_score(f64::NAN));
        assert_eq!(storage.high_score(), 5.1);
    }

    #[test]
    fn test_zero_speed_never_sets_record() {
        let storage = Storage::new(MemoryStore::new());
        assert!(!storage.update_high_score(0.0));
    }

    #[test]
    fn test_game_mode_roundtrip() {
        let storage = Storage::new(MemoryStore::new());
        for mode in GameMode::ALL {
            storage.save_game_mode(mode);
            assert_eq!(storage.game_mode(), mode);
        }
    }

    #[test]
    fn test_sqlite_store_persists_across_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("tapr.db");

        {
            let storage = Storage::new(SqliteStore::open(&path).unwrap());
            assert!(storage.update_high_score(6.4));
            storage.save_game_mode(GameMode::Five);
        }

        let storage = Storage::new(SqliteStore::open(&path).unwrap());
        assert_eq!(storage.high_score(), 6.4);
        assert_eq!(storage.game_mode(), GameMode::Five);
    }

    #[test]
    fn test_sqlite_set_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "1").unwrap();
        store.set("k", "2").unwrap();
        assert_eq!(store.get("k").unwrap(), Some("2".to_string()));
    }
}
