use crate::exchange::PositionSide;
use crate::logger::{self, LogTag};
use crate::paths;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc as StdArc, Mutex as StdMutex};

/// Open position for one sub-strategy (coin + Donchian period)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub side: PositionSide,
    pub amount: f64,
    pub entry_price: f64,
    pub leverage: u32,
    pub entry_time: DateTime<Utc>,
}

/// Key identifying a sub-strategy, e.g. "BTCUSDT-20"
pub fn position_key(symbol: &str, period: usize) -> String {
    format!("{}-{}", symbol, period)
}

/// All open positions, persisted as JSON between scheduled runs
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
pub struct PositionBook(pub HashMap<String, Position>);

impl PositionBook {
    pub fn get(&self, key: &str) -> Option<&Position> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: String, position: Position) {
        self.0.insert(key, position);
    }

    pub fn remove(&mut self, key: &str) -> Option<Position> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Load the book from a JSON file; a missing file is an empty book
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(book) => book,
                Err(e) => {
                    logger::error(
                        LogTag::Positions,
                        &format!("Corrupt positions file {}: {}", path.display(), e),
                    );
                    Self::default()
                }
            },
            Err(e) => {
                logger::error(
                    LogTag::Positions,
                    &format!("Failed to read {}: {}", path.display(), e),
                );
                Self::default()
            }
        }
    }

    /// Persist the book atomically (write tmp, then rename over the target)
    ///
    /// A crash mid-write must never leave a truncated positions file - the
    /// next run would treat every open position as closed.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp_path, contents)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Static global: saved positions, loaded from logs/positions.json on first
/// access
pub static SAVED_POSITIONS: Lazy<StdArc<StdMutex<PositionBook>>> = Lazy::new(|| {
    let book = PositionBook::load_from(&paths::get_positions_path());
    if !book.is_empty() {
        logger::info(
            LogTag::Positions,
            &format!("Loaded {} open position(s) from disk", book.len()),
        );
    }
    StdArc::new(StdMutex::new(book))
});

/// Snapshot of the global book
pub fn get_saved_positions() -> PositionBook {
    SAVED_POSITIONS
        .lock()
        .map(|book| book.clone())
        .unwrap_or_default()
}

/// Mutate the global book and persist it in one step
pub fn update_saved_positions<F>(mutate: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut PositionBook),
{
    let mut book = SAVED_POSITIONS
        .lock()
        .map_err(|_| anyhow::anyhow!("positions mutex poisoned"))?;
    mutate(&mut book);
    book.save_to(&paths::get_positions_path())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_position(side: PositionSide) -> Position {
        Position {
            side,
            amount: 0.052,
            entry_price: 35000.0,
            leverage: 2,
            entry_time: Utc::now(),
        }
    }

    #[test]
    fn test_position_key_format() {
        assert_eq!(position_key("BTCUSDT", 20), "BTCUSDT-20");
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.json");

        let mut book = PositionBook::default();
        book.insert(
            position_key("BTCUSDT", 20),
            sample_position(PositionSide::Long),
        );
        book.insert(
            position_key("ETHUSDT", 5),
            sample_position(PositionSide::Short),
        );
        book.save_to(&path).unwrap();

        let loaded = PositionBook::load_from(&path);
        assert_eq!(loaded, book);
        assert_eq!(
            loaded.get("BTCUSDT-20").unwrap().side,
            PositionSide::Long
        );
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let book = PositionBook::load_from(&dir.path().join("nope.json"));
        assert!(book.is_empty());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("positions.json");
        std::fs::write(&path, "{not json").unwrap();

        let book = PositionBook::load_from(&path);
        assert!(book.is_empty());
    }

    #[test]
    fn test_side_serializes_as_uppercase() {
        let json = serde_json::to_string(&sample_position(PositionSide::Short)).unwrap();
        assert!(json.contains("\"SHORT\""));
    }
}
