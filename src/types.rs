// Type definitions for Memory Match BASE Core

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use wasm_bindgen::prelude::*;

/// Level number. Signed so corrupted values survive parsing and get filtered.
pub type Level = i32;

/// Star rating for a completed level.
pub type Stars = i32;

/// Level -> star rating, ordered by level
pub type LevelStars = BTreeMap<Level, Stars>;

/// Timestamp in milliseconds since epoch
pub type Timestamp = i64;

pub const MIN_LEVEL: Level = 1;
pub const MAX_LEVEL: Level = 100;
pub const MIN_STARS: Stars = 1;
pub const MAX_STARS: Stars = 3;

/// Result type for Memory Match operations
pub type Result<T> = std::result::Result<T, MemoryMatchError>;

/// Error types for Memory Match operations
#[derive(Debug, thiserror::Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemoryMatchError {
    #[error("Invalid level: {0} (expected 1-100)")]
    InvalidLevel(Level),

    #[error("Invalid star rating: {0} (expected 1-3)")]
    InvalidStars(Stars),

    #[error("Level locked: {0}")]
    LevelLocked(Level),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("A progress submission is already pending")]
    SubmissionInFlight,
}

// Convert Rust errors to JsValue for WASM boundary
impl From<MemoryMatchError> for JsValue {
    fn from(err: MemoryMatchError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<serde_json::Error> for MemoryMatchError {
    fn from(err: serde_json::Error) -> Self {
        MemoryMatchError::SerializationError(err.to_string())
    }
}

pub fn is_valid_level(level: Level) -> bool {
    (MIN_LEVEL..=MAX_LEVEL).contains(&level)
}

pub fn is_valid_stars(stars: Stars) -> bool {
    (MIN_STARS..=MAX_STARS).contains(&stars)
}

/// Both halves of a (level, stars) pair are in range
pub fn is_valid_entry(level: Level, stars: Stars) -> bool {
    is_valid_level(level) && is_valid_stars(stars)
}

// ============================================================================
// Progress shapes
// ============================================================================

/// Integer that fits a `Level`/`Stars`, or `None`
fn small_int(value: &serde_json::Value) -> Option<i32> {
    value.as_i64().and_then(|n| i32::try_from(n).ok())
}

/// Read a level -> stars object, skipping entries that are not integers.
///
/// One bad entry must not cost the rest of the map; range checks happen later.
fn lenient_level_stars<'de, D>(deserializer: D) -> std::result::Result<LevelStars, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    let Some(entries) = raw.as_object() else {
        if !raw.is_null() {
            crate::log_warn!("ignoring levelStars that is not an object: {}", raw);
        }
        return Ok(LevelStars::new());
    };

    let mut level_stars = LevelStars::new();
    for (key, value) in entries {
        match (key.trim().parse::<Level>().ok(), small_int(value)) {
            (Some(level), Some(stars)) => {
                level_stars.insert(level, stars);
            }
            _ => crate::log_warn!("ignoring levelStars entry {}: {}", key, value),
        }
    }
    Ok(level_stars)
}

/// Read a list of levels, skipping elements that are not integers
fn lenient_levels<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<Level>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw
        .as_array()
        .map(|items| items.iter().filter_map(small_int).collect())
        .unwrap_or_default())
}

/// Player progress as kept in browser storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalProgress {
    #[serde(default, deserialize_with = "lenient_levels")]
    pub completed_levels: BTreeSet<Level>,
    #[serde(default, deserialize_with = "lenient_level_stars")]
    pub level_stars: LevelStars,
    #[serde(default = "default_highest_unlocked")]
    pub highest_unlocked_level: Level,
    #[serde(default = "default_sound_enabled")]
    pub sound_enabled: bool,
}

fn default_highest_unlocked() -> Level {
    MIN_LEVEL
}

fn default_sound_enabled() -> bool {
    true
}

impl Default for LocalProgress {
    fn default() -> Self {
        LocalProgress {
            completed_levels: BTreeSet::new(),
            level_stars: LevelStars::new(),
            highest_unlocked_level: default_highest_unlocked(),
            sound_enabled: default_sound_enabled(),
        }
    }
}

impl LocalProgress {
    /// Build progress from (level, stars) pairs, keeping completed_levels in step
    pub fn from_stars<I>(entries: I) -> LocalProgress
    where
        I: IntoIterator<Item = (Level, Stars)>,
    {
        let level_stars: LevelStars = entries.into_iter().collect();
        LocalProgress {
            completed_levels: level_stars.keys().copied().collect(),
            highest_unlocked_level: crate::sync::next_unlocked_level(level_stars.keys().copied()),
            level_stars,
            sound_enabled: default_sound_enabled(),
        }
    }
}

/// Snapshot of the progress contract for the connected wallet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainProgress {
    /// Sum of all recorded star values
    #[serde(default)]
    pub total: u64,
    /// Ledger-side last write time, informational only
    #[serde(default)]
    pub updated: Timestamp,
    #[serde(default, deserialize_with = "lenient_level_stars")]
    pub level_stars: LevelStars,
}

impl OnChainProgress {
    pub fn from_stars<I>(entries: I) -> OnChainProgress
    where
        I: IntoIterator<Item = (Level, Stars)>,
    {
        let mut snapshot = OnChainProgress {
            total: 0,
            updated: 0,
            level_stars: entries.into_iter().collect(),
        };
        snapshot.total = snapshot.recomputed_total();
        snapshot
    }
}

/// Levels whose local rating has not reached the ledger yet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsavedDelta {
    pub levels: Vec<Level>,
    pub stars: Vec<Stars>,
    pub count: usize,
}

/// Parallel arrays for a batch contract write
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpdateData {
    pub levels: Vec<Level>,
    pub stars: Vec<Stars>,
}

impl BatchUpdateData {
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl From<UnsavedDelta> for BatchUpdateData {
    fn from(delta: UnsavedDelta) -> Self {
        BatchUpdateData {
            levels: delta.levels,
            stars: delta.stars,
        }
    }
}

/// Where local and on-chain progress stand relative to each other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncStatus {
    /// No wallet connected, or snapshot not fetched yet
    NotConnected,
    Synced,
    /// Local holds better ratings the ledger lacks
    LocalAhead { unsaved: UnsavedDelta },
    /// Ledger holds better ratings the local store lacks
    ChainAhead,
    /// Each side holds something the other lacks
    Diverged { unsaved: UnsavedDelta },
}
