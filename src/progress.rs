// Progress store: level completions, star ratings and unlocks
//
// State lives in memory and is written through to storage on every mutation.

use wasm_bindgen::prelude::*;

use crate::config::GameConfig;
use crate::storage::{MemoryStorage, ProgressStorage};
use crate::sync;
use crate::types::{
    is_valid_entry, is_valid_level, is_valid_stars, Level, LocalProgress, MemoryMatchError,
    OnChainProgress, Result, Stars, MAX_LEVEL, MIN_LEVEL,
};

/// Restore the progress invariants on data read back from storage.
///
/// Out-of-range pairs are dropped, `completed_levels` is rebuilt from the star
/// map and the unlock level is clamped and never behind the completions.
pub fn normalize_progress(progress: LocalProgress) -> LocalProgress {
    let level_stars: crate::types::LevelStars = progress
        .level_stars
        .into_iter()
        .filter(|&(level, stars)| is_valid_entry(level, stars))
        .collect();

    let earned = sync::next_unlocked_level(level_stars.keys().copied());
    let stored = progress.highest_unlocked_level.clamp(MIN_LEVEL, MAX_LEVEL);

    LocalProgress {
        completed_levels: level_stars.keys().copied().collect(),
        highest_unlocked_level: stored.max(earned),
        level_stars,
        sound_enabled: progress.sound_enabled,
    }
}

/// Read progress from storage, falling back to defaults.
///
/// Missing, unreadable or corrupt payloads never fail the load; they are
/// logged and treated as a fresh player.
pub fn load_progress<S: ProgressStorage + ?Sized>(storage: &S, key: &str) -> LocalProgress {
    let raw = match storage.load(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return LocalProgress::default(),
        Err(e) => {
            crate::log_warn!("could not read saved progress: {}", e);
            return LocalProgress::default();
        }
    };

    match serde_json::from_str::<LocalProgress>(&raw) {
        Ok(progress) => normalize_progress(progress),
        Err(e) => {
            crate::log_warn!("discarding corrupt saved progress: {}", e);
            LocalProgress::default()
        }
    }
}

pub fn save_progress<S: ProgressStorage + ?Sized>(
    storage: &mut S,
    key: &str,
    progress: &LocalProgress,
) -> Result<()> {
    let json = serde_json::to_string(progress)?;
    storage.save(key, &json)
}

/// Player progress backed by a storage implementation
pub struct ProgressStore<S: ProgressStorage> {
    storage: S,
    key: String,
    progress: LocalProgress,
}

impl<S: ProgressStorage> ProgressStore<S> {
    /// Open the store, loading whatever is saved under `key`
    pub fn open(storage: S, key: &str) -> ProgressStore<S> {
        let progress = load_progress(&storage, key);
        ProgressStore {
            storage,
            key: key.to_string(),
            progress,
        }
    }

    pub fn progress(&self) -> &LocalProgress {
        &self.progress
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn is_level_unlocked(&self, level: Level) -> bool {
        is_valid_level(level) && level <= self.progress.highest_unlocked_level
    }

    pub fn stars_for(&self, level: Level) -> Option<Stars> {
        self.progress.level_stars.get(&level).copied()
    }

    pub fn total_stars(&self) -> u64 {
        sync::local_to_on_chain(&self.progress).total
    }

    pub fn completed_count(&self) -> usize {
        self.progress.completed_levels.len()
    }

    /// Record a finished level.
    ///
    /// Keeps the best rating seen for the level and unlocks the next one.
    /// Returns whether the stored rating improved.
    pub fn complete_level(&mut self, level: Level, stars: Stars) -> Result<bool> {
        if !is_valid_level(level) {
            return Err(MemoryMatchError::InvalidLevel(level));
        }
        if !is_valid_stars(stars) {
            return Err(MemoryMatchError::InvalidStars(stars));
        }
        if !self.is_level_unlocked(level) {
            return Err(MemoryMatchError::LevelLocked(level));
        }

        let previous = self.stars_for(level).unwrap_or(0);
        let improved = stars > previous;
        if improved {
            self.progress.level_stars.insert(level, stars);
        }
        self.progress.completed_levels.insert(level);

        let next = (level + 1).min(MAX_LEVEL);
        self.progress.highest_unlocked_level = self.progress.highest_unlocked_level.max(next);

        self.persist()?;
        Ok(improved)
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) -> Result<()> {
        self.progress.sound_enabled = enabled;
        self.persist()
    }

    /// Flip the sound preference, returning the new value
    pub fn toggle_sound(&mut self) -> Result<bool> {
        let enabled = !self.progress.sound_enabled;
        self.set_sound_enabled(enabled)?;
        Ok(enabled)
    }

    /// Wipe all level progress. The sound preference survives.
    pub fn reset(&mut self) -> Result<()> {
        self.progress = LocalProgress {
            sound_enabled: self.progress.sound_enabled,
            ..LocalProgress::default()
        };
        crate::log_info!("progress reset");
        self.persist()
    }

    /// Pull ledger progress into the local store.
    ///
    /// Returns whether anything changed; unchanged state is not rewritten.
    pub fn apply_merge(&mut self, on_chain: &OnChainProgress) -> Result<bool> {
        // ledger entries outside the level/star bounds are not taken in
        let mut merged = normalize_progress(sync::merge_progress(&self.progress, on_chain));
        // a local unlock may already be ahead of the completions
        merged.highest_unlocked_level = merged
            .highest_unlocked_level
            .max(self.progress.highest_unlocked_level);

        if merged == self.progress {
            return Ok(false);
        }

        crate::log_info!(
            "merged on-chain progress: {} -> {} completed levels",
            self.progress.completed_levels.len(),
            merged.completed_levels.len()
        );
        self.progress = merged;
        self.persist()?;
        Ok(true)
    }

    fn persist(&mut self) -> Result<()> {
        save_progress(&mut self.storage, &self.key, &self.progress).map_err(|e| {
            crate::log_error!("failed to save progress: {}", e);
            e
        })
    }
}

// ============================================================================
// WASM surface
// ============================================================================

fn parse_on_chain(on_chain_json: Option<String>) -> Result<Option<OnChainProgress>> {
    match on_chain_json {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(None),
    }
}

/// Progress store for the browser, persisted to localStorage
#[wasm_bindgen]
pub struct ProgressTracker {
    store: ProgressStore<Box<dyn ProgressStorage>>,
}

#[wasm_bindgen]
impl ProgressTracker {
    /// Open saved progress. `config_json` may override the storage key.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<ProgressTracker> {
        let config = match config_json {
            Some(json) => GameConfig::from_json(&json)?,
            None => GameConfig::default(),
        };

        #[cfg(target_arch = "wasm32")]
        let storage: Box<dyn ProgressStorage> = Box::new(crate::storage::BrowserStorage::new()?);
        #[cfg(not(target_arch = "wasm32"))]
        let storage: Box<dyn ProgressStorage> = Box::new(MemoryStorage::new());

        Ok(ProgressTracker {
            store: ProgressStore::open(storage, &config.storage_key),
        })
    }

    /// Tracker that keeps progress in memory only (guest play, tests)
    #[wasm_bindgen(js_name = inMemory)]
    pub fn in_memory() -> ProgressTracker {
        let storage: Box<dyn ProgressStorage> = Box::new(MemoryStorage::new());
        ProgressTracker {
            store: ProgressStore::open(storage, crate::config::DEFAULT_STORAGE_KEY),
        }
    }

    /// Current progress as JSON
    #[wasm_bindgen(js_name = getProgress)]
    pub fn get_progress(&self) -> Result<String> {
        Ok(serde_json::to_string(self.store.progress())?)
    }

    /// Current progress as a plain JS object
    #[wasm_bindgen(js_name = snapshot)]
    pub fn snapshot(&self) -> std::result::Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(self.store.progress()).map_err(JsValue::from)
    }

    #[wasm_bindgen(js_name = completeLevel)]
    pub fn complete_level(&mut self, level: Level, stars: Stars) -> Result<bool> {
        self.store.complete_level(level, stars)
    }

    #[wasm_bindgen(js_name = isLevelUnlocked)]
    pub fn is_level_unlocked(&self, level: Level) -> bool {
        self.store.is_level_unlocked(level)
    }

    #[wasm_bindgen(js_name = starsFor)]
    pub fn stars_for(&self, level: Level) -> Option<Stars> {
        self.store.stars_for(level)
    }

    #[wasm_bindgen(js_name = highestUnlockedLevel)]
    pub fn highest_unlocked_level(&self) -> Level {
        self.store.progress().highest_unlocked_level
    }

    #[wasm_bindgen(js_name = totalStars)]
    pub fn total_stars(&self) -> u32 {
        self.store.total_stars() as u32
    }

    #[wasm_bindgen(js_name = soundEnabled)]
    pub fn sound_enabled(&self) -> bool {
        self.store.progress().sound_enabled
    }

    #[wasm_bindgen(js_name = setSoundEnabled)]
    pub fn set_sound_enabled(&mut self, enabled: bool) -> Result<()> {
        self.store.set_sound_enabled(enabled)
    }

    #[wasm_bindgen(js_name = toggleSound)]
    pub fn toggle_sound(&mut self) -> Result<bool> {
        self.store.toggle_sound()
    }

    #[wasm_bindgen(js_name = reset)]
    pub fn reset(&mut self) -> Result<()> {
        self.store.reset()
    }

    /// Merge an on-chain snapshot (JSON) into local progress
    #[wasm_bindgen(js_name = applyMerge)]
    pub fn apply_merge(&mut self, on_chain_json: &str) -> Result<bool> {
        let on_chain: OnChainProgress = serde_json::from_str(on_chain_json)?;
        self.store.apply_merge(&on_chain)
    }

    /// Sync status against an optional on-chain snapshot (JSON or `null`)
    #[wasm_bindgen(js_name = syncStatus)]
    pub fn sync_status(&self, on_chain_json: Option<String>) -> Result<String> {
        let on_chain = parse_on_chain(on_chain_json)?;
        let status = sync::sync_status(self.store.progress(), on_chain.as_ref());
        Ok(serde_json::to_string(&status)?)
    }

    /// Levels still to be written on-chain, as `{levels, stars, count}` JSON
    #[wasm_bindgen(js_name = unsavedLevels)]
    pub fn unsaved_levels(&self, on_chain_json: Option<String>) -> Result<String> {
        let on_chain = parse_on_chain(on_chain_json)?;
        let delta = sync::get_unsaved_levels(self.store.progress(), on_chain.as_ref());
        Ok(serde_json::to_string(&delta)?)
    }
}
