// On-chain progress view
//
// Decodes what a read of the progress contract returns into an
// OnChainProgress snapshot.

use wasm_bindgen::prelude::*;

use crate::types::{
    is_valid_entry, Level, LevelStars, OnChainProgress, Result, Stars, Timestamp, UnsavedDelta,
};

impl OnChainProgress {
    /// Build a snapshot from the parallel arrays returned by the contract.
    ///
    /// Pairs beyond the shorter array and out-of-range pairs are dropped. A
    /// level reported twice keeps its best rating. `total` is recomputed from
    /// the kept pairs when the reported value disagrees.
    pub fn from_contract_read(
        total: u64,
        updated: Timestamp,
        levels: &[Level],
        stars: &[Stars],
    ) -> OnChainProgress {
        if levels.len() != stars.len() {
            crate::log_warn!(
                "contract returned {} levels but {} star values",
                levels.len(),
                stars.len()
            );
        }

        let mut level_stars = LevelStars::new();
        for (&level, &rating) in levels.iter().zip(stars.iter()) {
            if !is_valid_entry(level, rating) {
                crate::log_warn!("ignoring on-chain entry level={} stars={}", level, rating);
                continue;
            }
            let best = level_stars.entry(level).or_insert(rating);
            *best = (*best).max(rating);
        }

        let mut snapshot = OnChainProgress {
            total,
            updated,
            level_stars,
        };
        let computed = snapshot.recomputed_total();
        if computed != total {
            crate::log_warn!("on-chain total {} does not match stars ({})", total, computed);
            snapshot.total = computed;
        }
        snapshot
    }

    /// Sum of the star values held in the snapshot
    pub fn recomputed_total(&self) -> u64 {
        self.level_stars.values().map(|&stars| stars.max(0) as u64).sum()
    }

    /// The ledger as it reads after `delta` has been written
    pub fn overlay(&self, delta: &UnsavedDelta) -> OnChainProgress {
        let mut level_stars = self.level_stars.clone();
        for (&level, &stars) in delta.levels.iter().zip(delta.stars.iter()) {
            level_stars.insert(level, stars);
        }

        let mut next = OnChainProgress {
            total: 0,
            updated: self.updated,
            level_stars,
        };
        next.total = next.recomputed_total();
        next
    }
}

/// Decode a contract read into snapshot JSON
///
/// Example:
/// ```js
/// const [total, updated, levels, stars] = await contract.read.getProgress([address]);
/// const snapshot = decodeOnChainProgress(Number(total), Number(updated), levels, stars);
/// ```
#[wasm_bindgen(js_name = decodeOnChainProgress)]
pub fn decode_on_chain_progress(
    total: f64,
    updated: f64,
    levels: Vec<Level>,
    stars: Vec<Stars>,
) -> Result<String> {
    let snapshot = OnChainProgress::from_contract_read(
        total.max(0.0) as u64,
        updated as Timestamp,
        &levels,
        &stars,
    );
    Ok(serde_json::to_string(&snapshot)?)
}
