// Transaction submission bookkeeping
//
// The wallet call itself happens in JS. This module validates what is about
// to be written and tracks the pending/success/error state so that only one
// write is in flight at a time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use wasm_bindgen::prelude::*;

use crate::sync;
use crate::types::{
    is_valid_level, is_valid_stars, BatchUpdateData, Level, LocalProgress, MemoryMatchError,
    OnChainProgress, Result, Stars, Timestamp,
};
use crate::utils::now;

/// Check a batch write before it goes to the wallet.
///
/// The batch must be non-empty, the arrays the same length, every pair in
/// range and no level listed twice. The result is sorted by level.
pub fn validate_batch(levels: &[Level], stars: &[Stars]) -> Result<BatchUpdateData> {
    if levels.is_empty() {
        return Err(MemoryMatchError::InvalidOperation(
            "nothing to submit".to_string(),
        ));
    }
    if levels.len() != stars.len() {
        return Err(MemoryMatchError::InvalidOperation(format!(
            "{} levels but {} star values",
            levels.len(),
            stars.len()
        )));
    }

    let mut seen = BTreeSet::new();
    let mut pairs = Vec::with_capacity(levels.len());
    for (&level, &rating) in levels.iter().zip(stars.iter()) {
        validate_single(level, rating)?;
        if !seen.insert(level) {
            return Err(MemoryMatchError::InvalidOperation(format!(
                "level {} listed twice",
                level
            )));
        }
        pairs.push((level, rating));
    }
    pairs.sort_unstable_by_key(|&(level, _)| level);

    let (levels, stars) = pairs.into_iter().unzip();
    Ok(BatchUpdateData { levels, stars })
}

/// Check a single-level write (sequential update path)
pub fn validate_single(level: Level, stars: Stars) -> Result<()> {
    if !is_valid_level(level) {
        return Err(MemoryMatchError::InvalidLevel(level));
    }
    if !is_valid_stars(stars) {
        return Err(MemoryMatchError::InvalidStars(stars));
    }
    Ok(())
}

/// The batch to write for the current snapshots, or `None` when the ledger
/// is already up to date.
pub fn plan_submission(
    local: &LocalProgress,
    on_chain: Option<&OnChainProgress>,
) -> Result<Option<BatchUpdateData>> {
    let delta = sync::get_unsaved_levels(local, on_chain);
    if delta.count == 0 {
        return Ok(None);
    }

    validate_batch(&delta.levels, &delta.stars).map(Some)
}

/// Lifecycle of one progress write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SubmissionState {
    Idle,
    Pending {
        batch: BatchUpdateData,
        started_at: Timestamp,
    },
    Succeeded {
        batch: BatchUpdateData,
        tx_hash: String,
    },
    Failed {
        error: String,
    },
}

/// Tracks the single in-flight progress write
#[derive(Debug, Clone)]
#[wasm_bindgen]
pub struct SubmissionTracker {
    state: SubmissionState,
}

#[wasm_bindgen]
impl SubmissionTracker {
    #[wasm_bindgen(constructor)]
    pub fn new() -> SubmissionTracker {
        SubmissionTracker {
            state: SubmissionState::Idle,
        }
    }

    /// Validate a batch and mark it pending. Returns the normalised batch JSON
    /// the wallet call should use.
    #[wasm_bindgen(js_name = beginBatch)]
    pub fn begin_batch(&mut self, levels: Vec<Level>, stars: Vec<Stars>) -> Result<String> {
        let batch = self.begin(&levels, &stars)?;
        Ok(serde_json::to_string(&batch)?)
    }

    /// Validate and mark a single-level write pending
    #[wasm_bindgen(js_name = beginSingle)]
    pub fn begin_single(&mut self, level: Level, stars: Stars) -> Result<()> {
        self.begin(&[level], &[stars]).map(|_| ())
    }

    /// Record a confirmed transaction
    #[wasm_bindgen(js_name = succeed)]
    pub fn succeed(&mut self, tx_hash: String) -> Result<()> {
        let batch = match std::mem::replace(&mut self.state, SubmissionState::Idle) {
            SubmissionState::Pending { batch, .. } => batch,
            other => {
                self.state = other;
                return Err(MemoryMatchError::InvalidOperation(
                    "no pending submission to confirm".to_string(),
                ));
            }
        };

        crate::log_info!("progress saved on-chain: {} level(s), tx {}", batch.len(), tx_hash);
        self.state = SubmissionState::Succeeded { batch, tx_hash };
        Ok(())
    }

    /// Record a rejected or reverted transaction
    #[wasm_bindgen(js_name = fail)]
    pub fn fail(&mut self, error: String) -> Result<()> {
        if !self.is_pending() {
            return Err(MemoryMatchError::InvalidOperation(
                "no pending submission to fail".to_string(),
            ));
        }

        crate::log_warn!("progress submission failed: {}", error);
        self.state = SubmissionState::Failed { error };
        Ok(())
    }

    /// Back to idle, clearing success/error flags. Refused while pending.
    #[wasm_bindgen(js_name = reset)]
    pub fn reset(&mut self) -> Result<()> {
        if self.is_pending() {
            return Err(MemoryMatchError::SubmissionInFlight);
        }
        self.state = SubmissionState::Idle;
        Ok(())
    }

    #[wasm_bindgen(js_name = isPending)]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, SubmissionState::Pending { .. })
    }

    #[wasm_bindgen(js_name = isSuccess)]
    pub fn is_success(&self) -> bool {
        matches!(self.state, SubmissionState::Succeeded { .. })
    }

    #[wasm_bindgen(js_name = error)]
    pub fn error(&self) -> Option<String> {
        match &self.state {
            SubmissionState::Failed { error } => Some(error.clone()),
            _ => None,
        }
    }

    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.state)?)
    }
}

impl Default for SubmissionTracker {
    fn default() -> Self {
        Self::new()
    }
}

// Non-WASM methods for internal use
impl SubmissionTracker {
    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Validate and mark pending. A second write is refused while one is in flight.
    pub fn begin(&mut self, levels: &[Level], stars: &[Stars]) -> Result<BatchUpdateData> {
        if self.is_pending() {
            return Err(MemoryMatchError::SubmissionInFlight);
        }

        let batch = validate_batch(levels, stars)?;
        self.state = SubmissionState::Pending {
            batch: batch.clone(),
            started_at: now(),
        };
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LevelStars;

    #[test]
    fn test_validate_batch_sorts() {
        let batch = validate_batch(&[5, 1, 2], &[1, 3, 2]).unwrap();

        assert_eq!(batch.levels, vec![1, 2, 5]);
        assert_eq!(batch.stars, vec![3, 2, 1]);
    }

    #[test]
    fn test_validate_batch_rejects() {
        assert!(matches!(
            validate_batch(&[], &[]),
            Err(MemoryMatchError::InvalidOperation(_))
        ));
        assert!(matches!(
            validate_batch(&[1, 2], &[3]),
            Err(MemoryMatchError::InvalidOperation(_))
        ));
        assert!(matches!(
            validate_batch(&[1, 1], &[3, 2]),
            Err(MemoryMatchError::InvalidOperation(_))
        ));
        assert_eq!(validate_batch(&[0], &[1]), Err(MemoryMatchError::InvalidLevel(0)));
        assert_eq!(validate_batch(&[101], &[1]), Err(MemoryMatchError::InvalidLevel(101)));
        assert_eq!(validate_batch(&[3], &[4]), Err(MemoryMatchError::InvalidStars(4)));
    }

    #[test]
    fn test_validate_single() {
        assert!(validate_single(100, 3).is_ok());
        assert_eq!(validate_single(1, 0), Err(MemoryMatchError::InvalidStars(0)));
    }

    #[test]
    fn test_plan_submission() {
        let local = LocalProgress::from_stars([(1, 3), (2, 1)]);

        assert_eq!(plan_submission(&LocalProgress::default(), None).unwrap(), None);

        let batch = plan_submission(&local, None).unwrap().unwrap();
        assert_eq!(batch.levels, vec![1, 2]);

        let partial = OnChainProgress::from_stars([(1, 3)]);
        let batch = plan_submission(&local, Some(&partial)).unwrap().unwrap();
        assert_eq!(batch.levels, vec![2]);
        assert_eq!(batch.stars, vec![1]);

        let synced = OnChainProgress::from_stars([(1, 3), (2, 2)]);
        assert_eq!(plan_submission(&local, Some(&synced)).unwrap(), None);
    }

    #[test]
    fn test_plan_submission_from_stars_only() {
        let local = LocalProgress {
            level_stars: LevelStars::from([(5, 1), (1, 3)]),
            ..Default::default()
        };

        let batch = plan_submission(&local, None).unwrap().unwrap();
        assert_eq!(batch.levels, vec![1, 5]);
        assert_eq!(batch.stars, vec![3, 1]);
    }

    #[test]
    fn test_tracker_lifecycle() {
        let mut tracker = SubmissionTracker::new();
        assert!(!tracker.is_pending());

        tracker.begin(&[2, 1], &[1, 3]).unwrap();
        assert!(tracker.is_pending());

        tracker.succeed("0xabc".to_string()).unwrap();
        assert!(tracker.is_success());
        assert!(!tracker.is_pending());
        match tracker.state() {
            SubmissionState::Succeeded { batch, tx_hash } => {
                assert_eq!(batch.levels, vec![1, 2]);
                assert_eq!(tx_hash, "0xabc");
            }
            other => panic!("unexpected state {:?}", other),
        }

        tracker.reset().unwrap();
        assert_eq!(tracker.state(), &SubmissionState::Idle);
    }

    #[test]
    fn test_tracker_refuses_second_submission() {
        let mut tracker = SubmissionTracker::new();
        tracker.begin_single(1, 2).unwrap();

        assert_eq!(tracker.begin(&[2], &[1]), Err(MemoryMatchError::SubmissionInFlight));
        assert_eq!(tracker.reset(), Err(MemoryMatchError::SubmissionInFlight));
    }

    #[test]
    fn test_tracker_failure_allows_retry() {
        let mut tracker = SubmissionTracker::new();
        tracker.begin(&[1], &[3]).unwrap();
        tracker.fail("user rejected".to_string()).unwrap();

        assert_eq!(tracker.error().as_deref(), Some("user rejected"));
        assert!(!tracker.is_pending());

        tracker.begin(&[1], &[3]).unwrap();
        assert!(tracker.is_pending());
        assert_eq!(tracker.error(), None);
    }

    #[test]
    fn test_invalid_batch_leaves_tracker_idle() {
        let mut tracker = SubmissionTracker::new();

        assert!(tracker.begin(&[1], &[7]).is_err());
        assert_eq!(tracker.state(), &SubmissionState::Idle);
    }

    #[test]
    fn test_confirm_without_pending() {
        let mut tracker = SubmissionTracker::new();

        assert!(tracker.succeed("0x1".to_string()).is_err());
        assert!(tracker.fail("boom".to_string()).is_err());
        assert_eq!(tracker.state(), &SubmissionState::Idle);
    }

    #[test]
    fn test_state_json() {
        let mut tracker = SubmissionTracker::new();
        tracker.begin_batch(vec![3], vec![2]).unwrap();

        let state: serde_json::Value = serde_json::from_str(&tracker.get_state().unwrap()).unwrap();
        assert_eq!(state["state"], "pending");
        assert_eq!(state["batch"]["levels"], serde_json::json!([3]));
    }
}
