// Reconciliation operations exposed to WASM/JavaScript
//
// Thin JSON wrappers over `sync`. Progress crosses the boundary in the same
// camelCase shape the app keeps in localStorage.

use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::submission;
use crate::sync;
use crate::types::{LocalProgress, OnChainProgress, Result};

fn parse<T: DeserializeOwned>(json: &str) -> Result<T> {
    Ok(serde_json::from_str(json)?)
}

/// Absent argument and JSON `null` both mean "no snapshot yet"
fn parse_snapshot(json: Option<String>) -> Result<Option<OnChainProgress>> {
    match json {
        Some(json) => parse(&json),
        None => Ok(None),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// ProgressSync: local/on-chain reconciliation
///
/// Example:
/// ```js
/// const sync = new ProgressSync();
/// const delta = JSON.parse(sync.getUnsavedLevels(
///   JSON.stringify(localProgress),
///   onChain ? JSON.stringify(onChain) : null,
/// ));
/// if (delta.count > 0) {
///   await writeContract({ functionName: "batchUpdate", args: [delta.levels, delta.stars] });
/// }
/// ```
#[wasm_bindgen]
pub struct ProgressSync {
    _private: (),
}

#[wasm_bindgen]
impl ProgressSync {
    #[wasm_bindgen(constructor)]
    pub fn new() -> ProgressSync {
        ProgressSync { _private: () }
    }

    #[wasm_bindgen(js_name = localToOnChain)]
    pub fn local_to_on_chain(&self, local_json: &str) -> Result<String> {
        let local: LocalProgress = parse(local_json)?;
        to_json(&sync::local_to_on_chain(&local))
    }

    #[wasm_bindgen(js_name = onChainToLocal)]
    pub fn on_chain_to_local(&self, on_chain_json: &str) -> Result<String> {
        let on_chain: OnChainProgress = parse(on_chain_json)?;
        to_json(&sync::on_chain_to_local(&on_chain))
    }

    #[wasm_bindgen(js_name = mergeProgress)]
    pub fn merge_progress(&self, local_json: &str, on_chain_json: &str) -> Result<String> {
        let local: LocalProgress = parse(local_json)?;
        let on_chain: OnChainProgress = parse(on_chain_json)?;
        to_json(&sync::merge_progress(&local, &on_chain))
    }

    #[wasm_bindgen(js_name = extractBatchUpdateData)]
    pub fn extract_batch_update_data(&self, progress_json: &str) -> Result<String> {
        let progress: LocalProgress = parse(progress_json)?;
        to_json(&sync::extract_batch_update_data(&progress))
    }

    #[wasm_bindgen(js_name = hasCompletedLevels)]
    pub fn has_completed_levels(&self, progress_json: &str) -> Result<bool> {
        let progress: LocalProgress = parse(progress_json)?;
        Ok(sync::has_completed_levels(&progress))
    }

    #[wasm_bindgen(js_name = isProgressEquivalent)]
    pub fn is_progress_equivalent(&self, a_json: &str, b_json: &str) -> Result<bool> {
        let a: LocalProgress = parse(a_json)?;
        let b: LocalProgress = parse(b_json)?;
        Ok(sync::is_progress_equivalent(&a, &b))
    }

    #[wasm_bindgen(js_name = getUnsavedLevels)]
    pub fn get_unsaved_levels(&self, local_json: &str, on_chain_json: Option<String>) -> Result<String> {
        let local: LocalProgress = parse(local_json)?;
        let on_chain = parse_snapshot(on_chain_json)?;
        to_json(&sync::get_unsaved_levels(&local, on_chain.as_ref()))
    }

    #[wasm_bindgen(js_name = hasMoreProgressOnBlockchain)]
    pub fn has_more_progress_on_blockchain(&self, local_json: &str, on_chain_json: &str) -> Result<bool> {
        let local: LocalProgress = parse(local_json)?;
        let on_chain: OnChainProgress = parse(on_chain_json)?;
        Ok(sync::has_more_progress_on_blockchain(&local, &on_chain))
    }

    #[wasm_bindgen(js_name = syncStatus)]
    pub fn sync_status(&self, local_json: &str, on_chain_json: Option<String>) -> Result<String> {
        let local: LocalProgress = parse(local_json)?;
        let on_chain = parse_snapshot(on_chain_json)?;
        to_json(&sync::sync_status(&local, on_chain.as_ref()))
    }

    /// Validated batch to write, or `"null"` when the ledger is up to date
    #[wasm_bindgen(js_name = planSubmission)]
    pub fn plan_submission(&self, local_json: &str, on_chain_json: Option<String>) -> Result<String> {
        let local: LocalProgress = parse(local_json)?;
        let on_chain = parse_snapshot(on_chain_json)?;
        to_json(&submission::plan_submission(&local, on_chain.as_ref())?)
    }
}

impl Default for ProgressSync {
    fn default() -> Self {
        Self::new()
    }
}
