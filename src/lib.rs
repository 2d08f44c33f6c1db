// Memory Match BASE Core - Rust/WASM Implementation
// Copyright 2025 Memory Match BASE Contributors
// Licensed under the Apache License, Version 2.0

//! # Memory Match BASE Core (Rust/WASM)
//!
//! Game and progress logic for the Memory Match BASE browser game, compiled
//! to WebAssembly. Rendering and the wallet connection stay in JavaScript.
//!
//! ## Architecture
//!
//! - **Sync**: pure reconciliation of local and on-chain progress
//! - **Progress**: level completions, stars and unlocks, persisted to localStorage
//! - **Chain**: decoding of progress contract reads
//! - **Submission**: validation and in-flight tracking of progress writes
//! - **Game**: the memory-match board itself
//!
//! ## Progress model
//!
//! Levels run 1-100 and earn 1-3 stars. Merging local and on-chain progress
//! keeps the best rating per level, so neither side ever loses stars.

use wasm_bindgen::prelude::*;

// Module declarations
#[macro_use]
pub mod logging;
pub mod types;
pub mod config;
pub mod utils;
pub mod sync;
pub mod storage;
pub mod progress;
pub mod chain;
pub mod submission;
pub mod game;
mod sync_ops;

// Re-exports
pub use config::GameConfig;
pub use game::{Board, FlipOutcome, MemoryGame};
pub use progress::{ProgressStore, ProgressTracker};
pub use storage::{MemoryStorage, ProgressStorage};
pub use submission::SubmissionTracker;
pub use sync_ops::ProgressSync;
pub use types::{
    BatchUpdateData, Level, LocalProgress, MemoryMatchError, OnChainProgress, Stars, SyncStatus,
    UnsavedDelta,
};

// WASM initialization
#[wasm_bindgen(start)]
pub fn init() {
    // Set up better panic messages in the browser console
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    log_info!("memory-match-core {} ready", env!("CARGO_PKG_VERSION"));
}

// Version information
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
