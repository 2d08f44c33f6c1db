// Memory-match board engine
//
// Cards show blockchain ecosystem projects. A level deals a number of pairs
// that grows with the level; the player flips two cards per move and earns
// one to three stars depending on how many moves the board took.

use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

use crate::config::GameConfig;
use crate::types::{is_valid_level, Level, MemoryMatchError, Result, Stars, Timestamp};
use crate::utils::{generate_id, shuffle_vec};

/// Card faces
pub const PROJECTS: &[&str] = &[
    "Base",
    "Coinbase Wallet",
    "Aerodrome",
    "Uniswap",
    "Farcaster",
    "Zora",
    "Morpho",
    "Aave",
    "Moonwell",
    "Basenames",
    "OnchainKit",
    "Seamless",
    "Extra Finance",
    "BaseSwap",
    "Degen",
    "Toshi",
    "Brett",
    "Virtuals",
    "Clanker",
    "Warpcast",
    "Basepaint",
    "Highlight",
    "Parallel",
    "Avantis",
];

/// Board size and star thresholds for one level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelConfig {
    pub level: Level,
    pub pairs: usize,
    /// At most this many moves earns three stars
    pub three_star_moves: u32,
    /// At most this many moves earns two stars
    pub two_star_moves: u32,
}

impl LevelConfig {
    pub fn for_level(level: Level, config: &GameConfig) -> Result<LevelConfig> {
        if !is_valid_level(level) {
            return Err(MemoryMatchError::InvalidLevel(level));
        }

        let extra = (level as usize - 1) / config.levels_per_extra_pair;
        let pairs = (config.base_pairs + extra).min(PROJECTS.len());

        Ok(LevelConfig {
            level,
            pairs,
            three_star_moves: (pairs as u32).saturating_add(config.three_star_slack),
            two_star_moves: (pairs as u32).saturating_add(config.two_star_slack),
        })
    }

    pub fn stars_for_moves(&self, moves: u32) -> Stars {
        if moves <= self.three_star_moves {
            3
        } else if moves <= self.two_star_moves {
            2
        } else {
            1
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Both cards of a pair share this id
    pub pair_id: usize,
    pub project: String,
    pub face_up: bool,
    pub matched: bool,
}

/// Result of flipping one card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum FlipOutcome {
    /// First card of a move
    Revealed { index: usize },
    Match { first: usize, second: usize },
    /// Both cards stay face up until `hide_mismatched`
    Mismatch { first: usize, second: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    config: LevelConfig,
    cards: Vec<Card>,
    /// Face-up cards not yet matched, in flip order
    revealed: Vec<usize>,
    moves: u32,
}

impl Board {
    /// Deal a board for `level`. The same seed always deals the same board.
    pub fn deal(level: Level, seed: Option<&str>, config: &GameConfig) -> Result<Board> {
        let level_config = LevelConfig::for_level(level, config)?;

        let mut faces: Vec<usize> = (0..PROJECTS.len()).collect();
        let face_seed = seed.map(|s| format!("{}-faces", s));
        shuffle_vec(&mut faces, face_seed.as_deref());
        faces.truncate(level_config.pairs);

        let mut cards: Vec<Card> = faces
            .iter()
            .enumerate()
            .flat_map(|(pair_id, &face)| {
                let card = Card {
                    pair_id,
                    project: PROJECTS[face].to_string(),
                    face_up: false,
                    matched: false,
                };
                [card.clone(), card]
            })
            .collect();
        let deck_seed = seed.map(|s| format!("{}-deck", s));
        shuffle_vec(&mut cards, deck_seed.as_deref());

        Ok(Board {
            config: level_config,
            cards,
            revealed: Vec::with_capacity(2),
            moves: 0,
        })
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn matched_pairs(&self) -> usize {
        self.cards.iter().filter(|card| card.matched).count() / 2
    }

    pub fn is_complete(&self) -> bool {
        self.cards.iter().all(|card| card.matched)
    }

    /// Star rating, once every pair is found
    pub fn stars(&self) -> Option<Stars> {
        self.is_complete()
            .then(|| self.config.stars_for_moves(self.moves))
    }

    pub fn flip(&mut self, index: usize) -> Result<FlipOutcome> {
        if index >= self.cards.len() {
            return Err(MemoryMatchError::IndexOutOfBounds(index));
        }
        if self.revealed.len() == 2 {
            return Err(MemoryMatchError::InvalidOperation(
                "two cards are already face up".to_string(),
            ));
        }

        let card = &mut self.cards[index];
        if card.matched || card.face_up {
            return Err(MemoryMatchError::InvalidOperation(format!(
                "card {} is already face up",
                index
            )));
        }
        card.face_up = true;
        self.revealed.push(index);

        let (first, second) = match self.revealed[..] {
            [only] => return Ok(FlipOutcome::Revealed { index: only }),
            [first, second] => (first, second),
            _ => {
                return Err(MemoryMatchError::InvalidOperation(format!(
                    "{} cards face up",
                    self.revealed.len()
                )))
            }
        };

        self.moves += 1;
        if self.cards[first].pair_id == self.cards[second].pair_id {
            self.cards[first].matched = true;
            self.cards[second].matched = true;
            self.revealed.clear();
            Ok(FlipOutcome::Match { first, second })
        } else {
            Ok(FlipOutcome::Mismatch { first, second })
        }
    }

    /// Turn a mismatched pair back face down. Returns how many cards were hidden.
    pub fn hide_mismatched(&mut self) -> usize {
        if self.revealed.len() < 2 {
            return 0;
        }
        for index in self.revealed.drain(..) {
            self.cards[index].face_up = false;
        }
        2
    }
}

/// Game state snapshot handed to the UI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GameSnapshot<'a> {
    session_id: &'a str,
    level: Level,
    cards: &'a [Card],
    moves: u32,
    matched_pairs: usize,
    total_pairs: usize,
    complete: bool,
    stars: Option<Stars>,
    started_at: Timestamp,
    finished_at: Option<Timestamp>,
}

/// One play-through of a level, for WASM
#[wasm_bindgen]
pub struct MemoryGame {
    session_id: String,
    board: Board,
    started_at: Timestamp,
    finished_at: Option<Timestamp>,
}

#[wasm_bindgen]
impl MemoryGame {
    /// Deal a new game. `seed` makes the deal reproducible.
    #[wasm_bindgen(constructor)]
    pub fn new(level: Level, seed: Option<String>, config_json: Option<String>) -> Result<MemoryGame> {
        let config = match config_json {
            Some(json) => GameConfig::from_json(&json)?,
            None => GameConfig::default(),
        };
        let board = Board::deal(level, seed.as_deref(), &config)?;

        Ok(MemoryGame {
            session_id: generate_id(),
            board,
            started_at: chrono::Utc::now().timestamp_millis(),
            finished_at: None,
        })
    }

    /// Flip a card, returning the outcome as JSON
    #[wasm_bindgen(js_name = flip)]
    pub fn flip(&mut self, index: usize) -> Result<String> {
        let outcome = self.board.flip(index)?;
        if self.finished_at.is_none() && self.board.is_complete() {
            self.finished_at = Some(chrono::Utc::now().timestamp_millis());
        }
        Ok(serde_json::to_string(&outcome)?)
    }

    #[wasm_bindgen(js_name = hideMismatched)]
    pub fn hide_mismatched(&mut self) -> usize {
        self.board.hide_mismatched()
    }

    #[wasm_bindgen(js_name = isComplete)]
    pub fn is_complete(&self) -> bool {
        self.board.is_complete()
    }

    #[wasm_bindgen(js_name = moves)]
    pub fn moves(&self) -> u32 {
        self.board.moves()
    }

    #[wasm_bindgen(js_name = stars)]
    pub fn stars(&self) -> Option<Stars> {
        self.board.stars()
    }

    #[wasm_bindgen(js_name = sessionId)]
    pub fn session_id(&self) -> String {
        self.session_id.clone()
    }

    /// Milliseconds played, up to completion
    #[wasm_bindgen(js_name = elapsedMs)]
    pub fn elapsed_ms(&self) -> f64 {
        let end = self
            .finished_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        (end - self.started_at) as f64
    }

    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<String> {
        let snapshot = GameSnapshot {
            session_id: &self.session_id,
            level: self.board.config().level,
            cards: self.board.cards(),
            moves: self.board.moves(),
            matched_pairs: self.board.matched_pairs(),
            total_pairs: self.board.config().pairs,
            complete: self.board.is_complete(),
            stars: self.board.stars(),
            started_at: self.started_at,
            finished_at: self.finished_at,
        };
        Ok(serde_json::to_string(&snapshot)?)
    }
}

// Non-WASM methods for internal use
impl MemoryGame {
    pub fn board(&self) -> &Board {
        &self.board
    }
}
