// Utility functions for Memory Match BASE Core

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::types::Timestamp;

/// Get current timestamp in milliseconds
pub fn now() -> Timestamp {
    #[cfg(target_arch = "wasm32")]
    {
        js_sys::Date::now() as Timestamp
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Generate a unique ID (UUID v4)
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Create a deterministic RNG from a seed string
pub fn seeded_rng(seed: &str) -> ChaCha8Rng {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    let hash = hasher.finish().to_le_bytes();

    // Spread the 8 hash bytes over the 32 byte seed
    let mut seed_array = [0u8; 32];
    for (i, byte) in seed_array.iter_mut().enumerate() {
        *byte = hash[i % hash.len()];
    }

    ChaCha8Rng::from_seed(seed_array)
}

/// Fisher-Yates shuffle, deterministic when a seed is given
pub fn shuffle_vec<T>(vec: &mut [T], seed: Option<&str>) {
    use rand::Rng;

    let len = vec.len();
    if len <= 1 {
        return;
    }

    let mut rng: Box<dyn rand::RngCore> = match seed {
        Some(seed_str) => Box::new(seeded_rng(seed_str)),
        None => Box::new(rand::thread_rng()),
    };

    for i in (1..len).rev() {
        let j = rng.gen_range(0..=i);
        vec.swap(i, j);
    }
}
