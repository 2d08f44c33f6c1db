// Progress reconciliation between local storage and the on-chain contract
//
// Every function here is pure: inputs are borrowed, outputs are freshly
// allocated, and nothing fails. Out-of-range (level, stars) pairs are dropped
// instead of reported, since ledger data may come from an older contract.

use crate::types::{
    is_valid_entry, BatchUpdateData, Level, LevelStars, LocalProgress, OnChainProgress, Stars,
    SyncStatus, UnsavedDelta, MAX_LEVEL, MIN_LEVEL,
};

/// Level the player may play next: one past the highest completed, capped at
/// `MAX_LEVEL`, or `MIN_LEVEL` when nothing is completed.
pub fn next_unlocked_level<I>(completed: I) -> Level
where
    I: IntoIterator<Item = Level>,
{
    completed
        .into_iter()
        .max()
        .map(|highest| highest.saturating_add(1).clamp(MIN_LEVEL, MAX_LEVEL))
        .unwrap_or(MIN_LEVEL)
}

/// In-range pairs only, ascending by level
fn valid_entries(level_stars: &LevelStars) -> impl Iterator<Item = (Level, Stars)> + '_ {
    level_stars
        .iter()
        .map(|(&level, &stars)| (level, stars))
        .filter(|&(level, stars)| is_valid_entry(level, stars))
}

fn stars_or_zero(level_stars: &LevelStars, level: Level) -> Stars {
    level_stars.get(&level).copied().unwrap_or(0)
}

/// Convert local progress into the shape stored on-chain.
///
/// `updated` stays 0; only the ledger sets it.
pub fn local_to_on_chain(local: &LocalProgress) -> OnChainProgress {
    let level_stars: LevelStars = valid_entries(&local.level_stars).collect();
    let total = level_stars.values().map(|&stars| stars as u64).sum();

    OnChainProgress {
        total,
        updated: 0,
        level_stars,
    }
}

/// Convert an on-chain snapshot into local progress.
///
/// `sound_enabled` comes back as `true`; callers overlay the real preference.
pub fn on_chain_to_local(on_chain: &OnChainProgress) -> LocalProgress {
    let level_stars: LevelStars = valid_entries(&on_chain.level_stars).collect();

    LocalProgress {
        completed_levels: level_stars.keys().copied().collect(),
        highest_unlocked_level: next_unlocked_level(level_stars.keys().copied()),
        level_stars,
        sound_enabled: true,
    }
}

/// Merge both records, keeping the best rating per level.
///
/// The result never holds fewer stars for a level than either input did.
/// The sound preference is always taken from `local`.
pub fn merge_progress(local: &LocalProgress, on_chain: &OnChainProgress) -> LocalProgress {
    let mut level_stars = LevelStars::new();

    let levels = local
        .level_stars
        .keys()
        .chain(on_chain.level_stars.keys())
        .copied();

    for level in levels {
        let merged = stars_or_zero(&local.level_stars, level)
            .max(stars_or_zero(&on_chain.level_stars, level));
        if merged > 0 {
            level_stars.insert(level, merged);
        }
    }

    LocalProgress {
        completed_levels: level_stars.keys().copied().collect(),
        highest_unlocked_level: next_unlocked_level(level_stars.keys().copied()),
        level_stars,
        sound_enabled: local.sound_enabled,
    }
}

/// Parallel (levels, stars) arrays for a batch write, ascending by level
pub fn extract_batch_update_data(progress: &LocalProgress) -> BatchUpdateData {
    let (levels, stars) = valid_entries(&progress.level_stars).unzip();
    BatchUpdateData { levels, stars }
}

/// Guard against submitting an empty transaction
pub fn has_completed_levels(progress: &LocalProgress) -> bool {
    !progress.completed_levels.is_empty()
}

/// Same star rating for exactly the same levels. Preferences are ignored.
pub fn is_progress_equivalent(a: &LocalProgress, b: &LocalProgress) -> bool {
    if a.level_stars.len() != b.level_stars.len() {
        return false;
    }

    a.level_stars
        .iter()
        .all(|(level, stars)| b.level_stars.get(level) == Some(stars))
}

/// Levels whose local rating beats the ledger's, ascending.
///
/// Without a snapshot every valid local level counts as unsaved. Levels only
/// the ledger knows about are never included; this is a local -> chain delta.
pub fn get_unsaved_levels(
    local: &LocalProgress,
    on_chain: Option<&OnChainProgress>,
) -> UnsavedDelta {
    let (levels, stars): (Vec<Level>, Vec<Stars>) = valid_entries(&local.level_stars)
        .filter(|&(level, stars)| match on_chain {
            Some(chain) => stars > stars_or_zero(&chain.level_stars, level),
            None => true,
        })
        .unzip();

    UnsavedDelta {
        count: levels.len(),
        levels,
        stars,
    }
}

/// True when the ledger holds a better rating for at least one level.
/// Levels missing locally count as zero stars.
pub fn has_more_progress_on_blockchain(local: &LocalProgress, on_chain: &OnChainProgress) -> bool {
    on_chain
        .level_stars
        .iter()
        .any(|(&level, &stars)| stars > stars_or_zero(&local.level_stars, level))
}

/// Summarise what the UI should offer for the current pair of snapshots
pub fn sync_status(local: &LocalProgress, on_chain: Option<&OnChainProgress>) -> SyncStatus {
    let Some(chain) = on_chain else {
        return SyncStatus::NotConnected;
    };

    let unsaved = get_unsaved_levels(local, Some(chain));
    let chain_ahead = has_more_progress_on_blockchain(local, chain);

    match (unsaved.count > 0, chain_ahead) {
        (false, false) => SyncStatus::Synced,
        (true, false) => SyncStatus::LocalAhead { unsaved },
        (false, true) => SyncStatus::ChainAhead,
        (true, true) => SyncStatus::Diverged { unsaved },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MAX_STARS, MIN_STARS};
    use crate::utils::seeded_rng;
    use rand::Rng;

    fn local(entries: &[(Level, Stars)]) -> LocalProgress {
        LocalProgress::from_stars(entries.iter().copied())
    }

    fn chain(entries: &[(Level, Stars)]) -> OnChainProgress {
        OnChainProgress::from_stars(entries.iter().copied())
    }

    /// Random valid progress; roughly a third of the levels are filled in
    fn random_stars(rng: &mut impl Rng) -> Vec<(Level, Stars)> {
        let mut entries = Vec::new();
        for level in MIN_LEVEL..=MAX_LEVEL {
            if rng.gen_bool(0.3) {
                entries.push((level, rng.gen_range(MIN_STARS..=MAX_STARS)));
            }
        }
        entries
    }

    #[test]
    fn test_next_unlocked_level() {
        assert_eq!(next_unlocked_level(Vec::new()), 1);
        assert_eq!(next_unlocked_level(vec![1, 2, 7]), 8);
        assert_eq!(next_unlocked_level(vec![99]), 100);
        assert_eq!(next_unlocked_level(vec![100]), 100);
    }

    #[test]
    fn test_basic_merge() {
        let merged = merge_progress(&local(&[(1, 2), (2, 3)]), &chain(&[(1, 3), (3, 2)]));

        assert_eq!(merged.level_stars, LevelStars::from([(1, 3), (2, 3), (3, 2)]));
        assert_eq!(merged.completed_levels.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(merged.highest_unlocked_level, 4);
    }

    #[test]
    fn test_merge_keeps_local_sound_preference() {
        let mut l = local(&[(1, 1)]);
        l.sound_enabled = false;

        let merged = merge_progress(&l, &chain(&[(2, 3)]));
        assert!(!merged.sound_enabled);
    }

    #[test]
    fn test_merge_is_monotonic() {
        let mut rng = seeded_rng("merge-monotonic");

        for _ in 0..200 {
            let l = local(&random_stars(&mut rng));
            let c = chain(&random_stars(&mut rng));
            let merged = merge_progress(&l, &c);

            for level in MIN_LEVEL..=MAX_LEVEL {
                let got = stars_or_zero(&merged.level_stars, level);
                let l_stars = stars_or_zero(&l.level_stars, level);
                let c_stars = stars_or_zero(&c.level_stars, level);

                assert!(got >= l_stars, "level {} lost local stars", level);
                assert!(got >= c_stars, "level {} lost on-chain stars", level);
                assert_eq!(got, l_stars.max(c_stars));
            }
            assert_eq!(merged.completed_levels.len(), merged.level_stars.len());
        }
    }

    #[test]
    fn test_merge_star_value_is_order_independent() {
        let a = [(1, 1), (2, 3), (4, 2)];
        let b = [(1, 2), (2, 1), (5, 3)];

        let ab = merge_progress(&local(&a), &chain(&b));
        let ba = merge_progress(&local(&b), &chain(&a));

        assert_eq!(ab.level_stars, ba.level_stars);
    }

    #[test]
    fn test_merge_empty_unlocks_first_level() {
        let merged = merge_progress(&LocalProgress::default(), &OnChainProgress::default());

        assert!(merged.level_stars.is_empty());
        assert_eq!(merged.highest_unlocked_level, 1);
    }

    #[test]
    fn test_on_chain_to_local_empty() {
        let converted = on_chain_to_local(&OnChainProgress::default());

        assert!(converted.completed_levels.is_empty());
        assert_eq!(converted.highest_unlocked_level, 1);
        assert!(converted.sound_enabled);
    }

    #[test]
    fn test_on_chain_to_local_caps_unlock() {
        let converted = on_chain_to_local(&chain(&[(50, 2), (100, 1)]));

        assert_eq!(converted.highest_unlocked_level, 100);
        assert_eq!(converted.completed_levels.len(), 2);
    }

    #[test]
    fn test_local_to_on_chain_totals() {
        let converted = local_to_on_chain(&local(&[(1, 3), (2, 2), (9, 1)]));

        assert_eq!(converted.total, 6);
        assert_eq!(converted.updated, 0);
        assert_eq!(converted.level_stars.len(), 3);
    }

    #[test]
    fn test_round_trip_is_stable() {
        let mut rng = seeded_rng("round-trip");

        for _ in 0..100 {
            let original = chain(&random_stars(&mut rng));
            let back = local_to_on_chain(&on_chain_to_local(&original));

            assert_eq!(back.level_stars, original.level_stars);
            assert_eq!(back.total, original.total);
        }
    }

    #[test]
    fn test_bounds_filtering() {
        let mut dirty = LevelStars::from([(1, 2), (3, 3)]);
        dirty.insert(0, 2);
        dirty.insert(101, 1);
        dirty.insert(-4, 3);
        dirty.insert(5, 0);
        dirty.insert(6, 4);

        let progress = LocalProgress {
            completed_levels: dirty.keys().copied().collect(),
            level_stars: dirty.clone(),
            ..LocalProgress::default()
        };
        let snapshot = OnChainProgress {
            total: 0,
            updated: 0,
            level_stars: dirty,
        };
        let expected = LevelStars::from([(1, 2), (3, 3)]);

        let on_chain = local_to_on_chain(&progress);
        assert_eq!(on_chain.level_stars, expected);
        assert_eq!(on_chain.total, 5);

        let converted = on_chain_to_local(&snapshot);
        assert_eq!(converted.level_stars, expected);
        assert_eq!(converted.highest_unlocked_level, 4);

        let batch = extract_batch_update_data(&progress);
        assert_eq!(batch.levels, vec![1, 3]);
        assert_eq!(batch.stars, vec![2, 3]);
    }

    #[test]
    fn test_extraction_is_ascending() {
        let batch = extract_batch_update_data(&local(&[(5, 1), (1, 3), (2, 2)]));

        assert_eq!(batch.levels, vec![1, 2, 5]);
        assert_eq!(batch.stars, vec![3, 2, 1]);
    }

    #[test]
    fn test_has_completed_levels() {
        assert!(!has_completed_levels(&LocalProgress::default()));
        assert!(has_completed_levels(&local(&[(1, 1)])));
    }

    #[test]
    fn test_equivalence_ignores_preferences() {
        let a = local(&[(1, 3), (2, 1)]);
        let mut b = local(&[(2, 1), (1, 3)]);
        b.sound_enabled = false;

        assert!(is_progress_equivalent(&a, &b));
    }

    #[test]
    fn test_equivalence_detects_differences() {
        let a = local(&[(1, 3), (2, 1)]);

        assert!(!is_progress_equivalent(&a, &local(&[(1, 3)])));
        assert!(!is_progress_equivalent(&a, &local(&[(1, 3), (2, 2)])));
        assert!(!is_progress_equivalent(&a, &local(&[(1, 3), (3, 1)])));
    }

    #[test]
    fn test_unsaved_without_snapshot() {
        let delta = get_unsaved_levels(&local(&[(1, 3), (5, 1)]), None);

        assert_eq!(delta.levels, vec![1, 5]);
        assert_eq!(delta.stars, vec![3, 1]);
        assert_eq!(delta.count, 2);
    }

    #[test]
    fn test_unsaved_fully_synced() {
        let delta = get_unsaved_levels(&local(&[(1, 3)]), Some(&chain(&[(1, 3)])));

        assert_eq!(delta.count, 0);
        assert!(delta.levels.is_empty());
    }

    #[test]
    fn test_unsaved_is_one_directional() {
        let delta = get_unsaved_levels(
            &local(&[(1, 2), (2, 3), (3, 1)]),
            Some(&chain(&[(1, 3), (2, 1), (3, 1), (4, 3)])),
        );

        // level 1 is better on-chain, level 3 ties, level 4 is chain-only
        assert_eq!(delta.levels, vec![2]);
        assert_eq!(delta.stars, vec![3]);
        assert_eq!(delta.count, 1);
    }

    #[test]
    fn test_unsaved_delta_converges() {
        let mut rng = seeded_rng("delta-convergence");

        for _ in 0..200 {
            let l = local(&random_stars(&mut rng));
            let c = chain(&random_stars(&mut rng));

            let delta = get_unsaved_levels(&l, Some(&c));
            let mut applied = c.clone();
            for (&level, &stars) in delta.levels.iter().zip(delta.stars.iter()) {
                applied.level_stars.insert(level, stars);
            }

            assert_eq!(get_unsaved_levels(&l, Some(&applied)).count, 0);
        }
    }

    #[test]
    fn test_has_more_progress_on_blockchain() {
        let l = local(&[(1, 2), (2, 3)]);

        assert!(!has_more_progress_on_blockchain(&l, &chain(&[(1, 2), (2, 1)])));
        assert!(has_more_progress_on_blockchain(&l, &chain(&[(1, 3)])));
        // absent locally counts as zero
        assert!(has_more_progress_on_blockchain(&l, &chain(&[(7, 1)])));
        assert!(!has_more_progress_on_blockchain(&l, &OnChainProgress::default()));
    }

    #[test]
    fn test_sync_status() {
        let l = local(&[(1, 2), (2, 3)]);

        assert_eq!(sync_status(&l, None), SyncStatus::NotConnected);
        assert_eq!(sync_status(&l, Some(&chain(&[(1, 2), (2, 3)]))), SyncStatus::Synced);
        assert_eq!(sync_status(&l, Some(&chain(&[(1, 2), (2, 3), (3, 1)]))), SyncStatus::ChainAhead);

        match sync_status(&l, Some(&chain(&[(1, 2)]))) {
            SyncStatus::LocalAhead { unsaved } => assert_eq!(unsaved.levels, vec![2]),
            other => panic!("expected LocalAhead, got {:?}", other),
        }

        match sync_status(&l, Some(&chain(&[(1, 3)]))) {
            SyncStatus::Diverged { unsaved } => assert_eq!(unsaved.levels, vec![2]),
            other => panic!("expected Diverged, got {:?}", other),
        }
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let l = local(&[(1, 2), (4, 1)]);
        let c = chain(&[(1, 3), (2, 2)]);
        let (l_before, c_before) = (l.clone(), c.clone());

        let _ = merge_progress(&l, &c);
        let _ = get_unsaved_levels(&l, Some(&c));
        let _ = local_to_on_chain(&l);
        let _ = on_chain_to_local(&c);

        assert_eq!(l, l_before);
        assert_eq!(c, c_before);
    }
}
