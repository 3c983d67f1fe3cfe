use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::debug;

use crate::error::CaptionError;
use crate::strategy::Strategy;

const MIN_SUBSET: usize = 5;

/// Per-strategy memory of seeds that have already been used as a request's
/// base seed. Sets only grow for the lifetime of the process.
#[derive(Debug, Default)]
pub struct UsageTracker {
    used: Mutex<HashMap<Strategy, HashSet<String>>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draws a fresh random subset of `pool`, prefers members not yet used for
    /// `strategy`, and marks the pick as used. Once every member of the subset
    /// has been used the whole subset is eligible again.
    ///
    /// The draw, membership check and insert all run under a single lock.
    pub fn pick_seed<R: Rng + ?Sized>(
        &self,
        strategy: Strategy,
        pool: &[String],
        rng: &mut R,
    ) -> Result<String, CaptionError> {
        if pool.is_empty() {
            return Err(CaptionError::InvalidPool(strategy));
        }

        let subset_len = subset_size(pool.len());
        let subset: Vec<&String> = pool.choose_multiple(rng, subset_len).collect();

        let mut used = self.lock();
        let seen = used.entry(strategy).or_default();

        let fresh: Vec<&String> = subset
            .iter()
            .copied()
            .filter(|seed| !seen.contains(seed.as_str()))
            .collect();

        let exhausted = fresh.is_empty();
        let candidates = if exhausted { &subset } else { &fresh };
        let chosen = candidates
            .choose(rng)
            .map(|seed| (*seed).clone())
            .ok_or(CaptionError::InvalidPool(strategy))?;

        seen.insert(chosen.clone());
        debug!(
            strategy = strategy.as_str(),
            subset = subset_len,
            fresh = fresh.len(),
            exhausted,
            "Picked seed"
        );

        Ok(chosen)
    }

    pub fn used_count(&self, strategy: Strategy) -> usize {
        self.lock().get(&strategy).map_or(0, HashSet::len)
    }

    pub fn is_used(&self, strategy: Strategy, seed: &str) -> bool {
        self.lock()
            .get(&strategy)
            .is_some_and(|seen| seen.contains(seed))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Strategy, HashSet<String>>> {
        self.used
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn subset_size(pool_len: usize) -> usize {
    pool_len.min(MIN_SUBSET.max(pool_len / 3))
}
