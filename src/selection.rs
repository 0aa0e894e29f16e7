//! Reproducible client sampling.
//!
//! The sampler is reseeded with the round index on every call, so a given
//! round always picks the same subset from the same pool. Experiments that
//! share round indices therefore also share their selections.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

/// Pick `min(target_count, pool_len)` distinct indices into a pool of
/// `pool_len` candidates, seeded by `round`.
///
/// Indices are returned in the order they were drawn.
pub fn sample_indices(round: u64, pool_len: usize, target_count: usize) -> Vec<usize> {
    let amount = target_count.min(pool_len);
    if amount == 0 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(round);
    index::sample(&mut rng, pool_len, amount).into_vec()
}
