//! Axial slice selection for a pair of volumes.
//!
//! Indices are 0-based. With `e` excluded slices at each end of a volume of
//! depth `Z`, the candidate range is `[e, Z - 1 - e]`. Random draws cover the
//! whole range; the deterministic pick is its midpoint. When the exclusion
//! leaves nothing, the center slice `ceil(Z / 2) - 1` is used instead.

use crate::enums::Phase;

use rand::Rng;
use tracing::warn;

/// Result of reconciling the depths of two paired volumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlicePair {
    pub shared_depth: usize,
    pub index_a: usize,
    pub index_b: usize,
}

/// Choose an axial slice index for a volume of `depth` slices.
///
/// Only draws from `rng` when `phase` is [`Phase::Train`] and `randomize`
/// is set, so evaluation never advances the random stream.
pub fn pick_slice<R: Rng + ?Sized>(
    depth: usize,
    exclude_slices: usize,
    phase: Phase,
    randomize: bool,
    rng: &mut R,
) -> usize {
    let start = exclude_slices;
    let end = depth
        .checked_sub(1)
        .and_then(|last| last.checked_sub(exclude_slices));

    match end {
        Some(end) if end >= start => {
            if phase.is_train() && randomize {
                rng.gen_range(start..=end)
            } else {
                (start + end) / 2
            }
        }
        _ => {
            warn!(depth, exclude_slices, "exclusion covers the whole volume, using center slice");
            depth.div_ceil(2).saturating_sub(1)
        }
    }
}

/// Pick one slice against the shallower of two volumes and clamp it into
/// each volume's own range.
pub fn reconcile<R: Rng + ?Sized>(
    depth_a: usize,
    depth_b: usize,
    exclude_slices: usize,
    phase: Phase,
    randomize: bool,
    rng: &mut R,
) -> SlicePair {
    let shared_depth = depth_a.min(depth_b);
    if depth_a != depth_b {
        warn!(depth_a, depth_b, "paired volumes differ in depth");
    }
    let index = pick_slice(shared_depth, exclude_slices, phase, randomize, rng);
    SlicePair {
        shared_depth,
        index_a: index.min(depth_a.saturating_sub(1)),
        index_b: index.min(depth_b.saturating_sub(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn eval_pick_is_deterministic_midpoint() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(pick_slice(20, 2, Phase::Eval, true, &mut rng), 9);
        }
        assert_eq!(pick_slice(7, 0, Phase::Eval, false, &mut rng), 3);
        assert_eq!(pick_slice(8, 1, Phase::Eval, false, &mut rng), 3);
    }

    #[test]
    fn eval_pick_leaves_rng_untouched() {
        let mut used = ChaCha8Rng::seed_from_u64(9);
        let mut fresh = ChaCha8Rng::seed_from_u64(9);
        pick_slice(30, 3, Phase::Eval, true, &mut used);
        assert_eq!(used.r#gen::<u64>(), fresh.r#gen::<u64>());
    }

    #[test]
    fn train_pick_stays_within_exclusion_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut seen_first = false;
        let mut seen_last = false;
        for _ in 0..2000 {
            let index = pick_slice(20, 3, Phase::Train, true, &mut rng);
            assert!((3..=16).contains(&index), "index {index} out of bounds");
            seen_first |= index == 3;
            seen_last |= index == 16;
        }
        assert!(seen_first && seen_last);
    }

    #[test]
    fn train_without_randomization_uses_midpoint() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(pick_slice(20, 2, Phase::Train, false, &mut rng), 9);
    }

    #[test]
    fn oversized_exclusion_falls_back_to_center() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(pick_slice(10, 5, Phase::Train, true, &mut rng), 4);
        assert_eq!(pick_slice(9, 100, Phase::Eval, false, &mut rng), 4);
        assert_eq!(pick_slice(1, 1, Phase::Train, true, &mut rng), 0);
        assert_eq!(pick_slice(0, 0, Phase::Eval, false, &mut rng), 0);
    }

    #[test]
    fn exclusion_leaving_one_slice_picks_it() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(pick_slice(5, 2, Phase::Train, true, &mut rng), 2);
        assert_eq!(pick_slice(5, 2, Phase::Eval, true, &mut rng), 2);
    }

    #[test]
    fn reconcile_uses_shallower_depth() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            let pair = reconcile(5, 3, 0, Phase::Train, true, &mut rng);
            assert_eq!(pair.shared_depth, 3);
            assert!(pair.index_a < 5);
            assert!(pair.index_b < 3);
            assert_eq!(pair.index_a, pair.index_b);
        }
    }

    #[test]
    fn reconcile_eval_matches_pick_on_shared_depth() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let pair = reconcile(20, 18, 2, Phase::Eval, false, &mut rng);
        assert_eq!(pair.shared_depth, 18);
        assert_eq!(pair.index_a, pick_slice(18, 2, Phase::Eval, false, &mut rng));
        assert_eq!(pair.index_b, 8);
    }
}
