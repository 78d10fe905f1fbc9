//! Seeded row splits.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Shuffle `0..n` with a seeded generator.
pub fn shuffled_indices(n: usize, seed: u64) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    idx.shuffle(&mut rng);
    idx
}

/// Split `0..n` into (train, test) rows.
///
/// The test share is `round(n * test_fraction)`, kept within `1..n` so that
/// both sides are non-empty whenever `n >= 2`. Each side is returned sorted.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    if n < 2 {
        return ((0..n).collect(), Vec::new());
    }
    let n_test = ((n as f64) * test_fraction).round() as usize;
    let n_test = n_test.clamp(1, n - 1);
    let idx = shuffled_indices(n, seed);
    let mut test = idx[..n_test].to_vec();
    let mut train = idx[n_test..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    (train, test)
}

/// Assign `0..n` to `k` folds of near-equal size. Returns the held-out rows
/// of each fold, sorted. `k` is capped at `n`.
pub fn kfold(n: usize, k: usize, seed: u64) -> Vec<Vec<usize>> {
    let k = k.clamp(1, n.max(1));
    let idx = shuffled_indices(n, seed);
    let mut folds = vec![Vec::new(); k];
    for (pos, row) in idx.into_iter().enumerate() {
        folds[pos % k].push(row);
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}

/// Rows of `0..n` that are not in `held_out` (which must be sorted).
pub fn complement(n: usize, held_out: &[usize]) -> Vec<usize> {
    (0..n).filter(|r| held_out.binary_search(r).is_err()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes_and_disjoint() {
        let (train, test) = train_test_split(10, 0.3, 7);
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 7);
        assert!(test.iter().all(|t| !train.contains(t)));
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(train_test_split(50, 0.2, 1), train_test_split(50, 0.2, 1));
    }

    #[test]
    fn test_split_never_empties_a_side() {
        let (train, test) = train_test_split(3, 0.01, 0);
        assert_eq!((train.len(), test.len()), (2, 1));
        let (train, test) = train_test_split(3, 0.99, 0);
        assert_eq!((train.len(), test.len()), (1, 2));
    }

    #[test]
    fn test_kfold_partitions_rows() {
        let folds = kfold(11, 3, 5);
        assert_eq!(folds.len(), 3);
        let mut all: Vec<usize> = folds.iter().flatten().copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
        assert_eq!(complement(11, &folds[0]).len(), 11 - folds[0].len());
    }
}
