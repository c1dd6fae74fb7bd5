//! Stratified hold-out split and stratified k-fold partitioning
//!
//! Both operate on class ids and return sorted row indices. Class members
//! are shuffled with the caller's RNG, so results are fixed by the seed.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

/// A class too small to appear on both sides of a split
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("class {class} has {count} sample(s), at least 2 are needed to stratify")]
pub struct SplitError {
    pub class: usize,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

fn members_by_class<R: Rng>(y: &[usize], n_classes: usize, rng: &mut R) -> Vec<Vec<usize>> {
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (i, &class) in y.iter().enumerate() {
        if class < n_classes {
            members[class].push(i);
        }
    }
    for rows in members.iter_mut() {
        rows.shuffle(rng);
    }
    members
}

/// Hold out `test_fraction` of every class
///
/// Each class contributes `round(fraction · count)` rows to the test side,
/// clamped so both sides receive at least one row.
pub fn stratified_split<R: Rng>(
    y: &[usize],
    n_classes: usize,
    test_fraction: f64,
    rng: &mut R,
) -> Result<Split, SplitError> {
    let members = members_by_class(y, n_classes, rng);

    let mut train = Vec::with_capacity(y.len());
    let mut test = Vec::new();
    for (class, rows) in members.into_iter().enumerate() {
        let count = rows.len();
        if count == 0 {
            continue;
        }
        if count < 2 {
            return Err(SplitError { class, count });
        }
        let n_test = ((test_fraction * count as f64).round() as usize).clamp(1, count - 1);
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(Split { train, test })
}

/// `k` folds with every class spread round-robin across them
///
/// Callers pick `k` no larger than the smallest class so every fold sees
/// every class.
pub fn stratified_k_fold<R: Rng>(y: &[usize], n_classes: usize, k: usize, rng: &mut R) -> Vec<Split> {
    let k = k.max(1);
    let members = members_by_class(y, n_classes, rng);

    let mut fold_of = vec![0usize; y.len()];
    let mut next = 0;
    for rows in &members {
        for &row in rows {
            fold_of[row] = next % k;
            next += 1;
        }
    }

    (0..k)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..y.len()).partition(|&row| fold_of[row] == fold);
            Split { train, test }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_split_keeps_every_class_on_both_sides() {
        let y = vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2];
        let split = stratified_split(&y, 3, 0.2, &mut StdRng::seed_from_u64(42)).unwrap();

        for class in 0..3 {
            assert!(split.train.iter().any(|&i| y[i] == class));
            assert!(split.test.iter().any(|&i| y[i] == class));
        }
        // 6 → 1, 4 → 1, 2 → 1
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len() + split.test.len(), y.len());
    }

    #[test]
    fn test_split_rejects_singleton_class() {
        let y = vec![0, 0, 0, 1];
        let err = stratified_split(&y, 2, 0.2, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert_eq!(err, SplitError { class: 1, count: 1 });
    }

    #[test]
    fn test_split_is_deterministic() {
        let y: Vec<usize> = (0..40).map(|i| i % 3).collect();
        let a = stratified_split(&y, 3, 0.2, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = stratified_split(&y, 3, 0.2, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_k_fold_partitions_rows() {
        let y = vec![0, 0, 0, 0, 0, 0, 1, 1, 1];
        let folds = stratified_k_fold(&y, 2, 3, &mut StdRng::seed_from_u64(3));
        assert_eq!(folds.len(), 3);

        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..9).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 9);
            for class in 0..2 {
                assert!(fold.test.iter().any(|&i| y[i] == class));
                assert!(fold.train.iter().any(|&i| y[i] == class));
            }
        }
    }
}
