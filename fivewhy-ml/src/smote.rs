//! SMOTE: synthetic minority oversampling
//!
//! Every class is grown to the size of the largest class by interpolating
//! between a sample and one of its `k` nearest same-class neighbours. `k` is
//! capped at one below the smallest class size; when that leaves no
//! neighbours the data is returned unchanged.

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Smote {
    pub k_neighbors: usize,
}

impl Default for Smote {
    fn default() -> Self {
        Self { k_neighbors: 3 }
    }
}

fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

impl Smote {
    /// Neighbour count actually used for the given class sizes
    pub fn effective_k(&self, class_counts: &[usize]) -> usize {
        let smallest = class_counts.iter().copied().filter(|&c| c > 0).min().unwrap_or(0);
        self.k_neighbors.min(smallest.saturating_sub(1))
    }

    /// Returns the original rows followed by synthetic rows
    pub fn resample<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        rng: &mut R,
    ) -> (Array2<f64>, Vec<usize>) {
        let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (i, &class) in y.iter().enumerate() {
            if class < n_classes {
                members[class].push(i);
            }
        }
        let counts: Vec<usize> = members.iter().map(Vec::len).collect();
        let majority = counts.iter().copied().max().unwrap_or(0);
        let k = self.effective_k(&counts);

        if k == 0 {
            debug!("SMOTE skipped: smallest class has a single sample");
            return (x.clone(), y.to_vec());
        }

        let mut synthetic: Vec<(Vec<f64>, usize)> = Vec::new();
        for (class, indices) in members.iter().enumerate() {
            let count = indices.len();
            if count == 0 || count >= majority {
                continue;
            }

            // k nearest same-class neighbours of every class member
            let neighbours: Vec<Vec<usize>> = indices
                .iter()
                .map(|&i| {
                    let mut by_distance: Vec<(f64, usize)> = indices
                        .iter()
                        .filter(|&&j| j != i)
                        .map(|&j| (squared_distance(x.row(i), x.row(j)), j))
                        .collect();
                    by_distance.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                    by_distance.into_iter().take(k).map(|(_, j)| j).collect()
                })
                .collect();

            for _ in 0..(majority - count) {
                let base = rng.gen_range(0..count);
                let neighbour = neighbours[base][rng.gen_range(0..neighbours[base].len())];
                let gap: f64 = rng.gen();
                let origin = x.row(indices[base]);
                let target = x.row(neighbour);
                let row = origin
                    .iter()
                    .zip(target.iter())
                    .map(|(a, b)| a + gap * (b - a))
                    .collect();
                synthetic.push((row, class));
            }
        }

        debug!("SMOTE generated {} synthetic samples", synthetic.len());

        let n_original = x.nrows();
        let mut out = Array2::<f64>::zeros((n_original + synthetic.len(), x.ncols()));
        out.slice_mut(ndarray::s![..n_original, ..]).assign(x);
        let mut labels = y.to_vec();
        for (offset, (row, class)) in synthetic.into_iter().enumerate() {
            for (j, value) in row.into_iter().enumerate() {
                out[[n_original + offset, j]] = value;
            }
            labels.push(class);
        }

        (out, labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_effective_k_capped_below_smallest_class() {
        let smote = Smote { k_neighbors: 3 };
        assert_eq!(smote.effective_k(&[10, 3]), 2);
        assert_eq!(smote.effective_k(&[10, 10]), 3);
        assert_eq!(smote.effective_k(&[10, 1]), 0);
    }

    #[test]
    fn test_balances_classes_with_interpolated_rows() {
        let x = array![[0.0, 0.0], [0.1, 0.0], [0.2, 0.0], [0.3, 0.0], [1.0, 1.0], [1.0, 2.0]];
        let y = vec![0, 0, 0, 0, 1, 1];
        let mut rng = StdRng::seed_from_u64(7);

        let (xr, yr) = Smote::default().resample(&x, &y, 2, &mut rng);

        assert_eq!(xr.nrows(), 8);
        assert_eq!(yr.iter().filter(|&&c| c == 1).count(), 4);
        for i in 6..8 {
            // Synthetic minority rows lie on the segment between the two minority samples
            assert_eq!(xr[[i, 0]], 1.0);
            assert!(xr[[i, 1]] >= 1.0 && xr[[i, 1]] <= 2.0);
        }
        assert_eq!(xr.slice(ndarray::s![..6, ..]), x);
    }

    #[test]
    fn test_single_sample_class_is_left_alone() {
        let x = array![[0.0], [1.0], [5.0]];
        let y = vec![0, 0, 1];
        let mut rng = StdRng::seed_from_u64(1);

        let (xr, yr) = Smote::default().resample(&x, &y, 2, &mut rng);
        assert_eq!(xr, x);
        assert_eq!(yr, y);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let x = array![[0.0], [0.5], [1.0], [4.0], [6.0]];
        let y = vec![0, 0, 0, 1, 1];
        let a = Smote::default().resample(&x, &y, 2, &mut StdRng::seed_from_u64(3));
        let b = Smote::default().resample(&x, &y, 2, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
