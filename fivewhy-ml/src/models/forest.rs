//! Random forest of Gini trees with bootstrap sampling

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::tree::{grow_classification_tree, Tree, TreeLimits, WeightedSample};
use super::{class_counts, ModelError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Reweight classes inside every bootstrap sample
    pub balanced_subsample: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            max_depth: 20,
            min_samples_split: 3,
            min_samples_leaf: 1,
            balanced_subsample: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_classes: usize,
    n_features: usize,
    trees: Vec<Tree<Vec<f64>>>,
}

impl RandomForest {
    pub fn fit<R: Rng>(
        params: &ForestParams,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        if params.n_estimators == 0 {
            return Err(ModelError::InvalidParameter("n_estimators must be positive".into()));
        }

        let n = x.nrows();
        let max_features = ((x.ncols() as f64).sqrt() as usize).max(1);
        let limits = TreeLimits {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
            min_samples_leaf: params.min_samples_leaf.max(1),
        };

        let mut trees = Vec::with_capacity(params.n_estimators);
        for _ in 0..params.n_estimators {
            let drawn: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let drawn_classes: Vec<usize> = drawn.iter().map(|&row| y[row]).collect();
            let weights = class_weights(&drawn_classes, n_classes, params.balanced_subsample);

            let samples = drawn
                .iter()
                .map(|&row| WeightedSample {
                    row,
                    class: y[row],
                    weight: weights[y[row]],
                })
                .collect();
            trees.push(grow_classification_tree(
                x,
                samples,
                n_classes,
                limits,
                Some(max_features),
                rng,
            ));
        }

        Ok(Self {
            n_classes,
            n_features: x.ncols(),
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the leaf distributions of all trees
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut probabilities = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, leaf) in probabilities.iter_mut().zip(tree.leaf(row)) {
                *p += leaf;
            }
        }
        let n = self.trees.len().max(1) as f64;
        probabilities.iter_mut().for_each(|p| *p /= n);
        probabilities
    }
}

/// Per-class weights: balanced over the classes present in `y`, or uniform
fn class_weights(y: &[usize], n_classes: usize, balanced: bool) -> Vec<f64> {
    if !balanced {
        return vec![1.0; n_classes];
    }
    let counts = class_counts(y, n_classes);
    let present = counts.iter().filter(|&&c| c > 0).count().max(1) as f64;
    let n = y.len() as f64;
    counts
        .iter()
        .map(|&c| if c == 0 { 0.0 } else { n / (present * c as f64) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    fn data() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.1],
            [0.1, 0.0],
            [0.2, 0.1],
            [0.1, 0.2],
            [1.0, 0.9],
            [0.9, 1.0],
            [1.0, 1.1],
            [1.1, 1.0]
        ];
        (x, vec![0, 0, 0, 0, 1, 1, 1, 1])
    }

    fn params() -> ForestParams {
        ForestParams {
            n_estimators: 25,
            ..Default::default()
        }
    }

    #[test]
    fn test_forest_learns_separable_data() {
        let (x, y) = data();
        let forest = RandomForest::fit(&params(), &x, &y, 2, &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(forest.n_trees(), 25);
        let low = forest.predict_proba(array![0.05, 0.05].view());
        let high = forest.predict_proba(array![1.05, 1.05].view());
        assert!(low[0] > 0.5);
        assert!(high[1] > 0.5);
        assert!((low.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_forest_is_deterministic_for_seed() {
        let (x, y) = data();
        let a = RandomForest::fit(&params(), &x, &y, 2, &mut StdRng::seed_from_u64(9)).unwrap();
        let b = RandomForest::fit(&params(), &x, &y, 2, &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_balanced_class_weights() {
        assert_eq!(class_weights(&[0, 0, 0, 1], 3, true), vec![4.0 / 6.0, 2.0, 0.0]);
        assert_eq!(class_weights(&[0, 1], 2, false), vec![1.0, 1.0]);
    }
}
