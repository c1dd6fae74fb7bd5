//! Softmax gradient boosting over histogram regression trees
//!
//! One regression tree per class per round fits the Newton step of the
//! multinomial log-loss. The same machinery serves both boosting candidates;
//! they differ in split criterion and hyper-parameters.

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use super::tree::SplitCriterion;
use super::tree::{grow_regression_tree, FeatureBins, Tree, TreeLimits};
use super::{class_counts, softmax, ModelError};

const MAX_BINS: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows drawn (without replacement) for every round
    pub subsample: f64,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub criterion: SplitCriterion,
}

impl BoostingParams {
    pub fn gradient_boosting() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.05,
            max_depth: 7,
            subsample: 0.8,
            min_samples_split: 5,
            min_samples_leaf: 2,
            criterion: SplitCriterion::FirstOrder,
        }
    }

    pub fn xgboost() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 6,
            subsample: 0.8,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: SplitCriterion::SecondOrder {
                lambda: 1.0,
                gamma: 0.0,
                min_child_weight: 1.0,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedTrees {
    n_features: usize,
    learning_rate: f64,
    /// Log class priors
    init: Vec<f64>,
    /// rounds × classes
    rounds: Vec<Vec<Tree<f64>>>,
}

impl BoostedTrees {
    pub fn fit<R: Rng>(
        params: &BoostingParams,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        if !(params.subsample > 0.0 && params.subsample <= 1.0) {
            return Err(ModelError::InvalidParameter(format!(
                "subsample must be in (0, 1], got {}",
                params.subsample
            )));
        }
        if params.learning_rate <= 0.0 || !params.learning_rate.is_finite() {
            return Err(ModelError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                params.learning_rate
            )));
        }

        let n = x.nrows();
        let counts = class_counts(y, n_classes);
        let init: Vec<f64> = counts
            .iter()
            .map(|&c| (c as f64 / n as f64).max(1e-12).ln())
            .collect();

        let bins = FeatureBins::fit(x, MAX_BINS);
        let limits = TreeLimits {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split.max(2),
            min_samples_leaf: params.min_samples_leaf.max(1),
        };
        let draw = ((params.subsample * n as f64).round() as usize).clamp(1, n);

        let mut raw = Array2::<f64>::zeros((n, n_classes));
        for mut row in raw.rows_mut() {
            row.iter_mut().zip(&init).for_each(|(r, i)| *r = *i);
        }

        let mut rounds = Vec::with_capacity(params.n_estimators);
        let mut gradients = vec![0.0; n];
        let mut hessians = vec![0.0; n];
        for _ in 0..params.n_estimators {
            let probabilities: Vec<Vec<f64>> = raw
                .rows()
                .into_iter()
                .map(|row| softmax(&row.to_vec()))
                .collect();

            let rows: Vec<usize> = if draw < n {
                let mut rows = rand::seq::index::sample(rng, n, draw).into_vec();
                rows.sort_unstable();
                rows
            } else {
                (0..n).collect()
            };

            let mut trees = Vec::with_capacity(n_classes);
            for class in 0..n_classes {
                for i in 0..n {
                    let p = probabilities[i][class];
                    let target = if y[i] == class { 1.0 } else { 0.0 };
                    gradients[i] = p - target;
                    hessians[i] = (p * (1.0 - p)).max(1e-16);
                }
                trees.push(grow_regression_tree(
                    &bins,
                    rows.clone(),
                    &gradients,
                    &hessians,
                    limits,
                    params.criterion,
                ));
            }

            for (i, mut row) in raw.rows_mut().into_iter().enumerate() {
                let sample = x.row(i);
                for (class, tree) in trees.iter().enumerate() {
                    row[class] += params.learning_rate * tree.leaf(sample);
                }
            }
            rounds.push(trees);
        }

        Ok(Self {
            n_features: x.ncols(),
            learning_rate: params.learning_rate,
            init,
            rounds,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.init.len()
    }

    pub fn n_rounds(&self) -> usize {
        self.rounds.len()
    }

    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut raw = self.init.clone();
        for trees in &self.rounds {
            for (score, tree) in raw.iter_mut().zip(trees) {
                *score += self.learning_rate * tree.leaf(row);
            }
        }
        softmax(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    fn data() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 1.0],
            [0.1, 1.0],
            [0.2, 0.0],
            [0.3, 0.0],
            [0.9, 1.0],
            [1.0, 0.0],
            [1.1, 1.0],
            [1.2, 0.0]
        ];
        (x, vec![0, 0, 0, 0, 1, 1, 1, 1])
    }

    fn check(params: BoostingParams) {
        let (x, y) = data();
        let model = BoostedTrees::fit(&params, &x, &y, 2, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(model.n_rounds(), params.n_estimators);
        for (i, &class) in y.iter().enumerate() {
            let p = model.predict_proba(x.row(i));
            assert!(p[class] > 0.5, "row {} → {:?}", i, p);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_gradient_boosting_learns_threshold() {
        check(BoostingParams {
            n_estimators: 50,
            min_samples_split: 2,
            min_samples_leaf: 1,
            subsample: 1.0,
            ..BoostingParams::gradient_boosting()
        });
    }

    #[test]
    fn test_xgboost_learns_threshold() {
        check(BoostingParams {
            n_estimators: 50,
            subsample: 1.0,
            ..BoostingParams::xgboost()
        });
    }

    #[test]
    fn test_starts_from_class_priors() {
        let (x, y) = data();
        let params = BoostingParams {
            n_estimators: 0,
            ..BoostingParams::xgboost()
        };
        let model = BoostedTrees::fit(&params, &x, &y, 2, &mut StdRng::seed_from_u64(0)).unwrap();
        let p = model.predict_proba(x.row(0));
        assert!((p[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_subsample() {
        let (x, y) = data();
        let params = BoostingParams {
            subsample: 0.0,
            ..BoostingParams::gradient_boosting()
        };
        assert!(BoostedTrees::fit(&params, &x, &y, 2, &mut StdRng::seed_from_u64(0)).is_err());
    }
}
