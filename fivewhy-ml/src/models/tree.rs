//! Binary decision trees
//!
//! Trees are stored as flat node arrays. A sample goes left at a split when
//! `value <= threshold`. Classification trees (Gini, exact thresholds) back
//! the random forest; regression trees over histogram bins back boosting.

use ndarray::{Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node<L> {
    Leaf(L),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree<L> {
    nodes: Vec<Node<L>>,
}

impl<L> Tree<L> {
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk<L>(nodes: &[Node<L>], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf(_) => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Leaf reached by `sample`
    pub fn leaf(&self, sample: ArrayView1<'_, f64>) -> &L {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if sample[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Growth limits shared by both tree kinds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeLimits {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

// ----------------------------------------------------------------------------
// Classification trees
// ----------------------------------------------------------------------------

/// Training sample of a classification tree
#[derive(Debug, Clone, Copy)]
pub struct WeightedSample {
    pub row: usize,
    pub class: usize,
    pub weight: f64,
}

/// Grow a Gini tree whose leaves hold class probability vectors
///
/// At every node `max_features` randomly ordered non-constant features are
/// searched (all of them when `None`).
pub fn grow_classification_tree<R: Rng>(
    x: &Array2<f64>,
    samples: Vec<WeightedSample>,
    n_classes: usize,
    limits: TreeLimits,
    max_features: Option<usize>,
    rng: &mut R,
) -> Tree<Vec<f64>> {
    let mut builder = ClassificationBuilder {
        x,
        n_classes,
        limits,
        max_features,
        rng,
        nodes: Vec::new(),
    };
    builder.build(samples, 0);
    Tree {
        nodes: builder.nodes,
    }
}

struct ClassificationBuilder<'a, R> {
    x: &'a Array2<f64>,
    n_classes: usize,
    limits: TreeLimits,
    max_features: Option<usize>,
    rng: &'a mut R,
    nodes: Vec<Node<Vec<f64>>>,
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl<'a, R: Rng> ClassificationBuilder<'a, R> {
    fn distribution(&self, samples: &[WeightedSample]) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_classes];
        for s in samples {
            totals[s.class] += s.weight;
        }
        totals
    }

    fn build(&mut self, samples: Vec<WeightedSample>, depth: usize) -> usize {
        let totals = self.distribution(&samples);
        let weight: f64 = totals.iter().sum();
        let probabilities: Vec<f64> = if weight > 0.0 {
            totals.iter().map(|t| t / weight).collect()
        } else {
            vec![1.0 / self.n_classes as f64; self.n_classes]
        };

        let index = self.nodes.len();
        self.nodes.push(Node::Leaf(probabilities));

        let pure = totals.iter().filter(|&&t| t > 0.0).count() <= 1;
        if pure || depth >= self.limits.max_depth || samples.len() < self.limits.min_samples_split {
            return index;
        }

        let Some(choice) = self.best_split(&samples, &totals) else {
            return index;
        };

        let (left, right): (Vec<WeightedSample>, Vec<WeightedSample>) = samples
            .into_iter()
            .partition(|s| self.x[[s.row, choice.feature]] <= choice.threshold);

        let left = self.build(left, depth + 1);
        let right = self.build(right, depth + 1);
        self.nodes[index] = Node::Split {
            feature: choice.feature,
            threshold: choice.threshold,
            left,
            right,
        };
        index
    }

    fn best_split(&mut self, samples: &[WeightedSample], totals: &[f64]) -> Option<SplitChoice> {
        let n_features = self.x.ncols();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(&mut *self.rng);
        let budget = self.max_features.unwrap_or(n_features).max(1);

        let parent_weight: f64 = totals.iter().sum();
        let parent_score = totals.iter().map(|t| t * t).sum::<f64>() / parent_weight;

        let mut best: Option<SplitChoice> = None;
        let mut searched = 0;
        let mut column: Vec<(f64, usize, f64)> = Vec::with_capacity(samples.len());

        for feature in features {
            if searched >= budget {
                break;
            }
            column.clear();
            column.extend(
                samples
                    .iter()
                    .map(|s| (self.x[[s.row, feature]], s.class, s.weight)),
            );
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let (first, last) = (column[0].0, column[column.len() - 1].0);
            if first == last {
                continue;
            }
            searched += 1;

            let mut left = vec![0.0; self.n_classes];
            let mut left_weight = 0.0;
            let n = column.len();
            for i in 0..n - 1 {
                let (value, class, weight) = column[i];
                left[class] += weight;
                left_weight += weight;

                let next = column[i + 1].0;
                if value == next {
                    continue;
                }
                if i + 1 < self.limits.min_samples_leaf || n - i - 1 < self.limits.min_samples_leaf {
                    continue;
                }

                let right_weight = parent_weight - left_weight;
                if left_weight <= 0.0 || right_weight <= 0.0 {
                    continue;
                }
                let left_score = left.iter().map(|t| t * t).sum::<f64>() / left_weight;
                let right_score = totals
                    .iter()
                    .zip(&left)
                    .map(|(t, l)| (t - l) * (t - l))
                    .sum::<f64>()
                    / right_weight;
                let gain = left_score + right_score - parent_score;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitChoice {
                        feature,
                        threshold: midpoint(value, next),
                        gain,
                    });
                }
            }
        }

        best
    }
}

fn midpoint(low: f64, high: f64) -> f64 {
    let mid = low + (high - low) / 2.0;
    if mid >= high {
        low
    } else {
        mid
    }
}

// ----------------------------------------------------------------------------
// Histogram regression trees
// ----------------------------------------------------------------------------

/// Per-feature candidate thresholds, at most `max_bins - 1` each
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBins {
    thresholds: Vec<Vec<f64>>,
    /// Column-major bin index of every training value
    binned: Vec<Vec<u16>>,
}

impl FeatureBins {
    pub fn fit(x: &Array2<f64>, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, u16::MAX as usize);
        let mut thresholds = Vec::with_capacity(x.ncols());
        let mut binned = Vec::with_capacity(x.ncols());

        for column in x.columns() {
            let mut values: Vec<f64> = column.iter().copied().collect();
            values.sort_by(f64::total_cmp);
            values.dedup();

            let midpoints: Vec<f64> = values.windows(2).map(|w| midpoint(w[0], w[1])).collect();
            let mut cuts: Vec<f64> = if midpoints.len() < max_bins {
                midpoints
            } else {
                let step = midpoints.len() as f64 / max_bins as f64;
                (1..max_bins)
                    .map(|j| midpoints[((j as f64 * step) as usize).min(midpoints.len() - 1)])
                    .collect()
            };
            cuts.dedup();

            let bins = column
                .iter()
                .map(|v| cuts.partition_point(|t| t < v) as u16)
                .collect();
            thresholds.push(cuts);
            binned.push(bins);
        }

        Self { thresholds, binned }
    }

    pub fn n_thresholds(&self, feature: usize) -> usize {
        self.thresholds[feature].len()
    }
}

/// Split scoring for gradient-boosted trees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SplitCriterion {
    /// Squared-error reduction on the gradients
    FirstOrder,
    /// Regularized second-order gain
    SecondOrder {
        lambda: f64,
        gamma: f64,
        min_child_weight: f64,
    },
}

impl SplitCriterion {
    fn lambda(&self) -> f64 {
        match self {
            SplitCriterion::FirstOrder => 0.0,
            SplitCriterion::SecondOrder { lambda, .. } => *lambda,
        }
    }

    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        let denominator = h + self.lambda();
        if denominator < 1e-12 {
            0.0
        } else {
            -g / denominator
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Stats {
    g: f64,
    h: f64,
    n: usize,
}

impl Stats {
    fn minus(self, other: Stats) -> Stats {
        Stats {
            g: self.g - other.g,
            h: self.h - other.h,
            n: self.n - other.n,
        }
    }
}

/// Grow a regression tree fitting Newton steps for `gradients`/`hessians`
/// over the training `rows` (indices into the binned matrix)
pub fn grow_regression_tree(
    bins: &FeatureBins,
    rows: Vec<usize>,
    gradients: &[f64],
    hessians: &[f64],
    limits: TreeLimits,
    criterion: SplitCriterion,
) -> Tree<f64> {
    let mut builder = RegressionBuilder {
        bins,
        gradients,
        hessians,
        limits,
        criterion,
        nodes: Vec::new(),
    };
    builder.build(rows, 0);
    Tree {
        nodes: builder.nodes,
    }
}

struct RegressionBuilder<'a> {
    bins: &'a FeatureBins,
    gradients: &'a [f64],
    hessians: &'a [f64],
    limits: TreeLimits,
    criterion: SplitCriterion,
    nodes: Vec<Node<f64>>,
}

impl<'a> RegressionBuilder<'a> {
    fn stats(&self, rows: &[usize]) -> Stats {
        rows.iter().fold(Stats::default(), |acc, &r| Stats {
            g: acc.g + self.gradients[r],
            h: acc.h + self.hessians[r],
            n: acc.n + 1,
        })
    }

    fn gain(&self, left: Stats, right: Stats, parent: Stats) -> Option<f64> {
        if left.n < self.limits.min_samples_leaf || right.n < self.limits.min_samples_leaf {
            return None;
        }
        let gain = match self.criterion {
            SplitCriterion::FirstOrder => {
                left.g * left.g / left.n as f64 + right.g * right.g / right.n as f64
                    - parent.g * parent.g / parent.n as f64
            }
            SplitCriterion::SecondOrder {
                lambda,
                gamma,
                min_child_weight,
            } => {
                if left.h < min_child_weight || right.h < min_child_weight {
                    return None;
                }
                0.5 * (left.g * left.g / (left.h + lambda) + right.g * right.g / (right.h + lambda)
                    - parent.g * parent.g / (parent.h + lambda))
                    - gamma
            }
        };
        (gain > 1e-12).then_some(gain)
    }

    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let parent = self.stats(&rows);
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf(self.criterion.leaf_value(parent.g, parent.h)));

        if depth >= self.limits.max_depth || rows.len() < self.limits.min_samples_split {
            return index;
        }

        // (feature, bin, gain)
        let mut best: Option<(usize, usize, f64)> = None;
        let mut histogram: Vec<Stats> = Vec::new();
        for feature in 0..self.bins.thresholds.len() {
            let n_cuts = self.bins.n_thresholds(feature);
            if n_cuts == 0 {
                continue;
            }
            histogram.clear();
            histogram.resize(n_cuts + 1, Stats::default());
            let column = &self.bins.binned[feature];
            for &r in &rows {
                let cell = &mut histogram[column[r] as usize];
                cell.g += self.gradients[r];
                cell.h += self.hessians[r];
                cell.n += 1;
            }

            let mut left = Stats::default();
            for (bin, cell) in histogram.iter().take(n_cuts).enumerate() {
                left.g += cell.g;
                left.h += cell.h;
                left.n += cell.n;
                if left.n == 0 || left.n == parent.n {
                    continue;
                }
                if let Some(gain) = self.gain(left, parent.minus(left), parent) {
                    if best.map_or(true, |(_, _, b)| gain > b) {
                        best = Some((feature, bin, gain));
                    }
                }
            }
        }

        let Some((feature, bin, _)) = best else {
            return index;
        };

        let column = &self.bins.binned[feature];
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| (column[r] as usize) <= bin);

        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[index] = Node::Split {
            feature,
            threshold: self.bins.thresholds[feature][bin],
            left,
            right,
        };
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::{rngs::StdRng, SeedableRng};

    fn limits() -> TreeLimits {
        TreeLimits {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    fn samples(y: &[usize]) -> Vec<WeightedSample> {
        y.iter()
            .enumerate()
            .map(|(row, &class)| WeightedSample {
                row,
                class,
                weight: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_classification_tree_separates_classes() {
        let x = array![[0.0, 5.0], [1.0, 5.0], [2.0, 5.0], [10.0, 5.0], [11.0, 5.0]];
        let y = [0, 0, 0, 1, 1];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = grow_classification_tree(&x, samples(&y), 2, limits(), None, &mut rng);

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.leaf(x.row(0)), &vec![1.0, 0.0]);
        assert_eq!(tree.leaf(x.row(4)), &vec![0.0, 1.0]);
        assert_eq!(tree.leaf(array![6.0, 0.0].view()), &vec![1.0, 0.0]);
    }

    #[test]
    fn test_constant_features_yield_single_leaf() {
        let x = array![[1.0], [1.0], [1.0]];
        let mut rng = StdRng::seed_from_u64(0);
        let tree = grow_classification_tree(&x, samples(&[0, 1, 1]), 2, limits(), None, &mut rng);

        assert_eq!(tree.n_nodes(), 1);
        let leaf = tree.leaf(x.row(0));
        assert!((leaf[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_max_depth_zero_is_a_stump_leaf() {
        let x = array![[0.0], [1.0]];
        let mut rng = StdRng::seed_from_u64(0);
        let limits = TreeLimits {
            max_depth: 0,
            ..limits()
        };
        let tree = grow_classification_tree(&x, samples(&[0, 1]), 2, limits, None, &mut rng);
        assert_eq!(tree.n_nodes(), 1);
    }

    #[test]
    fn test_bins_route_like_raw_values() {
        let x = array![[0.0], [0.0], [0.5], [1.0], [3.0]];
        let bins = FeatureBins::fit(&x, 32);
        assert_eq!(bins.thresholds[0], vec![0.25, 0.75, 2.0]);
        assert_eq!(bins.binned[0], vec![0, 0, 1, 2, 3]);
    }

    #[test]
    fn test_bins_are_capped() {
        let x = Array2::from_shape_fn((100, 1), |(i, _)| i as f64);
        let bins = FeatureBins::fit(&x, 8);
        assert!(bins.n_thresholds(0) <= 7);
    }

    #[test]
    fn test_regression_tree_fits_newton_steps() {
        let x = array![[0.0], [0.0], [1.0], [1.0]];
        let bins = FeatureBins::fit(&x, 32);
        let gradients = [1.0, 1.0, -1.0, -1.0];
        let hessians = [1.0; 4];

        let tree = grow_regression_tree(
            &bins,
            vec![0, 1, 2, 3],
            &gradients,
            &hessians,
            limits(),
            SplitCriterion::FirstOrder,
        );
        assert_eq!(*tree.leaf(x.row(0)), -1.0);
        assert_eq!(*tree.leaf(x.row(2)), 1.0);

        let regularized = grow_regression_tree(
            &bins,
            vec![0, 1, 2, 3],
            &gradients,
            &hessians,
            limits(),
            SplitCriterion::SecondOrder {
                lambda: 1.0,
                gamma: 0.0,
                min_child_weight: 1.0,
            },
        );
        // -2 / (2 + 1)
        assert!((*regularized.leaf(x.row(0)) + 2.0 / 3.0).abs() < 1e-12);
    }
}
