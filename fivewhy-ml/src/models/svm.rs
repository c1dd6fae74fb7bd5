//! One-vs-rest RBF kernel SVM
//!
//! Each binary machine is solved by `linfa-svm` (SMO with a Gaussian kernel).
//! Rows that are a support vector of no machine are dropped after training.
//! Probabilities are `sigmoid(2·f_k(x))` normalized over classes.

use linfa::prelude::*;
use linfa_svm::Svm;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmParams {
    pub c: f64,
    /// Kernel width; `None` uses 1 / (n_features · variance of x)
    pub gamma: Option<f64>,
    pub balanced: bool,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            balanced: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelSvm {
    gamma: f64,
    /// Retained training rows
    support: Array2<f64>,
    /// n_classes × n_support signed dual coefficients
    coefficients: Array2<f64>,
    /// Per-class decision offset
    rho: Vec<f64>,
}

fn rbf(gamma: f64, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    let distance: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * distance).exp()
}

fn scale_gamma(x: &Array2<f64>) -> f64 {
    let count = x.len() as f64;
    let mean = x.sum() / count;
    let variance = x.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count;
    if variance > 0.0 {
        1.0 / (x.ncols() as f64 * variance)
    } else {
        1.0
    }
}

impl KernelSvm {
    pub fn fit(params: &SvmParams, x: &Array2<f64>, y: &[usize], n_classes: usize) -> Result<Self, ModelError> {
        if params.c <= 0.0 || !params.c.is_finite() {
            return Err(ModelError::InvalidParameter(format!("C must be positive, got {}", params.c)));
        }
        let gamma = params.gamma.unwrap_or_else(|| scale_gamma(x));
        if gamma <= 0.0 || !gamma.is_finite() {
            return Err(ModelError::InvalidParameter(format!("gamma must be positive, got {}", gamma)));
        }

        let n = x.nrows();
        let mut alpha = Array2::<f64>::zeros((n_classes, n));
        let mut rho = vec![0.0; n_classes];

        for class in 0..n_classes {
            let targets: Array1<bool> = y.iter().map(|&c| c == class).collect();
            let positives = targets.iter().filter(|&&t| t).count();
            if positives == 0 || positives == n {
                // Constant machine: always reject (absent) or always accept (only class)
                rho[class] = if positives == 0 { 1.0 } else { -1.0 };
                continue;
            }

            let (c_pos, c_neg) = if params.balanced {
                let half = n as f64 / 2.0;
                (
                    params.c * half / positives as f64,
                    params.c * half / (n - positives) as f64,
                )
            } else {
                (params.c, params.c)
            };

            let dataset = Dataset::new(x.clone(), targets);
            // linfa's Gaussian kernel is exp(-||a - b||² / eps)
            let machine = Svm::<f64, bool>::params()
                .pos_neg_weights(c_pos, c_neg)
                .gaussian_kernel(1.0 / gamma)
                .fit(&dataset)
                .map_err(|e| ModelError::Solver(format!("svm for class {}: {}", class, e)))?;

            for (j, a) in machine.alpha.iter().take(n).enumerate() {
                alpha[[class, j]] = *a;
            }
            rho[class] = machine.rho;
        }

        let support: Vec<usize> = (0..n)
            .filter(|&j| (0..n_classes).any(|k| alpha[[k, j]] != 0.0))
            .collect();
        debug!("SVM kept {} of {} training rows", support.len(), n);

        let support_rows = Array2::from_shape_fn((support.len(), x.ncols()), |(s, f)| x[[support[s], f]]);
        let coefficients =
            Array2::from_shape_fn((n_classes, support.len()), |(k, s)| alpha[[k, support[s]]]);

        Ok(Self {
            gamma,
            support: support_rows,
            coefficients,
            rho,
        })
    }

    pub fn n_features(&self) -> usize {
        self.support.ncols()
    }

    pub fn n_classes(&self) -> usize {
        self.coefficients.nrows()
    }

    pub fn n_support(&self) -> usize {
        self.support.nrows()
    }

    /// Raw one-vs-rest decision values
    pub fn decision_function(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let kernel: Vec<f64> = self
            .support
            .rows()
            .into_iter()
            .map(|sv| rbf(self.gamma, sv, row))
            .collect();
        self.coefficients
            .rows()
            .into_iter()
            .zip(&self.rho)
            .map(|(coef, rho)| coef.iter().zip(&kernel).map(|(a, k)| a * k).sum::<f64>() - rho)
            .collect()
    }

    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let scores: Vec<f64> = self
            .decision_function(row)
            .into_iter()
            .map(|f| 1.0 / (1.0 + (-2.0 * f).exp()))
            .collect();
        let total: f64 = scores.iter().sum();
        if total > 0.0 {
            scores.into_iter().map(|s| s / total).collect()
        } else {
            vec![1.0 / scores.len().max(1) as f64; scores.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_svm_separates_clusters() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.0, 0.2],
            [2.0, 2.0],
            [2.1, 1.9],
            [1.9, 2.1],
            [0.0, 2.0],
            [0.1, 2.1],
            [0.2, 1.9]
        ];
        let y = [0, 0, 0, 1, 1, 1, 2, 2, 2];
        let params = SvmParams {
            gamma: Some(1.0),
            c: 10.0,
            ..Default::default()
        };
        let svm = KernelSvm::fit(&params, &x, &y, 3).unwrap();
        assert!(svm.n_support() <= x.nrows());

        for (i, &class) in y.iter().enumerate() {
            let p = svm.predict_proba(x.row(i));
            assert_eq!(super::super::argmax(&p), class, "row {} → {:?}", i, p);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_scale_gamma() {
        let x = array![[0.0, 2.0], [0.0, 2.0]];
        // mean 1, variance 1, two features
        assert!((scale_gamma(&x) - 0.5).abs() < 1e-12);
        assert_eq!(scale_gamma(&array![[3.0]]), 1.0);
    }

    #[test]
    fn test_decision_sign_follows_class() {
        let x = array![[0.0], [0.2], [3.0], [3.2]];
        let y = [0, 0, 1, 1];
        let params = SvmParams {
            gamma: Some(0.5),
            c: 10.0,
            ..Default::default()
        };
        let svm = KernelSvm::fit(&params, &x, &y, 2).unwrap();
        let near_zero = svm.decision_function(array![0.1].view());
        let near_three = svm.decision_function(array![3.1].view());
        assert!(near_zero[0] > 0.0 && near_zero[1] < 0.0, "{:?}", near_zero);
        assert!(near_three[1] > 0.0 && near_three[0] < 0.0, "{:?}", near_three);
    }

    #[test]
    fn test_absent_class_never_wins() {
        let x = array![[0.0], [0.2], [3.0], [3.2]];
        let y = [0, 0, 2, 2];
        let svm = KernelSvm::fit(&SvmParams::default(), &x, &y, 3).unwrap();
        let p = svm.predict_proba(x.row(0));
        assert!(p[1] < p[0]);
        assert!(svm.decision_function(x.row(0))[1] < 0.0);
    }
}
