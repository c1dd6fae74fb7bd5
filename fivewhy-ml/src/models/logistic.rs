//! Multinomial logistic regression with L2 penalty
//!
//! Fitted by `linfa-logistic` (L-BFGS on cross-entropy plus
//! `alpha/2 · ||W||²`, with `alpha = 1 / C`). The fitted weights are copied
//! out so the artifact only carries plain arrays.

use linfa::prelude::*;
use linfa_logistic::MultiLogisticRegression;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{class_counts, softmax, ModelError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticParams {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: u64,
    /// Stop when the gradient norm drops below this
    pub tol: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self {
            c: 0.1,
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    n_classes: usize,
    /// Class id of every weight column
    classes: Vec<usize>,
    /// n_features × classes.len()
    weights: Array2<f64>,
    intercept: Array1<f64>,
}

impl LogisticRegression {
    pub fn fit(
        params: &LogisticParams,
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
    ) -> Result<Self, ModelError> {
        if params.c <= 0.0 || !params.c.is_finite() {
            return Err(ModelError::InvalidParameter(format!("C must be positive, got {}", params.c)));
        }
        let present = class_counts(y, n_classes).iter().filter(|&&c| c > 0).count();
        if present < 2 {
            return Err(ModelError::Solver(format!(
                "logistic regression needs at least two classes, got {}",
                present
            )));
        }

        let dataset = Dataset::new(x.clone(), Array1::from(y.to_vec()));
        let fitted = MultiLogisticRegression::<f64>::default()
            .alpha(1.0 / params.c)
            .max_iterations(params.max_iter)
            .gradient_tolerance(params.tol)
            .fit(&dataset)
            .map_err(|e| ModelError::Solver(format!("logistic regression: {}", e)))?;
        debug!("Logistic regression fitted over {} classes", fitted.classes().len());

        Ok(Self {
            n_classes,
            classes: fitted.classes().to_vec(),
            weights: fitted.params().clone(),
            intercept: fitted.intercept().clone(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.weights.nrows()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Softmax over the fitted classes; classes absent from training get 0
    pub fn predict_proba(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let scores = row.dot(&self.weights) + &self.intercept;
        let fitted = softmax(&scores.to_vec());
        let mut probabilities = vec![0.0; self.n_classes];
        for (&class, p) in self.classes.iter().zip(fitted) {
            if class < self.n_classes {
                probabilities[class] = p;
            }
        }
        probabilities
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_logistic_separates_classes() {
        let x = array![[1.0, 0.0], [0.9, 0.1], [0.0, 1.0], [0.1, 0.9], [0.0, 0.0], [0.05, 0.0]];
        let y = [0, 0, 1, 1, 2, 2];
        let params = LogisticParams {
            c: 100.0,
            ..Default::default()
        };
        let model = LogisticRegression::fit(&params, &x, &y, 3).unwrap();

        assert_eq!(model.n_classes(), 3);
        assert_eq!(model.n_features(), 2);
        for (i, &class) in y.iter().enumerate() {
            let p = model.predict_proba(x.row(i));
            assert_eq!(super::super::argmax(&p), class, "row {} → {:?}", i, p);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_strong_penalty_shrinks_towards_uniform() {
        let x = array![[1.0], [0.0]];
        let y = [0, 1];
        let params = LogisticParams {
            c: 1e-6,
            ..Default::default()
        };
        let model = LogisticRegression::fit(&params, &x, &y, 2).unwrap();
        let p = model.predict_proba(x.row(0));
        assert!((p[0] - 0.5).abs() < 0.05);
    }

    #[test]
    fn test_class_missing_from_training_gets_zero() {
        let x = array![[1.0, 0.0], [0.9, 0.1], [0.0, 1.0], [0.1, 0.9]];
        let y = [0, 0, 2, 2];
        let params = LogisticParams {
            c: 10.0,
            ..Default::default()
        };
        let model = LogisticRegression::fit(&params, &x, &y, 3).unwrap();
        let p = model.predict_proba(x.row(0));
        assert_eq!(p.len(), 3);
        assert_eq!(p[1], 0.0);
        assert!(p[0] > p[2]);
    }

    #[test]
    fn test_rejects_non_positive_c() {
        let params = LogisticParams {
            c: 0.0,
            ..Default::default()
        };
        assert!(LogisticRegression::fit(&params, &array![[0.0]], &[0], 1).is_err());
    }

    #[test]
    fn test_single_class_is_solver_error() {
        let err = LogisticRegression::fit(&LogisticParams::default(), &array![[0.0], [1.0]], &[1, 1], 2)
            .unwrap_err();
        assert!(matches!(err, ModelError::Solver(_)));
    }
}
