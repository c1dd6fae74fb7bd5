//! Classification metrics for cross-validation and hold-out evaluation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fraction of positions where `predicted` equals `truth`
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
    correct as f64 / truth.len() as f64
}

/// Rows are true classes, columns predicted classes
pub fn confusion_matrix(truth: &[usize], predicted: &[usize], n_classes: usize) -> Vec<Vec<usize>> {
    let mut matrix = vec![vec![0; n_classes]; n_classes];
    for (&t, &p) in truth.iter().zip(predicted) {
        if t < n_classes && p < n_classes {
            matrix[t][p] += 1;
        }
    }
    matrix
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub confusion_matrix: Vec<Vec<usize>>,
    pub per_class: Vec<ClassMetrics>,
}

impl EvaluationReport {
    /// Report over all `labels` (indexed by class id); undefined ratios are 0
    pub fn compute(truth: &[usize], predicted: &[usize], labels: &[String]) -> Self {
        let matrix = confusion_matrix(truth, predicted, labels.len());

        let per_class = labels
            .iter()
            .enumerate()
            .map(|(class, label)| {
                let true_positive = matrix[class][class] as f64;
                let predicted_total: usize = matrix.iter().map(|row| row[class]).sum();
                let support: usize = matrix[class].iter().sum();

                let precision = ratio(true_positive, predicted_total as f64);
                let recall = ratio(true_positive, support as f64);
                let f1 = ratio(2.0 * precision * recall, precision + recall);
                ClassMetrics {
                    label: label.clone(),
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            accuracy: accuracy(truth, predicted),
            confusion_matrix: matrix,
            per_class,
        }
    }

    pub fn macro_f1(&self) -> f64 {
        let supported: Vec<&ClassMetrics> = self.per_class.iter().filter(|c| c.support > 0).collect();
        if supported.is_empty() {
            return 0.0;
        }
        supported.iter().map(|c| c.f1).sum::<f64>() / supported.len() as f64
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .per_class
            .iter()
            .map(|c| c.label.chars().count())
            .max()
            .unwrap_or(0)
            .max(12);

        writeln!(
            f,
            "{:<width$}  {:>9}  {:>9}  {:>9}  {:>7}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for c in &self.per_class {
            writeln!(
                f,
                "{:<width$}  {:>9.3}  {:>9.3}  {:>9.3}  {:>7}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        let total: usize = self.per_class.iter().map(|c| c.support).sum();
        write!(f, "{:<width$}  {:>9}  {:>9}  {:>9.3}  {:>7}", "accuracy", "", "", self.accuracy, total)
    }
}

/// Cross-validation outcome for one registry candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub name: String,
    pub fold_scores: Vec<f64>,
    pub mean: f64,
}

impl CandidateScore {
    pub fn new(name: impl Into<String>, fold_scores: Vec<f64>) -> Self {
        let mean = if fold_scores.is_empty() {
            0.0
        } else {
            fold_scores.iter().sum::<f64>() / fold_scores.len() as f64
        };
        Self {
            name: name.into(),
            fold_scores,
            mean,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    }

    #[test]
    fn test_accuracy() {
        assert_eq!(accuracy(&[0, 1, 1, 0], &[0, 1, 0, 0]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn test_report_per_class_figures() {
        let truth = [0, 0, 1, 1];
        let predicted = [0, 1, 1, 1];
        let report = EvaluationReport::compute(&truth, &predicted, &labels());

        assert_eq!(report.confusion_matrix, vec![vec![1, 1, 0], vec![0, 2, 0], vec![0, 0, 0]]);
        assert_eq!(report.per_class[0].precision, 1.0);
        assert_eq!(report.per_class[0].recall, 0.5);
        assert!((report.per_class[1].precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.per_class[1].recall, 1.0);
        // No samples and no predictions for "c"
        assert_eq!(report.per_class[2].f1, 0.0);
        assert_eq!(report.per_class[2].support, 0);
    }

    #[test]
    fn test_report_renders_table() {
        let report = EvaluationReport::compute(&[0, 1], &[0, 1], &labels());
        let text = report.to_string();
        assert!(text.contains("precision"));
        assert!(text.lines().any(|l| l.starts_with("accuracy")));
    }

    #[test]
    fn test_candidate_mean() {
        let score = CandidateScore::new("svm_rbf", vec![0.5, 1.0]);
        assert_eq!(score.mean, 0.75);
    }
}
