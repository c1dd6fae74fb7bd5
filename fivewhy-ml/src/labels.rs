//! Bidirectional mapping between root-cause labels and class ids
//!
//! Classes are sorted alphabetically so ids are reproducible across runs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let classes: BTreeSet<&str> = labels.into_iter().collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    /// Fit and return the class id of every label, in input order
    pub fn fit_transform(labels: &[&str]) -> (Self, Vec<usize>) {
        let encoder = Self::fit(labels.iter().copied());
        let ids: BTreeMap<&str, usize> = encoder
            .classes
            .iter()
            .enumerate()
            .map(|(id, class)| (class.as_str(), id))
            .collect();
        let y = labels.iter().map(|label| ids[label]).collect();
        (encoder, y)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .ok()
    }

    pub fn inverse_transform(&self, class_id: usize) -> Option<&str> {
        self.classes.get(class_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classes_sorted_and_deduplicated() {
        let encoder = LabelEncoder::fit(["Wear", "Inadequate lubrication", "Wear", "Misalignment"]);
        assert_eq!(
            encoder.classes(),
            &["Inadequate lubrication", "Misalignment", "Wear"]
        );
    }

    #[test]
    fn test_fit_transform_keeps_input_order() {
        let (encoder, ids) = LabelEncoder::fit_transform(&["b", "a", "b"]);
        assert_eq!(encoder.classes(), &["a", "b"]);
        assert_eq!(ids, vec![1, 0, 1]);
    }

    #[test]
    fn test_round_trip() {
        let encoder = LabelEncoder::fit(["b", "a", "c"]);
        for label in ["a", "b", "c"] {
            let id = encoder.transform(label).unwrap();
            assert_eq!(encoder.inverse_transform(id), Some(label));
        }
        assert_eq!(encoder.transform("z"), None);
        assert_eq!(encoder.inverse_transform(3), None);
    }
}
