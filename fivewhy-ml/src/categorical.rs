//! One-hot encoding of categorical columns
//!
//! Categories are learned per column and sorted. A value never seen during
//! fitting encodes to the all-zero block for its column instead of failing,
//! which keeps the serving path available for new vocabulary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted categories per column
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    /// Learn categories from rows of equal width
    pub fn fit<'a, I>(n_columns: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut seen: Vec<BTreeSet<&'a str>> = vec![BTreeSet::new(); n_columns];
        for row in rows {
            for (column, value) in row.iter().enumerate().take(n_columns) {
                seen[column].insert(value.as_str());
            }
        }

        let categories = seen
            .into_iter()
            .map(|values| values.into_iter().map(str::to_string).collect())
            .collect();
        Self { categories }
    }

    pub fn n_columns(&self) -> usize {
        self.categories.len()
    }

    /// Total width of the encoded block
    pub fn n_features(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn categories(&self, column: usize) -> Option<&[String]> {
        self.categories.get(column).map(Vec::as_slice)
    }

    /// Write the one-hot block for `row` into `out` (length `n_features()`)
    ///
    /// Returns the number of values that were unknown to the encoder.
    pub fn transform_into(&self, row: &[String], out: &mut [f64]) -> usize {
        out.iter_mut().for_each(|v| *v = 0.0);

        let mut offset = 0;
        let mut unknown = 0;
        for (categories, value) in self.categories.iter().zip(row) {
            match categories.binary_search(value) {
                Ok(position) => out[offset + position] = 1.0,
                Err(_) => unknown += 1,
            }
            offset += categories.len();
        }
        unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fit_sorts_categories() {
        let rows = vec![row(&["night", "high"]), row(&["day", "low"]), row(&["day", "high"])];
        let encoder = OneHotEncoder::fit(2, rows.iter().map(Vec::as_slice));

        assert_eq!(encoder.categories(0).unwrap(), &["day", "night"]);
        assert_eq!(encoder.categories(1).unwrap(), &["high", "low"]);
        assert_eq!(encoder.n_features(), 4);
    }

    #[test]
    fn test_transform_known_values() {
        let rows = vec![row(&["night", "high"]), row(&["day", "low"])];
        let encoder = OneHotEncoder::fit(2, rows.iter().map(Vec::as_slice));

        let mut out = vec![9.0; 4];
        let unknown = encoder.transform_into(&row(&["night", "low"]), &mut out);
        assert_eq!(unknown, 0);
        assert_eq!(out, vec![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unknown_value_maps_to_zero_block() {
        let rows = vec![row(&["overdue"]), row(&["recent"])];
        let encoder = OneHotEncoder::fit(1, rows.iter().map(Vec::as_slice));

        let mut out = vec![0.0; 2];
        let unknown = encoder.transform_into(&row(&["extremely-overdue"]), &mut out);
        assert_eq!(unknown, 1);
        assert_eq!(out, vec![0.0, 0.0]);
    }
}
