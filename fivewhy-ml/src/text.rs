//! TF-IDF text vectorizer
//!
//! Tokens are runs of two or more word characters, lower-cased, with English
//! stop words removed. Word n-grams are built from the remaining tokens.
//! Document-frequency bounds are applied before the vocabulary is capped at
//! `max_features` (most frequent terms first). Rows are L2-normalized.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Vectorizer hyper-parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfConfig {
    pub max_features: usize,
    /// Minimum document frequency as a fraction of documents
    pub min_df: f64,
    /// Maximum document frequency as a fraction of documents
    pub max_df: f64,
    pub ngram_range: (usize, usize),
    pub sublinear_tf: bool,
    pub smooth_idf: bool,
    pub remove_stop_words: bool,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            max_features: 2000,
            min_df: 0.1,
            max_df: 0.9,
            ngram_range: (1, 3),
            sublinear_tf: true,
            smooth_idf: true,
            remove_stop_words: true,
        }
    }
}

const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
    "around", "as", "at", "be", "became", "because", "become", "becomes", "becoming", "been",
    "before", "beforehand", "behind", "being", "below", "beside", "besides", "between", "beyond",
    "both", "but", "by", "can", "cannot", "could", "did", "do", "does", "done", "down", "due",
    "during", "each", "eg", "either", "else", "elsewhere", "enough", "etc", "even", "ever",
    "every", "everyone", "everything", "everywhere", "except", "few", "for", "former",
    "formerly", "from", "further", "had", "has", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hers", "herself", "him", "himself", "his", "how",
    "however", "ie", "if", "in", "indeed", "into", "is", "it", "its", "itself", "just", "last",
    "latter", "least", "less", "ltd", "many", "may", "me", "meanwhile", "might", "more",
    "moreover", "most", "mostly", "much", "must", "my", "myself", "namely", "neither", "never",
    "nevertheless", "next", "no", "nobody", "none", "nor", "not", "nothing", "now", "nowhere",
    "of", "off", "often", "on", "once", "one", "only", "onto", "or", "other", "others",
    "otherwise", "our", "ours", "ourselves", "out", "over", "own", "per", "perhaps", "please",
    "rather", "re", "same", "seem", "seemed", "seeming", "seems", "several", "she", "should",
    "since", "so", "some", "somehow", "someone", "something", "sometime", "sometimes",
    "somewhere", "still", "such", "than", "that", "the", "their", "them", "themselves", "then",
    "thence", "there", "thereafter", "thereby", "therefore", "therein", "thereupon", "these",
    "they", "this", "those", "though", "through", "throughout", "thru", "thus", "to",
    "together", "too", "toward", "towards", "under", "until", "up", "upon", "us", "very", "via",
    "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever", "where",
    "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever", "whether", "which",
    "while", "whither", "who", "whoever", "whole", "whom", "whose", "why", "will", "with",
    "within", "without", "would", "yet", "you", "your", "yours", "yourself", "yourselves",
];

fn is_stop_word(token: &str) -> bool {
    ENGLISH_STOP_WORDS.binary_search(&token).is_ok()
}

/// Lower-cased word tokens of length two or more
pub fn tokenize(text: &str, remove_stop_words: bool) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|token| !(remove_stop_words && is_stop_word(token)))
        .collect()
}

/// Word n-grams for `min_n..=max_n`
pub fn ngrams(tokens: &[String], (min_n, max_n): (usize, usize)) -> Vec<String> {
    let mut grams = Vec::new();
    for n in min_n.max(1)..=max_n {
        if n > tokens.len() {
            break;
        }
        grams.extend(tokens.windows(n).map(|window| window.join(" ")));
    }
    grams
}

/// Fitted TF-IDF vocabulary and inverse document frequencies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    /// Term → column, columns assigned in alphabetical term order
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn fit(config: &TfidfConfig, documents: &[&str]) -> Self {
        let n_docs = documents.len();

        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for document in documents {
            let grams = ngrams(&tokenize(document, config.remove_stop_words), config.ngram_range);
            let mut seen = BTreeSet::new();
            for gram in grams {
                *total_frequency.entry(gram.clone()).or_insert(0) += 1;
                if seen.insert(gram.clone()) {
                    *document_frequency.entry(gram).or_insert(0) += 1;
                }
            }
        }

        let min_count = config.min_df * n_docs as f64;
        let max_count = config.max_df * n_docs as f64;
        let mut kept: Vec<(String, usize)> = document_frequency
            .iter()
            .filter(|(_, &df)| df as f64 >= min_count && df as f64 <= max_count)
            .map(|(term, _)| (term.clone(), total_frequency.get(term).copied().unwrap_or(0)))
            .collect();

        if kept.len() > config.max_features {
            // Most frequent first; alphabetical order breaks ties
            kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            kept.truncate(config.max_features);
        }

        let terms: BTreeSet<String> = kept.into_iter().map(|(term, _)| term).collect();
        let vocabulary: BTreeMap<String, usize> = terms
            .into_iter()
            .enumerate()
            .map(|(column, term)| (term, column))
            .collect();

        let mut idf = vec![0.0; vocabulary.len()];
        for (term, &column) in &vocabulary {
            let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
            let n = n_docs as f64;
            idf[column] = if config.smooth_idf {
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            } else {
                (n / df.max(1.0)).ln() + 1.0
            };
        }

        Self {
            config: config.clone(),
            vocabulary,
            idf,
        }
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn vocabulary(&self) -> &BTreeMap<String, usize> {
        &self.vocabulary
    }

    /// Write the L2-normalized TF-IDF vector of `document` into `out`
    ///
    /// `out` must have exactly `n_features()` entries.
    pub fn transform_into(&self, document: &str, out: &mut [f64]) {
        out.iter_mut().for_each(|v| *v = 0.0);

        let grams = ngrams(
            &tokenize(document, self.config.remove_stop_words),
            self.config.ngram_range,
        );
        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for gram in grams {
            if let Some(&column) = self.vocabulary.get(&gram) {
                *counts.entry(column).or_insert(0) += 1;
            }
        }

        for (column, count) in counts {
            let tf = if self.config.sublinear_tf {
                1.0 + (count as f64).ln()
            } else {
                count as f64
            };
            out[column] = tf * self.idf[column];
        }

        let norm = out.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            out.iter_mut().for_each(|v| *v /= norm);
        }
    }

    pub fn transform(&self, document: &str) -> Vec<f64> {
        let mut out = vec![0.0; self.n_features()];
        self.transform_into(document, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TfidfConfig {
        TfidfConfig {
            min_df: 0.0,
            max_df: 1.0,
            ngram_range: (1, 1),
            ..Default::default()
        }
    }

    #[test]
    fn test_stop_word_list_is_sorted() {
        let mut sorted = ENGLISH_STOP_WORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, ENGLISH_STOP_WORDS);
    }

    #[test]
    fn test_tokenize_lowercases_and_drops_short_and_stop_words() {
        let tokens = tokenize("The Pump is OVERHEATING, a 2nd time: x-axis", true);
        assert_eq!(tokens, vec!["pump", "overheating", "2nd", "time", "axis"]);
    }

    #[test]
    fn test_ngrams() {
        let tokens: Vec<String> = ["pump", "bearing", "noise"].iter().map(|s| s.to_string()).collect();
        let grams = ngrams(&tokens, (1, 3));
        assert_eq!(
            grams,
            vec![
                "pump",
                "bearing",
                "noise",
                "pump bearing",
                "bearing noise",
                "pump bearing noise"
            ]
        );
    }

    #[test]
    fn test_vocabulary_is_alphabetical() {
        let v = TfidfVectorizer::fit(&config(), &["pump noise", "bearing noise"]);
        let terms: Vec<&String> = v.vocabulary().keys().collect();
        assert_eq!(terms, vec!["bearing", "noise", "pump"]);
        assert_eq!(v.vocabulary()["bearing"], 0);
        assert_eq!(v.vocabulary()["pump"], 2);
    }

    #[test]
    fn test_document_frequency_bounds() {
        let config = TfidfConfig {
            max_df: 0.9,
            ..config()
        };
        // "equipment" appears in every document and is dropped
        let v = TfidfVectorizer::fit(
            &config,
            &["equipment pump", "equipment valve", "equipment motor"],
        );
        assert!(!v.vocabulary().contains_key("equipment"));
        assert_eq!(v.n_features(), 3);
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let config = TfidfConfig {
            max_features: 1,
            ..config()
        };
        let v = TfidfVectorizer::fit(&config, &["leak leak valve", "leak pump"]);
        assert_eq!(v.vocabulary().keys().collect::<Vec<_>>(), vec!["leak"]);
    }

    #[test]
    fn test_transform_is_unit_norm_and_ignores_unknown_terms() {
        let v = TfidfVectorizer::fit(&config(), &["pump noise", "bearing noise"]);
        let row = v.transform("pump pump bearing turbine");
        let norm: f64 = row.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert_eq!(row[1], 0.0);

        let empty = v.transform("turbine");
        assert!(empty.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_rarer_terms_weigh_more() {
        let v = TfidfVectorizer::fit(&config(), &["pump noise", "bearing noise", "noise"]);
        let row = v.transform("pump noise");
        assert!(row[v.vocabulary()["pump"]] > row[v.vocabulary()["noise"]]);
    }
}
