use std::collections::{BTreeMap, HashMap};

use crate::chunking::Chunk;
use crate::text::{is_word_char, normalize_text};

use super::{RetrievalHit, RetrievalMethod, Retriever, chunk_ids, rank_scores};

const SMALL_CORPUS_CHUNKS: usize = 5;
const SMALL_CORPUS_MAX_DF: f64 = 1.0;
const DEFAULT_MAX_DF: f64 = 0.95;

/// Uni+bi-gram TF-IDF with smoothed idf and L2-normalized rows; scored by cosine similarity.
#[derive(Debug, Clone, Default)]
pub struct TfidfIndex {
    chunk_ids: Vec<String>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    rows: Vec<HashMap<usize, f64>>,
}

impl TfidfIndex {
    pub fn build(chunks: &[Chunk]) -> Self {
        let documents = chunks
            .iter()
            .map(|chunk| term_counts(&normalize_text(&chunk.text)))
            .collect::<Vec<HashMap<String, usize>>>();
        let document_count = documents.len();

        let mut document_frequency = BTreeMap::<&str, usize>::new();
        for counts in &documents {
            for term in counts.keys() {
                *document_frequency.entry(term.as_str()).or_default() += 1;
            }
        }

        let max_df = if document_count < SMALL_CORPUS_CHUNKS {
            SMALL_CORPUS_MAX_DF
        } else {
            DEFAULT_MAX_DF
        };
        let max_document_count = max_df * document_count as f64;

        let mut vocabulary = HashMap::<String, usize>::new();
        let mut idf = Vec::<f64>::new();
        for (term, frequency) in document_frequency {
            if frequency as f64 > max_document_count {
                continue;
            }
            vocabulary.insert(term.to_string(), idf.len());
            idf.push(smoothed_idf(document_count, frequency));
        }

        let rows = documents
            .iter()
            .map(|counts| weighted_row(counts, &vocabulary, &idf))
            .collect();

        Self {
            chunk_ids: chunk_ids(chunks),
            vocabulary,
            idf,
            rows,
        }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    fn scores(&self, query_text: &str) -> Vec<f64> {
        let query = weighted_row(
            &term_counts(&normalize_text(query_text)),
            &self.vocabulary,
            &self.idf,
        );

        self.rows
            .iter()
            .map(|row| {
                query
                    .iter()
                    .filter_map(|(term, weight)| row.get(term).map(|value| value * weight))
                    .sum::<f64>()
            })
            .collect()
    }
}

impl Retriever for TfidfIndex {
    fn method(&self) -> RetrievalMethod {
        RetrievalMethod::Lexical
    }

    fn query(&self, query_text: &str, top_k: usize) -> Vec<RetrievalHit> {
        if query_text.trim().is_empty() || self.vocabulary.is_empty() {
            return Vec::new();
        }

        let scores = self.scores(query_text);
        rank_scores(&self.chunk_ids, &scores, top_k, self.method())
    }
}

/// Runs of two or more word characters, followed by adjacent-pair bigrams.
fn analyze(normalized: &str) -> Vec<String> {
    let unigrams = normalized
        .split(|character: char| !is_word_char(character))
        .filter(|token| token.chars().count() >= 2)
        .map(ToOwned::to_owned)
        .collect::<Vec<String>>();

    let bigrams = unigrams
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect::<Vec<String>>();

    let mut terms = unigrams;
    terms.extend(bigrams);
    terms
}

fn term_counts(normalized: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::<String, usize>::new();
    for term in analyze(normalized) {
        *counts.entry(term).or_default() += 1;
    }
    counts
}

fn smoothed_idf(document_count: usize, document_frequency: usize) -> f64 {
    ((1.0 + document_count as f64) / (1.0 + document_frequency as f64)).ln() + 1.0
}

fn weighted_row(
    counts: &HashMap<String, usize>,
    vocabulary: &HashMap<String, usize>,
    idf: &[f64],
) -> HashMap<usize, f64> {
    let mut row = counts
        .iter()
        .filter_map(|(term, count)| {
            vocabulary
                .get(term)
                .map(|index| (*index, *count as f64 * idf[*index]))
        })
        .collect::<HashMap<usize, f64>>();

    let norm = row.values().map(|value| value * value).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in row.values_mut() {
            *value /= norm;
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{ChunkingOptions, chunk_profile};

    fn chunk(chunk_id: &str, text: &str) -> Chunk {
        Chunk {
            chunk_id: chunk_id.to_string(),
            section: "experience".to_string(),
            text: text.to_string(),
            tokens: Vec::new(),
        }
    }

    #[test]
    fn analyzer_emits_unigrams_then_bigrams() {
        assert_eq!(
            analyze("built c++ apis in go"),
            vec!["built", "apis", "in", "go", "built apis", "apis in", "in go"]
        );
    }

    #[test]
    fn query_ranks_chunks_by_cosine_similarity() {
        let chunks = vec![
            chunk("experience_000", "Built payment services in Python and Django."),
            chunk("experience_001", "Led a team maintaining Java services."),
            chunk("experience_002", "Python data pipelines with Python tooling."),
        ];
        let index = TfidfIndex::build(&chunks);

        let hits = index.query("python", 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, "experience_002");
        assert_eq!(hits[1].chunk_id, "experience_000");
        assert!(hits.iter().all(|hit| hit.score > 0.0 && hit.score <= 1.0 + 1e-9));
        assert!(hits.iter().all(|hit| hit.method == RetrievalMethod::Lexical));
    }

    #[test]
    fn identical_text_has_unit_cosine() {
        let chunks = vec![chunk("skills_000", "rust tokio axum")];
        let index = TfidfIndex::build(&chunks);
        let hits = index.query("Rust tokio axum", 1);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn small_corpus_keeps_terms_present_everywhere() {
        let chunks = vec![chunk("a_000", "rust services"), chunk("a_001", "rust tooling")];
        let index = TfidfIndex::build(&chunks);
        assert_eq!(index.query("rust", 5).len(), 2);
    }

    #[test]
    fn large_corpus_prunes_ubiquitous_terms() {
        let chunks = (0..6)
            .map(|index| chunk(&format!("a_{index:03}"), &format!("engineer topic{index}")))
            .collect::<Vec<Chunk>>();
        let index = TfidfIndex::build(&chunks);
        assert!(index.query("engineer", 5).is_empty());
        assert_eq!(index.query("topic3", 5).len(), 1);
    }

    #[test]
    fn empty_query_or_empty_corpus_returns_no_hits() {
        let index = TfidfIndex::build(&chunk_profile("", None, ChunkingOptions::default()));
        assert_eq!(index.vocabulary_size(), 0);
        assert!(index.query("python", 5).is_empty());

        let index = TfidfIndex::build(&[chunk("a_000", "python")]);
        assert!(index.query("   ", 5).is_empty());
        assert!(index.query("cobol", 5).is_empty());
    }
}
