use std::collections::HashMap;

use crate::chunking::Chunk;
use crate::text::tokenize;

use super::{RetrievalHit, RetrievalMethod, Retriever, chunk_ids, rank_scores};

const BM25_K1: f64 = 1.5;
const BM25_B: f64 = 0.75;
const BM25_EPSILON: f64 = 0.25;

/// Okapi BM25 over the chunk token sequences. Terms with a negative idf are floored to
/// `epsilon * mean(idf)`.
#[derive(Debug, Clone, Default)]
pub struct Bm25Index {
    chunk_ids: Vec<String>,
    term_frequencies: Vec<HashMap<String, usize>>,
    document_lengths: Vec<usize>,
    average_length: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    pub fn build(chunks: &[Chunk]) -> Self {
        let mut term_frequencies = Vec::with_capacity(chunks.len());
        let mut document_lengths = Vec::with_capacity(chunks.len());
        let mut document_frequency = HashMap::<String, usize>::new();

        for chunk in chunks {
            let mut frequencies = HashMap::<String, usize>::new();
            for token in &chunk.tokens {
                *frequencies.entry(token.clone()).or_default() += 1;
            }
            for term in frequencies.keys() {
                *document_frequency.entry(term.clone()).or_default() += 1;
            }
            document_lengths.push(chunk.tokens.len());
            term_frequencies.push(frequencies);
        }

        let total_tokens = document_lengths.iter().sum::<usize>();
        let average_length = if chunks.is_empty() {
            0.0
        } else {
            total_tokens as f64 / chunks.len() as f64
        };

        Self {
            chunk_ids: chunk_ids(chunks),
            term_frequencies,
            document_lengths,
            average_length,
            idf: okapi_idf(chunks.len(), &document_frequency),
        }
    }

    fn scores(&self, query_tokens: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0_f64; self.chunk_ids.len()];

        for token in query_tokens {
            let Some(idf) = self.idf.get(token) else {
                continue;
            };

            for (index, frequencies) in self.term_frequencies.iter().enumerate() {
                let frequency = frequencies.get(token).copied().unwrap_or(0) as f64;
                if frequency == 0.0 {
                    continue;
                }
                let length_ratio = self.document_lengths[index] as f64 / self.average_length;
                let denominator = frequency + BM25_K1 * (1.0 - BM25_B + BM25_B * length_ratio);
                scores[index] += idf * (frequency * (BM25_K1 + 1.0) / denominator);
            }
        }

        scores
    }
}

impl Retriever for Bm25Index {
    fn method(&self) -> RetrievalMethod {
        RetrievalMethod::Probabilistic
    }

    fn query(&self, query_text: &str, top_k: usize) -> Vec<RetrievalHit> {
        if self.average_length <= 0.0 {
            return Vec::new();
        }

        let query_tokens = tokenize(query_text, None);
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let scores = self.scores(&query_tokens);
        rank_scores(&self.chunk_ids, &scores, top_k, self.method())
    }
}

fn okapi_idf(
    document_count: usize,
    document_frequency: &HashMap<String, usize>,
) -> HashMap<String, f64> {
    if document_frequency.is_empty() {
        return HashMap::new();
    }

    let total = document_count as f64;
    let mut idf = document_frequency
        .iter()
        .map(|(term, frequency)| {
            let frequency = *frequency as f64;
            let value = (total - frequency + 0.5).ln() - (frequency + 0.5).ln();
            (term.clone(), value)
        })
        .collect::<HashMap<String, f64>>();

    let average_idf = idf.values().sum::<f64>() / idf.len() as f64;
    let floor = BM25_EPSILON * average_idf;
    for value in idf.values_mut() {
        if *value < 0.0 {
            *value = floor;
        }
    }

    idf
}
