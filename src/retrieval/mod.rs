use serde::{Deserialize, Serialize};

use crate::chunking::Chunk;

mod bm25;
mod embed;
mod tfidf;

pub use bm25::Bm25Index;
pub use embed::EmbedIndex;
pub use tfidf::TfidfIndex;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMethod {
    Lexical,
    Probabilistic,
    Semantic,
}

impl RetrievalMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lexical => "tfidf",
            Self::Probabilistic => "bm25",
            Self::Semantic => "embed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalHit {
    pub chunk_id: String,
    pub score: f64,
    pub method: RetrievalMethod,
}

/// A ranked retriever over a fixed chunk set. Scores are only comparable within one method.
pub trait Retriever {
    fn method(&self) -> RetrievalMethod;

    fn query(&self, query_text: &str, top_k: usize) -> Vec<RetrievalHit>;
}

/// Sorts chunk scores descending (ties keep chunk order), truncates to `top_k` and drops
/// non-positive scores.
pub(crate) fn rank_scores(
    chunk_ids: &[String],
    scores: &[f64],
    top_k: usize,
    method: RetrievalMethod,
) -> Vec<RetrievalHit> {
    let mut order = (0..scores.len().min(chunk_ids.len())).collect::<Vec<usize>>();
    order.sort_by(|left, right| scores[*right].total_cmp(&scores[*left]));

    order
        .into_iter()
        .take(top_k)
        .filter(|index| scores[*index] > 0.0)
        .map(|index| RetrievalHit {
            chunk_id: chunk_ids[index].clone(),
            score: scores[index],
            method,
        })
        .collect()
}

pub(crate) fn chunk_ids(chunks: &[Chunk]) -> Vec<String> {
    chunks.iter().map(|chunk| chunk.chunk_id.clone()).collect()
}
