use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::chunking::Chunk;
use crate::semantic::{Embedder, inner_product, normalize_vector};
use crate::text::normalize_text;

use super::{RetrievalHit, RetrievalMethod, Retriever, chunk_ids, rank_scores};

/// Exact inner-product nearest-neighbour search over L2-normalized chunk embeddings.
pub struct EmbedIndex {
    chunk_ids: Vec<String>,
    vectors: Vec<Vec<f32>>,
    dimensions: usize,
    embedder: Arc<dyn Embedder>,
}

impl std::fmt::Debug for EmbedIndex {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("EmbedIndex")
            .field("chunks", &self.chunk_ids.len())
            .field("dimensions", &self.dimensions)
            .field("embedder", &self.embedder.name())
            .finish()
    }
}

impl EmbedIndex {
    pub fn build(chunks: &[Chunk], embedder: Arc<dyn Embedder>) -> Result<Self> {
        let texts = chunks
            .iter()
            .map(|chunk| normalize_text(&chunk.text))
            .collect::<Vec<String>>();

        let mut vectors = embedder
            .embed(&texts)
            .with_context(|| format!("embedder '{}' failed on chunk texts", embedder.name()))?;

        if vectors.len() != texts.len() {
            bail!(
                "embedder '{}' returned {} vectors for {} chunks",
                embedder.name(),
                vectors.len(),
                texts.len()
            );
        }

        let dimensions = vectors.first().map(Vec::len).unwrap_or(0);
        if vectors.iter().any(|vector| vector.len() != dimensions) {
            bail!(
                "embedder '{}' returned vectors of inconsistent dimension",
                embedder.name()
            );
        }

        for vector in &mut vectors {
            normalize_vector(vector);
        }

        Ok(Self {
            chunk_ids: chunk_ids(chunks),
            vectors,
            dimensions,
            embedder,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed_query(&self, query_text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embedder.embed(&[normalize_text(query_text)])?;
        let Some(mut vector) = vectors.pop() else {
            bail!("embedder '{}' returned no query vector", self.embedder.name());
        };
        normalize_vector(&mut vector);
        Ok(vector)
    }
}

impl Retriever for EmbedIndex {
    fn method(&self) -> RetrievalMethod {
        RetrievalMethod::Semantic
    }

    fn query(&self, query_text: &str, top_k: usize) -> Vec<RetrievalHit> {
        if query_text.trim().is_empty() || self.vectors.is_empty() {
            return Vec::new();
        }

        let query_vector = match self.embed_query(query_text) {
            Ok(vector) => vector,
            Err(err) => {
                warn!(
                    embedder = self.embedder.name(),
                    error = %err,
                    "query embedding failed; semantic signal empty for this query"
                );
                return Vec::new();
            }
        };

        let scores = self
            .vectors
            .iter()
            .map(|vector| inner_product(&query_vector, vector))
            .collect::<Vec<f64>>();
        rank_scores(&self.chunk_ids, &scores, top_k, self.method())
    }
}
