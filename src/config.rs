use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chunking::ChunkingOptions;
use crate::ranking::{FusionWeights, HybridRanker};
use crate::semantic::DEFAULT_EMBEDDING_DIM;

/// Run configuration. Every field has a default so a partial JSON file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub skills_path: PathBuf,
    pub stopwords_path: PathBuf,
    pub fewshot_path: PathBuf,

    pub use_tfidf: bool,
    pub use_bm25: bool,
    pub use_embeddings: bool,
    pub use_editor: bool,

    pub chunk_chars: usize,
    pub overlap_chars: usize,
    pub top_k_retrieval: usize,

    pub w_bm25: f64,
    pub w_tfidf: f64,
    pub w_embed: f64,

    pub match_threshold: f64,
    /// Ceiling applied to `match_threshold` when exactly one retrieval method is enabled.
    pub single_method_threshold_cap: f64,
    pub top_k_chunks: usize,
    pub score_weight_must: f64,

    pub max_bullet_words: usize,
    pub embedding_dim: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            skills_path: PathBuf::from("data/skills.yaml"),
            stopwords_path: PathBuf::from("data/stopwords.txt"),
            fewshot_path: PathBuf::from("data/fewshot_examples.json"),
            use_tfidf: true,
            use_bm25: true,
            use_embeddings: false,
            use_editor: false,
            chunk_chars: 430,
            overlap_chars: 60,
            top_k_retrieval: 8,
            w_bm25: 0.45,
            w_tfidf: 0.35,
            w_embed: 0.20,
            match_threshold: 0.45,
            single_method_threshold_cap: 0.30,
            top_k_chunks: 5,
            score_weight_must: 0.7,
            max_bullet_words: 28,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl PipelineConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn chunking_options(&self) -> ChunkingOptions {
        ChunkingOptions {
            chunk_chars: self.chunk_chars,
            overlap_chars: self.overlap_chars,
        }
    }

    pub fn enabled_method_count(&self) -> usize {
        [self.use_tfidf, self.use_bm25, self.use_embeddings]
            .into_iter()
            .filter(|enabled| *enabled)
            .count()
    }

    /// Configured weights with disabled methods zeroed, renormalized to sum to 1. Falls back
    /// to pure TF-IDF when nothing usable remains.
    pub fn adaptive_weights(&self) -> FusionWeights {
        let weights = FusionWeights {
            tfidf: if self.use_tfidf { self.w_tfidf } else { 0.0 },
            bm25: if self.use_bm25 { self.w_bm25 } else { 0.0 },
            embed: if self.use_embeddings { self.w_embed } else { 0.0 },
        };

        if weights.sum() <= 0.0 {
            return FusionWeights {
                tfidf: 1.0,
                bm25: 0.0,
                embed: 0.0,
            };
        }

        weights.renormalized()
    }

    pub fn adaptive_threshold(&self) -> f64 {
        if self.enabled_method_count() == 1 {
            return self.match_threshold.min(self.single_method_threshold_cap);
        }
        self.match_threshold
    }

    pub fn ranker(&self) -> Result<HybridRanker> {
        HybridRanker::new(
            self.adaptive_weights(),
            self.adaptive_threshold(),
            self.top_k_chunks,
            self.score_weight_must,
        )
        .context("invalid fusion configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_embeddings_and_renormalize_lexical_weights() {
        let config = PipelineConfig::default();
        let weights = config.adaptive_weights();
        assert!((weights.bm25 - 0.5625).abs() < 1e-12);
        assert!((weights.tfidf - 0.4375).abs() < 1e-12);
        assert_eq!(weights.embed, 0.0);
        assert_eq!(config.adaptive_threshold(), 0.45);
    }

    #[test]
    fn single_method_caps_threshold() {
        let config = PipelineConfig {
            use_bm25: false,
            ..PipelineConfig::default()
        };
        assert_eq!(config.enabled_method_count(), 1);
        assert_eq!(config.adaptive_threshold(), 0.30);
        assert_eq!(config.adaptive_weights().tfidf, 1.0);

        let lenient = PipelineConfig {
            use_bm25: false,
            match_threshold: 0.2,
            ..PipelineConfig::default()
        };
        assert_eq!(lenient.adaptive_threshold(), 0.2);

        let overridden = PipelineConfig {
            use_bm25: false,
            single_method_threshold_cap: 0.4,
            ..PipelineConfig::default()
        };
        assert_eq!(overridden.adaptive_threshold(), 0.4);
    }

    #[test]
    fn all_methods_disabled_falls_back_to_tfidf() {
        let config = PipelineConfig {
            use_tfidf: false,
            use_bm25: false,
            use_embeddings: false,
            ..PipelineConfig::default()
        };
        let weights = config.adaptive_weights();
        assert_eq!((weights.tfidf, weights.bm25, weights.embed), (1.0, 0.0, 0.0));
        assert_eq!(config.adaptive_threshold(), 0.45);
        assert!(config.ranker().is_ok());
    }

    #[test]
    fn zero_weights_on_enabled_methods_fall_back_too() {
        let config = PipelineConfig {
            w_bm25: 0.0,
            w_tfidf: 0.0,
            ..PipelineConfig::default()
        };
        assert_eq!(config.adaptive_weights().tfidf, 1.0);
    }

    #[test]
    fn all_three_methods_keep_configured_proportions() {
        let config = PipelineConfig {
            use_embeddings: true,
            ..PipelineConfig::default()
        };
        let weights = config.adaptive_weights();
        assert!((weights.sum() - 1.0).abs() < 1e-12);
        assert!((weights.embed - 0.20).abs() < 1e-12);
    }

    #[test]
    fn partial_json_config_keeps_defaults() {
        let directory = tempfile::tempdir().expect("tempdir");
        let path = directory.path().join("config.json");
        fs::write(&path, r#"{"use_embeddings": true, "match_threshold": 0.5}"#).expect("write");

        let config = PipelineConfig::load(Some(&path)).expect("load");
        assert!(config.use_embeddings);
        assert_eq!(config.match_threshold, 0.5);
        assert_eq!(config.chunk_chars, 430);
        assert_eq!(config.top_k_retrieval, 8);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let directory = tempfile::tempdir().expect("tempdir");
        let path = directory.path().join("absent.json");
        let error = PipelineConfig::load(Some(&path)).expect_err("missing file");
        assert!(format!("{error:#}").contains("failed to read config"));
    }
}
