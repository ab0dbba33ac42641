use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::retrieval::RetrievalHit;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub tfidf: f64,
    pub bm25: f64,
    pub embed: f64,
}

impl FusionWeights {
    pub fn sum(&self) -> f64 {
        self.tfidf + self.bm25 + self.embed
    }

    /// Divides each weight by the total. Callers must ensure the total is positive.
    pub fn renormalized(self) -> Self {
        let total = self.sum();
        Self {
            tfidf: self.tfidf / total,
            bm25: self.bm25 / total,
            embed: self.embed / total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk_id: String,
    pub score_final: f64,
    pub score_lexical: f64,
    pub score_probabilistic: f64,
    pub score_semantic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementMatch {
    pub requirement: String,
    pub matched: bool,
    pub score: f64,
    pub top_chunks: Vec<ScoredChunk>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    #[serde(rename = "match_score_must")]
    pub score_must: u32,
    #[serde(rename = "match_score_nice")]
    pub score_nice: u32,
    #[serde(rename = "match_score_overall")]
    pub score_overall: u32,
    pub matched_requirements: Vec<String>,
    pub missing_requirements: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct HybridRanker {
    weights: FusionWeights,
    match_threshold: f64,
    top_k_chunks: usize,
    score_weight_must: f64,
}

impl HybridRanker {
    pub fn new(
        weights: FusionWeights,
        match_threshold: f64,
        top_k_chunks: usize,
        score_weight_must: f64,
    ) -> Result<Self> {
        if weights.tfidf < 0.0 || weights.bm25 < 0.0 || weights.embed < 0.0 {
            bail!("fusion weights must not be negative: {weights:?}");
        }
        if weights.sum() <= 0.0 {
            bail!("at least one fusion weight must be positive");
        }

        Ok(Self {
            weights: weights.renormalized(),
            match_threshold,
            top_k_chunks,
            score_weight_must,
        })
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    pub fn match_threshold(&self) -> f64 {
        self.match_threshold
    }

    /// Min-max normalizes each method's hits independently, then takes the weighted sum per
    /// chunk. A chunk missing from a method scores 0 for it.
    pub fn rank_requirement(
        &self,
        requirement: &str,
        hits_tfidf: &[RetrievalHit],
        hits_bm25: &[RetrievalHit],
        hits_embed: &[RetrievalHit],
    ) -> RequirementMatch {
        let normalized_tfidf = min_max_normalize(hits_tfidf);
        let normalized_bm25 = min_max_normalize(hits_bm25);
        let normalized_embed = min_max_normalize(hits_embed);

        let mut seen = HashSet::<&str>::new();
        let candidate_ids = hits_tfidf
            .iter()
            .chain(hits_bm25)
            .chain(hits_embed)
            .map(|hit| hit.chunk_id.as_str())
            .filter(|chunk_id| seen.insert(chunk_id))
            .collect::<Vec<&str>>();

        let mut scored = candidate_ids
            .into_iter()
            .map(|chunk_id| {
                let score_lexical = normalized_tfidf.get(chunk_id).copied().unwrap_or(0.0);
                let score_probabilistic = normalized_bm25.get(chunk_id).copied().unwrap_or(0.0);
                let score_semantic = normalized_embed.get(chunk_id).copied().unwrap_or(0.0);
                let score_final = (self.weights.tfidf * score_lexical
                    + self.weights.bm25 * score_probabilistic
                    + self.weights.embed * score_semantic)
                    .clamp(0.0, 1.0);

                ScoredChunk {
                    chunk_id: chunk_id.to_string(),
                    score_final,
                    score_lexical,
                    score_probabilistic,
                    score_semantic,
                }
            })
            .collect::<Vec<ScoredChunk>>();

        scored.sort_by(|left, right| right.score_final.total_cmp(&left.score_final));
        scored.truncate(self.top_k_chunks);

        let score = scored.first().map(|top| top.score_final).unwrap_or(0.0);
        RequirementMatch {
            requirement: requirement.to_string(),
            matched: score >= self.match_threshold,
            score,
            top_chunks: scored,
        }
    }

    pub fn build_report(
        &self,
        matches: &[RequirementMatch],
        must_have: &[String],
        nice_to_have: &[String],
    ) -> MatchReport {
        if matches.is_empty() {
            return MatchReport::default();
        }

        let matched_requirements = distinct_requirements(matches, true);
        let missing_requirements = distinct_requirements(matches, false);

        let matched_set = matched_requirements
            .iter()
            .map(String::as_str)
            .collect::<HashSet<&str>>();
        let must_set = must_have.iter().map(String::as_str).collect::<HashSet<&str>>();
        let nice_set = nice_to_have.iter().map(String::as_str).collect::<HashSet<&str>>();

        let must_matched = must_set.intersection(&matched_set).count();
        let nice_matched = nice_set.intersection(&matched_set).count();

        let score_must = percentage(must_matched, must_set.len());
        let score_nice = percentage(nice_matched, nice_set.len());

        let weight_must = self.score_weight_must.clamp(0.0, 1.0);
        let overall =
            weight_must * f64::from(score_must) + (1.0 - weight_must) * f64::from(score_nice);

        MatchReport {
            score_must,
            score_nice,
            score_overall: overall.round_ties_even().clamp(0.0, 100.0) as u32,
            matched_requirements,
            missing_requirements,
        }
    }
}

/// Rescales one method's scores to [0, 1]. Equal scores map to 1.0 when positive, else 0.0.
pub fn min_max_normalize(hits: &[RetrievalHit]) -> HashMap<String, f64> {
    let Some(first) = hits.first() else {
        return HashMap::new();
    };

    let (minimum, maximum) = hits.iter().fold((first.score, first.score), |(low, high), hit| {
        (low.min(hit.score), high.max(hit.score))
    });

    if maximum == minimum {
        let value = if maximum > 0.0 { 1.0 } else { 0.0 };
        return hits
            .iter()
            .map(|hit| (hit.chunk_id.clone(), value))
            .collect();
    }

    let range = maximum - minimum;
    hits.iter()
        .map(|hit| (hit.chunk_id.clone(), (hit.score - minimum) / range))
        .collect()
}

/// Requirement strings with the given outcome, first occurrence kept.
fn distinct_requirements(matches: &[RequirementMatch], matched: bool) -> Vec<String> {
    let mut seen = HashSet::<&str>::new();
    matches
        .iter()
        .filter(|entry| entry.matched == matched)
        .filter(|entry| seen.insert(entry.requirement.as_str()))
        .map(|entry| entry.requirement.clone())
        .collect()
}

fn percentage(matched: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * matched as f64 / total as f64).round_ties_even().clamp(0.0, 100.0) as u32
}
