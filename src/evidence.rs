use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::chunking::Chunk;
use crate::ranking::RequirementMatch;
use crate::taxonomy::SkillTaxonomy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceScores {
    #[serde(rename = "final")]
    pub fused: f64,
    pub tfidf: f64,
    pub bm25: f64,
    pub embed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    pub chunk_id: String,
    pub section: String,
    pub text: String,
    pub skills_found: Vec<String>,
    pub scores: EvidenceScores,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub requirement: String,
    pub matched: bool,
    pub score: f64,
    pub chunks: Vec<EvidenceChunk>,
}

/// Requirement -> supporting chunks. The ids packed here are the only ids generated content may cite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceMap {
    items: BTreeMap<String, EvidenceItem>,
}

impl EvidenceMap {
    pub fn insert(&mut self, item: EvidenceItem) {
        self.items.insert(item.requirement.clone(), item);
    }

    pub fn get(&self, requirement: &str) -> Option<&EvidenceItem> {
        self.items.get(requirement)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> impl Iterator<Item = &EvidenceItem> {
        self.items.values()
    }

    pub fn known_chunk_ids(&self) -> BTreeSet<String> {
        self.items
            .values()
            .flat_map(|item| item.chunks.iter())
            .filter(|chunk| !chunk.chunk_id.is_empty())
            .map(|chunk| chunk.chunk_id.clone())
            .collect()
    }
}

pub struct EvidenceMapBuilder<'a> {
    taxonomy: &'a SkillTaxonomy,
}

impl<'a> EvidenceMapBuilder<'a> {
    pub fn new(taxonomy: &'a SkillTaxonomy) -> Self {
        Self { taxonomy }
    }

    pub fn build(&self, matches: &[RequirementMatch], chunks: &[Chunk]) -> EvidenceMap {
        let chunk_lookup = chunks
            .iter()
            .map(|chunk| (chunk.chunk_id.as_str(), chunk))
            .collect::<HashMap<&str, &Chunk>>();

        let mut evidence = EvidenceMap::default();
        for requirement_match in matches {
            let packed = requirement_match
                .top_chunks
                .iter()
                .filter_map(|scored| {
                    let chunk = chunk_lookup.get(scored.chunk_id.as_str())?;
                    Some(EvidenceChunk {
                        chunk_id: chunk.chunk_id.clone(),
                        section: chunk.section.clone(),
                        text: chunk.text.clone(),
                        skills_found: self.taxonomy.extract_skills(&chunk.text).into_iter().collect(),
                        scores: EvidenceScores {
                            fused: scored.score_final,
                            tfidf: scored.score_lexical,
                            bm25: scored.score_probabilistic,
                            embed: scored.score_semantic,
                        },
                    })
                })
                .collect::<Vec<EvidenceChunk>>();

            evidence.insert(EvidenceItem {
                requirement: requirement_match.requirement.clone(),
                matched: requirement_match.matched,
                score: requirement_match.score,
                chunks: packed,
            });
        }

        evidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::ScoredChunk;
    use crate::taxonomy::SkillEntry;

    fn taxonomy() -> SkillTaxonomy {
        SkillTaxonomy::new([
            SkillEntry {
                canonical: "python".to_string(),
                aliases: ["py".to_string()].into_iter().collect(),
                related: BTreeSet::new(),
            },
            SkillEntry {
                canonical: "postgresql".to_string(),
                aliases: ["postgres".to_string()].into_iter().collect(),
                related: BTreeSet::new(),
            },
        ])
    }

    fn chunk(chunk_id: &str, section: &str, text: &str) -> Chunk {
        Chunk {
            chunk_id: chunk_id.to_string(),
            section: section.to_string(),
            text: text.to_string(),
            tokens: Vec::new(),
        }
    }

    fn scored(chunk_id: &str, score_final: f64) -> ScoredChunk {
        ScoredChunk {
            chunk_id: chunk_id.to_string(),
            score_final,
            score_lexical: score_final,
            score_probabilistic: 0.5,
            score_semantic: 0.0,
        }
    }

    #[test]
    fn packs_chunk_content_skills_and_scores() {
        let chunks = vec![
            chunk("experience_000", "experience", "Built Python services on Postgres clusters."),
            chunk("education_001", "education", "BS CS."),
        ];
        let matches = vec![RequirementMatch {
            requirement: "python".to_string(),
            matched: true,
            score: 0.9,
            top_chunks: vec![scored("experience_000", 0.9)],
        }];

        let taxonomy = taxonomy();
        let evidence = EvidenceMapBuilder::new(&taxonomy).build(&matches, &chunks);

        let item = evidence.get("python").expect("python evidence");
        assert!(item.matched);
        assert_eq!(item.chunks.len(), 1);
        let packed = &item.chunks[0];
        assert_eq!(packed.section, "experience");
        assert_eq!(packed.text, "Built Python services on Postgres clusters.");
        assert_eq!(packed.skills_found, vec!["postgresql", "python"]);
        assert_eq!(packed.scores.fused, 0.9);
        assert_eq!(packed.scores.bm25, 0.5);
    }

    #[test]
    fn unresolvable_chunk_ids_are_skipped() {
        let chunks = vec![chunk("experience_000", "experience", "Python.")];
        let matches = vec![RequirementMatch {
            requirement: "python".to_string(),
            matched: true,
            score: 1.0,
            top_chunks: vec![scored("ghost_042", 1.0), scored("experience_000", 0.7)],
        }];

        let taxonomy = taxonomy();
        let evidence = EvidenceMapBuilder::new(&taxonomy).build(&matches, &chunks);
        let ids = evidence.known_chunk_ids();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains("experience_000"));
    }

    #[test]
    fn unmatched_requirements_still_get_an_item() {
        let taxonomy = taxonomy();
        let matches = vec![RequirementMatch {
            requirement: "kafka".to_string(),
            matched: false,
            score: 0.0,
            top_chunks: Vec::new(),
        }];
        let evidence = EvidenceMapBuilder::new(&taxonomy).build(&matches, &[]);
        assert_eq!(evidence.len(), 1);
        assert!(evidence.get("kafka").expect("kafka").chunks.is_empty());
        assert!(evidence.known_chunk_ids().is_empty());
    }

    #[test]
    fn serializes_as_object_keyed_by_requirement() {
        let chunks = vec![chunk("skills_000", "skills", "python")];
        let matches = vec![RequirementMatch {
            requirement: "python".to_string(),
            matched: true,
            score: 1.0,
            top_chunks: vec![scored("skills_000", 1.0)],
        }];
        let taxonomy = taxonomy();
        let evidence = EvidenceMapBuilder::new(&taxonomy).build(&matches, &chunks);

        let value = serde_json::to_value(&evidence).expect("serialize");
        assert_eq!(value["python"]["chunks"][0]["chunk_id"], "skills_000");
        assert_eq!(value["python"]["chunks"][0]["scores"]["final"], 1.0);

        let restored: EvidenceMap = serde_json::from_value(value).expect("deserialize");
        assert_eq!(restored, evidence);
    }
}
