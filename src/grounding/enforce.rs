use std::collections::BTreeSet;

use serde_json::Value;

use crate::evidence::EvidenceMap;
use crate::taxonomy::SkillTaxonomy;

use super::{CoverLetter, Generation, ResumeBullet, value_to_string};

/// Deterministic sanitizer. Bullets are kept or dropped individually; the cover letter is
/// kept whole or blanked. Never fails.
pub fn enforce_grounding(
    generation: &Value,
    evidence: &EvidenceMap,
    taxonomy: &SkillTaxonomy,
) -> Generation {
    let known_ids = evidence.known_chunk_ids();

    let resume_bullets = match generation.get("resume_bullets") {
        Some(Value::Array(bullets)) => bullets
            .iter()
            .filter_map(|bullet| grounded_bullet(bullet, &known_ids, taxonomy))
            .collect(),
        _ => Vec::new(),
    };

    let cover_letter = generation
        .get("cover_letter")
        .and_then(|cover| grounded_cover_letter(cover, &known_ids))
        .unwrap_or_default();

    let warnings = match generation.get("warnings") {
        Some(Value::Array(warnings)) => warnings.iter().map(value_to_string).collect(),
        _ => Vec::new(),
    };

    Generation {
        resume_bullets,
        cover_letter,
        warnings,
    }
}

fn grounded_bullet(
    bullet: &Value,
    known_ids: &BTreeSet<String>,
    taxonomy: &SkillTaxonomy,
) -> Option<ResumeBullet> {
    let Value::Object(bullet) = bullet else {
        return None;
    };

    let text = bullet
        .get("text")
        .map(value_to_string)
        .unwrap_or_default()
        .trim()
        .to_string();
    if text.is_empty() {
        return None;
    }

    let evidence_chunks = cited_ids(bullet.get("evidence_chunks"), known_ids)?;

    let skills_used = match bullet.get("skills_used") {
        Some(Value::Array(skills)) => skills
            .iter()
            .map(value_to_string)
            .filter(|skill| taxonomy.is_known_skill(skill))
            .collect(),
        _ => Vec::new(),
    };

    Some(ResumeBullet {
        text,
        evidence_chunks,
        skills_used,
    })
}

fn grounded_cover_letter(cover: &Value, known_ids: &BTreeSet<String>) -> Option<CoverLetter> {
    let Value::Object(cover) = cover else {
        return None;
    };

    let evidence_chunks = cited_ids(cover.get("evidence_chunks"), known_ids)?;
    Some(CoverLetter {
        text: cover.get("text").map(value_to_string).unwrap_or_default(),
        evidence_chunks,
    })
}

/// Stringified citations, or `None` when the list is missing, empty, or cites an unknown id.
fn cited_ids(evidence_chunks: Option<&Value>, known_ids: &BTreeSet<String>) -> Option<Vec<String>> {
    let Some(Value::Array(cited)) = evidence_chunks else {
        return None;
    };
    if cited.is_empty() {
        return None;
    }

    let ids = cited.iter().map(value_to_string).collect::<Vec<String>>();
    ids.iter()
        .all(|chunk_id| known_ids.contains(chunk_id))
        .then_some(ids)
}
