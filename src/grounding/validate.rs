use std::collections::BTreeSet;

use serde_json::Value;

use crate::evidence::EvidenceMap;
use crate::taxonomy::SkillTaxonomy;
use crate::text::normalize_text;

use super::{ValidationResult, ValidationWarning, WarningCode, value_to_string};

const FIRST_PERSON_MARKERS: [&str; 2] = [" i ", " my "];

/// Audits a generation payload against the evidence map. Never mutates; only FORMAT
/// warnings make the result not ok.
pub fn validate_generation(
    generation: &Value,
    evidence: &EvidenceMap,
    taxonomy: &SkillTaxonomy,
    max_bullet_words: usize,
) -> ValidationResult {
    let mut warnings = Vec::new();
    let known_ids = evidence.known_chunk_ids();

    let Value::Object(generation) = generation else {
        warnings.push(ValidationWarning::new(
            WarningCode::Format,
            "generation must be an object",
            "",
        ));
        return ValidationResult::from_warnings(warnings);
    };

    let empty = Vec::new();
    let bullets = match generation.get("resume_bullets") {
        None | Some(Value::Null) => &empty,
        Some(Value::Array(bullets)) => bullets,
        Some(_) => {
            warnings.push(ValidationWarning::new(
                WarningCode::Format,
                "resume_bullets must be a list",
                "resume_bullets",
            ));
            return ValidationResult::from_warnings(warnings);
        }
    };

    for (index, bullet) in bullets.iter().enumerate() {
        let path = format!("resume_bullets[{index}]");
        let Value::Object(bullet) = bullet else {
            warnings.push(ValidationWarning::new(
                WarningCode::Format,
                "bullet must be an object",
                path,
            ));
            continue;
        };

        let text = bullet.get("text").map(value_to_string).unwrap_or_default();
        check_bullet_text(text.trim(), &path, max_bullet_words, &mut warnings);

        check_evidence(
            bullet.get("evidence_chunks"),
            &known_ids,
            &format!("{path}.evidence_chunks"),
            "missing evidence_chunks",
            "unknown chunk_id in evidence_chunks",
            &mut warnings,
        );

        match bullet.get("skills_used") {
            None | Some(Value::Null) => {}
            Some(Value::Array(skills)) => {
                for (position, skill) in skills.iter().enumerate() {
                    if !taxonomy.is_known_skill(&value_to_string(skill)) {
                        warnings.push(ValidationWarning::new(
                            WarningCode::Skill,
                            "unknown skill in skills_used",
                            format!("{path}.skills_used[{position}]"),
                        ));
                    }
                }
            }
            Some(_) => warnings.push(ValidationWarning::new(
                WarningCode::Format,
                "skills_used must be a list",
                format!("{path}.skills_used"),
            )),
        }
    }

    match generation.get("cover_letter") {
        None | Some(Value::Null) => check_evidence(
            None,
            &known_ids,
            "cover_letter.evidence_chunks",
            "missing evidence_chunks for cover_letter",
            "unknown chunk_id in cover_letter evidence",
            &mut warnings,
        ),
        Some(Value::Object(cover)) => check_evidence(
            cover.get("evidence_chunks"),
            &known_ids,
            "cover_letter.evidence_chunks",
            "missing evidence_chunks for cover_letter",
            "unknown chunk_id in cover_letter evidence",
            &mut warnings,
        ),
        Some(_) => warnings.push(ValidationWarning::new(
            WarningCode::Format,
            "cover_letter must be an object",
            "cover_letter",
        )),
    }

    ValidationResult::from_warnings(warnings)
}

fn check_bullet_text(
    text: &str,
    path: &str,
    max_bullet_words: usize,
    warnings: &mut Vec<ValidationWarning>,
) {
    let text_path = format!("{path}.text");
    if text.is_empty() {
        warnings.push(ValidationWarning::new(
            WarningCode::Empty,
            "bullet text is empty",
            text_path,
        ));
        return;
    }

    let word_count = text.split_whitespace().count();
    if word_count > max_bullet_words {
        warnings.push(ValidationWarning::new(
            WarningCode::Length,
            format!("bullet too long: {word_count} words"),
            text_path.clone(),
        ));
    }

    let padded = format!(" {} ", normalize_text(text));
    if FIRST_PERSON_MARKERS
        .iter()
        .any(|marker| padded.contains(marker))
    {
        warnings.push(ValidationWarning::new(
            WarningCode::Style,
            "first-person pronoun in resume bullet",
            text_path,
        ));
    }
}

fn check_evidence(
    evidence_chunks: Option<&Value>,
    known_ids: &BTreeSet<String>,
    path: &str,
    missing_message: &str,
    unknown_message: &str,
    warnings: &mut Vec<ValidationWarning>,
) {
    let cited = match evidence_chunks {
        Some(Value::Array(cited)) if !cited.is_empty() => cited,
        _ => {
            warnings.push(ValidationWarning::new(
                WarningCode::Grounding,
                missing_message,
                path,
            ));
            return;
        }
    };

    for (position, chunk_id) in cited.iter().enumerate() {
        if !known_ids.contains(&value_to_string(chunk_id)) {
            warnings.push(ValidationWarning::new(
                WarningCode::Grounding,
                unknown_message,
                format!("{path}[{position}]"),
            ));
        }
    }
}
