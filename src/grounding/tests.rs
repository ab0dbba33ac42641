use std::collections::BTreeSet;

use serde_json::{Value, json};

use super::*;
use crate::evidence::{EvidenceChunk, EvidenceItem, EvidenceMap, EvidenceScores};
use crate::taxonomy::{SkillEntry, SkillTaxonomy};

fn taxonomy() -> SkillTaxonomy {
    SkillTaxonomy::new([
        SkillEntry {
            canonical: "python".to_string(),
            aliases: ["py".to_string()].into_iter().collect(),
            related: BTreeSet::new(),
        },
        SkillEntry {
            canonical: "kubernetes".to_string(),
            aliases: ["k8s".to_string()].into_iter().collect(),
            related: BTreeSet::new(),
        },
    ])
}

fn evidence(chunk_ids: &[&str]) -> EvidenceMap {
    let mut evidence = EvidenceMap::default();
    evidence.insert(EvidenceItem {
        requirement: "python".to_string(),
        matched: true,
        score: 0.9,
        chunks: chunk_ids
            .iter()
            .map(|chunk_id| EvidenceChunk {
                chunk_id: chunk_id.to_string(),
                section: "experience".to_string(),
                text: "Built payment services in Python.".to_string(),
                skills_found: vec!["python".to_string()],
                scores: EvidenceScores {
                    fused: 0.9,
                    tfidf: 1.0,
                    bm25: 1.0,
                    embed: 0.0,
                },
            })
            .collect(),
    });
    evidence
}

fn grounded_payload() -> Value {
    json!({
        "resume_bullets": [
            {
                "text": "Built payment services in Python handling card settlements",
                "evidence_chunks": ["c1"],
                "skills_used": ["python"]
            }
        ],
        "cover_letter": {"text": "Dear team, ...", "evidence_chunks": ["c1"]},
        "warnings": []
    })
}

fn codes(result: &ValidationResult) -> Vec<WarningCode> {
    result.warnings.iter().map(|warning| warning.code).collect()
}

#[test]
fn grounded_payload_validates_cleanly() {
    let result = validate_generation(&grounded_payload(), &evidence(&["c1"]), &taxonomy(), 28);
    assert!(result.ok);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
}

#[test]
fn non_list_bullets_short_circuit_with_format() {
    let payload = json!({"resume_bullets": "oops", "cover_letter": 7});
    let result = validate_generation(&payload, &evidence(&["c1"]), &taxonomy(), 28);
    assert!(!result.ok);
    assert_eq!(codes(&result), vec![WarningCode::Format]);
    assert_eq!(result.warnings[0].path, "resume_bullets");
}

#[test]
fn content_checks_are_advisory() {
    let long_text = std::iter::repeat_n("word", 30).collect::<Vec<&str>>().join(" ");
    let payload = json!({
        "resume_bullets": [
            {"text": "  ", "evidence_chunks": ["c1"], "skills_used": []},
            {"text": long_text, "evidence_chunks": ["c1"], "skills_used": []},
            {"text": "I led my team to ship Python services", "evidence_chunks": ["c1"], "skills_used": ["cobol"]}
        ],
        "cover_letter": {"text": "Hello", "evidence_chunks": ["c1"]}
    });

    let result = validate_generation(&payload, &evidence(&["c1"]), &taxonomy(), 28);
    assert!(result.ok);
    assert_eq!(
        codes(&result),
        vec![
            WarningCode::Empty,
            WarningCode::Length,
            WarningCode::Style,
            WarningCode::Skill
        ]
    );
    assert_eq!(result.warnings[0].path, "resume_bullets[0].text");
    assert_eq!(result.warnings[1].message, "bullet too long: 30 words");
    assert_eq!(result.warnings[3].path, "resume_bullets[2].skills_used[0]");
}

#[test]
fn grounding_warnings_point_at_offending_citations() {
    let payload = json!({
        "resume_bullets": [
            {"text": "Shipped Python services", "evidence_chunks": [], "skills_used": []},
            {"text": "Ran k8s clusters", "evidence_chunks": ["c1", "x_099"], "skills_used": ["k8s"]}
        ],
        "cover_letter": {"text": "Hello", "evidence_chunks": ["nope"]}
    });

    let result = validate_generation(&payload, &evidence(&["c1"]), &taxonomy(), 28);
    assert!(result.ok);
    assert_eq!(result.count(WarningCode::Grounding), 3);
    let paths = result
        .warnings
        .iter()
        .map(|warning| warning.path.as_str())
        .collect::<Vec<&str>>();
    assert_eq!(
        paths,
        vec![
            "resume_bullets[0].evidence_chunks",
            "resume_bullets[1].evidence_chunks[1]",
            "cover_letter.evidence_chunks[0]"
        ]
    );
}

#[test]
fn malformed_bullet_and_skill_lists_are_format_errors() {
    let payload = json!({
        "resume_bullets": [
            "just a string",
            {"text": "Python work", "evidence_chunks": ["c1"], "skills_used": "python"}
        ],
        "cover_letter": {"text": "Hello", "evidence_chunks": ["c1"]}
    });

    let result = validate_generation(&payload, &evidence(&["c1"]), &taxonomy(), 28);
    assert!(!result.ok);
    assert_eq!(result.count(WarningCode::Format), 2);
    assert_eq!(result.warnings[1].path, "resume_bullets[1].skills_used");
}

#[test]
fn missing_cover_letter_is_a_grounding_warning() {
    let payload = json!({"resume_bullets": []});
    let result = validate_generation(&payload, &evidence(&["c1"]), &taxonomy(), 28);
    assert!(result.ok);
    assert_eq!(codes(&result), vec![WarningCode::Grounding]);
    assert_eq!(result.warnings[0].path, "cover_letter.evidence_chunks");
}

#[test]
fn warning_codes_serialize_uppercase() {
    let warning = ValidationWarning::new(WarningCode::Grounding, "missing", "cover_letter");
    let value = serde_json::to_value(&warning).expect("serialize");
    assert_eq!(value["code"], "GROUNDING");
    assert_eq!(WarningCode::Skill.as_str(), "SKILL");
}

#[test]
fn enforcement_drops_bullet_citing_unknown_chunk() {
    let payload = json!({
        "resume_bullets": [
            {"text": "Invented the transistor", "evidence_chunks": ["x_099"], "skills_used": []},
            {"text": "Built payment services in Python", "evidence_chunks": ["c1"], "skills_used": ["python"]}
        ],
        "cover_letter": {"text": "Dear team", "evidence_chunks": ["c1"]},
        "warnings": []
    });

    let enforced = enforce_grounding(&payload, &evidence(&["c1"]), &taxonomy());
    assert_eq!(
        enforced.resume_bullets,
        vec![ResumeBullet {
            text: "Built payment services in Python".to_string(),
            evidence_chunks: vec!["c1".to_string()],
            skills_used: vec!["python".to_string()],
        }]
    );
}

#[test]
fn enforcement_keeps_or_blanks_cover_letter_whole() {
    let evidence = evidence(&["c1"]);
    let taxonomy = taxonomy();

    let kept = enforce_grounding(&grounded_payload(), &evidence, &taxonomy);
    assert_eq!(kept.cover_letter.text, "Dear team, ...");
    assert_eq!(kept.cover_letter.evidence_chunks, vec!["c1"]);

    let mut tampered = grounded_payload();
    tampered["cover_letter"]["evidence_chunks"] = json!(["c7"]);
    let blanked = enforce_grounding(&tampered, &evidence, &taxonomy);
    assert_eq!(blanked.cover_letter, CoverLetter::default());
    assert_eq!(blanked.resume_bullets.len(), 1);
}

#[test]
fn enforcement_filters_unknown_skills_and_trims_text() {
    let payload = json!({
        "resume_bullets": [
            {"text": "  Ran k8s clusters  ", "evidence_chunks": ["c1"], "skills_used": ["k8s", "cobol"]},
            {"text": "", "evidence_chunks": ["c1"], "skills_used": []},
            {"text": "No citations", "skills_used": []},
            42
        ],
        "cover_letter": "not an object",
        "warnings": ["model note", 3]
    });

    let enforced = enforce_grounding(&payload, &evidence(&["c1"]), &taxonomy());
    assert_eq!(enforced.resume_bullets.len(), 1);
    assert_eq!(enforced.resume_bullets[0].text, "Ran k8s clusters");
    assert_eq!(enforced.resume_bullets[0].skills_used, vec!["k8s"]);
    assert_eq!(enforced.cover_letter, CoverLetter::default());
    assert_eq!(enforced.warnings, vec!["model note", "3"]);
}

#[test]
fn enforcement_stringifies_numeric_ids() {
    let payload = json!({
        "resume_bullets": [{"text": "Python work", "evidence_chunks": [7], "skills_used": []}],
        "cover_letter": {"text": "Hi", "evidence_chunks": [7]}
    });
    let enforced = enforce_grounding(&payload, &evidence(&["7"]), &taxonomy());
    assert_eq!(enforced.resume_bullets[0].evidence_chunks, vec!["7"]);
    assert_eq!(enforced.cover_letter.evidence_chunks, vec!["7"]);
}

#[test]
fn enforcement_is_idempotent() {
    let evidence = evidence(&["c1", "c2"]);
    let taxonomy = taxonomy();
    let payload = json!({
        "resume_bullets": [
            {"text": " Shipped k8s operators ", "evidence_chunks": ["c2"], "skills_used": ["k8s", "rust?"]},
            {"text": "Fabricated claim", "evidence_chunks": ["c1", "c9"], "skills_used": []},
            "junk"
        ],
        "cover_letter": {"text": "  Dear team  ", "evidence_chunks": ["c1"]},
        "warnings": ["low evidence"]
    });

    let once = enforce_grounding(&payload, &evidence, &taxonomy);
    let twice = enforce_grounding(&once.to_value(), &evidence, &taxonomy);
    assert_eq!(once, twice);
}

#[test]
fn enforced_generation_validates_without_grounding_warnings_on_bullets() {
    let evidence = evidence(&["c1"]);
    let taxonomy = taxonomy();
    let payload = json!({
        "resume_bullets": [
            {"text": "Good", "evidence_chunks": ["c1"], "skills_used": ["python", "cobol"]},
            {"text": "Bad", "evidence_chunks": ["zz"], "skills_used": []}
        ],
        "cover_letter": {"text": "Hello", "evidence_chunks": ["c1"]}
    });

    let enforced = enforce_grounding(&payload, &evidence, &taxonomy);
    let result = validate_generation(&enforced.to_value(), &evidence, &taxonomy, 28);
    assert!(result.ok);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
}

#[test]
fn normalization_maps_any_shape_to_canonical_keys() {
    assert_eq!(normalize_generation_payload(json!("text")), empty_generation_payload());
    assert_eq!(normalize_generation_payload(Value::Null), empty_generation_payload());

    let normalized = normalize_generation_payload(json!({
        "resume_bullets": {"text": "not a list"},
        "cover_letter": {"text": 12},
        "warnings": "none",
        "extra": true
    }));
    assert_eq!(
        normalized,
        json!({
            "resume_bullets": [],
            "cover_letter": {"text": "", "evidence_chunks": []},
            "warnings": []
        })
    );
}

#[test]
fn normalization_unwraps_one_wrapper_level() {
    let normalized = normalize_generation_payload(json!({
        "output": {
            "resume_bullets": [{"text": "kept as received", "evidence_chunks": "c1"}],
            "cover_letter": {"text": "Hi", "evidence_chunks": ["c1"]}
        }
    }));
    assert_eq!(
        normalized["resume_bullets"][0],
        json!({"text": "kept as received", "evidence_chunks": "c1"})
    );
    assert_eq!(normalized["cover_letter"]["text"], "Hi");
    assert_eq!(normalized["warnings"], json!([]));

    let unrelated = normalize_generation_payload(json!({"result": {"score": 3}}));
    assert_eq!(unrelated, empty_generation_payload());
}

#[test]
fn normalized_output_is_idempotent() {
    let once = normalize_generation_payload(json!({
        "generation": {"resume_bullets": [1, 2], "cover_letter": null}
    }));
    let twice = normalize_generation_payload(once.clone());
    assert_eq!(once, twice);
}

#[test]
fn exact_shape_requires_only_the_canonical_keys() {
    assert!(is_exact_generation_shape(&grounded_payload()));
    assert!(is_exact_generation_shape(&Generation::default().to_value()));

    let mut extra = grounded_payload();
    extra["notes"] = json!("added by editor");
    assert!(!is_exact_generation_shape(&extra));

    let mut missing = grounded_payload();
    missing
        .as_object_mut()
        .expect("object")
        .remove("warnings");
    assert!(!is_exact_generation_shape(&missing));

    let mut broken_bullet = grounded_payload();
    broken_bullet["resume_bullets"][0]["skills_used"] = json!("python");
    assert!(!is_exact_generation_shape(&broken_bullet));

    let mut broken_cover = grounded_payload();
    broken_cover["cover_letter"] = json!({"text": "Hi"});
    assert!(!is_exact_generation_shape(&broken_cover));

    assert!(!is_exact_generation_shape(&json!([1, 2, 3])));
}
