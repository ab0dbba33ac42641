use serde_json::{Map, Value, json};

const GENERATION_KEYS: [&str; 3] = ["resume_bullets", "cover_letter", "warnings"];

const WRAPPER_KEYS: [&str; 4] = ["format", "generation", "output", "result"];

pub fn empty_generation_payload() -> Value {
    json!({
        "resume_bullets": [],
        "cover_letter": {"text": "", "evidence_chunks": []},
        "warnings": [],
    })
}

/// Total mapping from whatever a generator returned to the canonical top-level shape.
/// Bullet elements are left as received so the validator still sees their defects.
pub fn normalize_generation_payload(payload: Value) -> Value {
    let Value::Object(mut object) = payload else {
        return empty_generation_payload();
    };

    for key in WRAPPER_KEYS {
        if carries_generation(object.get(key)) {
            let inner = object.remove(key);
            if let Some(Value::Object(inner)) = inner {
                object = inner;
            }
            break;
        }
    }

    let resume_bullets = match object.remove("resume_bullets") {
        Some(Value::Array(bullets)) => Value::Array(bullets),
        _ => Value::Array(Vec::new()),
    };

    let cover_letter = match object.remove("cover_letter") {
        Some(Value::Object(cover)) => Value::Object(normalize_cover_letter(cover)),
        _ => json!({"text": "", "evidence_chunks": []}),
    };

    let warnings = match object.remove("warnings") {
        Some(Value::Array(warnings)) => Value::Array(warnings),
        _ => Value::Array(Vec::new()),
    };

    json!({
        "resume_bullets": resume_bullets,
        "cover_letter": cover_letter,
        "warnings": warnings,
    })
}

/// Strict check applied to editor output: exactly the three top-level keys and fully
/// formed bullet and cover letter records.
pub fn is_exact_generation_shape(payload: &Value) -> bool {
    let Value::Object(object) = payload else {
        return false;
    };

    if object.len() != GENERATION_KEYS.len()
        || !GENERATION_KEYS.iter().all(|key| object.contains_key(*key))
    {
        return false;
    }

    let Some(Value::Array(bullets)) = object.get("resume_bullets") else {
        return false;
    };
    if !matches!(object.get("warnings"), Some(Value::Array(_))) {
        return false;
    }

    let Some(Value::Object(cover)) = object.get("cover_letter") else {
        return false;
    };
    if !cover.contains_key("text") || !matches!(cover.get("evidence_chunks"), Some(Value::Array(_)))
    {
        return false;
    }

    bullets.iter().all(|bullet| {
        let Value::Object(bullet) = bullet else {
            return false;
        };
        bullet.contains_key("text")
            && matches!(bullet.get("evidence_chunks"), Some(Value::Array(_)))
            && matches!(bullet.get("skills_used"), Some(Value::Array(_)))
    })
}

fn carries_generation(value: Option<&Value>) -> bool {
    matches!(
        value,
        Some(Value::Object(inner)) if inner.contains_key("resume_bullets") || inner.contains_key("cover_letter")
    )
}

fn normalize_cover_letter(mut cover: Map<String, Value>) -> Map<String, Value> {
    if !matches!(cover.get("text"), Some(Value::String(_))) {
        cover.insert("text".to_string(), Value::String(String::new()));
    }
    if !matches!(cover.get("evidence_chunks"), Some(Value::Array(_))) {
        cover.insert("evidence_chunks".to_string(), Value::Array(Vec::new()));
    }
    cover
}
