mod enforce;
mod payload;
mod validate;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use enforce::enforce_grounding;
pub use payload::{
    empty_generation_payload, is_exact_generation_shape, normalize_generation_payload,
};
pub use validate::validate_generation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WarningCode {
    /// Structural schema violation. The only code that fails validation.
    Format,
    Empty,
    Length,
    Style,
    Grounding,
    Skill,
}

impl WarningCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Format => "FORMAT",
            Self::Empty => "EMPTY",
            Self::Length => "LENGTH",
            Self::Style => "STYLE",
            Self::Grounding => "GROUNDING",
            Self::Skill => "SKILL",
        }
    }

    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub code: WarningCode,
    pub message: String,
    pub path: String,
}

impl ValidationWarning {
    fn new(code: WarningCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn from_warnings(warnings: Vec<ValidationWarning>) -> Self {
        let ok = warnings.iter().all(|warning| !warning.code.is_blocking());
        Self { ok, warnings }
    }

    pub fn count(&self, code: WarningCode) -> usize {
        self.warnings
            .iter()
            .filter(|warning| warning.code == code)
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeBullet {
    pub text: String,
    pub evidence_chunks: Vec<String>,
    pub skills_used: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverLetter {
    pub text: String,
    pub evidence_chunks: Vec<String>,
}

/// Canonical generated content after grounding enforcement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Generation {
    pub resume_bullets: Vec<ResumeBullet>,
    pub cover_letter: CoverLetter,
    pub warnings: Vec<String>,
}

impl Generation {
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "resume_bullets": self
                .resume_bullets
                .iter()
                .map(|bullet| serde_json::json!({
                    "text": bullet.text,
                    "evidence_chunks": bullet.evidence_chunks,
                    "skills_used": bullet.skills_used,
                }))
                .collect::<Vec<Value>>(),
            "cover_letter": {
                "text": self.cover_letter.text,
                "evidence_chunks": self.cover_letter.evidence_chunks,
            },
            "warnings": self.warnings,
        })
    }
}

/// String form used for ids, skills and text found in loosely typed payloads.
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
