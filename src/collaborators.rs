use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::evidence::EvidenceMap;
use crate::grounding::{Generation, ValidationWarning, is_exact_generation_shape};
use crate::jd::JdStructure;
use crate::ranking::MatchReport;

pub const GENERATOR_FAILED_WARNING: &str = "generator failed; produced empty generation";
pub const EDITOR_FAILED_WARNING: &str =
    "editor failed or returned invalid JSON; kept original generation.";
pub const EDITOR_SCHEMA_WARNING: &str =
    "editor returned unexpected schema; kept original generation.";

#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest<'a> {
    pub jd: &'a JdStructure,
    pub match_report: &'a MatchReport,
    pub evidence_map: &'a EvidenceMap,
    pub profile_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fewshot_examples: Option<&'a [Value]>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditRequest<'a> {
    pub generation: &'a Generation,
    pub validation_warnings: &'a [ValidationWarning],
    pub evidence_map: &'a EvidenceMap,
}

/// Produces bullets and a cover letter from the evidence. The returned JSON is untrusted and
/// goes through normalization, validation and enforcement.
pub trait Generator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Value>;

    fn name(&self) -> &str;
}

/// Rewrites an enforced generation for style. Output must match the generation shape exactly.
pub trait Editor {
    fn edit(&self, request: &EditRequest<'_>) -> Result<Value>;

    fn name(&self) -> &str;
}

impl<F> Generator for F
where
    F: Fn(&GenerationRequest<'_>) -> Result<Value>,
{
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<Value> {
        self(request)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

impl<F> Editor for F
where
    F: Fn(&EditRequest<'_>) -> Result<Value>,
{
    fn edit(&self, request: &EditRequest<'_>) -> Result<Value> {
        self(request)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Replays a generation response saved to disk.
#[derive(Debug, Clone)]
pub struct FileGenerator {
    pub path: PathBuf,
}

impl Generator for FileGenerator {
    fn generate(&self, _request: &GenerationRequest<'_>) -> Result<Value> {
        read_json(&self.path, "generation response")
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[derive(Debug, Clone)]
pub struct FileEditor {
    pub path: PathBuf,
}

impl Editor for FileEditor {
    fn edit(&self, _request: &EditRequest<'_>) -> Result<Value> {
        read_json(&self.path, "editor response")
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Calls the generator; a failure becomes an empty payload carrying a warning.
pub fn generate_or_fallback(generator: &dyn Generator, request: &GenerationRequest<'_>) -> Value {
    match generator.generate(request) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(
                generator = generator.name(),
                error = %format!("{err:#}"),
                "generation failed; continuing with empty generation"
            );
            Generation {
                warnings: vec![GENERATOR_FAILED_WARNING.to_string()],
                ..Generation::default()
            }
            .to_value()
        }
    }
}

/// Calls the editor; a failure or any shape deviation keeps `original` with a warning appended.
pub fn edit_or_fallback(
    editor: &dyn Editor,
    request: &EditRequest<'_>,
    original: &Generation,
) -> Value {
    match editor.edit(request) {
        Ok(edited) if is_exact_generation_shape(&edited) => edited,
        Ok(_) => {
            warn!(editor = editor.name(), "editor returned unexpected schema");
            with_warning(original, EDITOR_SCHEMA_WARNING)
        }
        Err(err) => {
            warn!(
                editor = editor.name(),
                error = %format!("{err:#}"),
                "editor failed"
            );
            with_warning(original, EDITOR_FAILED_WARNING)
        }
    }
}

/// JSON list of few-shot examples. Missing or malformed files yield none.
pub fn load_fewshot_examples(path: &Path) -> Vec<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "no few-shot examples file");
        return Vec::new();
    }

    match read_json(path, "few-shot examples") {
        Ok(Value::Array(examples)) => examples,
        Ok(_) => {
            warn!(path = %path.display(), "few-shot examples are not a list; ignoring");
            Vec::new()
        }
        Err(err) => {
            warn!(path = %path.display(), error = %format!("{err:#}"), "ignoring few-shot examples");
            Vec::new()
        }
    }
}

fn with_warning(generation: &Generation, message: &str) -> Value {
    let mut kept = generation.clone();
    kept.warnings.push(message.to_string());
    kept.to_value()
}

fn read_json(path: &Path, label: &str) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {label}: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {label}: {}", path.display()))
}
