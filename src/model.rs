use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::evidence::EvidenceMap;
use crate::grounding::{Generation, ValidationResult};
use crate::jd::JdStructure;
use crate::ranking::{FusionWeights, MatchReport};
use crate::retrieval::RetrievalMethod;
use crate::util::{read_text, write_json_pretty, write_text};

pub const RESUME_EXPORT_FILE: &str = "resume.md";
pub const COVER_LETTER_EXPORT_FILE: &str = "cover_letter.md";

/// Retrieval settings actually used for a run, after adaptive weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSummary {
    pub chunk_count: usize,
    pub methods: Vec<RetrievalMethod>,
    pub weights: FusionWeights,
    pub match_threshold: f64,
}

/// Persisted record of one job description / profile run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArtifact {
    pub generated_at: String,
    pub jd_sha256: String,
    pub profile_sha256: String,
    pub retrieval: RetrievalSummary,
    pub jd: JdStructure,
    pub match_report: MatchReport,
    pub evidence_map: EvidenceMap,
    pub generation: Generation,
    pub validation: ValidationResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub resume: PathBuf,
    pub cover_letter: PathBuf,
}

impl RunArtifact {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_text(path, "run artifact")?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse run artifact: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_pretty(path, self)
    }

    pub fn write_exports(&self, directory: &Path) -> Result<ExportPaths> {
        let paths = ExportPaths {
            resume: directory.join(RESUME_EXPORT_FILE),
            cover_letter: directory.join(COVER_LETTER_EXPORT_FILE),
        };
        write_text(&paths.resume, &render_resume_markdown(&self.generation))?;
        write_text(&paths.cover_letter, &render_cover_letter_markdown(&self.generation))?;
        Ok(paths)
    }
}

pub fn render_resume_markdown(generation: &Generation) -> String {
    let mut lines = vec!["# Tailored Resume Bullets\n".to_string()];
    lines.extend(
        generation
            .resume_bullets
            .iter()
            .map(|bullet| bullet.text.trim())
            .filter(|text| !text.is_empty())
            .map(|text| format!("- {text}")),
    );
    format!("{}\n", lines.join("\n").trim())
}

pub fn render_cover_letter_markdown(generation: &Generation) -> String {
    let body = format!("# Cover Letter\n\n{}", generation.cover_letter.text.trim());
    format!("{}\n", body.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grounding::{CoverLetter, ResumeBullet};

    fn generation() -> Generation {
        Generation {
            resume_bullets: vec![
                ResumeBullet {
                    text: "Built payment services in Python".to_string(),
                    evidence_chunks: vec!["experience_001".to_string()],
                    skills_used: vec!["python".to_string()],
                },
                ResumeBullet {
                    text: "   ".to_string(),
                    evidence_chunks: vec!["experience_001".to_string()],
                    skills_used: Vec::new(),
                },
            ],
            cover_letter: CoverLetter {
                text: "Dear Acme team,\n\nI build payment systems.".to_string(),
                evidence_chunks: vec!["experience_001".to_string()],
            },
            warnings: Vec::new(),
        }
    }

    #[test]
    fn resume_markdown_lists_non_empty_bullets() {
        assert_eq!(
            render_resume_markdown(&generation()),
            "# Tailored Resume Bullets\n\n- Built payment services in Python\n"
        );
        assert_eq!(
            render_resume_markdown(&Generation::default()),
            "# Tailored Resume Bullets\n"
        );
    }

    #[test]
    fn cover_letter_markdown_keeps_paragraphs() {
        assert_eq!(
            render_cover_letter_markdown(&generation()),
            "# Cover Letter\n\nDear Acme team,\n\nI build payment systems.\n"
        );
        assert_eq!(
            render_cover_letter_markdown(&Generation::default()),
            "# Cover Letter\n"
        );
    }
}
