use std::collections::HashSet;
use std::io::{self, Write};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::cli::MatchArgs;
use crate::collaborators::{Editor, FileEditor, FileGenerator, GenerationRequest, Generator};
use crate::config::PipelineConfig;
use crate::grounding::empty_generation_payload;
use crate::jd::JdStructure;
use crate::model::RunArtifact;
use crate::pipeline::{Pipeline, RunRequest};
use crate::util::{ensure_directory, read_text};

pub fn run(args: MatchArgs) -> Result<()> {
    let mut config = args.data.load_config()?;
    apply_overrides(&mut config, &args);

    let jd_text = read_text(&args.jd, "job description")?;
    let profile_text = read_text(&args.profile, "profile")?;
    let jd_structure = args
        .jd_structure
        .as_deref()
        .map(JdStructure::from_json_path)
        .transpose()?;

    let generator: Box<dyn Generator> = match &args.generation {
        Some(path) => Box::new(FileGenerator { path: path.clone() }),
        None => {
            info!("no generation response supplied; grounding an empty generation");
            Box::new(empty_generation)
        }
    };
    let editor = args
        .edited
        .as_ref()
        .map(|path| FileEditor { path: path.clone() });

    let pipeline = Pipeline::from_config(config)?;
    let artifact = pipeline.run(
        RunRequest {
            jd_text: &jd_text,
            profile_text: &profile_text,
            jd_structure,
        },
        generator.as_ref(),
        editor.as_ref().map(|editor| editor as &dyn Editor),
    )?;

    if let Some(path) = &args.output {
        artifact.save(path)?;
        info!(path = %path.display(), "wrote run artifact");
    }

    if let Some(directory) = &args.export_dir {
        ensure_directory(directory)?;
        let exports = artifact.write_exports(directory)?;
        info!(
            resume = %exports.resume.display(),
            cover_letter = %exports.cover_letter.display(),
            "wrote exports"
        );
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &artifact)
            .context("failed to serialize run artifact json output")?;
        writeln!(output)?;
    } else {
        write_text_summary(&mut output, &artifact)?;
    }
    output.flush()?;

    Ok(())
}

fn empty_generation(_request: &GenerationRequest<'_>) -> Result<Value> {
    Ok(empty_generation_payload())
}

fn apply_overrides(config: &mut PipelineConfig, args: &MatchArgs) {
    if args.use_embeddings {
        config.use_embeddings = true;
    }
    if args.no_tfidf {
        config.use_tfidf = false;
    }
    if args.no_bm25 {
        config.use_bm25 = false;
    }
    if args.edited.is_some() {
        config.use_editor = true;
    }
    if let Some(threshold) = args.match_threshold {
        config.match_threshold = threshold;
    }
    if let Some(top_k) = args.top_k_chunks {
        config.top_k_chunks = top_k;
    }
    if let Some(top_k) = args.top_k_retrieval {
        config.top_k_retrieval = top_k;
    }
    if let Some(chunk_chars) = args.chunk_chars {
        config.chunk_chars = chunk_chars;
    }
    if let Some(overlap_chars) = args.overlap_chars {
        config.overlap_chars = overlap_chars;
    }
}

fn write_text_summary(output: &mut impl Write, artifact: &RunArtifact) -> Result<()> {
    let role = display_or(&artifact.jd.role_title, "(unknown role)");
    let company = display_or(&artifact.jd.company_name, "(unknown company)");
    writeln!(output, "Role: {role} at {company}")?;

    let report = &artifact.match_report;
    writeln!(
        output,
        "Match: must={} nice={} overall={}",
        report.score_must, report.score_nice, report.score_overall
    )?;

    let retrieval = &artifact.retrieval;
    let methods = retrieval
        .methods
        .iter()
        .map(|method| method.as_str())
        .collect::<Vec<&str>>();
    writeln!(
        output,
        "Retrieval: chunks={} methods={} weights tfidf={:.3} bm25={:.3} embed={:.3} threshold={:.2}",
        retrieval.chunk_count,
        if methods.is_empty() {
            "none".to_string()
        } else {
            methods.join(",")
        },
        retrieval.weights.tfidf,
        retrieval.weights.bm25,
        retrieval.weights.embed,
        retrieval.match_threshold,
    )?;

    writeln!(output, "Requirements: {}", artifact.evidence_map.len())?;
    if artifact.evidence_map.is_empty() {
        writeln!(output, "  (none)")?;
    }
    let mut listed = HashSet::new();
    for requirement in artifact.jd.requirement_list() {
        if !listed.insert(requirement.clone()) {
            continue;
        }
        let Some(item) = artifact.evidence_map.get(&requirement) else {
            continue;
        };
        let top_chunk = item
            .chunks
            .first()
            .map(|chunk| chunk.chunk_id.as_str())
            .unwrap_or("-");
        writeln!(
            output,
            "  [{}]\t{:.3}\t{}\t{}",
            if item.matched { "x" } else { " " },
            item.score,
            item.requirement,
            top_chunk,
        )?;
    }

    let generation = &artifact.generation;
    writeln!(
        output,
        "Generation: bullets={} cover_letter={}",
        generation.resume_bullets.len(),
        if generation.cover_letter.text.is_empty() {
            "empty"
        } else {
            "present"
        }
    )?;
    for warning in &generation.warnings {
        writeln!(output, "  note: {warning}")?;
    }

    let validation = &artifact.validation;
    writeln!(
        output,
        "Validation: ok={} warnings={}",
        validation.ok,
        validation.warnings.len()
    )?;
    for warning in &validation.warnings {
        writeln!(
            output,
            "  {}\t{}\t{}",
            warning.code.as_str(),
            warning.path,
            warning.message
        )?;
    }

    Ok(())
}

fn display_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() { fallback } else { value }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::cli::DataArgs;
    use crate::evidence::EvidenceMap;
    use crate::grounding::{Generation, ValidationResult};
    use crate::model::RetrievalSummary;
    use crate::ranking::{FusionWeights, MatchReport};
    use crate::retrieval::RetrievalMethod;

    fn match_args() -> MatchArgs {
        MatchArgs {
            jd: PathBuf::from("jd.txt"),
            profile: PathBuf::from("profile.txt"),
            data: DataArgs::default(),
            jd_structure: None,
            generation: None,
            edited: None,
            use_embeddings: false,
            no_tfidf: false,
            no_bm25: false,
            match_threshold: None,
            top_k_chunks: None,
            top_k_retrieval: None,
            chunk_chars: None,
            overlap_chars: None,
            output: None,
            export_dir: None,
            json: false,
        }
    }

    #[test]
    fn overrides_leave_unset_fields_alone() {
        let mut config = PipelineConfig::default();
        apply_overrides(&mut config, &match_args());
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn overrides_apply_flags_and_values() {
        let mut args = match_args();
        args.no_bm25 = true;
        args.use_embeddings = true;
        args.edited = Some(PathBuf::from("edited.json"));
        args.match_threshold = Some(0.6);
        args.chunk_chars = Some(400);

        let mut config = PipelineConfig::default();
        apply_overrides(&mut config, &args);
        assert!(!config.use_bm25);
        assert!(config.use_tfidf);
        assert!(config.use_embeddings);
        assert!(config.use_editor);
        assert_eq!(config.match_threshold, 0.6);
        assert_eq!(config.chunk_chars, 400);
    }

    #[test]
    fn text_summary_reports_scores_and_methods() {
        let artifact = RunArtifact {
            generated_at: "2026-01-01T00:00:00Z".to_string(),
            jd_sha256: String::new(),
            profile_sha256: String::new(),
            retrieval: RetrievalSummary {
                chunk_count: 3,
                methods: vec![RetrievalMethod::Lexical, RetrievalMethod::Probabilistic],
                weights: FusionWeights {
                    tfidf: 0.4375,
                    bm25: 0.5625,
                    embed: 0.0,
                },
                match_threshold: 0.45,
            },
            jd: JdStructure {
                role_title: "Platform Engineer".to_string(),
                ..JdStructure::default()
            },
            match_report: MatchReport {
                score_must: 100,
                score_nice: 0,
                score_overall: 70,
                ..MatchReport::default()
            },
            evidence_map: EvidenceMap::default(),
            generation: Generation::default(),
            validation: ValidationResult::from_warnings(Vec::new()),
        };

        let mut buffer = Vec::new();
        write_text_summary(&mut buffer, &artifact).expect("summary");
        let text = String::from_utf8(buffer).expect("utf8");

        assert!(text.contains("Role: Platform Engineer at (unknown company)"));
        assert!(text.contains("Match: must=100 nice=0 overall=70"));
        assert!(text.contains("methods=tfidf,bm25"));
        assert!(text.contains("threshold=0.45"));
        assert!(text.contains("Requirements: 0\n  (none)\n"));
        assert!(text.contains("Generation: bullets=0 cover_letter=empty"));
        assert!(text.contains("Validation: ok=true warnings=0"));
    }
}
