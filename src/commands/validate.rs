use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::ValidateArgs;
use crate::grounding::{
    Generation, ValidationResult, WarningCode, enforce_grounding, is_exact_generation_shape,
    normalize_generation_payload, validate_generation,
};
use crate::model::RunArtifact;
use crate::taxonomy::SkillTaxonomy;
use crate::util::{read_text, write_json_pretty};

const WARNING_CODES: [WarningCode; 6] = [
    WarningCode::Format,
    WarningCode::Empty,
    WarningCode::Length,
    WarningCode::Style,
    WarningCode::Grounding,
    WarningCode::Skill,
];

#[derive(Debug, Serialize)]
struct ValidateReport {
    artifact: String,
    generation: String,
    exact_shape: bool,
    validation: ValidationResult,
    enforced: Generation,
}

pub fn run(args: ValidateArgs) -> Result<()> {
    let config = args.data.load_config()?;
    let max_bullet_words = args.max_bullet_words.unwrap_or(config.max_bullet_words);

    let artifact = RunArtifact::load(&args.artifact)?;
    let taxonomy = SkillTaxonomy::from_yaml_path(&config.skills_path)?;
    let raw = read_text(&args.generation, "generation")?;
    let payload = serde_json::from_str::<Value>(&raw)
        .with_context(|| format!("failed to parse generation: {}", args.generation.display()))?;

    let exact_shape = is_exact_generation_shape(&payload);
    if !exact_shape {
        warn!(
            path = %args.generation.display(),
            "generation does not have the exact resume_bullets/cover_letter/warnings shape"
        );
    }

    let normalized = normalize_generation_payload(payload);
    let validation = validate_generation(
        &normalized,
        &artifact.evidence_map,
        &taxonomy,
        max_bullet_words,
    );
    let enforced = enforce_grounding(&normalized, &artifact.evidence_map, &taxonomy);
    info!(
        ok = validation.ok,
        warnings = validation.warnings.len(),
        bullets_kept = enforced.resume_bullets.len(),
        "validated generation"
    );

    if let Some(path) = &args.output {
        write_json_pretty(path, &enforced)?;
        info!(path = %path.display(), "wrote enforced generation");
    }

    let report = ValidateReport {
        artifact: args.artifact.display().to_string(),
        generation: args.generation.display().to_string(),
        exact_shape,
        validation,
        enforced,
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &report)
            .context("failed to serialize validation json output")?;
        writeln!(output)?;
    } else {
        write_text_report(&mut output, &report)?;
    }
    output.flush()?;

    if args.strict && !report.validation.ok {
        bail!(
            "generation failed validation with {} FORMAT warning(s)",
            report.validation.count(WarningCode::Format)
        );
    }

    Ok(())
}

fn write_text_report(output: &mut impl Write, report: &ValidateReport) -> Result<()> {
    writeln!(output, "Generation: {}", report.generation)?;
    writeln!(output, "Evidence: {}", report.artifact)?;
    let counts = WARNING_CODES
        .iter()
        .map(|code| format!("{}={}", code.as_str(), report.validation.count(*code)))
        .collect::<Vec<String>>();
    writeln!(
        output,
        "Validation: ok={} exact_shape={} {}",
        report.validation.ok,
        report.exact_shape,
        counts.join(" "),
    )?;
    for warning in &report.validation.warnings {
        writeln!(
            output,
            "  {}\t{}\t{}",
            warning.code.as_str(),
            warning.path,
            warning.message
        )?;
    }

    writeln!(
        output,
        "Enforced: bullets={} cover_letter_evidence={}",
        report.enforced.resume_bullets.len(),
        report.enforced.cover_letter.evidence_chunks.len(),
    )?;
    for bullet in &report.enforced.resume_bullets {
        writeln!(
            output,
            "  - {}\t[{}]",
            bullet.text,
            bullet.evidence_chunks.join(", ")
        )?;
    }

    Ok(())
}
