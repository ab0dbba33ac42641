use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::SkillsArgs;
use crate::taxonomy::SkillTaxonomy;
use crate::util::read_text;

#[derive(Debug, Serialize, PartialEq, Eq)]
struct SkillResolution {
    name: String,
    canonical: Option<String>,
    related: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SkillsReport {
    taxonomy_size: usize,
    resolved: Vec<SkillResolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extracted: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    canonicals: Option<Vec<String>>,
}

pub fn run(args: SkillsArgs) -> Result<()> {
    let config = args.data.load_config()?;
    let taxonomy = SkillTaxonomy::from_yaml_path(&config.skills_path)?;
    info!(
        path = %config.skills_path.display(),
        skills = taxonomy.len(),
        "loaded skill taxonomy"
    );

    let extracted = match &args.text_file {
        Some(path) => {
            let text = read_text(path, "skill text")?;
            Some(taxonomy.extract_skills(&text).into_iter().collect())
        }
        None => None,
    };

    let report = SkillsReport {
        taxonomy_size: taxonomy.len(),
        resolved: resolve_names(&taxonomy, &args.names),
        extracted,
        canonicals: args.list.then(|| taxonomy.all_canonicals()),
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        serde_json::to_writer_pretty(&mut output, &report)
            .context("failed to serialize skills json output")?;
        writeln!(output)?;
    } else {
        write_text_report(&mut output, &report)?;
    }
    output.flush()?;

    Ok(())
}

fn resolve_names(taxonomy: &SkillTaxonomy, names: &[String]) -> Vec<SkillResolution> {
    names
        .iter()
        .map(|name| {
            let canonical = taxonomy.canonicalize(name).map(str::to_string);
            let related = canonical
                .as_deref()
                .and_then(|canonical| taxonomy.related(canonical))
                .map(|related| related.iter().cloned().collect())
                .unwrap_or_default();
            SkillResolution {
                name: name.clone(),
                canonical,
                related,
            }
        })
        .collect()
}

fn write_text_report(output: &mut impl Write, report: &SkillsReport) -> Result<()> {
    writeln!(output, "Taxonomy: {} skills", report.taxonomy_size)?;

    for resolution in &report.resolved {
        match &resolution.canonical {
            Some(canonical) if resolution.related.is_empty() => {
                writeln!(output, "{}\t-> {canonical}", resolution.name)?
            }
            Some(canonical) => writeln!(
                output,
                "{}\t-> {canonical}\trelated: {}",
                resolution.name,
                resolution.related.join(", ")
            )?,
            None => writeln!(output, "{}\t(unknown)", resolution.name)?,
        }
    }

    if let Some(extracted) = &report.extracted {
        writeln!(output, "Extracted: {}", extracted.join(", "))?;
    }

    if let Some(canonicals) = &report.canonicals {
        writeln!(output, "Canonical skills:")?;
        for canonical in canonicals {
            writeln!(output, "  {canonical}")?;
        }
    }

    Ok(())
}
