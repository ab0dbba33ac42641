use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::chunking::Chunk;
use crate::cli::ChunkArgs;
use crate::pipeline::Pipeline;
use crate::text::join_tokens;
use crate::util::read_text;

const PREVIEW_CHARS: usize = 60;

#[derive(Debug, Serialize)]
struct ChunkListing<'a> {
    profile: String,
    chunk_chars: usize,
    overlap_chars: usize,
    returned: usize,
    chunks: &'a [Chunk],
}

pub fn run(args: ChunkArgs) -> Result<()> {
    let mut config = args.data.load_config()?;
    if let Some(chunk_chars) = args.chunk_chars {
        config.chunk_chars = chunk_chars;
    }
    if let Some(overlap_chars) = args.overlap_chars {
        config.overlap_chars = overlap_chars;
    }

    let profile_text = read_text(&args.profile, "profile")?;
    let pipeline = Pipeline::from_config(config)?;
    let chunks = pipeline.chunk(&profile_text);
    info!(
        profile = %args.profile.display(),
        chunks = chunks.len(),
        "chunked profile"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        let listing = ChunkListing {
            profile: args.profile.display().to_string(),
            chunk_chars: pipeline.config().chunk_chars,
            overlap_chars: pipeline.config().overlap_chars,
            returned: chunks.len(),
            chunks: &chunks,
        };
        serde_json::to_writer_pretty(&mut output, &listing)
            .context("failed to serialize chunk json output")?;
        writeln!(output)?;
    } else {
        write_chunk_table(&mut output, &chunks)?;
    }
    output.flush()?;

    Ok(())
}

fn write_chunk_table(output: &mut impl Write, chunks: &[Chunk]) -> Result<()> {
    writeln!(output, "Chunks: {}", chunks.len())?;
    for chunk in chunks {
        writeln!(
            output,
            "{}\t{}\tchars={}\ttokens={}\t{}",
            chunk.chunk_id,
            chunk.section,
            chunk.text.chars().count(),
            chunk.tokens.len(),
            preview(&chunk.text),
        )?;
    }
    Ok(())
}

fn preview(text: &str) -> String {
    let flattened = join_tokens(&text.split_whitespace().collect::<Vec<&str>>());
    if flattened.chars().count() <= PREVIEW_CHARS {
        return flattened;
    }
    let truncated = flattened.chars().take(PREVIEW_CHARS).collect::<String>();
    format!("{}...", truncated.trim_end())
}
