use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "groundmatch",
    version,
    about = "Job description to profile matching with grounded generation checks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score a profile against a job description and ground a generation.
    Match(MatchArgs),
    /// Show how a profile is split into retrieval chunks.
    Chunk(ChunkArgs),
    /// Validate and enforce a generation against a saved run's evidence.
    Validate(ValidateArgs),
    /// Resolve skill names or extract skills from text.
    Skills(SkillsArgs),
}

/// Config file plus per-path overrides shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct DataArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub skills_path: Option<PathBuf>,

    #[arg(long)]
    pub stopwords_path: Option<PathBuf>,

    #[arg(long)]
    pub fewshot_path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    #[arg(long)]
    pub jd: PathBuf,

    #[arg(long)]
    pub profile: PathBuf,

    #[command(flatten)]
    pub data: DataArgs,

    /// JSON job description structure to use instead of rule-based parsing.
    #[arg(long)]
    pub jd_structure: Option<PathBuf>,

    /// Saved generator response (JSON) to ground.
    #[arg(long)]
    pub generation: Option<PathBuf>,

    /// Saved editor response (JSON); enables the edit pass.
    #[arg(long)]
    pub edited: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub use_embeddings: bool,

    #[arg(long, default_value_t = false)]
    pub no_tfidf: bool,

    #[arg(long, default_value_t = false)]
    pub no_bm25: bool,

    #[arg(long)]
    pub match_threshold: Option<f64>,

    #[arg(long)]
    pub top_k_chunks: Option<usize>,

    #[arg(long)]
    pub top_k_retrieval: Option<usize>,

    #[arg(long)]
    pub chunk_chars: Option<usize>,

    #[arg(long)]
    pub overlap_chars: Option<usize>,

    /// Write the run artifact as JSON.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Write resume.md and cover_letter.md into this directory.
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ChunkArgs {
    #[arg(long)]
    pub profile: PathBuf,

    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long)]
    pub chunk_chars: Option<usize>,

    #[arg(long)]
    pub overlap_chars: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Run artifact whose evidence map is the source of known chunk ids.
    #[arg(long)]
    pub artifact: PathBuf,

    #[arg(long)]
    pub generation: PathBuf,

    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long)]
    pub max_bullet_words: Option<usize>,

    /// Write the enforced generation as JSON.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Fail when validation reports a FORMAT warning.
    #[arg(long, default_value_t = false)]
    pub strict: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SkillsArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[arg(long = "name")]
    pub names: Vec<String>,

    #[arg(long)]
    pub text_file: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub list: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}
