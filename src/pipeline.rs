use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::chunking::{Chunk, chunk_profile};
use crate::collaborators::{
    EditRequest, Editor, GenerationRequest, Generator, edit_or_fallback, generate_or_fallback,
    load_fewshot_examples,
};
use crate::config::PipelineConfig;
use crate::evidence::{EvidenceMap, EvidenceMapBuilder};
use crate::grounding::{
    Generation, ValidationResult, enforce_grounding, normalize_generation_payload,
    validate_generation,
};
use crate::jd::{JdStructure, RuleJdParser};
use crate::model::{RetrievalSummary, RunArtifact};
use crate::ranking::{HybridRanker, MatchReport, RequirementMatch};
use crate::retrieval::{
    Bm25Index, EmbedIndex, RetrievalHit, RetrievalMethod, Retriever, TfidfIndex,
};
use crate::semantic::{Embedder, HashEmbedder};
use crate::taxonomy::SkillTaxonomy;
use crate::text::load_stopwords;
use crate::util::{now_utc_string, sha256_hex};

/// Inputs for one run. `jd_structure` replaces rule-based structuring when supplied.
#[derive(Debug, Clone, Default)]
pub struct RunRequest<'a> {
    pub jd_text: &'a str,
    pub profile_text: &'a str,
    pub jd_structure: Option<JdStructure>,
}

/// Owns the read-only data a run needs. Nothing here is mutated by [`Pipeline::run`], so one
/// pipeline can serve any number of independent requests.
pub struct Pipeline {
    config: PipelineConfig,
    taxonomy: SkillTaxonomy,
    stopwords: Option<HashSet<String>>,
    fewshot_examples: Vec<Value>,
    embedder: Option<Arc<dyn Embedder>>,
    jd_parser: RuleJdParser,
}

/// Per-requirement matches plus the ranker and retrieval settings that produced them.
#[derive(Debug, Clone)]
pub struct RankedRequirements {
    pub matches: Vec<RequirementMatch>,
    pub ranker: HybridRanker,
    pub retrieval: RetrievalSummary,
}

impl RankedRequirements {
    pub fn report(&self, jd: &JdStructure) -> MatchReport {
        self.ranker
            .build_report(&self.matches, &jd.must_have_skills, &jd.nice_to_have_skills)
    }
}

struct RetrievalIndices {
    tfidf: Option<TfidfIndex>,
    bm25: Option<Bm25Index>,
    embed: Option<EmbedIndex>,
}

impl RetrievalIndices {
    fn methods(&self) -> Vec<RetrievalMethod> {
        let mut methods = Vec::new();
        if self.tfidf.is_some() {
            methods.push(RetrievalMethod::Lexical);
        }
        if self.bm25.is_some() {
            methods.push(RetrievalMethod::Probabilistic);
        }
        if self.embed.is_some() {
            methods.push(RetrievalMethod::Semantic);
        }
        methods
    }

    fn query(&self, requirement: &str, top_k: usize) -> [Vec<RetrievalHit>; 3] {
        [
            query_optional(self.tfidf.as_ref(), requirement, top_k),
            query_optional(self.bm25.as_ref(), requirement, top_k),
            query_optional(self.embed.as_ref(), requirement, top_k),
        ]
    }
}

impl Pipeline {
    /// An empty stopword set means the tokenizer's built-in list applies. No embedder is
    /// attached; see [`Pipeline::with_embedder`].
    pub fn new(
        config: PipelineConfig,
        taxonomy: SkillTaxonomy,
        stopwords: HashSet<String>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            taxonomy,
            stopwords: (!stopwords.is_empty()).then_some(stopwords),
            fewshot_examples: Vec::new(),
            embedder: None,
            jd_parser: RuleJdParser::new()?,
        })
    }

    /// Loads taxonomy, stopwords and few-shot examples from the configured paths.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let taxonomy = SkillTaxonomy::from_yaml_path(&config.skills_path)?;
        if taxonomy.is_empty() {
            warn!(
                path = %config.skills_path.display(),
                "skill taxonomy is empty; no skills will be extracted"
            );
        }
        let stopwords = load_stopwords(&config.stopwords_path)?;
        if stopwords.is_empty() {
            debug!(
                path = %config.stopwords_path.display(),
                "no stopwords loaded; using built-in defaults"
            );
        }
        let fewshot_examples = load_fewshot_examples(&config.fewshot_path);

        info!(
            skills = taxonomy.len(),
            stopwords = stopwords.len(),
            fewshot_examples = fewshot_examples.len(),
            "loaded pipeline data"
        );

        let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder {
            dimensions: config.embedding_dim,
        });

        Ok(Self::new(config, taxonomy, stopwords)?
            .with_fewshot_examples(fewshot_examples)
            .with_embedder(embedder))
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_fewshot_examples(mut self, examples: Vec<Value>) -> Self {
        self.fewshot_examples = examples;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn chunk(&self, profile_text: &str) -> Vec<Chunk> {
        chunk_profile(
            profile_text,
            self.stopwords.as_ref(),
            self.config.chunking_options(),
        )
    }

    /// Rule-based structure, or the supplied one. `Company:`/`Role:` lines in the text win
    /// over supplied values.
    pub fn structure_jd(&self, jd_text: &str, supplied: Option<JdStructure>) -> JdStructure {
        let Some(mut structure) = supplied else {
            return self.jd_parser.parse(jd_text, &self.taxonomy);
        };

        let (company_name, role_title) = self.jd_parser.extract_company_role(jd_text);
        if !company_name.is_empty() {
            structure.company_name = company_name;
        }
        if !role_title.is_empty() {
            structure.role_title = role_title;
        }
        structure
    }

    /// Ranks every requirement against the profile chunks using whichever indices are
    /// enabled and could be built.
    pub fn rank_requirements(
        &self,
        requirements: &[String],
        chunks: &[Chunk],
    ) -> Result<RankedRequirements> {
        let (indices, effective) = self.build_indices(chunks);
        let ranker = effective.ranker()?;

        let matches = requirements
            .iter()
            .map(|requirement| {
                let [tfidf, bm25, embed] = indices.query(requirement, effective.top_k_retrieval);
                debug!(
                    requirement = %requirement,
                    tfidf = tfidf.len(),
                    bm25 = bm25.len(),
                    embed = embed.len(),
                    "retrieved candidates"
                );
                ranker.rank_requirement(requirement, &tfidf, &bm25, &embed)
            })
            .collect::<Vec<RequirementMatch>>();

        let retrieval = RetrievalSummary {
            chunk_count: chunks.len(),
            methods: indices.methods(),
            weights: ranker.weights(),
            match_threshold: ranker.match_threshold(),
        };

        Ok(RankedRequirements {
            matches,
            ranker,
            retrieval,
        })
    }

    pub fn run(
        &self,
        request: RunRequest<'_>,
        generator: &dyn Generator,
        editor: Option<&dyn Editor>,
    ) -> Result<RunArtifact> {
        let jd = self.structure_jd(request.jd_text, request.jd_structure);
        let requirements = jd.requirement_list();
        let chunks = self.chunk(request.profile_text);
        info!(
            requirements = requirements.len(),
            chunks = chunks.len(),
            "structured job description and chunked profile"
        );

        let ranked = self.rank_requirements(&requirements, &chunks)?;
        let match_report = ranked.report(&jd);
        info!(
            must = match_report.score_must,
            nice = match_report.score_nice,
            overall = match_report.score_overall,
            missing = match_report.missing_requirements.len(),
            "scored requirements"
        );

        let evidence_map =
            EvidenceMapBuilder::new(&self.taxonomy).build(&ranked.matches, &chunks);

        let generation_request = GenerationRequest {
            jd: &jd,
            match_report: &match_report,
            evidence_map: &evidence_map,
            profile_text: request.profile_text,
            fewshot_examples: (!self.fewshot_examples.is_empty())
                .then_some(self.fewshot_examples.as_slice()),
        };
        let raw = generate_or_fallback(generator, &generation_request);
        let (mut generation, mut validation) = self.ground(raw, &evidence_map);

        if self.config.use_editor {
            match editor {
                Some(editor) => {
                    let edit_request = EditRequest {
                        generation: &generation,
                        validation_warnings: &validation.warnings,
                        evidence_map: &evidence_map,
                    };
                    let edited = edit_or_fallback(editor, &edit_request, &generation);
                    (generation, validation) = self.ground(edited, &evidence_map);
                }
                None => warn!("editor enabled but no editor supplied; skipping edit pass"),
            }
        }

        info!(
            bullets = generation.resume_bullets.len(),
            cover_letter = !generation.cover_letter.text.is_empty(),
            ok = validation.ok,
            warnings = validation.warnings.len(),
            "grounded generation"
        );

        Ok(RunArtifact {
            generated_at: now_utc_string(),
            jd_sha256: sha256_hex(request.jd_text),
            profile_sha256: sha256_hex(request.profile_text),
            retrieval: ranked.retrieval,
            jd,
            match_report,
            evidence_map,
            generation,
            validation,
        })
    }

    /// Normalize, validate and enforce one collaborator payload.
    pub fn ground(
        &self,
        payload: Value,
        evidence_map: &EvidenceMap,
    ) -> (Generation, ValidationResult) {
        let normalized = normalize_generation_payload(payload);
        let validation = validate_generation(
            &normalized,
            evidence_map,
            &self.taxonomy,
            self.config.max_bullet_words,
        );
        let generation = enforce_grounding(&normalized, evidence_map, &self.taxonomy);
        (generation, validation)
    }

    /// Builds the enabled indices. A failed embedding build disables the semantic signal and
    /// the returned config reflects that, so weights and threshold adapt to what is available.
    fn build_indices(&self, chunks: &[Chunk]) -> (RetrievalIndices, PipelineConfig) {
        let mut effective = self.config.clone();

        let tfidf = effective.use_tfidf.then(|| TfidfIndex::build(chunks));
        if let Some(index) = &tfidf {
            debug!(vocabulary = index.vocabulary_size(), "built tf-idf index");
        }
        let bm25 = effective.use_bm25.then(|| Bm25Index::build(chunks));

        let embed = if effective.use_embeddings {
            self.build_embed_index(chunks)
        } else {
            None
        };
        effective.use_embeddings = embed.is_some();

        (RetrievalIndices { tfidf, bm25, embed }, effective)
    }

    fn build_embed_index(&self, chunks: &[Chunk]) -> Option<EmbedIndex> {
        let Some(embedder) = &self.embedder else {
            warn!("embeddings enabled but no embedder attached; continuing without semantic signal");
            return None;
        };

        match EmbedIndex::build(chunks, Arc::clone(embedder)) {
            Ok(index) => {
                debug!(
                    embedder = embedder.name(),
                    dimensions = index.dimensions(),
                    "built embedding index"
                );
                Some(index)
            }
            Err(err) => {
                warn!(
                    error = %format!("{err:#}"),
                    "embedding index unavailable; continuing without semantic signal"
                );
                None
            }
        }
    }
}

fn query_optional<R: Retriever>(
    retriever: Option<&R>,
    requirement: &str,
    top_k: usize,
) -> Vec<RetrievalHit> {
    retriever
        .map(|index| index.query(requirement, top_k))
        .unwrap_or_default()
}
