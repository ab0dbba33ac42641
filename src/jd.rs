use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::taxonomy::SkillTaxonomy;
use crate::text::{normalize_text, tokenize};

const MUST_MARKERS: &[&str] = &[
    "must",
    "required",
    "requirements",
    "you will need",
    "need to",
    "mandatory",
    "essential",
    "minimum",
    "strong experience",
    "proven experience",
];

const NICE_MARKERS: &[&str] = &[
    "nice to have",
    "nice-to-have",
    "preferred",
    "a plus",
    "plus",
    "advantage",
    "bonus",
    "good to have",
    "would be great",
];

const MAX_PROMOTED_MUST_SKILLS: usize = 6;
const MAX_KEYWORDS: usize = 30;
const MAX_BULLET_RESPONSIBILITIES: usize = 30;
const MAX_SENTENCE_RESPONSIBILITIES: usize = 12;
const MIN_RESPONSIBILITY_WORDS: usize = 6;

/// Structured job description. Produced by [`RuleJdParser`] or supplied as JSON by an
/// external classifier; absent fields default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JdStructure {
    pub company_name: String,
    pub role_title: String,
    pub must_have_skills: Vec<String>,
    pub nice_to_have_skills: Vec<String>,
    pub other_skills: Vec<String>,
    pub responsibilities: Vec<String>,
    pub keywords: Vec<String>,
}

impl JdStructure {
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read jd structure: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse jd structure: {}", path.display()))
    }

    /// Must-have then nice-to-have skills, blanks dropped. Duplicates across the two lists
    /// are queried twice.
    pub fn requirement_list(&self) -> Vec<String> {
        self.must_have_skills
            .iter()
            .chain(&self.nice_to_have_skills)
            .filter(|skill| !skill.trim().is_empty())
            .cloned()
            .collect()
    }
}

pub struct RuleJdParser {
    sentence_break: Regex,
    bullet_marker: Regex,
    company_line: Regex,
    role_line: Regex,
}

impl RuleJdParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            sentence_break: Regex::new(r"[.!?:]\s+")
                .context("failed to compile sentence break regex")?,
            bullet_marker: Regex::new(r"^(?:-|\*|•)\s+")
                .context("failed to compile bullet marker regex")?,
            company_line: Regex::new(r"(?im)^\s*company\s*:\s*(.+?)\s*$")
                .context("failed to compile company regex")?,
            role_line: Regex::new(r"(?im)^\s*role\s*:\s*(.+?)\s*$")
                .context("failed to compile role regex")?,
        })
    }

    pub fn parse(&self, jd_text: &str, taxonomy: &SkillTaxonomy) -> JdStructure {
        let sentences = self.split_sentences(jd_text);

        let mut must = BTreeSet::<String>::new();
        let mut nice = BTreeSet::<String>::new();
        let mut other = BTreeSet::<String>::new();

        for sentence in &sentences {
            let found = taxonomy.extract_skills(sentence);
            if found.is_empty() {
                continue;
            }

            let normalized = normalize_text(sentence);
            if contains_marker(&normalized, NICE_MARKERS) {
                nice.extend(found);
            } else if contains_marker(&normalized, MUST_MARKERS) {
                must.extend(found);
            } else {
                other.extend(found);
            }
        }

        nice.retain(|skill| !must.contains(skill));
        other.retain(|skill| !must.contains(skill) && !nice.contains(skill));

        if must.is_empty() && !other.is_empty() {
            let promoted = other
                .iter()
                .take(MAX_PROMOTED_MUST_SKILLS)
                .cloned()
                .collect::<Vec<String>>();
            for skill in promoted {
                other.remove(&skill);
                must.insert(skill);
            }
        }

        let (company_name, role_title) = self.extract_company_role(jd_text);

        JdStructure {
            company_name,
            role_title,
            must_have_skills: must.into_iter().collect(),
            nice_to_have_skills: nice.into_iter().collect(),
            other_skills: other.into_iter().collect(),
            responsibilities: self.extract_responsibilities(jd_text, &sentences),
            keywords: extract_keywords(jd_text, MAX_KEYWORDS),
        }
    }

    /// First `Company: ...` and `Role: ...` lines, empty when absent.
    pub fn extract_company_role(&self, jd_text: &str) -> (String, String) {
        let capture = |pattern: &Regex| {
            pattern
                .captures(jd_text)
                .and_then(|captures| captures.get(1))
                .map(|value| value.as_str().trim().to_string())
                .unwrap_or_default()
        };
        (capture(&self.company_line), capture(&self.role_line))
    }

    fn split_sentences(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();

        for line in text.lines() {
            let mut start = 0;
            for boundary in self.sentence_break.find_iter(line) {
                push_trimmed(&mut sentences, &line[start..boundary.start() + 1]);
                start = boundary.end();
            }
            push_trimmed(&mut sentences, &line[start..]);
        }

        sentences
    }

    fn extract_responsibilities(&self, jd_text: &str, sentences: &[String]) -> Vec<String> {
        let bulleted = jd_text
            .lines()
            .map(str::trim)
            .filter(|line| self.bullet_marker.is_match(line))
            .map(|line| self.bullet_marker.replace(line, "").trim().to_string())
            .filter(|item| !item.is_empty())
            .take(MAX_BULLET_RESPONSIBILITIES)
            .collect::<Vec<String>>();

        if !bulleted.is_empty() {
            return bulleted;
        }

        sentences
            .iter()
            .filter(|sentence| sentence.split_whitespace().count() >= MIN_RESPONSIBILITY_WORDS)
            .take(MAX_SENTENCE_RESPONSIBILITIES)
            .cloned()
            .collect()
    }
}

/// Most frequent tokens, ties broken lexicographically.
pub fn extract_keywords(text: &str, top_k: usize) -> Vec<String> {
    let mut frequency = HashMap::<String, usize>::new();
    for token in tokenize(text, None) {
        *frequency.entry(token).or_default() += 1;
    }

    let mut ranked = frequency.into_iter().collect::<Vec<(String, usize)>>();
    ranked.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
    ranked
        .into_iter()
        .take(top_k)
        .map(|(token, _)| token)
        .collect()
}

fn contains_marker(normalized: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| normalized.contains(marker))
}

fn push_trimmed(sentences: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}
