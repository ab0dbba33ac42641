use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::text::{normalize_text, tokenize};

pub const DEFAULT_SECTION: &str = "profile";

const SECTION_MARKERS: &[(&str, &[&str])] = &[
    ("summary", &["summary", "profile", "about"]),
    ("experience", &["experience", "work experience", "employment"]),
    ("projects", &["projects", "project"]),
    ("skills", &["skills", "technical skills"]),
    ("education", &["education"]),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub section: String,
    pub text: String,
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingOptions {
    pub chunk_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_chars: 1200,
            overlap_chars: 200,
        }
    }
}

/// Splits profile text into section-aware overlapping windows. Sequence numbers are global
/// across sections, so ids stay unique without restarting at each section.
pub fn chunk_profile(
    profile_text: &str,
    stopwords: Option<&HashSet<String>>,
    options: ChunkingOptions,
) -> Vec<Chunk> {
    let mut chunks = Vec::<Chunk>::new();

    for (section, body) in split_sections(profile_text) {
        if body.is_empty() {
            continue;
        }

        let merged = paragraphs(&body).join("\n\n");
        for slice in sliding_windows(&merged, options) {
            chunks.push(Chunk {
                chunk_id: format!("{section}_{:03}", chunks.len()),
                section: section.clone(),
                tokens: tokenize(&slice, stopwords),
                text: slice,
            });
        }
    }

    if chunks.is_empty() {
        let text = profile_text.trim().to_string();
        chunks.push(Chunk {
            chunk_id: format!("{DEFAULT_SECTION}_000"),
            section: DEFAULT_SECTION.to_string(),
            tokens: tokenize(&text, stopwords),
            text,
        });
    }

    chunks
}

pub fn detect_section(line: &str) -> Option<&'static str> {
    let normalized = normalize_text(line);
    let key = normalized.trim_matches(':').trim();

    SECTION_MARKERS
        .iter()
        .find(|(_, names)| names.contains(&key))
        .map(|(section, _)| *section)
}

fn split_sections(profile_text: &str) -> Vec<(String, String)> {
    let text = profile_text.trim();
    if text.is_empty() {
        return vec![(DEFAULT_SECTION.to_string(), String::new())];
    }

    let mut sections: Vec<(String, Vec<&str>)> = vec![(DEFAULT_SECTION.to_string(), Vec::new())];
    let mut current = 0_usize;

    for line in text.lines().map(str::trim_end) {
        if let Some(section) = detect_section(line) {
            current = match sections.iter().position(|(name, _)| name == section) {
                Some(index) => index,
                None => {
                    sections.push((section.to_string(), Vec::new()));
                    sections.len() - 1
                }
            };
            continue;
        }
        sections[current].1.push(line);
    }

    sections
        .into_iter()
        .map(|(name, lines)| (name, lines.join("\n").trim().to_string()))
        .collect()
}

fn paragraphs(body: &str) -> Vec<String> {
    let mut out = Vec::<String>::new();
    let mut buffer = Vec::<&str>::new();

    for line in body.split('\n') {
        if line.trim().is_empty() {
            if !buffer.is_empty() {
                out.push(buffer.join("\n").trim().to_string());
                buffer.clear();
            }
        } else {
            buffer.push(line);
        }
    }
    if !buffer.is_empty() {
        out.push(buffer.join("\n").trim().to_string());
    }

    out.retain(|paragraph| !paragraph.is_empty());
    if out.is_empty() {
        out.push(body.to_string());
    }
    out
}

/// Character windows of `chunk_chars` stepping back `overlap_chars` after each window.
/// The overlap is clamped below the window size so every step advances.
fn sliding_windows(merged: &str, options: ChunkingOptions) -> Vec<String> {
    let characters = merged.chars().collect::<Vec<char>>();
    let length = characters.len();
    let window = options.chunk_chars.max(1);
    let overlap = options.overlap_chars.min(window - 1);

    let mut out = Vec::new();
    let mut start = 0_usize;
    while start < length {
        let end = length.min(start + window);
        let slice = characters[start..end].iter().collect::<String>();
        let trimmed = slice.trim();
        if !trimmed.is_empty() {
            out.push(trimmed.to_string());
        }
        if end == length {
            break;
        }
        start = end.saturating_sub(overlap);
    }
    out
}
