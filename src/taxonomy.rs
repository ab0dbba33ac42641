use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use tracing::{debug, warn};

use crate::text::normalize_text;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub canonical: String,
    pub aliases: BTreeSet<String>,
    pub related: BTreeSet<String>,
}

/// Read-only alias to canonical skill lookup. Built once and passed by reference into
/// every component that needs it.
#[derive(Debug, Clone, Default)]
pub struct SkillTaxonomy {
    entries: BTreeMap<String, SkillEntry>,
    alias_to_canonical: BTreeMap<String, String>,
}

impl SkillTaxonomy {
    pub fn new(entries: impl IntoIterator<Item = SkillEntry>) -> Self {
        let mut taxonomy = Self::default();

        for entry in entries {
            register_alias(
                &mut taxonomy.alias_to_canonical,
                &entry.canonical,
                &entry.canonical,
            );
            for alias in &entry.aliases {
                register_alias(&mut taxonomy.alias_to_canonical, alias, &entry.canonical);
            }
            taxonomy.entries.insert(entry.canonical.clone(), entry);
        }

        taxonomy
    }

    pub fn from_yaml_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read skill taxonomy: {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("failed to parse skill taxonomy: {}", path.display()))
    }

    /// Parses a `canonical: {aliases: [...], related: [...]}` mapping. Entries that are
    /// not mappings are skipped; a bare `canonical:` key registers the skill without aliases.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let document: YamlValue =
            serde_yaml::from_str(raw).context("taxonomy is not valid yaml")?;

        let mapping = match document {
            YamlValue::Null => return Ok(Self::default()),
            YamlValue::Mapping(mapping) => mapping,
            _ => {
                warn!("skill taxonomy root is not a mapping; loaded empty taxonomy");
                return Ok(Self::default());
            }
        };

        let mut entries = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let Some(canonical_raw) = yaml_scalar_to_string(&key) else {
                debug!("skipping taxonomy entry with non-scalar key");
                continue;
            };
            let canonical = normalize_text(&canonical_raw);
            if canonical.is_empty() {
                continue;
            }

            let (aliases, related) = match &value {
                YamlValue::Null => (BTreeSet::new(), BTreeSet::new()),
                YamlValue::Mapping(fields) => (
                    normalized_string_list(fields.get("aliases")),
                    normalized_string_list(fields.get("related")),
                ),
                _ => {
                    warn!(skill = %canonical, "skipping malformed taxonomy entry");
                    continue;
                }
            };

            entries.push(SkillEntry {
                canonical,
                aliases,
                related,
            });
        }

        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn canonicalize(&self, skill_or_alias: &str) -> Option<&str> {
        self.alias_to_canonical
            .get(&normalize_text(skill_or_alias))
            .map(String::as_str)
    }

    pub fn is_known_skill(&self, skill: &str) -> bool {
        let key = normalize_text(skill);
        self.entries.contains_key(&key) || self.alias_to_canonical.contains_key(&key)
    }

    pub fn all_canonicals(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn related(&self, canonical: &str) -> Option<&BTreeSet<String>> {
        self.entries
            .get(&normalize_text(canonical))
            .map(|entry| &entry.related)
    }

    /// Whole-word containment of every known alias in the normalized text.
    pub fn extract_skills(&self, input: &str) -> BTreeSet<String> {
        let padded = format!(" {} ", normalize_text(input));
        let mut found = BTreeSet::new();

        for (alias, canonical) in &self.alias_to_canonical {
            if padded.contains(&format!(" {alias} ")) {
                found.insert(canonical.clone());
            }
        }

        found
    }
}

fn register_alias(lookup: &mut BTreeMap<String, String>, alias: &str, canonical: &str) {
    let key = normalize_text(alias);
    if key.is_empty() {
        return;
    }
    lookup.insert(key, canonical.to_string());
}

fn yaml_scalar_to_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(text) => Some(text.clone()),
        YamlValue::Number(number) => Some(number.to_string()),
        YamlValue::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn normalized_string_list(value: Option<&YamlValue>) -> BTreeSet<String> {
    let Some(YamlValue::Sequence(items)) = value else {
        return BTreeSet::new();
    };

    items
        .iter()
        .filter_map(yaml_scalar_to_string)
        .map(|item| normalize_text(&item))
        .filter(|item| !item.is_empty())
        .collect()
}
