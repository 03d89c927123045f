//! Target column lists and the source → target column mapping.
//!
//! A [`Mapping`] keeps one slot per source column, in source order, so the
//! output column order never depends on the order assignments were made.
//! [`MappingFile`] is the YAML form of a mapping, written by the `template`
//! command and read back by `generate --mapping`.

use std::{fs::File, io::BufReader, ops::Deref, path::Path};

use anyhow::{Context, Result};
use heck::ToSnakeCase;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, ConvertResult};

/// Ordered, non-empty destination column names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TargetColumns(Vec<String>);

impl TargetColumns {
    /// Splits `raw` on commas and trims each piece. Any empty piece rejects the
    /// whole list.
    pub fn parse(raw: &str) -> ConvertResult<Self> {
        Self::from_names(raw.split(','))
    }

    pub fn from_names<I, S>(names: I) -> ConvertResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let columns = names
            .into_iter()
            .map(|name| name.as_ref().trim().to_string())
            .collect::<Vec<_>>();
        if columns.is_empty() || columns.iter().any(String::is_empty) {
            return Err(ConvertError::validation("Target columns cannot be empty"));
        }
        Ok(TargetColumns(columns))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|column| column == name)
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for TargetColumns {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Assignment {
    #[default]
    Unset,
    Excluded,
    Target(String),
}

impl Assignment {
    pub fn target(&self) -> Option<&str> {
        match self {
            Assignment::Target(target) => Some(target),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSlot {
    pub source: String,
    pub assignment: Assignment,
}

/// What to do when two source columns name the same target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateTargets {
    #[default]
    Reject,
    /// Accept it; the first source column in source order feeds the target.
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Mapping {
    slots: Vec<ColumnSlot>,
}

impl Mapping {
    pub fn new<S: AsRef<str>>(sources: &[S]) -> Self {
        Mapping {
            slots: sources
                .iter()
                .map(|source| ColumnSlot {
                    source: source.as_ref().to_string(),
                    assignment: Assignment::Unset,
                })
                .collect(),
        }
    }

    pub fn slots(&self) -> &[ColumnSlot] {
        &self.slots
    }

    pub fn get(&self, source: &str) -> Option<&Assignment> {
        self.slots
            .iter()
            .find(|slot| slot.source == source)
            .map(|slot| &slot.assignment)
    }

    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.assignment = Assignment::Unset;
        }
    }

    /// Records `target` for `source`; an empty target excludes the column.
    pub fn assign(
        &mut self,
        source: &str,
        target: &str,
        targets: &TargetColumns,
        duplicates: DuplicateTargets,
    ) -> ConvertResult<()> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.source == source)
            .ok_or_else(|| ConvertError::validation(format!("Unknown source column '{source}'")))?;

        let target = target.trim();
        if target.is_empty() {
            debug!("Excluding source column '{source}'");
            self.slots[index].assignment = Assignment::Excluded;
            return Ok(());
        }
        if !targets.contains(target) {
            return Err(ConvertError::validation(format!(
                "Target column '{target}' is not one of: {}",
                targets.join(", ")
            )));
        }
        if duplicates == DuplicateTargets::Reject
            && let Some(other) = self
                .slots
                .iter()
                .enumerate()
                .find(|(idx, slot)| *idx != index && slot.assignment.target() == Some(target))
                .map(|(_, slot)| slot.source.as_str())
        {
            return Err(ConvertError::validation(format!(
                "Target column '{target}' is already mapped from '{other}'"
            )));
        }

        debug!("Mapping source column '{source}' -> '{target}'");
        self.slots[index].assignment = Assignment::Target(target.to_string());
        Ok(())
    }

    /// Maps every unset source column whose snake_case name matches a free
    /// target column. Returns the number of new assignments.
    pub fn auto_map(&mut self, targets: &TargetColumns) -> usize {
        let mut assigned = 0;
        for idx in 0..self.slots.len() {
            if self.slots[idx].assignment != Assignment::Unset {
                continue;
            }
            let key = self.slots[idx].source.to_snake_case();
            let candidate = targets.iter().find(|target| {
                target.to_snake_case() == key
                    && !self
                        .slots
                        .iter()
                        .any(|slot| slot.assignment.target() == Some(target.as_str()))
            });
            if let Some(target) = candidate {
                debug!(
                    "Auto-mapped source column '{}' -> '{target}'",
                    self.slots[idx].source
                );
                self.slots[idx].assignment = Assignment::Target(target.clone());
                assigned += 1;
            }
        }
        assigned
    }

    pub fn mapped_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.assignment.target().is_some())
            .count()
    }

    pub fn unset_sources(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|slot| slot.assignment == Assignment::Unset)
            .map(|slot| slot.source.as_str())
            .collect()
    }

    /// Distinct targets in source order, each paired with the position of
    /// the first source column that feeds it.
    pub fn active_targets(&self) -> Vec<(&str, usize)> {
        let mut active: Vec<(&str, usize)> = Vec::new();
        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(target) = slot.assignment.target()
                && !active.iter().any(|(seen, _)| *seen == target)
            {
                active.push((target, idx));
            }
        }
        active
    }
}

/// One `source: target` line of a mapping file. An empty target (`""`)
/// excludes the source column; an entry without a target leaves it unmapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MappingFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_columns: Vec<String>,
    #[serde(default)]
    pub columns: Vec<MappingEntry>,
}

impl MappingFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening mapping file {path:?}"))?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).context("Parsing mapping YAML")
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing mapping to YAML")
    }

    pub fn from_mapping(table: Option<&str>, targets: &TargetColumns, mapping: &Mapping) -> Self {
        MappingFile {
            table: table.map(str::to_string),
            target_columns: targets.to_vec(),
            columns: mapping
                .slots()
                .iter()
                .map(|slot| MappingEntry {
                    source: slot.source.clone(),
                    target: match &slot.assignment {
                        Assignment::Unset => None,
                        Assignment::Excluded => Some(String::new()),
                        Assignment::Target(target) => Some(target.clone()),
                    },
                })
                .collect(),
        }
    }
}

/// Parses a `SOURCE=TARGET` pair; `SOURCE=` excludes the column.
pub fn parse_map_pair(raw: &str) -> ConvertResult<(String, String)> {
    let (source, target) = raw.split_once('=').ok_or_else(|| {
        ConvertError::validation(format!(
            "Invalid mapping '{raw}': expected SOURCE=TARGET"
        ))
    })?;
    let source = source.trim();
    if source.is_empty() {
        return Err(ConvertError::validation(format!(
            "Invalid mapping '{raw}': source column is empty"
        )));
    }
    Ok((source.to_string(), target.trim().to_string()))
}
