//! Root variable mapping and reference resolution
//!
//! The mapping is filled from `:root` declarations in source order, then
//! resolved in place so that every value that does not depend on a reference
//! cycle is a plain literal.

use crate::error::{InlinerError, Result};
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};

/// `var(--name)`; no fallback handling, a comma becomes part of the name
pub const VAR_REFERENCE_PATTERN: &str = r"var\((--[^)]+)\)";

/// Compiled `var(--name)` matcher shared by the resolver and the substituter
#[derive(Debug, Clone)]
pub struct ReferencePattern {
    regex: Regex,
}

impl ReferencePattern {
    pub fn new() -> Result<Self> {
        let regex = Regex::new(VAR_REFERENCE_PATTERN).map_err(|e| InlinerError::Pattern {
            message: e.to_string(),
        })?;
        Ok(Self { regex })
    }

    /// Cheap pre-check before running the regex.
    pub fn is_candidate(&self, value: &str) -> bool {
        value.contains("var(")
    }

    /// Referenced names in order of appearance, repeats included.
    pub fn names<'v>(&self, value: &'v str) -> Vec<&'v str> {
        self.regex
            .captures_iter(value)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Replace every reference for which `lookup` has a value; other
    /// references stay as written.
    pub fn substitute<'m, F>(&self, value: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<&'m str>,
    {
        self.regex
            .replace_all(value, |caps: &Captures| match lookup(&caps[1]) {
                Some(resolved) => resolved.to_string(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    /// Current value; equals `raw_value` until resolution runs
    pub value: String,
    pub raw_value: String,
    pub def_line: usize,
}

/// Name → value mapping that remembers the order names were first defined.
/// Redefinitions overwrite the value in place.
#[derive(Debug, Clone, Default)]
pub struct VariableMap {
    entries: Vec<VariableDef>,
    index: HashMap<String, usize>,
}

/// What the resolver did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub passes: usize,
    /// Names that reach themselves through references, in mapping order
    pub cyclic: Vec<String>,
}

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or redefine a variable. Returns the line of the previous
    /// definition when the name was already present.
    pub fn insert(&mut self, name: &str, value: &str, def_line: usize) -> Option<usize> {
        let def = VariableDef {
            name: name.to_string(),
            value: value.to_string(),
            raw_value: value.to_string(),
            def_line,
        };

        match self.index.get(name) {
            Some(&position) => {
                let previous = self.entries[position].def_line;
                self.entries[position] = def;
                Some(previous)
            }
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(def);
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_def(name).map(|def| def.value.as_str())
    }

    pub fn get_def(&self, name: &str) -> Option<&VariableDef> {
        self.index.get(name).map(|&position| &self.entries[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableDef> {
        self.entries.iter()
    }

    /// Entries whose value still carries reference syntax.
    pub fn unresolved<'s>(&'s self, pattern: &'s ReferencePattern) -> impl Iterator<Item = &'s VariableDef> {
        self.entries
            .iter()
            .filter(move |def| !pattern.names(&def.value).is_empty())
    }

    /// Rewrite values until a full pass changes nothing.
    ///
    /// Entries are visited in mapping order and read each other's current
    /// values, so a pass sees rewrites made earlier in the same pass. A
    /// reference is never expanded to a value that still refers to the same
    /// name: once a cycle closes, its members keep their reference syntax
    /// instead of growing on every pass. The pass count is capped at the
    /// number of entries plus one.
    pub fn resolve(&mut self, pattern: &ReferencePattern) -> Resolution {
        let limit = self.entries.len() + 1;
        let mut passes = 0;
        while passes < limit {
            passes += 1;
            let mut changed = false;

            for position in 0..self.entries.len() {
                if !pattern.is_candidate(&self.entries[position].value) {
                    continue;
                }

                let new_value = pattern.substitute(&self.entries[position].value, |name| {
                    self.index
                        .get(name)
                        .map(|&target| self.entries[target].value.as_str())
                        .filter(|value| !pattern.names(value).contains(&name))
                });

                if new_value != self.entries[position].value {
                    self.entries[position].value = new_value;
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        let mut cyclic: Vec<usize> = self.find_cycle_members(pattern).into_iter().collect();
        cyclic.sort_unstable();

        Resolution {
            passes,
            cyclic: cyclic
                .into_iter()
                .map(|position| self.entries[position].name.clone())
                .collect(),
        }
    }

    /// Entries that reach themselves through references in their raw values.
    /// Depth-first search from every entry with an explicit stack.
    fn find_cycle_members(&self, pattern: &ReferencePattern) -> HashSet<usize> {
        let edges: Vec<Vec<usize>> = self
            .entries
            .iter()
            .map(|def| {
                pattern
                    .names(&def.raw_value)
                    .into_iter()
                    .filter_map(|name| self.index.get(name).copied())
                    .collect()
            })
            .collect();

        let mut members = HashSet::new();
        for start in 0..edges.len() {
            let mut stack = edges[start].clone();
            let mut seen = HashSet::new();

            while let Some(node) = stack.pop() {
                if node == start {
                    members.insert(start);
                    break;
                }
                if seen.insert(node) {
                    stack.extend(edges[node].iter().copied());
                }
            }
        }

        members
    }
}
