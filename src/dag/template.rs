// src/dag/template.rs

//! Job templates: named, immutable sets of submit directives.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use crate::dag::layer::JobVariableSet;

/// Macros the scheduler expands itself; these are never bound per instance.
pub const SCHEDULER_MACROS: &[&str] = &[
    "Cluster", "ClusterId", "Process", "ProcId", "Node", "JOB", "Item", "Step", "Row",
];

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    // `$(name)`; HTCondor also allows `$(name:default)` which we treat as bound.
    Regex::new(r"\$\(([A-Za-z_][A-Za-z0-9_.+]*)(:[^)]*)?\)").expect("static regex")
});

/// A variable referenced by a template but missing from an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedPlaceholder {
    pub directive: String,
    pub variable: String,
}

/// Named set of submit directives with `$(variable)` placeholders.
///
/// Directive order is kept sorted by key so rendered descriptors do not depend
/// on how the template was assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTemplate {
    name: String,
    directives: BTreeMap<String, String>,
}

impl JobTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            directives: BTreeMap::new(),
        }
    }

    /// Builder-style directive setter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.directives.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directives(&self) -> &BTreeMap<String, String> {
        &self.directives
    }

    /// Look up a directive; keys are case-insensitive as in submit files.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.directives
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn executable(&self) -> Option<&str> {
        self.get("executable")
    }

    /// Every per-instance variable the template references.
    pub fn placeholders(&self) -> BTreeSet<String> {
        self.directives
            .values()
            .flat_map(|v| PLACEHOLDER.captures_iter(v))
            .filter(|c| c.get(2).is_none())
            .map(|c| c[1].to_string())
            .filter(|name| !is_scheduler_macro(name))
            .collect()
    }

    /// Substitute `vars` into every directive.
    ///
    /// Scheduler macros and `$(name:default)` forms are left untouched; any
    /// other placeholder missing from `vars` is reported.
    pub fn render(
        &self,
        vars: &JobVariableSet,
    ) -> std::result::Result<BTreeMap<String, String>, UnresolvedPlaceholder> {
        let mut rendered = BTreeMap::new();
        for (key, value) in &self.directives {
            let mut missing = None;
            let out = PLACEHOLDER.replace_all(value, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                if caps.get(2).is_some() || is_scheduler_macro(name) {
                    return caps[0].to_string();
                }
                match vars.get(name) {
                    Some(v) => v.to_string(),
                    None => {
                        missing.get_or_insert_with(|| name.to_string());
                        caps[0].to_string()
                    }
                }
            });
            if let Some(variable) = missing {
                return Err(UnresolvedPlaceholder {
                    directive: key.clone(),
                    variable,
                });
            }
            rendered.insert(key.clone(), out.into_owned());
        }
        Ok(rendered)
    }

    /// Submit-description text: one `key = value` line per directive, then
    /// `queue`. Placeholders stay as scheduler macros; the DAG's `VARS` lines
    /// bind them per node.
    pub fn to_submit_description(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.directives {
            let _ = writeln!(out, "{key} = {value}");
        }
        out.push_str("queue\n");
        out
    }
}

fn is_scheduler_macro(name: &str) -> bool {
    SCHEDULER_MACROS.iter().any(|m| m.eq_ignore_ascii_case(name))
}
