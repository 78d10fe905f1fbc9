//! # Diagnostics
//!
//! Non-fatal findings are collected as data and handed back to the caller
//! with the result, instead of being written to a log stream. A
//! `Critical` entry means the operation refused to run.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        };
        write!(f, "{}", s)
    }
}

/// A single named finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable identifier of the check that produced this entry.
    pub name: String,
    pub level: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(name: impl Into<String>, level: Severity, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.name, self.message)
    }
}

/// An ordered list of findings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn info(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::new(name, Severity::Info, message));
    }

    pub fn warn(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::new(name, Severity::Warning, message));
    }

    pub fn critical(&mut self, name: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::new(name, Severity::Critical, message));
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn has_critical(&self) -> bool {
        self.items.iter().any(|d| d.level == Severity::Critical)
    }

    /// Entries at exactly the given level.
    pub fn at_level(&self, level: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.level == level)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.at_level(Severity::Warning)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
