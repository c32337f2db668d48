//! Diagnostics
//!
//! Flat, coded view of integrity findings. Severity describes how serious a
//! finding is for the loaded graph; no severity ever aborts a run.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::NodeKind;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Identity ===
    /// Several node rows of one kind share a natural key
    DuplicateNode,
    /// Several input records share a `paper_id`
    DuplicateRecord,
    /// One identifier is carried by nodes with different keys or kinds
    IdCollision,

    // === Edges ===
    /// Edge source is not a known node
    MissingFrom,
    /// Edge target is not a known node
    MissingTo,

    // === Coverage ===
    /// Node has no incident edge
    OrphanNode,
    /// Node has no embedding attached
    MissingEmbedding,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateNode => "E001",
            Self::DuplicateRecord => "W001",
            Self::IdCollision => "E002",
            Self::MissingFrom => "E003",
            Self::MissingTo => "E004",
            Self::OrphanNode => "W002",
            Self::MissingEmbedding => "I001",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::DuplicateNode | Self::IdCollision | Self::MissingFrom | Self::MissingTo => {
                Severity::Error
            }
            Self::DuplicateRecord | Self::OrphanNode => Severity::Warning,
            Self::MissingEmbedding => Severity::Info,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Severity
// =============================================================================

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// What the finding is about: a node id, a natural key or a paper id
    pub subject: String,
    /// Kind of the node(s) involved, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    pub code: DiagnosticCode,
    pub message: String,
    /// Additional context (ids involved, edge endpoints)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(
        subject: impl Into<String>,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            kind: None,
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = self.code.severity();
        write!(f, "[{}] {}: {} ({})", self.code, severity, self.message, self.subject)?;
        if let Some(kind) = self.kind {
            write!(f, " [{}]", kind)?;
        }

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of findings from one validation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items with the given code
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &DiagnosticItem> {
        self.items.iter().filter(move |i| i.code == code)
    }

    /// Number of findings at one severity
    pub fn count(&self, severity: Severity) -> usize {
        self.items.iter().filter(|i| i.severity() == severity).count()
    }

    /// One line per finding, then a per-severity tally
    pub fn format_all(&self) -> String {
        let mut output = String::new();
        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if !self.is_empty() {
            output.push_str(&format!(
                "\n{} error(s), {} warning(s), {} info\n",
                self.count(Severity::Error),
                self.count(Severity::Warning),
                self.count(Severity::Info)
            ));
        }
        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_all())
    }
}
