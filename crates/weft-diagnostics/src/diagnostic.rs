//! Diagnostic types for link errors and advisories.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational note
    Note,
    /// Warning (the link succeeded but something deserves attention)
    Warning,
    /// Error (the link was aborted)
    Error,
}

impl Severity {
    /// Get the string representation for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure category, mirroring how the caller should react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// Phases run out of order or with mismatched inputs
    Configuration,
    /// An earlier phase has not produced its output yet
    MissingArtifact,
    /// A persisted record exists but cannot be read back
    Deserialization,
    /// A linker in the chain failed
    LinkerStage,
    /// Writing the output directories failed
    Materialization,
    /// Everything else
    Internal,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Configuration => "configuration",
            Category::MissingArtifact => "missing-artifact",
            Category::Deserialization => "deserialization",
            Category::LinkerStage => "linker-stage",
            Category::Materialization => "materialization",
            Category::Internal => "internal",
        }
    }
}

/// Diagnostic codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Configuration errors (L001-L099)
    /// Result-file count differs from the permutation count
    PermutationCountMismatch,
    /// Precompilation was produced for another module
    ModuleMismatch,
    /// More than one primary linker in the chain
    MultiplePrimaryLinkers,
    /// Module names a linker nobody registered
    UnknownLinker,
    /// A property is not declared by the module
    UnknownProperty,
    /// A property value is not legal for its property
    InvalidPropertyValue,
    /// The module definition itself is malformed
    InvalidModule,

    // Missing artifacts (M001-M099)
    /// No precompilation record in the work directory
    PrecompilationMissing,
    /// A per-permutation result file is absent
    CompiledResultMissing,

    // Deserialization (D001-D099)
    /// Precompilation record exists but cannot be decoded
    PrecompilationDeserializationFailed,
    /// A result file exists but cannot be read as text
    CompiledResultUnreadable,

    // Linker stages (S001-S099)
    /// A linker reported a failure
    LinkerFailed,

    // Output (O001-O099)
    /// Filesystem failure while writing output
    OutputWriteFailed,
    /// An artifact path escapes its output directory
    InvalidArtifactPath,
    /// Private artifacts landed in the legacy auxiliary directory
    LegacyAuxDirectory,
    /// The public and private output directories contain one another
    NestedOutputDirectories,

    // Internal errors (I001-I099)
    /// Internal linker error
    InternalError,
}

impl DiagnosticCode {
    /// Every code, in documentation order.
    pub const ALL: &'static [DiagnosticCode] = &[
        Self::PermutationCountMismatch,
        Self::ModuleMismatch,
        Self::MultiplePrimaryLinkers,
        Self::UnknownLinker,
        Self::UnknownProperty,
        Self::InvalidPropertyValue,
        Self::InvalidModule,
        Self::PrecompilationMissing,
        Self::CompiledResultMissing,
        Self::PrecompilationDeserializationFailed,
        Self::CompiledResultUnreadable,
        Self::LinkerFailed,
        Self::OutputWriteFailed,
        Self::InvalidArtifactPath,
        Self::LegacyAuxDirectory,
        Self::NestedOutputDirectories,
        Self::InternalError,
    ];

    /// Get the code string (e.g., "L001").
    pub fn as_str(&self) -> &'static str {
        match self {
            // Configuration
            Self::PermutationCountMismatch => "L001",
            Self::ModuleMismatch => "L002",
            Self::MultiplePrimaryLinkers => "L003",
            Self::UnknownLinker => "L004",
            Self::UnknownProperty => "L005",
            Self::InvalidPropertyValue => "L006",
            Self::InvalidModule => "L007",

            // Missing artifacts
            Self::PrecompilationMissing => "M001",
            Self::CompiledResultMissing => "M002",

            // Deserialization
            Self::PrecompilationDeserializationFailed => "D001",
            Self::CompiledResultUnreadable => "D002",

            // Linker stages
            Self::LinkerFailed => "S001",

            // Output
            Self::OutputWriteFailed => "O001",
            Self::InvalidArtifactPath => "O002",
            Self::LegacyAuxDirectory => "O003",
            Self::NestedOutputDirectories => "O004",

            // Internal
            Self::InternalError => "I001",
        }
    }

    /// Look a code up by its string form, ignoring case.
    pub fn parse(code: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(code))
    }

    pub fn category(&self) -> Category {
        match self {
            Self::PermutationCountMismatch
            | Self::ModuleMismatch
            | Self::MultiplePrimaryLinkers
            | Self::UnknownLinker
            | Self::UnknownProperty
            | Self::InvalidPropertyValue
            | Self::InvalidModule => Category::Configuration,

            Self::PrecompilationMissing | Self::CompiledResultMissing => Category::MissingArtifact,

            Self::PrecompilationDeserializationFailed | Self::CompiledResultUnreadable => {
                Category::Deserialization
            }

            Self::LinkerFailed => Category::LinkerStage,

            Self::OutputWriteFailed
            | Self::InvalidArtifactPath
            | Self::LegacyAuxDirectory
            | Self::NestedOutputDirectories => Category::Materialization,

            Self::InternalError => Category::Internal,
        }
    }

    /// Get the default severity for this code.
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::LegacyAuxDirectory => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A linker diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Unique code
    pub code: DiagnosticCode,
    /// Severity level
    pub severity: Severity,
    /// Short message (single line)
    pub message: String,
    /// What the caller should do about it
    pub help: Option<String>,
    /// The file the diagnostic is about
    pub path: Option<PathBuf>,
    /// Underlying causes, outermost first
    pub causes: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Error, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, Severity::Warning, message)
    }

    /// Create a diagnostic with the code's default severity.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(code, code.default_severity(), message)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }
}

/// Builder for constructing diagnostics fluently.
pub struct DiagnosticBuilder {
    inner: Diagnostic,
}

impl DiagnosticBuilder {
    /// Create a new diagnostic builder.
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            inner: Diagnostic {
                code,
                severity,
                message: message.into(),
                help: None,
                path: None,
                causes: Vec::new(),
            },
        }
    }

    /// Attach the offending file.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.inner.path = Some(path.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.inner.help = Some(help.into());
        self
    }

    /// Append an underlying cause.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.inner.causes.push(cause.into());
        self
    }

    /// Build the diagnostic.
    pub fn build(self) -> Diagnostic {
        self.inner
    }
}

/// Collection of diagnostics with summary statistics.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// All diagnostics
    pub items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_warning()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
