//! Link failures and their diagnostic codes.

use std::path::{Path, PathBuf};

use thiserror::Error;
use weft_diagnostics::{Diagnostic, DiagnosticCode};

use weft_types::PermutationId;

/// Errors that abort a link run.
///
/// Every variant is fatal; a link either completes or leaves no output.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The number of result files differs from the permutation count.
    #[error("mismatched result file count: {results} result file(s) for {permutations} permutation(s)")]
    PermutationCountMismatch {
        permutations: usize,
        results: usize,
    },

    /// The precompilation belongs to another module.
    #[error("precompilation was produced for module '{found}', not '{expected}'")]
    ModuleMismatch { expected: String, found: String },

    /// The chain names two primary linkers.
    #[error("linkers '{first}' and '{second}' are both primary linkers")]
    MultiplePrimaryLinkers { first: String, second: String },

    #[error("no linker named '{0}' is registered")]
    UnknownLinker(String),

    #[error("property '{0}' is not declared by the module")]
    UnknownProperty(String),

    #[error("'{value}' is not a legal value of property '{property}'")]
    InvalidPropertyValue { property: String, value: String },

    #[error("file not found '{}'; please run precompile first", path.display())]
    PrecompilationMissing { path: PathBuf },

    #[error("file not found '{}'; please compile all permutations", path.display())]
    CompiledResultMissing {
        permutation: PermutationId,
        path: PathBuf,
    },

    /// The record exists but cannot be decoded.
    #[error("unable to deserialize '{}'", path.display())]
    PrecompilationDeserializationFailed {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A result file exists but is not readable text.
    #[error("unable to read compiled result '{}'", path.display())]
    CompiledResultUnreadable {
        permutation: PermutationId,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Raised by a linker stage; passed through the chain untouched.
    #[error("linker '{linker}' failed")]
    Stage {
        linker: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("artifact path '{0}' must be relative and stay inside its output directory")]
    InvalidArtifactPath(String),

    #[error("deploy path '{0}' must be a non-empty relative path without '..'")]
    InvalidDeployPath(String),

    /// One output directory lies inside the other.
    #[error(
        "public directory '{}' and private directory '{}' must not contain one another",
        public_dir.display(),
        private_dir.display()
    )]
    NestedOutputDirectories {
        public_dir: PathBuf,
        private_dir: PathBuf,
    },

    #[error("I/O error on '{}'", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for link operations.
pub type Result<T> = std::result::Result<T, LinkError>;

impl LinkError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        LinkError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Wrap a failure reported by the linker named `linker`.
    pub fn stage(
        linker: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        LinkError::Stage {
            linker: linker.into(),
            source: source.into(),
        }
    }

    pub fn code(&self) -> DiagnosticCode {
        match self {
            LinkError::PermutationCountMismatch { .. } => DiagnosticCode::PermutationCountMismatch,
            LinkError::ModuleMismatch { .. } => DiagnosticCode::ModuleMismatch,
            LinkError::MultiplePrimaryLinkers { .. } => DiagnosticCode::MultiplePrimaryLinkers,
            LinkError::UnknownLinker(_) => DiagnosticCode::UnknownLinker,
            LinkError::UnknownProperty(_) => DiagnosticCode::UnknownProperty,
            LinkError::InvalidPropertyValue { .. } => DiagnosticCode::InvalidPropertyValue,
            LinkError::PrecompilationMissing { .. } => DiagnosticCode::PrecompilationMissing,
            LinkError::CompiledResultMissing { .. } => DiagnosticCode::CompiledResultMissing,
            LinkError::PrecompilationDeserializationFailed { .. } => {
                DiagnosticCode::PrecompilationDeserializationFailed
            }
            LinkError::CompiledResultUnreadable { .. } => DiagnosticCode::CompiledResultUnreadable,
            LinkError::Stage { .. } => DiagnosticCode::LinkerFailed,
            LinkError::InvalidArtifactPath(_) => DiagnosticCode::InvalidArtifactPath,
            LinkError::InvalidDeployPath(_) => DiagnosticCode::InvalidModule,
            LinkError::NestedOutputDirectories { .. } => DiagnosticCode::NestedOutputDirectories,
            LinkError::Io { .. } => DiagnosticCode::OutputWriteFailed,
        }
    }

    /// What the caller should do next, when there is something to do.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            LinkError::PermutationCountMismatch { .. } => {
                Some("pass exactly one compiled result per permutation, in permutation order")
            }
            LinkError::ModuleMismatch { .. } => Some("re-run precompile for this module"),
            LinkError::PrecompilationMissing { .. } => Some("run precompile first"),
            LinkError::CompiledResultMissing { .. } => {
                Some("compile all permutations before linking")
            }
            LinkError::PrecompilationDeserializationFailed { .. } => {
                Some("the record is corrupt or from another weft version; re-run precompile")
            }
            LinkError::CompiledResultUnreadable { .. } => {
                Some("result files must be UTF-8 JavaScript; recompile the permutation")
            }
            LinkError::UnknownLinker(_) => Some("check the `linkers` list of the module"),
            LinkError::NestedOutputDirectories { .. } => {
                Some("pass an --extra directory outside the public output, or omit it")
            }
            _ => None,
        }
    }

    /// The file the error is about, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            LinkError::PrecompilationMissing { path }
            | LinkError::CompiledResultMissing { path, .. }
            | LinkError::PrecompilationDeserializationFailed { path, .. }
            | LinkError::CompiledResultUnreadable { path, .. }
            | LinkError::Io { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Render as a single diagnostic, including the source chain.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut builder = Diagnostic::new(self.code(), self.to_string());
        if let Some(path) = self.path() {
            builder = builder.with_path(path);
        }
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            builder = builder.with_cause(cause.to_string());
            source = std::error::Error::source(cause);
        }
        if let Some(help) = self.help() {
            builder = builder.with_help(help);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_result_diagnostic() {
        let err = LinkError::CompiledResultMissing {
            permutation: 3,
            path: PathBuf::from("work/permutation-3.js"),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, DiagnosticCode::CompiledResultMissing);
        assert!(diag.message.contains("permutation-3.js"));
        assert_eq!(diag.path.as_deref(), Some(Path::new("work/permutation-3.js")));
        assert_eq!(diag.help.as_deref(), Some("compile all permutations before linking"));
    }

    #[test]
    fn test_deserialization_keeps_cause() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = LinkError::PrecompilationDeserializationFailed {
            path: PathBuf::from("work/precompilation.json"),
            source: Box::new(source),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code.as_str(), "D001");
        assert_eq!(diag.causes.len(), 1);
    }

    #[test]
    fn test_stage_error_carries_message_as_cause() {
        let err = LinkError::stage("std", "two results share a selection");
        assert_eq!(err.to_string(), "linker 'std' failed");
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, DiagnosticCode::LinkerFailed);
        assert_eq!(diag.causes, ["two results share a selection"]);
    }
}
