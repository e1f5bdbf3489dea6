//! Diagnostic infrastructure for the weft linker.
//!
//! This crate provides structured error reporting with:
//! - Stable diagnostic codes grouped by failure category
//! - The offending file path, when there is one
//! - Terminal and JSON output
//!
//! # Example
//!
//! ```
//! use weft_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticEmitter, TerminalEmitter};
//!
//! let diag = Diagnostic::error(
//!     DiagnosticCode::CompiledResultMissing,
//!     "file not found 'work/permutation-1.js'",
//! )
//! .with_path("work/permutation-1.js")
//! .with_help("compile all permutations before linking")
//! .build();
//!
//! let stderr = std::io::stderr();
//! let mut emitter = TerminalEmitter::new(stderr.lock(), false);
//! emitter.emit(&diag).unwrap();
//! ```

pub mod diagnostic;
pub mod emitter;

// Re-export commonly used types
pub use diagnostic::{Category, Diagnostic, DiagnosticBuilder, DiagnosticCode, Diagnostics, Severity};
pub use emitter::{DiagnosticEmitter, JsonEmitter, TerminalEmitter};
