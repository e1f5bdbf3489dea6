//! Errors raised while building a property model or loading a module.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when declaring properties or parsing module config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error parsing TOML syntax.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Error reading a module file.
    #[error("I/O error reading {path}: {error}")]
    Io {
        /// Path to the file that failed to read.
        path: PathBuf,
        /// The underlying I/O error.
        error: std::io::Error,
    },

    /// The module has no name.
    #[error("module name must not be empty")]
    EmptyModuleName,

    /// The deploy path is empty or leaves the output root.
    #[error("deploy path '{0}' must be a non-empty relative path without '..'")]
    InvalidDeployPath(String),

    /// Two properties share a name.
    #[error("property '{0}' is declared more than once")]
    DuplicateProperty(String),

    /// A binding property declares no legal values.
    #[error("binding property '{0}' has no legal values")]
    NoValues(String),

    /// A binding property lists the same value twice.
    #[error("binding property '{property}' lists value '{value}' more than once")]
    DuplicateValue {
        /// The property name.
        property: String,
        /// The repeated value.
        value: String,
    },

    /// A collapse group names a value the property does not declare.
    #[error("collapse group of '{property}' names unknown value '{value}'")]
    UnknownCollapseValue {
        /// The property name.
        property: String,
        /// The value that is not legal for the property.
        value: String,
    },

    /// A value appears in two collapse groups.
    #[error("value '{value}' of '{property}' appears in more than one collapse group")]
    OverlappingCollapse {
        /// The property name.
        property: String,
        /// The value claimed by several groups.
        value: String,
    },

    /// A pin names a property the module does not declare.
    #[error("cannot pin undeclared property '{0}'")]
    UnknownProperty(String),

    /// A pin names a value the property does not allow.
    #[error("cannot pin '{property}' to '{value}': not a legal value")]
    IllegalPin {
        /// The property name.
        property: String,
        /// The rejected value.
        value: String,
    },

    /// A `name=value` pin could not be parsed.
    #[error("malformed property pin '{0}' (expected name=value)")]
    MalformedPin(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
