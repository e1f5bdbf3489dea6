//! Built-in linkers.

pub mod manifest;
pub mod selection;

pub use manifest::ManifestLinker;
pub use selection::SelectionScriptLinker;
