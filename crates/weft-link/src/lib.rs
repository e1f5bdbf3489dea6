//! Permutation linker
//!
//! Takes the [`Precompilation`] of a module and one compiled result per
//! permutation, runs the module's linker chain over them and writes the
//! resulting public and private artifacts to disk.
//!
//! ```no_run
//! use std::path::Path;
//! use weft_link::{produce_output, run_link, LinkOptions};
//! use weft_types::ModuleDef;
//!
//! let module = ModuleDef::load(Path::new("hello.module.toml"))?;
//! let artifacts = run_link(Path::new("work"), &module, &LinkOptions::default())?;
//! produce_output(&artifacts, &module, Path::new("www"), None)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod artifact;
pub mod compilation;
pub mod context;
pub mod error;
pub mod link;
pub mod linker;
pub mod linkers;
pub mod output;
pub mod precompilation;

pub use artifact::{Artifact, ArtifactId, ArtifactKind, ArtifactSet, EmittedArtifact, Visibility};
pub use compilation::{strong_name, CompiledResult, SelectionPermutation};
pub use context::{LinkerContext, SelectionProperty};
pub use error::{LinkError, Result};
pub use link::{link, locate_result_files, run_link, LinkOptions};
pub use linker::{order_chain, Linker, LinkerOrder, LinkerRegistry};
pub use linkers::{ManifestLinker, SelectionScriptLinker};
pub use output::{legacy_aux_dir_name, produce_output, OutputLayout, OutputReport};
pub use precompilation::{
    permutation_filename, CompilerOptions, OutputStyle, Precompilation, SharedIr, FORMAT_VERSION,
    PRECOMPILATION_FILENAME,
};
