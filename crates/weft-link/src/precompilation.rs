//! The precompilation record handed from the front end to the link phase.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use weft_types::{Permutation, PermutationId};

use crate::artifact::ArtifactSet;
use crate::error::{LinkError, Result};

/// Name of the precompilation record inside the work directory.
pub const PRECOMPILATION_FILENAME: &str = "precompilation.json";

/// Version written into every record; readers reject anything else.
pub const FORMAT_VERSION: u32 = 1;

/// Path of the compiled result for permutation `id` inside `work_dir`.
pub fn permutation_filename(work_dir: &Path, id: PermutationId) -> PathBuf {
    work_dir.join(format!("permutation-{}.js", id))
}

/// How emitted code is formatted; linkers follow the same style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    #[default]
    Obfuscated,
    Pretty,
    Detailed,
}

/// Compiler options that survive into the link phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerOptions {
    #[serde(default)]
    pub output_style: OutputStyle,
}

/// The module's shared intermediate representation.
///
/// The body is opaque to the linker; only the options are consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedIr {
    pub options: CompilerOptions,
    pub body: String,
}

/// Result of front-end analysis: the module's IR plus every permutation.
///
/// Immutable once built. Persisted between the precompile, per-permutation
/// compile and link phases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precompilation {
    format_version: u32,
    module_name: String,
    ir: SharedIr,
    permutations: Vec<Permutation>,
    #[serde(default)]
    pinned_properties: BTreeMap<String, String>,
    #[serde(default)]
    generated_artifacts: ArtifactSet,
}

#[derive(Debug, Error)]
enum RecordError {
    #[error("unsupported format version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },

    #[error("permutation at index {index} has id {id}")]
    PermutationId { index: usize, id: PermutationId },

    #[error("record has no permutations")]
    NoPermutations,

    #[error("permutation {id} answers for no property combination")]
    NoOracles { id: PermutationId },

    #[error("permutation {id} has an oracle with {props} properties but {values} values")]
    OracleShape {
        id: PermutationId,
        props: usize,
        values: usize,
    },
}

impl Precompilation {
    pub fn new(module_name: impl Into<String>, ir: SharedIr, permutations: Vec<Permutation>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            module_name: module_name.into(),
            ir,
            permutations,
            pinned_properties: BTreeMap::new(),
            generated_artifacts: ArtifactSet::new(),
        }
    }

    /// Record a property value fixed before compilation.
    pub fn with_pinned_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pinned_properties.insert(name.into(), value.into());
        self
    }

    /// Artifacts produced by generators during precompile.
    pub fn with_generated_artifacts(mut self, artifacts: ArtifactSet) -> Self {
        self.generated_artifacts = artifacts;
        self
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn ir(&self) -> &SharedIr {
        &self.ir
    }

    pub fn permutations(&self) -> &[Permutation] {
        &self.permutations
    }

    pub fn pinned_properties(&self) -> &BTreeMap<String, String> {
        &self.pinned_properties
    }

    pub fn generated_artifacts(&self) -> &ArtifactSet {
        &self.generated_artifacts
    }

    /// Write the record to `path`, creating parent directories.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| LinkError::io(parent, e))?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|e| LinkError::io(path, e.into()))?;
        fs::write(path, json).map_err(|e| LinkError::io(path, e))
    }

    /// Read a record back.
    ///
    /// A missing file and an undecodable one are reported differently.
    pub fn read_from(path: &Path) -> Result<Self> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LinkError::PrecompilationMissing {
                    path: path.to_path_buf(),
                })
            }
            Err(e) => return Err(LinkError::io(path, e)),
        };

        let corrupt = |source: Box<dyn std::error::Error + Send + Sync>| {
            LinkError::PrecompilationDeserializationFailed {
                path: path.to_path_buf(),
                source,
            }
        };

        let record: Self = serde_json::from_slice(&bytes).map_err(|e| corrupt(Box::new(e)))?;
        record.validate().map_err(|e| corrupt(Box::new(e)))?;
        Ok(record)
    }

    fn validate(&self) -> std::result::Result<(), RecordError> {
        if self.format_version != FORMAT_VERSION {
            return Err(RecordError::Version {
                found: self.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if self.permutations.is_empty() {
            return Err(RecordError::NoPermutations);
        }
        for (index, perm) in self.permutations.iter().enumerate() {
            if perm.id() != index {
                return Err(RecordError::PermutationId { index, id: perm.id() });
            }
            if perm.oracles().is_empty() {
                return Err(RecordError::NoOracles { id: index });
            }
            for oracle in perm.oracles() {
                let (props, values) = (oracle.ordered_props().len(), oracle.ordered_values().len());
                if props != values {
                    return Err(RecordError::OracleShape { id: index, props, values });
                }
            }
        }
        Ok(())
    }
}
