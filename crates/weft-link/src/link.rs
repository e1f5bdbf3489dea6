//! The Link stage: merge compiled permutations and run the linker chain.

use std::path::{Path, PathBuf};

use log::{debug, info};
use weft_types::{ModuleDef, Permutation};

use crate::artifact::ArtifactSet;
use crate::context::LinkerContext;
use crate::error::{LinkError, Result};
use crate::linker::LinkerRegistry;
use crate::precompilation::{permutation_filename, Precompilation, PRECOMPILATION_FILENAME};

/// Settings for one link invocation.
#[derive(Debug, Default)]
pub struct LinkOptions {
    /// Property values fixed for this link only, applied after the
    /// precompilation's own pins
    pub pins: Vec<(String, String)>,
    /// Where linker names from the module are resolved
    pub registry: LinkerRegistry,
}

impl LinkOptions {
    pub fn with_pin(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pins.push((name.into(), value.into()));
        self
    }

    pub fn with_registry(mut self, registry: LinkerRegistry) -> Self {
        self.registry = registry;
        self
    }
}

/// Link `precompilation` using one compiled result file per permutation.
///
/// `result_files[i]` must hold the code of permutation `i`. The count is
/// checked before anything is read.
pub fn link(
    module: &ModuleDef,
    precompilation: &Precompilation,
    result_files: &[PathBuf],
    options: &LinkOptions,
) -> Result<ArtifactSet> {
    let permutations = precompilation.permutations();
    if permutations.len() != result_files.len() {
        return Err(LinkError::PermutationCountMismatch {
            permutations: permutations.len(),
            results: result_files.len(),
        });
    }
    if precompilation.module_name() != module.name() {
        return Err(LinkError::ModuleMismatch {
            expected: module.name().to_string(),
            found: precompilation.module_name().to_string(),
        });
    }

    let mut ctx = create_context(module, precompilation, options)?;

    info!("Linking module {}", module.name());
    for (permutation, path) in permutations.iter().zip(result_files) {
        finish_permutation(&mut ctx, permutation, path)?;
    }

    ctx.add_or_replace_artifacts(precompilation.generated_artifacts());
    let artifacts = ctx.invoke_link()?;
    info!("Link succeeded");
    Ok(artifacts)
}

/// The on-disk hand-off: read the record and every result file from `work_dir`.
pub fn run_link(work_dir: &Path, module: &ModuleDef, options: &LinkOptions) -> Result<ArtifactSet> {
    let precompilation = Precompilation::read_from(&work_dir.join(PRECOMPILATION_FILENAME))?;
    let result_files = locate_result_files(work_dir, precompilation.permutations().len())?;
    link(module, &precompilation, &result_files, options)
}

/// Paths of `permutation-0.js` .. `permutation-{count-1}.js`.
///
/// The first absent file is reported.
pub fn locate_result_files(work_dir: &Path, count: usize) -> Result<Vec<PathBuf>> {
    (0..count)
        .map(|id| {
            let path = permutation_filename(work_dir, id);
            if path.is_file() {
                Ok(path)
            } else {
                Err(LinkError::CompiledResultMissing {
                    permutation: id,
                    path,
                })
            }
        })
        .collect()
}

fn create_context(
    module: &ModuleDef,
    precompilation: &Precompilation,
    options: &LinkOptions,
) -> Result<LinkerContext> {
    let linkers = options.registry.build_chain(module.linkers())?;
    let mut ctx = LinkerContext::new(module, precompilation.ir().options.clone(), linkers);
    for (name, value) in precompilation.pinned_properties() {
        ctx.pin_property(name, value)?;
    }
    for (name, value) in &options.pins {
        ctx.pin_property(name, value)?;
    }
    Ok(ctx)
}

/// Record one permutation's compiled result and its selection permutations.
fn finish_permutation(ctx: &mut LinkerContext, permutation: &Permutation, path: &Path) -> Result<()> {
    let selections = permutation
        .oracles()
        .iter()
        .filter(|oracle| ctx.is_reachable(oracle))
        .map(|oracle| ctx.unbound_properties(oracle))
        .collect::<Result<Vec<_>>>()?;

    let result = ctx.compilation_for(path, permutation.id())?;
    for selection in selections {
        result.add_selection_permutation(selection);
    }
    debug!(
        "Finished permutation {} with {} selection(s)",
        permutation.id(),
        result.selection_permutations().len()
    );
    Ok(())
}
