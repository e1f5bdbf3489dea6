//! Post linker writing private bookkeeping about the compiled results.

use std::fmt::Write as _;

use serde::Serialize;

use crate::artifact::{ArtifactSet, EmittedArtifact};
use crate::compilation::SelectionPermutation;
use crate::context::LinkerContext;
use crate::error::{LinkError, Result};
use crate::linker::{Linker, LinkerOrder};
use crate::linkers::SelectionScriptLinker;

pub const MAPPINGS_FILE: &str = "compilation-mappings.txt";
pub const PERMUTATIONS_FILE: &str = "permutations.json";

pub struct ManifestLinker;

impl ManifestLinker {
    pub const NAME: &'static str = "manifest";
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    strong_name: &'a str,
    permutations: &'a [usize],
    selections: &'a [SelectionPermutation],
}

impl Linker for ManifestLinker {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn order(&self) -> LinkerOrder {
        LinkerOrder::Post
    }

    fn link(&self, _ctx: &LinkerContext, mut artifacts: ArtifactSet) -> Result<ArtifactSet> {
        let mut mappings = String::new();
        let mut entries = Vec::new();

        for result in artifacts.compilations() {
            let cache_file = SelectionScriptLinker::cache_file(result.strong_name());
            if result.selection_permutations().is_empty() {
                let _ = writeln!(mappings, "{}\n", cache_file);
            }
            for selection in result.selection_permutations() {
                let _ = writeln!(mappings, "{}", cache_file);
                for (name, value) in selection {
                    let _ = writeln!(mappings, "{} {}", name, value);
                }
                let _ = writeln!(mappings);
            }
            entries.push(ManifestEntry {
                strong_name: result.strong_name(),
                permutations: result.permutation_ids(),
                selections: result.selection_permutations(),
            });
        }

        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| LinkError::stage(Self::NAME, e))?;

        artifacts.add_or_replace(EmittedArtifact::new(Self::NAME, MAPPINGS_FILE, mappings).private());
        artifacts.add_or_replace(EmittedArtifact::new(Self::NAME, PERMUTATIONS_FILE, json).private());
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compilation::CompiledResult;
    use crate::artifact::Visibility;
    use weft_types::{ModuleDef, PropertyModel};

    #[test]
    fn test_mappings_list_every_selection() {
        let mut result = CompiledResult::from_code("x();");
        result.add_permutation_id(0);
        result.add_selection_permutation([("locale".to_string(), "en".to_string())].into());
        result.add_selection_permutation([("locale".to_string(), "fr".to_string())].into());
        let strong = result.strong_name().to_string();

        let mut input = ArtifactSet::new();
        input.add_or_replace(result);
        let ctx = LinkerContext::new(&ModuleDef::new("m", PropertyModel::new()), Default::default(), Vec::new());
        let out = ManifestLinker.link(&ctx, input).unwrap();

        let files: Vec<&EmittedArtifact> = out.emitted().collect();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.visibility() == Visibility::Private));

        let mappings = std::str::from_utf8(files[0].contents()).unwrap();
        assert_eq!(
            mappings,
            format!("{0}.cache.js\nlocale en\n\n{0}.cache.js\nlocale fr\n\n", strong)
        );

        let json: serde_json::Value = serde_json::from_slice(files[1].contents()).unwrap();
        assert_eq!(json[0]["permutations"], serde_json::json!([0]));
        assert_eq!(json[0]["selections"][1]["locale"], "fr");
    }
}
