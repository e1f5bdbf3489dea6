//! Per-run linker state: the link-time property registry, the compiled
//! results seen so far and the live artifact set.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::mem;
use std::path::Path;

use indexmap::IndexMap;
use log::debug;
use weft_types::{ModuleDef, PermutationId, PropertyOracle};

use crate::artifact::{Artifact, ArtifactSet};
use crate::compilation::{CompiledResult, SelectionPermutation};
use crate::error::{LinkError, Result};
use crate::linker::Linker;
use crate::precompilation::CompilerOptions;

/// Link-time view of a deployment property.
///
/// Properties with a static value are fixed for the whole deployment and
/// never appear in a [`SelectionPermutation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionProperty {
    name: String,
    values: Vec<String>,
    static_value: Option<String>,
    provider: Option<String>,
}

impl SelectionProperty {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// The static value, if the property is bound for this link.
    pub fn try_value(&self) -> Option<&str> {
        self.static_value.as_deref()
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }
}

pub struct LinkerContext {
    module_name: String,
    options: CompilerOptions,
    properties: BTreeMap<String, SelectionProperty>,
    linkers: Vec<Box<dyn Linker>>,
    compilations: IndexMap<String, CompiledResult>,
    artifacts: ArtifactSet,
}

impl LinkerContext {
    /// Build the registry from the module's declarations.
    ///
    /// `linkers` must already be in execution order.
    pub fn new(module: &ModuleDef, options: CompilerOptions, linkers: Vec<Box<dyn Linker>>) -> Self {
        let model = module.properties();
        let mut properties = BTreeMap::new();

        for binding in model.binding_properties() {
            properties.insert(
                binding.name.clone(),
                SelectionProperty {
                    name: binding.name.clone(),
                    values: binding.values.clone(),
                    static_value: binding.static_value().map(str::to_string),
                    provider: binding.provider.clone(),
                },
            );
        }
        for config in model.configuration_properties() {
            properties.insert(
                config.name.clone(),
                SelectionProperty {
                    name: config.name.clone(),
                    values: vec![config.value.clone()],
                    static_value: Some(config.value.clone()),
                    provider: None,
                },
            );
        }

        Self {
            module_name: module.name().to_string(),
            options,
            properties,
            linkers,
            compilations: IndexMap::new(),
            artifacts: ArtifactSet::new(),
        }
    }

    /// Fix `name` to `value` for this link.
    pub fn pin_property(&mut self, name: &str, value: &str) -> Result<()> {
        let property = self
            .properties
            .get_mut(name)
            .ok_or_else(|| LinkError::UnknownProperty(name.to_string()))?;
        if !property.values.iter().any(|v| v == value) {
            return Err(LinkError::InvalidPropertyValue {
                property: name.to_string(),
                value: value.to_string(),
            });
        }
        property.static_value = Some(value.to_string());
        Ok(())
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn property(&self, name: &str) -> Option<&SelectionProperty> {
        self.properties.get(name)
    }

    /// All properties, ordered by name.
    pub fn properties(&self) -> impl Iterator<Item = &SelectionProperty> {
        self.properties.values()
    }

    pub fn linker_names(&self) -> impl Iterator<Item = &str> {
        self.linkers.iter().map(|l| l.name())
    }

    /// Whether `oracle` agrees with every static value in this context.
    ///
    /// An oracle that names another value for a pinned property describes a
    /// target this deployment never serves.
    pub fn is_reachable(&self, oracle: &PropertyOracle) -> bool {
        oracle.iter().all(|(name, value)| {
            match self.properties.get(name).and_then(|p| p.try_value()) {
                Some(fixed) => fixed == value,
                None => true,
            }
        })
    }

    /// The part of `oracle` that is still open at link time.
    ///
    /// Properties that have a static value in this context are dropped even
    /// if they varied during compilation.
    pub fn unbound_properties(&self, oracle: &PropertyOracle) -> Result<SelectionPermutation> {
        let mut unbound = SelectionPermutation::new();
        for (name, value) in oracle.iter() {
            let property = self
                .properties
                .get(name)
                .ok_or_else(|| LinkError::UnknownProperty(name.to_string()))?;
            if property.try_value().is_some() {
                continue;
            }
            if !property.values.iter().any(|v| v == value) {
                return Err(LinkError::InvalidPropertyValue {
                    property: name.to_string(),
                    value: value.to_string(),
                });
            }
            unbound.insert(name.to_string(), value.to_string());
        }
        Ok(unbound)
    }

    /// Load the compiled result at `path` for permutation `id`.
    ///
    /// Byte-identical code maps to the result already loaded under the same
    /// strong name.
    pub fn compilation_for(&mut self, path: &Path, id: PermutationId) -> Result<&mut CompiledResult> {
        let code = match fs::read_to_string(path) {
            Ok(code) => code,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LinkError::CompiledResultMissing {
                    permutation: id,
                    path: path.to_path_buf(),
                })
            }
            Err(e) => {
                return Err(LinkError::CompiledResultUnreadable {
                    permutation: id,
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let fresh = CompiledResult::from_code(code);
        let result = self
            .compilations
            .entry(fresh.strong_name().to_string())
            .or_insert(fresh);
        result.add_permutation_id(id);
        debug!(
            "Permutation {} compiled to {} ({} bytes)",
            id,
            result.strong_name(),
            result.code().len()
        );
        Ok(result)
    }

    pub fn compilations(&self) -> impl Iterator<Item = &CompiledResult> {
        self.compilations.values()
    }

    pub fn add_or_replace_artifacts(&mut self, artifacts: &ArtifactSet) {
        self.artifacts.add_all_or_replace(artifacts.iter().cloned());
    }

    /// Run the chain over the accumulated artifacts.
    ///
    /// Compilations come first in the set handed to the first linker,
    /// followed by everything added through
    /// [`add_or_replace_artifacts`](Self::add_or_replace_artifacts).
    /// A failing stage ends the run with its error.
    pub fn invoke_link(&mut self) -> Result<ArtifactSet> {
        let mut artifacts: ArtifactSet = mem::take(&mut self.compilations)
            .into_values()
            .map(Artifact::from)
            .collect();
        artifacts.add_all_or_replace(mem::take(&mut self.artifacts));

        for linker in &self.linkers {
            debug!("Invoking linker '{}' ({} artifacts)", linker.name(), artifacts.len());
            artifacts = linker.link(self, artifacts)?;
        }
        Ok(artifacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::{BindingProperty, ConfigurationProperty, PropertyModel};

    fn module() -> ModuleDef {
        let model = PropertyModel::new()
            .with_binding(BindingProperty::new("agent", ["ie", "moz"]).with_provider("return 'ie';"))
            .unwrap()
            .with_binding(BindingProperty::new("locale", ["en", "fr"]))
            .unwrap()
            .with_binding(BindingProperty::new("mode", ["only"]))
            .unwrap()
            .with_configuration(ConfigurationProperty::new("debug", "false"))
            .unwrap();
        ModuleDef::new("com.example.Hello", model)
    }

    fn context() -> LinkerContext {
        LinkerContext::new(&module(), CompilerOptions::default(), Vec::new())
    }

    #[test]
    fn test_registry_statics() {
        let ctx = context();
        assert_eq!(ctx.property("agent").unwrap().try_value(), None);
        assert_eq!(ctx.property("agent").unwrap().provider(), Some("return 'ie';"));
        assert_eq!(ctx.property("mode").unwrap().try_value(), Some("only"));
        assert_eq!(ctx.property("debug").unwrap().try_value(), Some("false"));
        let names: Vec<&str> = ctx.properties().map(SelectionProperty::name).collect();
        assert_eq!(names, ["agent", "debug", "locale", "mode"]);
    }

    #[test]
    fn test_unbound_skips_static_properties() {
        let mut ctx = context();
        let oracle = PropertyOracle::from_pairs([("agent", "moz"), ("locale", "fr"), ("mode", "only")]);

        let open = ctx.unbound_properties(&oracle).unwrap();
        assert_eq!(open.len(), 2);
        assert_eq!(open["agent"], "moz");
        assert_eq!(open["locale"], "fr");

        ctx.pin_property("locale", "fr").unwrap();
        let open = ctx.unbound_properties(&oracle).unwrap();
        assert_eq!(open.keys().collect::<Vec<_>>(), ["agent"]);
    }

    #[test]
    fn test_unbound_rejects_unknown_and_illegal() {
        let ctx = context();
        let err = ctx
            .unbound_properties(&PropertyOracle::from_pairs([("theme", "dark")]))
            .unwrap_err();
        assert!(matches!(err, LinkError::UnknownProperty(ref p) if p == "theme"));

        let err = ctx
            .unbound_properties(&PropertyOracle::from_pairs([("agent", "opera")]))
            .unwrap_err();
        assert!(matches!(err, LinkError::InvalidPropertyValue { ref value, .. } if value == "opera"));
    }

    #[test]
    fn test_pinned_value_decides_reachability() {
        let mut ctx = context();
        let ie = PropertyOracle::from_pairs([("agent", "ie"), ("locale", "en")]);
        let moz = PropertyOracle::from_pairs([("agent", "moz"), ("locale", "en")]);
        assert!(ctx.is_reachable(&ie));
        assert!(ctx.is_reachable(&moz));

        ctx.pin_property("agent", "ie").unwrap();
        assert!(ctx.is_reachable(&ie));
        assert!(!ctx.is_reachable(&moz));
        assert!(ctx.is_reachable(&PropertyOracle::from_pairs([("theme", "dark")])));
    }

    #[test]
    fn test_pin_validation() {
        let mut ctx = context();
        assert!(matches!(
            ctx.pin_property("nope", "x"),
            Err(LinkError::UnknownProperty(_))
        ));
        assert!(matches!(
            ctx.pin_property("debug", "true"),
            Err(LinkError::InvalidPropertyValue { .. })
        ));
        ctx.pin_property("agent", "ie").unwrap();
        assert_eq!(ctx.property("agent").unwrap().try_value(), Some("ie"));
    }

    #[test]
    fn test_identical_code_shares_a_result() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("permutation-0.js");
        let b = dir.path().join("permutation-1.js");
        fs::write(&a, "same();").unwrap();
        fs::write(&b, "same();").unwrap();

        let mut ctx = context();
        let first = ctx.compilation_for(&a, 0).unwrap().strong_name().to_string();
        let second = ctx.compilation_for(&b, 1).unwrap();
        assert_eq!(second.strong_name(), first);
        assert_eq!(second.permutation_ids(), [0, 1]);
        assert_eq!(ctx.compilations().count(), 1);
    }

    #[test]
    fn test_binary_result_is_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("permutation-0.js");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let err = context().compilation_for(&path, 0).unwrap_err();
        assert!(matches!(err, LinkError::CompiledResultUnreadable { permutation: 0, .. }));
        assert_eq!(err.code().as_str(), "D002");
    }

    #[test]
    fn test_missing_result_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context();
        let err = ctx
            .compilation_for(&dir.path().join("permutation-4.js"), 4)
            .unwrap_err();
        assert!(matches!(err, LinkError::CompiledResultMissing { permutation: 4, .. }));
    }
}
