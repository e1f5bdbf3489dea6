//! Pluggable linker stages and the registry that builds a chain from names.

use std::collections::BTreeMap;
use std::fmt;

use crate::artifact::ArtifactSet;
use crate::context::LinkerContext;
use crate::error::{LinkError, Result};
use crate::linkers::{ManifestLinker, SelectionScriptLinker};

/// Where a linker runs relative to the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkerOrder {
    /// Before the primary linker, in declaration order
    Pre,
    /// At most one per chain; produces the deployable entry point
    Primary,
    /// After the primary linker, in declaration order
    Post,
}

/// One stage of the link.
///
/// A stage receives the artifacts produced so far and returns the set the
/// next stage will see. It must not assume it is the only stage touching a
/// given artifact identity: later stages may replace what it emits.
pub trait Linker {
    /// Name used in module definitions and diagnostics.
    fn name(&self) -> &str;

    fn order(&self) -> LinkerOrder;

    fn link(&self, ctx: &LinkerContext, artifacts: ArtifactSet) -> Result<ArtifactSet>;
}

/// Sort linkers into execution order: pre, primary, post.
///
/// The sort is stable, so declaration order holds within each group.
pub fn order_chain(mut linkers: Vec<Box<dyn Linker>>) -> Result<Vec<Box<dyn Linker>>> {
    let mut primary: Option<&str> = None;
    for linker in &linkers {
        if linker.order() != LinkerOrder::Primary {
            continue;
        }
        if let Some(first) = primary {
            return Err(LinkError::MultiplePrimaryLinkers {
                first: first.to_string(),
                second: linker.name().to_string(),
            });
        }
        primary = Some(linker.name());
    }

    linkers.sort_by_key(|l| l.order());
    Ok(linkers)
}

type LinkerFactory = Box<dyn Fn() -> Box<dyn Linker> + Send + Sync>;

/// Maps linker names to constructors.
pub struct LinkerRegistry {
    factories: BTreeMap<String, LinkerFactory>,
}

impl LinkerRegistry {
    /// A registry with no linkers at all.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding the built-in `std` and `manifest` linkers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(SelectionScriptLinker::NAME, || Box::new(SelectionScriptLinker));
        registry.register(ManifestLinker::NAME, || Box::new(ManifestLinker));
        registry
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Linker> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn Linker>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| LinkError::UnknownLinker(name.to_string()))
    }

    /// Instantiate `names` and put them in execution order.
    pub fn build_chain<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Box<dyn Linker>>> {
        let linkers = names
            .iter()
            .map(|name| self.create(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        order_chain(linkers)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl Default for LinkerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for LinkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, LinkerOrder);

    impl Linker for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn order(&self) -> LinkerOrder {
            self.1
        }

        fn link(&self, _ctx: &LinkerContext, artifacts: ArtifactSet) -> Result<ArtifactSet> {
            Ok(artifacts)
        }
    }

    fn names(chain: &[Box<dyn Linker>]) -> Vec<&str> {
        chain.iter().map(|l| l.name()).collect()
    }

    #[test]
    fn test_order_chain_groups_and_keeps_declaration_order() {
        let chain = order_chain(vec![
            Box::new(Named("post-a", LinkerOrder::Post)),
            Box::new(Named("primary", LinkerOrder::Primary)),
            Box::new(Named("pre-a", LinkerOrder::Pre)),
            Box::new(Named("post-b", LinkerOrder::Post)),
            Box::new(Named("pre-b", LinkerOrder::Pre)),
        ])
        .unwrap();
        assert_eq!(names(&chain), ["pre-a", "pre-b", "primary", "post-a", "post-b"]);
    }

    #[test]
    fn test_two_primaries_rejected() {
        let err = order_chain(vec![
            Box::new(Named("one", LinkerOrder::Primary)),
            Box::new(Named("two", LinkerOrder::Primary)),
        ])
        .err()
        .unwrap();
        assert!(matches!(
            err,
            LinkError::MultiplePrimaryLinkers { ref first, ref second } if first == "one" && second == "two"
        ));
    }

    #[test]
    fn test_registry_builds_chain() {
        let registry = LinkerRegistry::with_builtins();
        let chain = registry.build_chain(&["manifest", "std"]).unwrap();
        assert_eq!(names(&chain), ["std", "manifest"]);

        let err = registry.build_chain(&["std", "xs"]).err().unwrap();
        assert!(matches!(err, LinkError::UnknownLinker(ref name) if name == "xs"));
    }

    #[test]
    fn test_register_custom_linker() {
        let mut registry = LinkerRegistry::empty();
        registry.register("noop", || Box::new(Named("noop", LinkerOrder::Pre)));
        assert_eq!(registry.names().collect::<Vec<_>>(), ["noop"]);
        assert_eq!(registry.create("noop").unwrap().name(), "noop");
    }
}
