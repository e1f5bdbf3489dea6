//! The primary linker: one cacheable file per compiled result plus a
//! dispatch script that picks the right one at runtime.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use crate::artifact::{ArtifactSet, EmittedArtifact};
use crate::compilation::{CompiledResult, SelectionPermutation};
use crate::context::LinkerContext;
use crate::error::{LinkError, Result};
use crate::linker::{Linker, LinkerOrder};
use crate::precompilation::OutputStyle;

pub struct SelectionScriptLinker;

impl SelectionScriptLinker {
    pub const NAME: &'static str = "std";

    /// Partial path of the cacheable file for `strong_name`.
    pub fn cache_file(strong_name: &str) -> String {
        format!("{}.cache.js", strong_name)
    }

    /// Partial path of the module's dispatch script.
    pub fn nocache_file(module_name: &str) -> String {
        format!("{}.nocache.js", module_name)
    }
}

impl Linker for SelectionScriptLinker {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn order(&self) -> LinkerOrder {
        LinkerOrder::Primary
    }

    fn link(&self, ctx: &LinkerContext, mut artifacts: ArtifactSet) -> Result<ArtifactSet> {
        // results only reachable through values pinned away serve no target
        let compilations: Vec<CompiledResult> = artifacts
            .compilations()
            .filter(|c| !c.selection_permutations().is_empty())
            .cloned()
            .collect();
        let answers = selection_table(&compilations)?;

        for result in &compilations {
            artifacts.add_or_replace(EmittedArtifact::new(
                Self::NAME,
                Self::cache_file(result.strong_name()),
                result.code(),
            ));
        }

        let script = dispatch_script(ctx, &answers);
        artifacts.add_or_replace(EmittedArtifact::new(
            Self::NAME,
            Self::nocache_file(ctx.module_name()),
            script,
        ));
        Ok(artifacts)
    }
}

struct Answer<'a> {
    selection: &'a SelectionPermutation,
    result: &'a CompiledResult,
}

/// Every selection permutation with the result it selects.
///
/// Fails if one selection leads to two different results: the runtime
/// could not tell them apart.
fn selection_table(compilations: &[CompiledResult]) -> Result<Vec<Answer<'_>>> {
    let mut seen: BTreeMap<&SelectionPermutation, &str> = BTreeMap::new();
    let mut answers = Vec::new();

    for result in compilations {
        for selection in result.selection_permutations() {
            if let Some(other) = seen.insert(selection, result.strong_name()) {
                if other != result.strong_name() {
                    return Err(LinkError::stage(
                        SelectionScriptLinker::NAME,
                        format!(
                            "results {} and {} are both selected by {{{}}}",
                            other,
                            result.strong_name(),
                            describe(selection)
                        ),
                    ));
                }
                continue;
            }
            answers.push(Answer { selection, result });
        }
    }
    Ok(answers)
}

fn describe(selection: &SelectionPermutation) -> String {
    selection
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn js_string(text: &str) -> String {
    serde_json::Value::from(text).to_string()
}

fn dispatch_script(ctx: &LinkerContext, answers: &[Answer<'_>]) -> String {
    let detailed = ctx.options().output_style == OutputStyle::Detailed;
    let unbound: BTreeSet<&str> = answers
        .iter()
        .flat_map(|a| a.selection.keys().map(String::as_str))
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "(function () {{");
    let _ = writeln!(out, "  var providers = {{");
    for name in &unbound {
        let body = match ctx.property(name).and_then(|p| p.provider()) {
            Some(provider) => provider.to_string(),
            None => format!("return (window.weftProperties || {{}})[{}];", js_string(name)),
        };
        let _ = writeln!(out, "    {}: function () {{ {} }},", js_string(name), body);
    }
    let _ = writeln!(out, "  }};");

    let _ = writeln!(out, "  var answers = {{}};");
    for answer in answers {
        if detailed {
            let ids: Vec<String> = answer
                .result
                .permutation_ids()
                .iter()
                .map(ToString::to_string)
                .collect();
            let _ = writeln!(out, "  // permutations {}", ids.join(", "));
        }
        let key: Vec<&str> = unbound
            .iter()
            .map(|name| answer.selection.get(*name).map(String::as_str).unwrap_or(""))
            .collect();
        let _ = writeln!(
            out,
            "  answers[{}] = {};",
            js_string(&key.join(",")),
            js_string(answer.result.strong_name())
        );
    }

    let lookups: Vec<String> = unbound
        .iter()
        .map(|name| format!("providers[{}]()", js_string(name)))
        .collect();
    let _ = writeln!(out, "  var key = [{}].join(\",\");", lookups.join(", "));
    let _ = writeln!(out, "  var strongName = answers[key];");
    let _ = writeln!(
        out,
        "  if (!strongName) {{ throw new Error({} + key); }}",
        js_string(&format!("{}: no permutation for ", ctx.module_name()))
    );
    let _ = writeln!(out, "  var script = document.createElement(\"script\");");
    let _ = writeln!(out, "  script.src = strongName + \".cache.js\";");
    let _ = writeln!(out, "  document.head.appendChild(script);");
    let _ = writeln!(out, "}})();");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::{BindingProperty, ModuleDef, PropertyModel};

    fn ctx() -> LinkerContext {
        let model = PropertyModel::new()
            .with_binding(BindingProperty::new("agent", ["ie", "moz"]).with_provider("return 'moz';"))
            .unwrap();
        LinkerContext::new(&ModuleDef::new("hello", model), Default::default(), Vec::new())
    }

    fn result(code: &str, agent: &str) -> CompiledResult {
        let mut result = CompiledResult::from_code(code);
        result.add_selection_permutation([("agent".to_string(), agent.to_string())].into());
        result
    }

    #[test]
    fn test_emits_cache_files_and_dispatch() {
        let ie = result("ie();", "ie");
        let moz = result("moz();", "moz");
        let mut input = ArtifactSet::new();
        input.add_or_replace(ie.clone());
        input.add_or_replace(moz.clone());

        let out = SelectionScriptLinker.link(&ctx(), input).unwrap();
        let paths: Vec<&str> = out.emitted().map(|e| e.partial_path()).collect();
        assert_eq!(
            paths,
            [
                SelectionScriptLinker::cache_file(ie.strong_name()),
                SelectionScriptLinker::cache_file(moz.strong_name()),
                "hello.nocache.js".to_string(),
            ]
        );

        let script = out.emitted().last().unwrap();
        let text = std::str::from_utf8(script.contents()).unwrap();
        assert!(text.contains("return 'moz';"));
        assert!(text.contains(&format!("answers[\"ie\"] = \"{}\";", ie.strong_name())));
        assert!(text.contains(&format!("answers[\"moz\"] = \"{}\";", moz.strong_name())));
    }

    #[test]
    fn test_unselected_result_gets_no_cache_file() {
        let ie = result("ie();", "ie");
        let moz = CompiledResult::from_code("moz();");
        let mut input = ArtifactSet::new();
        input.add_or_replace(ie.clone());
        input.add_or_replace(moz.clone());

        let out = SelectionScriptLinker.link(&ctx(), input).unwrap();
        let paths: Vec<&str> = out.emitted().map(|e| e.partial_path()).collect();
        assert_eq!(
            paths,
            [SelectionScriptLinker::cache_file(ie.strong_name()), "hello.nocache.js".to_string()]
        );
        let script = std::str::from_utf8(out.emitted().last().unwrap().contents()).unwrap();
        assert!(!script.contains(moz.strong_name()));
    }

    #[test]
    fn test_ambiguous_selection_fails() {
        let mut input = ArtifactSet::new();
        input.add_or_replace(result("one();", "ie"));
        input.add_or_replace(result("two();", "ie"));

        let err = SelectionScriptLinker.link(&ctx(), input).unwrap_err();
        assert!(matches!(err, LinkError::Stage { ref linker, .. } if linker == "std"));
    }
}
