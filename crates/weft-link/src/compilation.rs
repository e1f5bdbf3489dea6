//! Compiled permutation results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use weft_types::PermutationId;

/// Still-unbound selection properties mapped to the value that selects a result.
pub type SelectionPermutation = BTreeMap<String, String>;

/// Content hash used to name emitted permutation files.
pub fn strong_name(bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(bytes))
}

/// The emitted code of one permutation.
///
/// Permutations whose code is byte-identical share one result; it then
/// records every permutation id and every selection permutation that leads
/// to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledResult {
    strong_name: String,
    code: String,
    permutation_ids: Vec<PermutationId>,
    selection_permutations: Vec<SelectionPermutation>,
}

impl CompiledResult {
    pub fn from_code(code: impl Into<String>) -> Self {
        let code = code.into();
        Self {
            strong_name: strong_name(code.as_bytes()),
            code,
            permutation_ids: Vec::new(),
            selection_permutations: Vec::new(),
        }
    }

    pub fn strong_name(&self) -> &str {
        &self.strong_name
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn permutation_ids(&self) -> &[PermutationId] {
        &self.permutation_ids
    }

    /// Selection permutations in the order they were first recorded.
    pub fn selection_permutations(&self) -> &[SelectionPermutation] {
        &self.selection_permutations
    }

    pub fn add_permutation_id(&mut self, id: PermutationId) {
        if !self.permutation_ids.contains(&id) {
            self.permutation_ids.push(id);
        }
    }

    /// Record a selection permutation; duplicates are ignored.
    pub fn add_selection_permutation(&mut self, selection: SelectionPermutation) {
        if !self.selection_permutations.contains(&selection) {
            self.selection_permutations.push(selection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_name_is_content_hash() {
        let a = CompiledResult::from_code("var a = 1;");
        let b = CompiledResult::from_code("var a = 1;");
        let c = CompiledResult::from_code("var a = 2;");
        assert_eq!(a.strong_name(), b.strong_name());
        assert_ne!(a.strong_name(), c.strong_name());
        assert_eq!(a.strong_name().len(), 64);
        assert!(a.strong_name().chars().all(|ch| ch.is_ascii_digit() || ch.is_ascii_uppercase()));
    }

    #[test]
    fn test_selection_permutations_dedupe() {
        let mut result = CompiledResult::from_code("x");
        let en: SelectionPermutation = [("locale".to_string(), "en".to_string())].into();
        result.add_selection_permutation(en.clone());
        result.add_selection_permutation(en);
        result.add_selection_permutation(SelectionPermutation::new());
        result.add_permutation_id(0);
        result.add_permutation_id(0);
        assert_eq!(result.selection_permutations().len(), 2);
        assert_eq!(result.permutation_ids(), [0]);
    }
}
