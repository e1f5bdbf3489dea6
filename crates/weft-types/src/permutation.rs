//! Permutations of binding-property values
//!
//! A permutation is one compile of the module. It owns one oracle per
//! property-value combination it answers for; collapsed permutations answer
//! for several combinations at once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::property::PropertyModel;

/// Index of a permutation in the precompilation's permutation array
pub type PermutationId = usize;

/// Ordered (property, value) answers for one combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyOracle {
    props: Vec<String>,
    values: Vec<String>,
}

impl PropertyOracle {
    /// Build an oracle from parallel name/value lists.
    ///
    /// # Panics
    /// If the lists differ in length.
    pub fn new(props: Vec<String>, values: Vec<String>) -> Self {
        assert_eq!(
            props.len(),
            values.len(),
            "every ordered property needs exactly one value"
        );
        Self { props, values }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let (props, values) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self { props, values }
    }

    pub fn ordered_props(&self) -> &[String] {
        &self.props
    }

    pub fn ordered_values(&self) -> &[String] {
        &self.values
    }

    pub fn value_of(&self, prop: &str) -> Option<&str> {
        self.iter().find(|(p, _)| *p == prop).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.props
            .iter()
            .zip(&self.values)
            .map(|(p, v)| (p.as_str(), v.as_str()))
    }
}

impl std::fmt::Display for PropertyOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (prop, value) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", prop, value)?;
            first = false;
        }
        Ok(())
    }
}

/// One compile of the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permutation {
    id: PermutationId,
    oracles: Vec<PropertyOracle>,
}

impl Permutation {
    pub fn new(id: PermutationId, oracle: PropertyOracle) -> Self {
        Self {
            id,
            oracles: vec![oracle],
        }
    }

    /// A permutation standing in for several collapsed combinations.
    pub fn with_oracles(id: PermutationId, oracles: Vec<PropertyOracle>) -> Self {
        assert!(!oracles.is_empty(), "a permutation needs at least one oracle");
        Self { id, oracles }
    }

    pub fn id(&self) -> PermutationId {
        self.id
    }

    pub fn oracles(&self) -> &[PropertyOracle] {
        &self.oracles
    }
}

impl PropertyModel {
    /// Enumerate the cross product of binding-property values.
    ///
    /// The first declared property varies slowest. Rows that are equal under
    /// every property's collapse groups share a permutation, which keeps one
    /// oracle per row. Ids are assigned in order of first occurrence, so the
    /// same declarations always produce the same array.
    pub fn enumerate(&self) -> Vec<Permutation> {
        let props = self.binding_properties();
        let names: Vec<String> = props.iter().map(|p| p.name.clone()).collect();

        let mut permutations: Vec<Permutation> = Vec::new();
        let mut by_key: HashMap<Vec<&str>, PermutationId> = HashMap::new();
        let mut cursor = vec![0usize; props.len()];

        loop {
            let values: Vec<&str> = props
                .iter()
                .zip(&cursor)
                .map(|(p, &i)| p.values[i].as_str())
                .collect();
            let key: Vec<&str> = props
                .iter()
                .zip(&values)
                .map(|(p, &v)| p.collapse_key(v))
                .collect();
            let oracle = PropertyOracle::new(
                names.clone(),
                values.iter().map(|v| v.to_string()).collect(),
            );

            match by_key.get(&key) {
                Some(&id) => permutations[id].oracles.push(oracle),
                None => {
                    let id = permutations.len();
                    by_key.insert(key, id);
                    permutations.push(Permutation::new(id, oracle));
                }
            }

            // Advance the odometer; the last property varies fastest.
            let mut slot = props.len();
            loop {
                if slot == 0 {
                    return permutations;
                }
                slot -= 1;
                cursor[slot] += 1;
                if cursor[slot] < props[slot].values.len() {
                    break;
                }
                cursor[slot] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{BindingProperty, ConfigurationProperty};

    fn model() -> PropertyModel {
        PropertyModel::new()
            .with_binding(BindingProperty::new("agent", ["ie", "moz", "opera"]))
            .unwrap()
            .with_binding(BindingProperty::new("locale", ["en", "fr"]))
            .unwrap()
            .with_configuration(ConfigurationProperty::new("debug", "false"))
            .unwrap()
    }

    #[test]
    fn test_cross_product_order() {
        let perms = model().enumerate();
        let rows: Vec<String> = perms.iter().map(|p| p.oracles()[0].to_string()).collect();
        assert_eq!(
            rows,
            vec![
                "agent=ie, locale=en",
                "agent=ie, locale=fr",
                "agent=moz, locale=en",
                "agent=moz, locale=fr",
                "agent=opera, locale=en",
                "agent=opera, locale=fr",
            ]
        );
        for (i, perm) in perms.iter().enumerate() {
            assert_eq!(perm.id(), i);
            assert_eq!(perm.oracles().len(), 1);
        }
    }

    #[test]
    fn test_enumeration_is_deterministic() {
        assert_eq!(model().enumerate(), model().enumerate());
    }

    #[test]
    fn test_no_binding_properties_yields_one_permutation() {
        let perms = PropertyModel::new().enumerate();
        assert_eq!(perms.len(), 1);
        assert!(perms[0].oracles()[0].ordered_props().is_empty());
    }

    #[test]
    fn test_collapse_merges_rows() {
        let model = PropertyModel::new()
            .with_binding(BindingProperty::new("agent", ["ie", "moz"]).with_collapse_all())
            .unwrap()
            .with_binding(BindingProperty::new("locale", ["en", "fr"]))
            .unwrap();
        let perms = model.enumerate();

        assert_eq!(perms.len(), 2);
        assert_eq!(perms[0].oracles().len(), 2);
        assert_eq!(perms[0].oracles()[0].to_string(), "agent=ie, locale=en");
        assert_eq!(perms[0].oracles()[1].to_string(), "agent=moz, locale=en");
        assert_eq!(perms[1].oracles()[0].value_of("locale"), Some("fr"));
        assert_eq!(perms[1].id(), 1);
    }

    #[test]
    fn test_partial_collapse_group() {
        let model = PropertyModel::new()
            .with_binding(
                BindingProperty::new("agent", ["ie6", "ie8", "moz"]).with_collapse(["ie6", "ie8"]),
            )
            .unwrap();
        let perms = model.enumerate();
        assert_eq!(perms.len(), 2);
        assert_eq!(perms[0].oracles().len(), 2);
        assert_eq!(perms[1].oracles()[0].value_of("agent"), Some("moz"));
    }

    #[test]
    fn test_oracle_from_pairs() {
        let oracle = PropertyOracle::from_pairs([("agent", "ie"), ("locale", "en")]);
        assert_eq!(oracle.ordered_props(), ["agent", "locale"]);
        assert_eq!(oracle.ordered_values(), ["ie", "en"]);
        assert_eq!(oracle.value_of("missing"), None);
    }
}
