//! Deployment properties and the model that owns them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// A property resolved at compile time; every permutation carries one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingProperty {
    /// Property name (e.g. "user.agent")
    pub name: String,
    /// Legal values in declaration order
    pub values: Vec<String>,
    /// Groups of values known to produce identical output
    #[serde(default)]
    pub collapse: Vec<Vec<String>>,
    /// Treat every value as one group
    #[serde(default)]
    pub collapse_all: bool,
    /// Script body that answers the property at runtime
    #[serde(default)]
    pub provider: Option<String>,
}

impl BindingProperty {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
            collapse: Vec::new(),
            collapse_all: false,
            provider: None,
        }
    }

    /// Declare that the given values compile to the same output.
    pub fn with_collapse<I, S>(mut self, group: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collapse.push(group.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_collapse_all(mut self) -> Self {
        self.collapse_all = true;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// A property with a single legal value never forks the compile.
    pub fn static_value(&self) -> Option<&str> {
        match self.values.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    pub fn allows(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    /// The representative value of the collapse group containing `value`.
    ///
    /// Values outside any group represent themselves.
    pub fn collapse_key<'a>(&'a self, value: &'a str) -> &'a str {
        if self.collapse_all {
            return self.values.first().map(String::as_str).unwrap_or(value);
        }
        self.collapse
            .iter()
            .find(|group| group.iter().any(|v| v == value))
            .and_then(|group| group.first())
            .map(String::as_str)
            .unwrap_or(value)
    }

    fn validate(&self) -> Result<()> {
        if self.values.is_empty() {
            return Err(ConfigError::NoValues(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for value in &self.values {
            if !seen.insert(value.as_str()) {
                return Err(ConfigError::DuplicateValue {
                    property: self.name.clone(),
                    value: value.clone(),
                });
            }
        }

        let mut grouped = HashSet::new();
        for value in self.collapse.iter().flatten() {
            if !self.allows(value) {
                return Err(ConfigError::UnknownCollapseValue {
                    property: self.name.clone(),
                    value: value.clone(),
                });
            }
            if !grouped.insert(value.as_str()) {
                return Err(ConfigError::OverlappingCollapse {
                    property: self.name.clone(),
                    value: value.clone(),
                });
            }
        }

        Ok(())
    }
}

/// A non-forking property whose value is always known statically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationProperty {
    pub name: String,
    pub value: String,
}

impl ConfigurationProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Canonical table of every property a module declares.
///
/// Permutations refer back to these entries by name only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyModel {
    binding: Vec<BindingProperty>,
    configuration: Vec<ConfigurationProperty>,
}

impl PropertyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding property, rejecting malformed declarations.
    pub fn add_binding(&mut self, property: BindingProperty) -> Result<()> {
        self.check_unique(&property.name)?;
        property.validate()?;
        self.binding.push(property);
        Ok(())
    }

    pub fn add_configuration(&mut self, property: ConfigurationProperty) -> Result<()> {
        self.check_unique(&property.name)?;
        self.configuration.push(property);
        Ok(())
    }

    /// Builder form of [`PropertyModel::add_binding`].
    pub fn with_binding(mut self, property: BindingProperty) -> Result<Self> {
        self.add_binding(property)?;
        Ok(self)
    }

    pub fn with_configuration(mut self, property: ConfigurationProperty) -> Result<Self> {
        self.add_configuration(property)?;
        Ok(self)
    }

    pub fn binding_properties(&self) -> &[BindingProperty] {
        &self.binding
    }

    pub fn configuration_properties(&self) -> &[ConfigurationProperty] {
        &self.configuration
    }

    pub fn binding(&self, name: &str) -> Option<&BindingProperty> {
        self.binding.iter().find(|p| p.name == name)
    }

    pub fn configuration(&self, name: &str) -> Option<&ConfigurationProperty> {
        self.configuration.iter().find(|p| p.name == name)
    }

    /// Fix a property to one value before enumeration.
    ///
    /// A pinned binding property keeps only that value and no longer forks
    /// the compile.
    pub fn pin(&mut self, name: &str, value: &str) -> Result<()> {
        let illegal = || ConfigError::IllegalPin {
            property: name.to_string(),
            value: value.to_string(),
        };

        if let Some(config) = self.configuration(name) {
            return if config.value == value { Ok(()) } else { Err(illegal()) };
        }
        let binding = self
            .binding
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| ConfigError::UnknownProperty(name.to_string()))?;
        if !binding.allows(value) {
            return Err(illegal());
        }
        binding.values = vec![value.to_string()];
        binding.collapse.clear();
        binding.collapse_all = false;
        Ok(())
    }

    fn check_unique(&self, name: &str) -> Result<()> {
        if self.binding(name).is_some() || self.configuration(name).is_some() {
            return Err(ConfigError::DuplicateProperty(name.to_string()));
        }
        Ok(())
    }
}
