//! Module definitions loaded from `*.module.toml`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::{ConfigError, Result};
use crate::property::{BindingProperty, ConfigurationProperty, PropertyModel};

/// Linker used when a module does not name any.
pub const DEFAULT_LINKER: &str = "std";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModuleFile {
    module: ModuleSection,
    #[serde(default)]
    binding_property: Vec<BindingProperty>,
    #[serde(default)]
    configuration_property: Vec<ConfigurationProperty>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModuleSection {
    name: String,
    deploy_to: Option<String>,
    #[serde(default)]
    linkers: Vec<String>,
    public_dir: Option<PathBuf>,
}

/// A resolved module: its name, deploy location, linkers and properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDef {
    name: String,
    deploy_to: String,
    linkers: Vec<String>,
    public_dir: Option<PathBuf>,
    properties: PropertyModel,
}

impl ModuleDef {
    pub fn new(name: impl Into<String>, properties: PropertyModel) -> Self {
        let name = name.into();
        Self {
            deploy_to: format!("{}/", name),
            name,
            linkers: vec![DEFAULT_LINKER.to_string()],
            public_dir: None,
            properties,
        }
    }

    /// Override the deploy path; a trailing `/` is added when missing.
    pub fn with_deploy_to(mut self, deploy_to: impl Into<String>) -> Self {
        self.deploy_to = normalize_deploy_to(deploy_to.into());
        self
    }

    pub fn with_linkers<I, S>(mut self, linkers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.linkers = linkers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_public_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.public_dir = Some(dir.into());
        self
    }

    /// Load a module file. `public_dir` is resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.to_path_buf(),
            error,
        })?;
        let module = Self::from_toml_str(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self {
            public_dir: module.public_dir.map(|dir| base.join(dir)),
            ..module
        })
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ModuleFile = toml::from_str(text)?;
        if file.module.name.trim().is_empty() {
            return Err(ConfigError::EmptyModuleName);
        }

        let mut properties = PropertyModel::new();
        for prop in file.binding_property {
            properties.add_binding(prop)?;
        }
        for prop in file.configuration_property {
            properties.add_configuration(prop)?;
        }

        let mut module = Self::new(file.module.name, properties);
        if let Some(deploy_to) = file.module.deploy_to {
            module = module.with_deploy_to(deploy_to);
        }
        if !file.module.linkers.is_empty() {
            module.linkers = file.module.linkers;
        }
        if !is_valid_deploy_path(module.deploy_to()) {
            return Err(ConfigError::InvalidDeployPath(module.deploy_to().to_string()));
        }
        module.public_dir = file.module.public_dir;
        Ok(module)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deploy path relative to the output root, always ending in `/`.
    pub fn deploy_to(&self) -> &str {
        &self.deploy_to
    }

    pub fn linkers(&self) -> &[String] {
        &self.linkers
    }

    pub fn public_dir(&self) -> Option<&Path> {
        self.public_dir.as_deref()
    }

    pub fn properties(&self) -> &PropertyModel {
        &self.properties
    }
}

fn normalize_deploy_to(deploy_to: String) -> String {
    if deploy_to.ends_with('/') {
        deploy_to
    } else {
        format!("{}/", deploy_to)
    }
}

/// Whether `deploy_to` names a directory strictly below the output root.
///
/// The trailing separator is ignored; what remains must be non-empty and
/// made of plain path segments only.
pub fn is_valid_deploy_path(deploy_to: &str) -> bool {
    let trimmed = deploy_to.trim_end_matches('/');
    !trimmed.is_empty()
        && Path::new(trimmed)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// Parse a `name=value` property pin given on the command line.
pub fn parse_pin(text: &str) -> Result<(String, String)> {
    match text.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(ConfigError::MalformedPin(text.to_string())),
    }
}
