//! CLI command implementations

pub mod explain;
pub mod link;
pub mod perms;
pub mod precompile;

use anyhow::{Context, Result};
use std::path::Path;
use weft_types::{parse_pin, ModuleDef};

/// Load a module definition, naming the file on failure.
pub(crate) fn load_module(path: &Path) -> Result<ModuleDef> {
    ModuleDef::load(path).with_context(|| format!("failed to load module {}", path.display()))
}

/// Parse repeated `--pin name=value` flags.
pub(crate) fn parse_pins(pins: &[String]) -> Result<Vec<(String, String)>> {
    pins.iter()
        .map(|pin| parse_pin(pin).map_err(Into::into))
        .collect()
}
