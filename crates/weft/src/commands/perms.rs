//! Perms command - list the permutations a module compiles to

use anyhow::Result;
use clap::Args;
use std::collections::BTreeMap;
use std::path::PathBuf;
use weft_types::{Permutation, PropertyOracle};

use super::{load_module, parse_pins};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct PermsArgs {
    /// Module definition (*.module.toml)
    pub module: PathBuf,

    /// Fix a property to one value (name=value); may be repeated
    #[arg(long = "pin", value_name = "NAME=VALUE")]
    pub pins: Vec<String>,
}

pub(crate) fn enumerate(args: &PermsArgs) -> Result<Vec<Permutation>> {
    let module = load_module(&args.module)?;
    let mut model = module.properties().clone();
    for (name, value) in parse_pins(&args.pins)? {
        model.pin(&name, &value)?;
    }
    Ok(model.enumerate())
}

fn oracle_json(oracle: &PropertyOracle) -> BTreeMap<&str, &str> {
    oracle.iter().collect()
}

pub fn run(args: PermsArgs, format: OutputFormat) -> Result<()> {
    let permutations = enumerate(&args)?;

    match format {
        OutputFormat::Text => {
            for permutation in &permutations {
                println!("permutation {}:", permutation.id());
                for oracle in permutation.oracles() {
                    if oracle.ordered_props().is_empty() {
                        println!("  (no properties)");
                    } else {
                        println!("  {}", oracle);
                    }
                }
            }
        }
        OutputFormat::Json => {
            let output: Vec<serde_json::Value> = permutations
                .iter()
                .map(|p| {
                    let oracles: Vec<_> = p.oracles().iter().map(oracle_json).collect();
                    serde_json::json!({ "id": p.id(), "oracles": oracles })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
