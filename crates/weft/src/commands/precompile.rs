//! Precompile command - enumerate permutations and write the record

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use weft_link::{
    ArtifactSet, CompilerOptions, EmittedArtifact, OutputStyle, Precompilation, SharedIr,
    PRECOMPILATION_FILENAME,
};

use super::{load_module, parse_pins};
use crate::OutputFormat;

/// Producer name recorded on resources copied from the public directory.
const PUBLIC_RESOURCES: &str = "public";

#[derive(Args, Debug)]
pub struct PrecompileArgs {
    /// Module definition (*.module.toml)
    pub module: PathBuf,

    /// Directory that receives the precompilation record
    #[arg(short, long)]
    pub work_dir: PathBuf,

    /// File holding the shared intermediate representation
    #[arg(long)]
    pub ir: Option<PathBuf>,

    /// Output style recorded for the linkers
    #[arg(long, value_enum, default_value = "obfuscated")]
    pub style: StyleArg,

    /// Fix a property to one value (name=value); may be repeated
    #[arg(long = "pin", value_name = "NAME=VALUE")]
    pub pins: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StyleArg {
    Obfuscated,
    Pretty,
    Detailed,
}

impl From<StyleArg> for OutputStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Obfuscated => OutputStyle::Obfuscated,
            StyleArg::Pretty => OutputStyle::Pretty,
            StyleArg::Detailed => OutputStyle::Detailed,
        }
    }
}

/// Every file below `dir`, in path order, as a public artifact.
fn collect_public_resources(dir: &Path) -> Result<ArtifactSet> {
    let mut artifacts = ArtifactSet::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to scan {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(dir)?;
        let partial: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let contents = fs::read(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        artifacts.add_or_replace(EmittedArtifact::new(PUBLIC_RESOURCES, partial.join("/"), contents));
    }
    Ok(artifacts)
}

pub(crate) fn build_precompilation(args: &PrecompileArgs) -> Result<Precompilation> {
    let module = load_module(&args.module)?;
    let pins = parse_pins(&args.pins)?;

    let mut model = module.properties().clone();
    for (name, value) in &pins {
        model.pin(name, value)?;
    }

    let body = match &args.ir {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read IR {}", path.display()))?,
        None => String::new(),
    };
    let generated = match module.public_dir() {
        Some(dir) if dir.is_dir() => collect_public_resources(dir)?,
        Some(dir) => {
            warn!("Public directory {} does not exist; no resources collected", dir.display());
            ArtifactSet::new()
        }
        None => ArtifactSet::new(),
    };

    let ir = SharedIr {
        options: CompilerOptions {
            output_style: args.style.into(),
        },
        body,
    };
    let precompilation = pins
        .into_iter()
        .fold(Precompilation::new(module.name(), ir, model.enumerate()), |p, (name, value)| {
            p.with_pinned_property(name, value)
        })
        .with_generated_artifacts(generated);
    Ok(precompilation)
}

pub fn run(args: PrecompileArgs, format: OutputFormat, quiet: bool) -> Result<()> {
    let precompilation = build_precompilation(&args)?;
    let path = args.work_dir.join(PRECOMPILATION_FILENAME);
    precompilation.write_to(&path)?;

    match format {
        OutputFormat::Text => {
            if !quiet {
                println!(
                    "Precompiled {}: {} permutation(s), {} resource(s)",
                    precompilation.module_name(),
                    precompilation.permutations().len(),
                    precompilation.generated_artifacts().len()
                );
                println!("  Wrote {}", path.display());
            }
        }
        OutputFormat::Json => {
            let result = serde_json::json!({
                "success": true,
                "module": precompilation.module_name(),
                "permutations": precompilation.permutations().len(),
                "resources": precompilation.generated_artifacts().len(),
                "path": path.to_string_lossy(),
            });
            println!("{}", serde_json::to_string(&result)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODULE: &str = r#"
[module]
name = "hello"
public_dir = "public"

[[binding_property]]
name = "agent"
values = ["ie", "moz"]

[[binding_property]]
name = "locale"
values = ["en", "fr"]
"#;

    fn args(dir: &Path, pins: &[&str]) -> PrecompileArgs {
        PrecompileArgs {
            module: dir.join("hello.module.toml"),
            work_dir: dir.join("work"),
            ir: None,
            style: StyleArg::Pretty,
            pins: pins.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_collects_public_resources_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.module.toml"), MODULE).unwrap();
        fs::create_dir_all(dir.path().join("public/css")).unwrap();
        fs::write(dir.path().join("public/index.html"), "<html>").unwrap();
        fs::write(dir.path().join("public/css/site.css"), "body {}").unwrap();

        let precompilation = build_precompilation(&args(dir.path(), &[])).unwrap();
        let paths: Vec<&str> = precompilation
            .generated_artifacts()
            .emitted()
            .map(|a| a.partial_path())
            .collect();
        assert_eq!(paths, ["css/site.css", "index.html"]);
        assert_eq!(precompilation.permutations().len(), 4);
        assert_eq!(precompilation.ir().options.output_style, OutputStyle::Pretty);
    }

    #[test]
    fn test_pins_narrow_enumeration() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.module.toml"), MODULE).unwrap();

        let precompilation = build_precompilation(&args(dir.path(), &["locale=fr"])).unwrap();
        assert_eq!(precompilation.permutations().len(), 2);
        assert_eq!(precompilation.pinned_properties()["locale"], "fr");
        assert!(precompilation.generated_artifacts().is_empty());
    }

    #[test]
    fn test_bad_pin_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("hello.module.toml"), MODULE).unwrap();
        assert!(build_precompilation(&args(dir.path(), &["locale=de"])).is_err());
        assert!(build_precompilation(&args(dir.path(), &["locale"])).is_err());
    }
}
