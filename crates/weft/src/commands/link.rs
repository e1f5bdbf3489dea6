//! Link command - merge compiled permutations into the deployable module

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use weft_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticEmitter, Diagnostics, TerminalEmitter};
use weft_link::{produce_output, run_link, LinkOptions, OutputReport};

use super::{load_module, parse_pins};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Module definition (*.module.toml)
    pub module: PathBuf,

    /// Directory holding precompilation.json and permutation-N.js
    #[arg(short, long)]
    pub work_dir: PathBuf,

    /// Root of the public output
    #[arg(short, long)]
    pub out: PathBuf,

    /// Root for private artifacts (default: a -aux directory next to the public one)
    #[arg(long)]
    pub extra: Option<PathBuf>,

    /// Fix a property for this link (name=value); may be repeated
    #[arg(long = "pin", value_name = "NAME=VALUE")]
    pub pins: Vec<String>,
}

fn advisory_diagnostics(report: &OutputReport) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    for advisory in &report.advisories {
        diagnostics.push(
            Diagnostic::new(DiagnosticCode::LegacyAuxDirectory, advisory.as_str())
                .with_path(&report.layout.private_dir)
                .with_help("pass --extra DIR to keep private files out of the output directory")
                .build(),
        );
    }
    diagnostics
}

pub fn run(args: LinkArgs, format: OutputFormat, use_color: bool, quiet: bool) -> Result<()> {
    let module = load_module(&args.module)?;
    let pins = parse_pins(&args.pins)?;
    let options = LinkOptions {
        pins,
        ..LinkOptions::default()
    };

    let artifacts = run_link(&args.work_dir, &module, &options)?;
    let report = produce_output(&artifacts, &module, &args.out, args.extra.as_deref())?;
    let warnings = advisory_diagnostics(&report);

    let results: Vec<&str> = artifacts.compilations().map(|c| c.strong_name()).collect();
    let permutations: usize = artifacts.compilations().map(|c| c.permutation_ids().len()).sum();

    match format {
        OutputFormat::Text => {
            if !quiet {
                let stderr = std::io::stderr();
                TerminalEmitter::new(stderr.lock(), use_color).emit_all(&warnings)?;

                println!(
                    "Linked {}: {} permutation(s) into {} result(s)",
                    module.name(),
                    permutations,
                    results.len()
                );
                println!(
                    "  {} public file(s) in {}",
                    report.public_files,
                    report.layout.public_dir.display()
                );
                if report.private_files > 0 {
                    println!(
                        "  {} private file(s) in {}",
                        report.private_files,
                        report.layout.private_dir.display()
                    );
                }
            }
        }
        OutputFormat::Json => {
            let warnings: Vec<serde_json::Value> = warnings
                .iter()
                .map(|d| {
                    serde_json::json!({
                        "code": d.code.as_str(),
                        "message": d.message,
                    })
                })
                .collect();
            let result = serde_json::json!({
                "success": true,
                "module": module.name(),
                "permutations": permutations,
                "results": results,
                "public_dir": report.layout.public_dir.to_string_lossy(),
                "private_dir": report.layout.private_dir.to_string_lossy(),
                "public_files": report.public_files,
                "private_files": report.private_files,
                "warnings": warnings,
            });
            println!("{}", serde_json::to_string(&result)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use weft_link::{permutation_filename, Precompilation, SharedIr, PRECOMPILATION_FILENAME};
    use weft_types::ModuleDef;

    const MODULE: &str = r#"
[module]
name = "hello"
linkers = ["std", "manifest"]

[[binding_property]]
name = "agent"
values = ["ie", "moz"]
"#;

    #[test]
    fn test_link_writes_public_and_legacy_aux() {
        let dir = tempfile::tempdir().unwrap();
        let module_path = dir.path().join("hello.module.toml");
        fs::write(&module_path, MODULE).unwrap();

        let module = ModuleDef::load(&module_path).unwrap();
        let work = dir.path().join("work");
        Precompilation::new("hello", SharedIr::default(), module.properties().enumerate())
            .write_to(&work.join(PRECOMPILATION_FILENAME))
            .unwrap();
        fs::write(permutation_filename(&work, 0), "ie();").unwrap();
        fs::write(permutation_filename(&work, 1), "moz();").unwrap();

        let out = dir.path().join("www");
        let args = LinkArgs {
            module: module_path,
            work_dir: work,
            out: out.clone(),
            extra: None,
            pins: Vec::new(),
        };
        run(args, OutputFormat::Json, false, true).unwrap();

        assert!(out.join("hello/hello.nocache.js").is_file());
        assert!(out.join("hello-aux/compilation-mappings.txt").is_file());
    }

    #[test]
    fn test_advisories_become_warnings() {
        let report = OutputReport {
            layout: weft_link::OutputLayout {
                public_dir: PathBuf::from("www/hello"),
                private_dir: PathBuf::from("www/hello-aux"),
                legacy_aux: true,
            },
            public_files: 1,
            private_files: 1,
            advisories: vec!["private files in www/hello-aux".to_string()],
        };
        let warnings = advisory_diagnostics(&report);
        assert_eq!(warnings.warning_count(), 1);
        let first = warnings.iter().next().unwrap();
        assert_eq!(first.code.as_str(), "O003");
        assert_eq!(first.path, Some(PathBuf::from("www/hello-aux")));
    }
}
