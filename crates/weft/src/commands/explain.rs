//! Explain command - explain diagnostic codes

use anyhow::{anyhow, Result};
use clap::Args;
use weft_diagnostics::DiagnosticCode;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Diagnostic code to explain (e.g., L001, M002)
    pub code: String,
}

struct ErrorExplanation {
    code: DiagnosticCode,
    title: &'static str,
    description: &'static str,
    example: Option<&'static str>,
    suggestion: Option<&'static str>,
    related: &'static [&'static str],
}

const ERROR_EXPLANATIONS: &[ErrorExplanation] = &[
    // Configuration
    ErrorExplanation {
        code: DiagnosticCode::PermutationCountMismatch,
        title: "Permutation Count Mismatch",
        description: "The link was handed a different number of compiled results than the precompilation has permutations. Each permutation index needs exactly one result, in order.",
        example: Some("mismatched result file count: 3 result file(s) for 4 permutation(s)"),
        suggestion: Some("Compile every permutation listed by `weft perms` and pass all results."),
        related: &["M002"],
    },
    ErrorExplanation {
        code: DiagnosticCode::ModuleMismatch,
        title: "Module Mismatch",
        description: "The precompilation record in the work directory was produced for another module.",
        example: None,
        suggestion: Some("Use a separate work directory per module, or re-run `weft precompile`."),
        related: &["M001"],
    },
    ErrorExplanation {
        code: DiagnosticCode::MultiplePrimaryLinkers,
        title: "Multiple Primary Linkers",
        description: "A module may run any number of pre and post linkers but at most one primary linker, since the primary linker produces the entry point.",
        example: Some("[module]\nlinkers = [\"std\", \"my-primary\"]"),
        suggestion: Some("Remove all but one primary linker from `linkers`."),
        related: &["L004"],
    },
    ErrorExplanation {
        code: DiagnosticCode::UnknownLinker,
        title: "Unknown Linker",
        description: "The module names a linker that is not registered. Built-in linkers are `std` and `manifest`.",
        example: Some("[module]\nlinkers = [\"std\", \"xs\"]"),
        suggestion: Some("Check the spelling of the names in `linkers`."),
        related: &["L003"],
    },
    ErrorExplanation {
        code: DiagnosticCode::UnknownProperty,
        title: "Unknown Property",
        description: "A pin or a permutation refers to a property the module does not declare.",
        example: Some("weft link hello.module.toml --pin theme=dark ..."),
        suggestion: Some("Declare the property in the module, or drop the pin."),
        related: &["L006"],
    },
    ErrorExplanation {
        code: DiagnosticCode::InvalidPropertyValue,
        title: "Invalid Property Value",
        description: "A property was given a value outside its declared list of legal values.",
        example: Some("weft link hello.module.toml --pin locale=de ...  # locale allows en, fr"),
        suggestion: Some("Use one of the values listed in the module's property declaration."),
        related: &["L005"],
    },
    ErrorExplanation {
        code: DiagnosticCode::InvalidModule,
        title: "Invalid Module",
        description: "The module definition could not be read or is malformed: bad TOML, duplicate properties, empty value lists or collapse groups naming undeclared values.",
        example: None,
        suggestion: Some("Fix the reported problem in the *.module.toml file."),
        related: &[],
    },
    // Missing artifacts
    ErrorExplanation {
        code: DiagnosticCode::PrecompilationMissing,
        title: "Precompilation Missing",
        description: "The work directory has no precompilation.json.",
        example: None,
        suggestion: Some("Run `weft precompile <module> --work-dir <dir>` first."),
        related: &["D001"],
    },
    ErrorExplanation {
        code: DiagnosticCode::CompiledResultMissing,
        title: "Compiled Result Missing",
        description: "A permutation-N.js file is absent from the work directory. The first missing index is reported.",
        example: None,
        suggestion: Some("Compile all permutations before linking."),
        related: &["L001"],
    },
    // Deserialization
    ErrorExplanation {
        code: DiagnosticCode::PrecompilationDeserializationFailed,
        title: "Unreadable Precompilation",
        description: "precompilation.json exists but is corrupt or was written by an incompatible version.",
        example: None,
        suggestion: Some("Re-run `weft precompile` with this version of weft."),
        related: &["M001"],
    },
    ErrorExplanation {
        code: DiagnosticCode::CompiledResultUnreadable,
        title: "Unreadable Compiled Result",
        description: "A permutation-N.js file exists but could not be read as UTF-8 text.",
        example: None,
        suggestion: Some("Recompile the permutation; result files must be UTF-8 JavaScript."),
        related: &["M002"],
    },
    // Linker stages
    ErrorExplanation {
        code: DiagnosticCode::LinkerFailed,
        title: "Linker Failed",
        description: "A linker in the chain reported an error. The link stops and nothing is written.",
        example: Some("linker 'std' failed\n  = caused by: results A and B are both selected by {agent=ie}"),
        suggestion: Some("Read the cause; the std linker fails when two different results answer the same property values."),
        related: &[],
    },
    // Output
    ErrorExplanation {
        code: DiagnosticCode::OutputWriteFailed,
        title: "Output Write Failed",
        description: "Writing, clearing or renaming an output directory failed. Previous output is left in place.",
        example: None,
        suggestion: Some("Check permissions and free space for the output and extra directories."),
        related: &["O002"],
    },
    ErrorExplanation {
        code: DiagnosticCode::InvalidArtifactPath,
        title: "Invalid Artifact Path",
        description: "An artifact path is absolute or leaves its output directory through `..`.",
        example: Some("../outside.js"),
        suggestion: Some("Emit artifacts with relative paths below the module directory."),
        related: &["O001"],
    },
    ErrorExplanation {
        code: DiagnosticCode::LegacyAuxDirectory,
        title: "Legacy Auxiliary Directory",
        description: "No extra directory was given, so private artifacts were written to a `-aux` directory next to the public output, where they may get deployed by accident.",
        example: Some("www/hello/       public\nwww/hello-aux/   private"),
        suggestion: Some("Pass --extra DIR to keep private artifacts out of the output directory."),
        related: &[],
    },
    ErrorExplanation {
        code: DiagnosticCode::NestedOutputDirectories,
        title: "Nested Output Directories",
        description: "The private output directory lies inside the public one, or the other way round. Replacing one directory would delete the other.",
        example: Some("weft link hello.module.toml -w work -o www --extra www/hello/private"),
        suggestion: Some("Point --extra at a directory outside the public output, or at the output root itself."),
        related: &["O003"],
    },
    // Internal
    ErrorExplanation {
        code: DiagnosticCode::InternalError,
        title: "Internal Error",
        description: "Something failed outside the link itself, such as reading an IR file or printing results.",
        example: None,
        suggestion: Some("Re-run with -vv to see debug logging."),
        related: &[],
    },
];

fn find(code: &str) -> Option<&'static ErrorExplanation> {
    let code = DiagnosticCode::parse(code)?;
    ERROR_EXPLANATIONS.iter().find(|e| e.code == code)
}

pub fn run(args: ExplainArgs, format: OutputFormat, use_color: bool) -> Result<()> {
    let explanation =
        find(&args.code).ok_or_else(|| anyhow!("Unknown diagnostic code: {}", args.code))?;
    let code = explanation.code.as_str();

    match format {
        OutputFormat::Text => {
            if use_color {
                println!(
                    "\n{}: {}\n{}",
                    console::style(code).bold().cyan(),
                    console::style(explanation.title).bold(),
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            } else {
                println!(
                    "\n{}: {}\n{}",
                    code,
                    explanation.title,
                    "=".repeat(code.len() + explanation.title.len() + 2)
                );
            }

            println!("\n{}\n", explanation.description);

            if let Some(example) = explanation.example {
                if use_color {
                    println!("{}:", console::style("Example").bold());
                } else {
                    println!("Example:");
                }
                for line in example.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if let Some(suggestion) = explanation.suggestion {
                if use_color {
                    println!("{}:", console::style("Suggestion").bold().green());
                } else {
                    println!("Suggestion:");
                }
                for line in suggestion.lines() {
                    println!("  {}", line);
                }
                println!();
            }

            if !explanation.related.is_empty() {
                if use_color {
                    println!(
                        "{}: {}",
                        console::style("Related").dim(),
                        explanation.related.join(", ")
                    );
                } else {
                    println!("Related: {}", explanation.related.join(", "));
                }
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "code": code,
                "category": explanation.code.category().as_str(),
                "title": explanation.title,
                "description": explanation.description,
                "example": explanation.example,
                "suggestion": explanation.suggestion,
                "related": explanation.related,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
