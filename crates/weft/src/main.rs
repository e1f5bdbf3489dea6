//! Weft - Permutation Linker
//!
//! CLI driver for precompiling modules and linking compiled permutations.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use weft_diagnostics::{
    Diagnostic, DiagnosticCode, DiagnosticEmitter, JsonEmitter, TerminalEmitter,
};
use weft_link::LinkError;
use weft_types::ConfigError;

/// Permutation linker
#[derive(Parser, Debug)]
#[command(name = "weft")]
#[command(author, version, about = "Link compiled permutations into a deployable module")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Enumerate permutations and write the precompilation record
    Precompile(commands::precompile::PrecompileArgs),

    /// Link compiled permutations and write the output directories
    Link(commands::link::LinkArgs),

    /// List the permutations of a module
    Perms(commands::perms::PermsArgs),

    /// Explain a diagnostic code
    Explain(commands::explain::ExplainArgs),
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "off",
        (false, 0) => "error",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Turn a failed command into a single diagnostic.
fn to_diagnostic(err: &anyhow::Error) -> Diagnostic {
    if let Some(link) = err.downcast_ref::<LinkError>() {
        return link.to_diagnostic();
    }

    let code = if err.downcast_ref::<ConfigError>().is_some() {
        DiagnosticCode::InvalidModule
    } else {
        DiagnosticCode::InternalError
    };
    let mut builder = Diagnostic::error(code, err.to_string());
    for cause in err.chain().skip(1) {
        builder = builder.with_cause(cause.to_string());
    }
    builder.build()
}

fn report(err: &anyhow::Error, format: OutputFormat, use_color: bool) {
    let diagnostic = to_diagnostic(err);
    let written = match format {
        OutputFormat::Text => {
            let stderr = std::io::stderr();
            TerminalEmitter::new(stderr.lock(), use_color).emit(&diagnostic)
        }
        OutputFormat::Json => {
            let stdout = std::io::stdout();
            JsonEmitter::new(stdout.lock()).emit(&diagnostic)
        }
    };
    if written.is_err() {
        eprintln!("error[{}]: {}", diagnostic.code, diagnostic.message);
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    // Errors go to stderr, so color follows that stream
    let use_color = !cli.no_color && atty::is(atty::Stream::Stderr);

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        if cmd.print_help().is_err() {
            return ExitCode::FAILURE;
        }
        println!();
        return ExitCode::SUCCESS;
    };

    let result = match command {
        Commands::Precompile(args) => {
            commands::precompile::run(args, cli.format, cli.quiet)
        }
        Commands::Link(args) => commands::link::run(args, cli.format, use_color, cli.quiet),
        Commands::Perms(args) => commands::perms::run(args, cli.format),
        Commands::Explain(args) => commands::explain::run(args, cli.format, use_color),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err, cli.format, use_color);
            ExitCode::FAILURE
        }
    }
}
