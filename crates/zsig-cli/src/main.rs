use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use zsig_core::GameVersion;

mod commands;
mod source;

use source::SourceArgs;

#[derive(Parser)]
#[command(name = "zsig")]
#[command(about = "Gothic engine signature resolver")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect which game version an image is
    Detect {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Resolve signature names to addresses
    Resolve {
        /// Signature names (e.g. zCParser_Parse)
        #[arg(required = true)]
        names: Vec<String>,
        /// Signature set JSON to use instead of the built-in sets
        #[arg(long)]
        signatures: Option<PathBuf>,
        /// Skip the persisted address cache
        #[arg(long)]
        no_cache: bool,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Scan the image for a raw AOB pattern
    Scan {
        /// Pattern, e.g. "E8 ?? ?? ?? ?? 8B 4E 24"
        pattern: String,
        /// Maximum number of matches to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Build a signature-set skeleton from a demangled names export
    Generate {
        /// Names export file (hex address + demangled declaration per line)
        names_file: PathBuf,
        /// Game version the export was taken from (g1, g1a, g2, g2a)
        #[arg(long)]
        version: GameVersion,
        /// Output signature set JSON
        #[arg(short, long)]
        output: PathBuf,
        /// Print lines that could not be parsed
        #[arg(long)]
        warnings: bool,
    },
    /// Check a signature set file without scanning anything
    Validate {
        /// Signature set JSON
        file: PathBuf,
    },
    /// Compute the delta between two addresses
    Offset {
        /// Source address (hex)
        from: String,
        /// Destination address (hex)
        to: String,
    },
}

/// Default log levels for the bin and core crate targets, overridable via
/// `RUST_LOG`.
const DEFAULT_LOG_DIRECTIVES: &[&str] = &["zsig=info", "zsig_core=info"];

fn main() -> Result<()> {
    let mut filter = EnvFilter::from_default_env();
    for directive in DEFAULT_LOG_DIRECTIVES {
        filter = filter.add_directive(directive.parse()?);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect { source } => commands::detect::run(&source),
        Commands::Resolve {
            names,
            signatures,
            no_cache,
            source,
        } => commands::resolve::run(&names, signatures.as_deref(), no_cache, &source),
        Commands::Scan {
            pattern,
            limit,
            source,
        } => commands::scan::run(&pattern, limit, &source),
        Commands::Generate {
            names_file,
            version,
            output,
            warnings,
        } => commands::generate::run(&names_file, version, &output, warnings),
        Commands::Validate { file } => commands::validate::run(&file),
        Commands::Offset { from, to } => commands::offset::run(&from, &to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::Directive;

    #[test]
    fn test_default_log_directives_parse() {
        for directive in DEFAULT_LOG_DIRECTIVES {
            directive.parse::<Directive>().unwrap();
        }
    }
}
