//! Deepfake ELA CLI
//!
//! Classifies images as Real or Fake with Error Level Analysis and a CNN.
//!
//! # Commands
//!
//! - `classify`: Classify one or more image files
//! - `stored`: Classify `<files_dir>/<folder>/<name>`
//! - `ela`: Export the ELA image of a file
//! - `status`: Load the model and report readiness
//!
//! Configuration comes from `--config <file.toml>` and `DEEPFAKE_*`
//! environment variables. Exit code 1 on error, 2 when the model is missing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod error;

/// Deepfake ELA - image authenticity checks
#[derive(Parser)]
#[command(name = "deepfake-ela")]
#[command(version)]
#[command(about = "Classify images as Real or Fake using Error Level Analysis")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify image files
    Classify(commands::classify::ClassifyArgs),
    /// Classify an image stored under the files directory
    ///
    /// Resolves `<files_dir>/<folder>/<filename>`. Both parts must be plain
    /// names without separators.
    Stored(commands::stored::StoredArgs),
    /// Write the ELA image of a file
    Ela(commands::ela::ElaArgs),
    /// Load the model and report whether it is ready
    Status(commands::status::StatusArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Classify(args) => commands::classify::handle_classify(args, cli.config).await,
        Commands::Stored(args) => commands::stored::handle_stored(args, cli.config).await,
        Commands::Ela(args) => commands::ela::handle_ela(args, cli.config).await,
        Commands::Status(args) => commands::status::handle_status(args, cli.config).await,
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_classify_json() {
        let cli = Cli::parse_from(["deepfake-ela", "-vv", "classify", "--format", "json", "a.jpg", "b.png"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Classify(args) => {
                assert_eq!(args.files.len(), 2);
                assert_eq!(args.format, commands::OutputFormat::Json);
            }
            _ => panic!("expected classify"),
        }
    }

    #[test]
    fn test_parse_stored() {
        let cli = Cli::parse_from(["deepfake-ela", "stored", "--folder", "batch", "img.jpg", "--config", "c.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        match cli.command {
            Commands::Stored(args) => {
                assert_eq!(args.folder, "batch");
                assert_eq!(args.filename, "img.jpg");
            }
            _ => panic!("expected stored"),
        }
    }

    #[test]
    fn test_classify_requires_files() {
        assert!(Cli::try_parse_from(["deepfake-ela", "classify"]).is_err());
    }
}
