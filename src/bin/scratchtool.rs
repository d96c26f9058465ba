//! scratchtool
//!
//! Inspect and edit scratch units from the command line.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scratchio::{Config, OpenStatus, Registry, ScratchError};
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Failures of a single tool invocation
#[derive(Debug, Error)]
enum ToolError {
    #[error(transparent)]
    Scratch(#[from] ScratchError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl ToolError {
    fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> Self {
        let context = context.into();
        move |source| ToolError::Io { context, source }
    }

    fn is_fatal(&self) -> bool {
        matches!(self, ToolError::Scratch(e) if e.is_fatal())
    }
}

/// scratchio unit inspector
#[derive(Parser, Debug)]
#[command(name = "scratchtool")]
#[command(about = "Inspect and edit scratchio units")]
#[command(version)]
struct Args {
    /// Directory holding volume files
    #[arg(short, long, default_value = "./scratch")]
    base_dir: PathBuf,

    /// Volume file name prefix
    #[arg(short, long, default_value = "scratch")]
    prefix: String,

    /// Volumes per unit
    #[arg(short, long, default_value = "1")]
    volumes: usize,

    /// Exit code for fatal errors
    #[arg(long, default_value = "1")]
    exit_code: i32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a unit's table of contents
    Toc {
        /// Unit id
        unit: usize,
    },

    /// Write an entry's bytes to stdout
    Dump {
        /// Unit id
        unit: usize,

        /// Entry key
        key: String,
    },

    /// Store a file's contents under a key
    Put {
        /// Unit id
        unit: usize,

        /// Entry key
        key: String,

        /// File to read the bytes from
        file: PathBuf,
    },

    /// Delete an entry
    Rm {
        /// Unit id
        unit: usize,

        /// Entry key
        key: String,
    },

    /// Remove every backing file of a unit
    Purge {
        /// Unit id
        unit: usize,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,scratchio=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .base_dir(&args.base_dir)
        .file_prefix(&args.prefix)
        .volumes(args.volumes)
        .error_exit_code(args.exit_code)
        .build();

    let mut registry = match Registry::open(config) {
        Ok(r) => r,
        Err(e) => {
            tracing::error!("Failed to initialize registry: {}", e);
            std::process::exit(args.exit_code);
        }
    };

    let result = run(&mut registry, args.command);
    let shutdown = registry.shutdown().map_err(ToolError::from);

    if let Err(e) = result.and(shutdown) {
        tracing::error!("{}", e);
        let code = if e.is_fatal() { registry.error_exit_code() } else { 2 };
        std::process::exit(code);
    }
}

fn run(registry: &mut Registry, command: Commands) -> Result<(), ToolError> {
    match command {
        Commands::Toc { unit } => {
            registry.open_unit(unit, OpenStatus::Old)?;
            let listing = registry.unit(unit)?.toc()?.to_string();
            print!("{}", listing);
            registry.close_unit(unit, true)?;
        }
        Commands::Dump { unit, key } => {
            registry.open_unit(unit, OpenStatus::Old)?;
            let bytes = registry.read(unit, &key);
            registry.close_unit(unit, true)?;
            io::stdout()
                .write_all(&bytes?)
                .map_err(ToolError::io("writing to stdout"))?;
        }
        Commands::Put { unit, key, file } => {
            let bytes = fs::read(&file).map_err(ToolError::io(format!("reading {}", file.display())))?;
            registry.open_unit(unit, OpenStatus::OldOrNew)?;
            let written = registry.write(unit, &key, &bytes);
            registry.close_unit(unit, true)?;
            written?;
        }
        Commands::Rm { unit, key } => {
            registry.open_unit(unit, OpenStatus::Old)?;
            let deleted = registry.delete_entry(unit, &key);
            registry.close_unit(unit, true)?;
            deleted?;
        }
        Commands::Purge { unit } => {
            let removed = registry.purge(unit)?;
            tracing::info!(unit, removed, "purged unit");
        }
    }
    Ok(())
}
