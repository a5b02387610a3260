//! Satchel CLI - attach files to entities from the command line

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{attach, clone, detach, fields, show};
use config::SatchelConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "satchel")]
#[command(about = "Entity-attached asset storage", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to satchel.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file or directory in an entity's field, replacing what was there
    Attach {
        /// Entity type
        entity_type: String,

        /// Entity id
        id: String,

        /// Field name
        field: String,

        /// File or directory to store, or "-" to read stdin
        source: String,

        /// Explicit metadata (key=value, repeatable)
        #[arg(long = "meta")]
        meta: Vec<String>,

        /// Extension hint for stdin input
        #[arg(long)]
        ext: Option<String>,
    },

    /// Remove a field's stored asset and metadata
    Detach {
        entity_type: String,
        id: String,
        field: String,
    },

    /// Show every field of an entity
    Show {
        entity_type: String,
        id: String,

        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },

    /// Copy all assets of one entity onto another of the same type
    Clone {
        entity_type: String,

        /// Source entity id
        from: String,

        /// Destination entity id
        to: String,
    },

    /// List declared entity types and fields
    Fields,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("SATCHEL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = SatchelConfig::load(cli.config.as_deref())?;
    tracing::debug!(
        storage_root = %config.storage_root.display(),
        metadata_root = %config.metadata_root.display(),
        entity_types = config.entities.len(),
        "loaded config"
    );

    match cli.command {
        Commands::Attach {
            entity_type,
            id,
            field,
            source,
            meta,
            ext,
        } => attach::run(
            &config,
            attach::AttachArgs {
                entity_type,
                id,
                field,
                source,
                meta,
                ext,
            },
        ),
        Commands::Detach {
            entity_type,
            id,
            field,
        } => detach::run(&config, &entity_type, &id, &field),
        Commands::Show {
            entity_type,
            id,
            format,
        } => show::run(&config, &entity_type, &id, &format),
        Commands::Clone {
            entity_type,
            from,
            to,
        } => clone::run(&config, &entity_type, &from, &to),
        Commands::Fields => fields::run(&config),
    }
}
