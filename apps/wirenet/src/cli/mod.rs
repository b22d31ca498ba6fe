//! # Wirenet CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Initialize a new world database
//! - `place` - Place an entity
//! - `remove` - Remove an entity, refunding its wires
//! - `connect` - Link two entities
//! - `disconnect` - Unlink two entities
//! - `inspect` - Show an entity's slots
//! - `status` - Show world status
//! - `export` - Export the world to a snapshot file
//! - `import` - Replace the world from a snapshot file
//! - `hash` - Compute BLAKE3 hash of the world

mod commands;

use crate::config::WirenetConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wirenet_core::{EntityKind, Position, WireNetError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Wirenet - wire links between world entities
#[derive(Parser, Debug)]
#[command(name = "wirenet")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the world database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new empty world database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },

    /// Place an entity
    Place {
        /// Entity kind (small_connector, large_connector, accumulator, block)
        #[arg(short, long)]
        kind: EntityKind,

        /// Origin position as x,y,z
        #[arg(short, long, allow_hyphen_values = true)]
        at: Position,
    },

    /// Remove the entity at a position, refunding its wires
    Remove {
        /// Any position occupied by the entity
        #[arg(short, long, allow_hyphen_values = true)]
        at: Position,

        /// Spool tokens held by the remover
        #[arg(long, default_value = "0")]
        spools: u32,
    },

    /// Link two entities
    Connect {
        #[arg(long, allow_hyphen_values = true)]
        from: Position,

        #[arg(long, allow_hyphen_values = true)]
        to: Position,

        /// Slot on the first entity (first open slot if omitted)
        #[arg(long, allow_negative_numbers = true)]
        from_slot: Option<i32>,

        /// Slot on the second entity (first open slot if omitted)
        #[arg(long, allow_negative_numbers = true)]
        to_slot: Option<i32>,

        /// Wire type name
        #[arg(short, long)]
        wire: Option<String>,
    },

    /// Unlink two entities
    Disconnect {
        #[arg(long, allow_hyphen_values = true)]
        from: Position,

        #[arg(long, allow_hyphen_values = true)]
        to: Position,
    },

    /// Show the entity at a position and its slots
    Inspect {
        #[arg(short, long, allow_hyphen_values = true)]
        at: Position,
    },

    /// Show world status
    Status,

    /// Export the world
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (snapshot, json)
        #[arg(short = 't', long, default_value = "snapshot")]
        format: String,
    },

    /// Replace the world from a snapshot or JSON export
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Compute BLAKE3 cryptographic hash of the world
    Hash,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli, config: &WirenetConfig) -> Result<(), WireNetError> {
    let db_path = config.database(cli.database.as_deref());
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Init { force }) => cmd_init(&db_path, json_mode, force),
        Some(Commands::Place { kind, at }) => cmd_place(&db_path, json_mode, kind, at),
        Some(Commands::Remove { at, spools }) => cmd_remove(&db_path, json_mode, at, spools),
        Some(Commands::Connect {
            from,
            to,
            from_slot,
            to_slot,
            wire,
        }) => {
            let wire = config.wire(wire.as_deref())?;
            cmd_connect(&db_path, json_mode, from, to, from_slot, to_slot, wire)
        }
        Some(Commands::Disconnect { from, to }) => cmd_disconnect(&db_path, json_mode, from, to),
        Some(Commands::Inspect { at }) => cmd_inspect(&db_path, json_mode, at),
        Some(Commands::Export { output, format }) => {
            cmd_export(&db_path, json_mode, &output, &format)
        }
        Some(Commands::Import { input }) => cmd_import(&db_path, json_mode, &input),
        Some(Commands::Hash) => cmd_hash(&db_path, json_mode),
        Some(Commands::Status) | None => {
            // No subcommand - show status by default
            cmd_status(&db_path, json_mode)
        }
    }
}
