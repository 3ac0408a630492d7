//! CLI definitions for promptlift.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// promptlift CLI.
#[derive(Parser)]
#[command(name = "promptlift")]
#[command(about = "Prompt enhancement for AI chat pages")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// List known chat platforms
    Platforms {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Find the prompt input on a page snapshot
    Resolve {
        /// Page snapshot (JSON)
        #[arg(long = "page")]
        snapshot: PathBuf,
    },

    /// Rewrite the draft on a page snapshot and write it back
    Enhance {
        /// Page snapshot (JSON)
        #[arg(long = "page")]
        snapshot: PathBuf,

        /// Text to rewrite instead of the draft in the input
        #[arg(long)]
        text: Option<String>,

        /// Render the rewrite progressively
        #[arg(long)]
        stream: bool,
    },

    /// Store text for a platform and open its chat page
    Open {
        /// Platform id (see `platforms`)
        #[arg(long)]
        platform: String,

        /// Text to insert once the page loads
        #[arg(long)]
        text: String,
    },

    /// Load a page snapshot and deliver any pending insertion into it
    Deliver {
        /// Page snapshot (JSON)
        #[arg(long = "page")]
        snapshot: PathBuf,
    },

    /// Show or clear the stored pending insertion
    Pending {
        /// Remove the stored insertion
        #[arg(long)]
        clear: bool,
    },

    /// Validate the configuration file
    Check,
}
