//! CLI argument definitions using clap
//!
//! Commands:
//! - mirrorgroup enable --group <name> [--mode snapshot|journal]
//! - mirrorgroup disable --group <name> [--force]
//! - mirrorgroup promote --group <name> [--force]
//! - mirrorgroup demote --group <name>
//! - mirrorgroup resync --group <name>
//! - mirrorgroup info --group <name>
//! - mirrorgroup status --group <name> [--local]
//! - mirrorgroup wait --group <name> --state <target>

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::mirror::ImageMirrorMode;

/// Inspect and control RBD mirror groups
#[derive(Parser, Debug)]
#[command(name = "mirrorgroup")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Pool holding the group (overrides the config file)
    #[arg(long, global = true)]
    pub pool: Option<String>,

    /// Log INFO events to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enable mirroring for a group
    Enable {
        #[arg(long)]
        group: String,
        /// Image mirroring mode
        #[arg(long, default_value = "snapshot")]
        mode: ImageMirrorMode,
    },

    /// Disable mirroring for a group
    Disable {
        #[arg(long)]
        group: String,
        /// Proceed even if peers cannot be reached
        #[arg(long)]
        force: bool,
    },

    /// Promote the group to primary at this site
    Promote {
        #[arg(long)]
        group: String,
        /// Promote even if another site is primary
        #[arg(long)]
        force: bool,
    },

    /// Demote the group to secondary at this site
    Demote {
        #[arg(long)]
        group: String,
    },

    /// Resync the group from the primary site
    Resync {
        #[arg(long)]
        group: String,
    },

    /// Print mirroring info
    Info {
        #[arg(long)]
        group: String,
    },

    /// Print mirroring status of every site
    Status {
        #[arg(long)]
        group: String,
        /// Print only the local site entry
        #[arg(long)]
        local: bool,
    },

    /// Poll until the group reaches a state
    Wait {
        #[arg(long)]
        group: String,
        #[arg(long, value_enum)]
        state: WaitTarget,
    },
}

/// Condition the `wait` command polls for
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    Enabled,
    Disabled,
    /// Enabled and primary at this site
    Primary,
    /// Enabled and secondary at this site
    Secondary,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
