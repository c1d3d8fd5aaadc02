//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Parser, Subcommand};

/// Calendar dispatcher for service tickets.
///
/// Allocates each ticket's remaining hours into free quarter-hour slots on
/// a member's calendar, respecting existing commitments, daily and total
/// caps, business days, and duplicate-dispatch policy.
#[derive(Debug, Parser)]
#[command(name = "td", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Dispatch ticket hours into free calendar slots.
    Dispatch {
        /// Path to the run parameters file (TOML).
        #[arg(long)]
        params: PathBuf,

        /// Plan and trace without writing to the remote calendar.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show day-by-day calendar load for a member.
    Calendar {
        /// Member identifier.
        #[arg(long)]
        member: String,

        /// First day of the window (YYYY-MM-DD).
        #[arg(long)]
        from: NaiveDate,

        /// Timezone for day boundaries and slot labels.
        #[arg(long, default_value = "UTC")]
        timezone: Tz,
    },

    /// Show resolved remaining hours for a run's tickets.
    Tickets {
        /// Path to the run parameters file (TOML).
        #[arg(long)]
        params: PathBuf,
    },
}
