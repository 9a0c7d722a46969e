use std::path::PathBuf;

use attendwise_core::Frequency;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "attendwise", version, about = "Event lifecycle decisions for AttendWise events")]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "attendwise.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve the call-to-action for a viewer of an event
    Resolve {
        /// Event record (JSON)
        #[arg(long)]
        event: PathBuf,
        /// Signed-in user (JSON); omit for an anonymous viewer
        #[arg(long)]
        user: Option<PathBuf>,
        /// The viewer's registration (JSON)
        #[arg(long)]
        registration: Option<PathBuf>,
        /// Treat the viewer as the event host
        #[arg(long)]
        host: bool,
        /// Session to decide against
        #[arg(long)]
        session: Option<String>,
        /// Decide as of this instant instead of the system clock
        #[arg(long)]
        now: Option<String>,
    },
    /// Pick the session an event page opens on
    SelectSession {
        #[arg(long)]
        event: PathBuf,
        /// Session id requested by the link, if any
        #[arg(long)]
        requested: Option<String>,
        #[arg(long)]
        now: Option<String>,
    },
    /// Show the time window a decision is made against
    Window {
        #[arg(long)]
        event: PathBuf,
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        now: Option<String>,
    },
    /// Parse, build or expand recurrence rules
    Rule {
        #[command(subcommand)]
        command: RuleCommand,
    },
    /// Plan the sessions a recurring event is missing
    Plan {
        #[arg(long)]
        event: PathBuf,
        /// Extra existing sessions (JSON array) on top of the event's own
        #[arg(long)]
        existing: Option<PathBuf>,
        #[arg(long)]
        now: Option<String>,
    },
    /// Count down to an instant, one line per second
    Countdown {
        #[arg(long)]
        target: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum RuleCommand {
    /// Decode a stored rule into its options
    Parse {
        rule: String,
        /// Also print the canonical rule anchored here
        #[arg(long)]
        dtstart: Option<String>,
    },
    /// Build a canonical rule from options
    Build {
        #[arg(long)]
        freq: Option<Frequency>,
        #[arg(long, default_value_t = 1)]
        interval: u32,
        /// Weekday codes, e.g. MO,WE (weekly rules only)
        #[arg(long, value_delimiter = ',')]
        byday: Vec<String>,
        #[arg(long, conflicts_with = "until")]
        count: Option<u32>,
        #[arg(long)]
        until: Option<String>,
        #[arg(long)]
        dtstart: String,
    },
    /// List occurrences of a rule
    Expand {
        rule: String,
        #[arg(long)]
        dtstart: String,
        /// Start of the listing window (defaults to dtstart)
        #[arg(long)]
        from: Option<String>,
        /// Window length in days (defaults to the configured window)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Count the occurrences of a bounded rule
    Count {
        rule: String,
        #[arg(long)]
        dtstart: String,
    },
}
