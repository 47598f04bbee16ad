use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "regalo")]
#[command(about = "Browse and reserve gifts from a wedding registry")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the site definition file
    #[arg(long, global = true, value_name = "PATH")]
    pub site: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show event details
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List gifts with their reservation state
    #[command(alias = "list")]
    Gifts {
        /// Only show gifts nobody has reserved yet
        #[arg(long)]
        available: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reserve a gift
    Reserve {
        /// Gift ID (e.g. g3)
        gift_id: String,
        /// Your name (shown next to the gift)
        #[arg(short, long)]
        name: Option<String>,
        /// Optional message for the couple
        #[arg(long)]
        note: Option<String>,
        /// Take the gift even if someone else already reserved it
        #[arg(long)]
        force: bool,
    },
    /// Release a reserved gift
    #[command(alias = "cancel")]
    Release {
        /// Gift ID (e.g. g3)
        gift_id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Follow reservation changes live until interrupted
    Watch {
        /// Print each change as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// Show bank accounts for gift deposits
    Accounts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
