//! CLI module - command-line interface
//!
//! Argument definitions live here, the handlers in [`commands`].

pub mod commands;

use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::{Framework, Styling};

/// uigrab - turn a piece of a live web page into a reusable component
#[derive(Parser, Debug)]
#[command(name = "uigrab")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'd', global = true)]
    pub debug: bool,

    /// Run in headed browser mode (visible window)
    #[arg(long, global = true)]
    pub headed: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract one element into a component
    Extract(ExtractArgs),
    /// Run every job in a batch file
    Batch(BatchArgs),
    /// Ask the locator which element matches each query, without extracting
    Locate(LocateArgs),
    /// Inspect or create the config file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("mode")
        .args(["selector", "find", "interactive"])
        .multiple(false)
))]
pub struct ExtractArgs {
    /// Page to extract from
    pub url: String,

    /// CSS selector of the element
    #[arg(long, short = 's')]
    pub selector: Option<String>,

    /// Describe the element in plain words
    #[arg(long, short = 'f')]
    pub find: Option<String>,

    /// Pick the element by clicking it in a visible browser
    #[arg(long, short = 'i')]
    pub interactive: bool,

    /// react, vue or svelte
    #[arg(long)]
    pub framework: Option<Framework>,

    /// tailwind, css, css-modules or inline
    #[arg(long)]
    pub styling: Option<Styling>,

    /// Output directory
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,

    /// Component name
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Download images and fonts next to the component
    #[arg(long)]
    pub assets: bool,

    /// Log extracted sizes and the chosen selector
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Print the outcome as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// JSON batch file
    pub file: PathBuf,

    /// Reuse one browser session for every job
    #[arg(long)]
    pub shared_session: bool,

    /// Print the batch result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct LocateArgs {
    /// Page to search
    pub url: String,

    /// Element description; repeat to locate several at once
    #[arg(long, short = 'f', required = true)]
    pub find: Vec<String>,

    /// Print the results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print where the config file lives
    Path,
}

impl Cli {
    /// Whether this invocation wants debug-level logs
    pub fn wants_debug(&self) -> bool {
        self.debug || matches!(&self.command, Command::Extract(args) if args.verbose)
    }
}
