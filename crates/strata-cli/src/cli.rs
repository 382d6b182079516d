use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use strata_sdk::Hash;

#[derive(Parser)]
#[command(
    name = "strata",
    about = "Strata: embedded content-addressed versioned key/value store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding the application databases (overrides the config file)
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Application name; its hash names the database directory
    #[arg(long, global = true, default_value = "default")]
    pub app: String,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Stage values under a namespace, commit them and push a new head
    Put(PutArgs),
    /// Read a value from the head state
    Get(GetArgs),
    /// Show the head state
    Head,
    /// Show the state chain from head to root
    Log(LogArgs),
    /// Show one state of the chain
    State(HashArg),
    /// List commits waiting in the commit log
    Commits,
    /// Show a commit from the commit log
    Show(HashArg),
    /// Delete an unpushed commit from the commit log
    Rollback(HashArg),
}

#[derive(Args)]
pub struct PutArgs {
    pub namespace: String,
    /// Values to store; each is keyed by its content hash
    #[arg(required = true)]
    pub values: Vec<String>,
    /// Commit without pushing; the commit stays in the commit log
    #[arg(long)]
    pub no_push: bool,
}

#[derive(Args)]
pub struct GetArgs {
    pub namespace: String,
    /// Resource key (hex)
    pub key: Hash,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
}

#[derive(Args)]
pub struct HashArg {
    /// Hash (hex)
    pub hash: Hash,
}
