use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "fl",
    about = "FundLedger — crowdfunding records on an ordered key-value ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Ledger image to operate on
    #[arg(long, global = true, default_value = "fundledger.json")]
    pub store: PathBuf,

    /// TOML file with chaincode settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

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
    /// Run a chaincode operation by name
    Invoke(InvokeArgs),
    /// Print the raw value stored under a key
    Read(ReadArgs),
    /// Decode and print the record stored under a key
    Show(ShowArgs),
    /// List every key in the ledger
    Keys,
    /// List the supported operations and their arguments
    Ops,
    /// Print the effective chaincode configuration
    Config,
}

#[derive(Args)]
pub struct InvokeArgs {
    pub operation: String,
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}

#[derive(Args)]
pub struct ReadArgs {
    pub key: String,
}

#[derive(Args)]
pub struct ShowArgs {
    pub key: String,
}
