use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "accessgate",
    version,
    about = "Group-membership access control for named operations"
)]
pub struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "ACCESSGATE_LOG_FORMAT")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Load a registry file and report every declared operation
    Validate(ValidateArgs),
    /// Evaluate one operation's authorization for a principal
    Check(CheckArgs),
    Version,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Registry file (YAML) with per-operation group declarations
    pub registry: PathBuf,

    /// Oracle configuration; when given, directory mappings are cross-checked
    #[arg(long, env = "ACCESSGATE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(long, env = "ACCESSGATE_REGISTRY")]
    pub registry: PathBuf,

    #[arg(long, env = "ACCESSGATE_CONFIG")]
    pub config: PathBuf,

    /// Operation name as declared in the registry
    #[arg(long)]
    pub operation: String,

    /// Principal id handed to the membership oracle
    #[arg(long)]
    pub principal: String,
}
