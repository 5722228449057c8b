//! Clap derive structures for the `esolar` CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// esolar -- read solar plant telemetry from the SAJ eSolar portal
#[derive(Debug, Parser)]
#[command(
    name = "esolar",
    version,
    about = "Read solar plant telemetry from the SAJ eSolar portal",
    long_about = "Logs into an eSolar web portal (SAJ or a rebranded reseller \
        deployment), walks the plant's monitor pages and prints one flat \
        snapshot of typed measurements.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Profile to use
    #[arg(long, short = 'p', env = "ESOLAR_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "ESOLAR_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Portal username (overrides profile)
    #[arg(long, short = 'u', env = "ESOLAR_USERNAME", global = true)]
    pub username: Option<String>,

    /// Portal preset: saj or greenheiss (overrides profile)
    #[arg(long, env = "ESOLAR_PROVIDER", global = true)]
    pub provider: Option<String>,

    /// Custom portal host (overrides provider)
    #[arg(long, env = "ESOLAR_HOST", global = true)]
    pub host: Option<String>,

    /// Application path under a custom host, e.g. "saj" or "cloud"
    #[arg(long, global = true, requires = "host")]
    pub path: Option<String>,

    /// Talk plain HTTP to a custom host
    #[arg(long, global = true, requires = "host")]
    pub http: bool,

    /// Plant hardware variant: base (none), h1 or saj_sec
    #[arg(long, env = "ESOLAR_VARIANT", global = true)]
    pub variant: Option<String>,

    /// Position of the plant in the account's plant list
    #[arg(long, global = true)]
    pub plant_index: Option<usize>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ESOLAR_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept any TLS certificate
    #[arg(long, short = 'k', env = "ESOLAR_INSECURE", global = true)]
    pub insecure: bool,

    /// Per-request timeout in seconds (overrides profile)
    #[arg(long, env = "ESOLAR_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain `key=value` lines (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that the portal accepts the configured credentials
    Login,

    /// Run one fetch cycle and print the snapshot
    #[command(alias = "f")]
    Fetch(FetchArgs),

    /// Poll the portal and print every new snapshot
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// List the fields a plant variant reports
    Fields(FieldsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Fetch / Watch ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Print the merged portal responses instead of the snapshot
    #[arg(long)]
    pub raw: bool,

    /// Also list fields the portal did not report
    #[arg(long, short = 'a')]
    pub all: bool,

    /// Only report these fields (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval, e.g. "5m" or "90s" (defaults to the config value)
    #[arg(long, short = 'i', value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Stop after this many snapshots
    #[arg(long, short = 'n')]
    pub count: Option<usize>,

    /// Only report these fields (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub fields: Option<Vec<String>>,
}

#[derive(Debug, Args)]
pub struct FieldsArgs {
    /// Include the portal path each field is read from
    #[arg(long)]
    pub paths: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive setup wizard
    Init,

    /// Show the loaded configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a profile value, e.g. `variant h1`
    Set {
        /// Profile key
        key: String,
        /// New value
        value: String,
    },

    /// List profiles; the default is marked with `*`
    Profiles,

    /// Make a profile the default
    Use {
        /// Profile name
        name: String,
    },

    /// Store a profile's password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
