use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod packages;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a bridge over stdin/stdout with the built-in demo packages.
    Serve(ServeArgs),
    /// List the demo packages, modules, methods and events.
    Packages(PackagesArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args),
        Command::Packages(args) => packages::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Maximum characters of serialized result per output message.
    #[arg(long, value_name = "CHARS")]
    pub chunk_size: Option<usize>,
    /// Per-invocation timeout (e.g. 5s, 500ms). Default: wait forever.
    #[arg(long)]
    pub invoke_timeout: Option<String>,
    /// Interval between `clock.ticker` tick events (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub tick_interval: String,
    /// How long to wait for in-flight invocations once stdin closes.
    #[arg(long, default_value = "5s")]
    pub drain_timeout: String,
}

#[derive(Args, Debug, Default)]
pub struct PackagesArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
