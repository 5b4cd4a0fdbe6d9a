use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rav-agenda",
    version,
    about = "Monthly agenda export for the RAV team calendar",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "agendarc", global = true)]
    pub agendarc: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the month's events as a table.
    List(SourceArgs),
    /// Print the month as a Sunday-first grid.
    Grid(GridArgs),
    /// Write the month's HTML document.
    Export(ExportArgs),
    /// Print the holidays of a month.
    Holidays(MonthArgs),
    /// Print the effective configuration.
    Show,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::List(_) => "list",
            Command::Grid(_) => "grid",
            Command::Export(_) => "export",
            Command::Holidays(_) => "holidays",
            Command::Show => "show",
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct MonthArgs {
    /// Month number, 1-12. Defaults to the current month.
    #[arg(long)]
    pub month: Option<u32>,

    /// Four-digit year. Defaults to the current year.
    #[arg(long)]
    pub year: Option<i32>,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SourceArgs {
    /// Events JSON file, or `-` for stdin.
    #[arg(long)]
    pub events: PathBuf,

    #[command(flatten)]
    pub period: MonthArgs,

    /// Merge the fixed holiday table into the month.
    #[arg(long)]
    pub holidays: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct GridArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Emit the grid as JSON instead of text.
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Output file. Defaults to `{export.dir}/agenda_{year}_{month}.html`.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Team roster, one name per line or first CSV column.
    #[arg(long)]
    pub roster: Option<PathBuf>,

    /// PNG logo embedded in the header.
    #[arg(long)]
    pub logo: Option<PathBuf>,
}

#[derive(Parser, Debug)]
#[command(name = "rav-agenda", no_binary_name = true)]
struct DefaultInvocation {
    #[command(subcommand)]
    command: Command,
}

/// Explicit subcommand, else `default.command` from the config.
#[tracing::instrument(skip_all)]
pub fn resolve_command(cfg: &Config, command: Option<Command>) -> anyhow::Result<Command> {
    if let Some(command) = command {
        return Ok(command);
    }

    let name = cfg.default_command();
    debug!(command = %name, "no explicit command, using default");

    DefaultInvocation::try_parse_from([name])
        .map(|inv| inv.command)
        .map_err(|err| anyhow!("default command `{name}` cannot run without arguments: {err}"))
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls positional `rc.key=value` / `rc.key:value` tokens out of argv.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest
                .split_once('=')
                .or_else(|| rest.split_once(':'))
                .map(|(k, v)| (format!("rc.{k}"), v.to_string()));

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}
