pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod document;
pub mod event;
pub mod filter;
pub mod grid;
pub mod holidays;
pub mod normalize;
pub mod palette;
pub mod render;
pub mod team;

use std::ffi::OsString;

use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting rav-agenda"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.agendarc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let renderer =
    render::Renderer::new(&cfg)?;
  let command = cli::resolve_command(
    &cfg,
    cli.command
  )?;

  commands::dispatch(
    &cfg,
    &renderer,
    command,
    Utc::now()
  )?;

  info!("done");
  Ok(())
}
