use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use tracing::{debug, info, instrument};

use crate::cli::{Command, ExportArgs, GridArgs, MonthArgs, SourceArgs};
use crate::config::{Config, expand_tilde};
use crate::datetime::{MonthRef, resolve_timezone};
use crate::document::{ExportOptions, build_month_document, resolve_output_path, write_document};
use crate::event::{Event, load_events, parse_events_json};
use crate::filter::filter_events_by_month;
use crate::grid::build_month_grid;
use crate::holidays::{holiday_events, holidays_in_month};
use crate::normalize::{DisplayRecord, normalize_event};
use crate::render::Renderer;
use crate::team::load_roster;

pub const STDIN_PATH: &str = "-";

#[instrument(skip(cfg, renderer, command, now), fields(command = command.name()))]
pub fn dispatch(
    cfg: &Config,
    renderer: &Renderer,
    command: Command,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    debug!(?command, "dispatching command");

    match command {
        Command::List(args) => cmd_list(cfg, renderer, &args, now),
        Command::Grid(args) => cmd_grid(cfg, renderer, &args, now),
        Command::Export(args) => {
            let path = cmd_export(cfg, &args, now)?;
            println!("{}", path.display());
            Ok(())
        }
        Command::Holidays(args) => cmd_holidays(cfg, renderer, &args, now),
        Command::Show => cmd_show(cfg),
    }
}

fn cmd_list(
    cfg: &Config,
    renderer: &Renderer,
    args: &SourceArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command list");
    let (month, events) = load_month_source(cfg, args, now)?;
    let records = month_records(&events, month);
    renderer.print_event_table(&records)
}

fn cmd_grid(
    cfg: &Config,
    renderer: &Renderer,
    args: &GridArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command grid");
    let (month, events) = load_month_source(cfg, &args.source, now)?;
    let records = month_records(&events, month);
    let grid = build_month_grid(month, &records);

    if args.json {
        let json = serde_json::to_string_pretty(&grid).context("failed to serialize grid")?;
        println!("{json}");
        return Ok(());
    }

    renderer.print_month_grid(&grid)
}

/// Builds and writes the month document; returns the written path.
#[instrument(skip(cfg, args, now))]
pub fn cmd_export(cfg: &Config, args: &ExportArgs, now: DateTime<Utc>) -> anyhow::Result<PathBuf> {
    info!("command export");
    let (month, events) = load_month_source(cfg, &args.source, now)?;

    let roster = args
        .roster
        .as_deref()
        .map(|path| load_roster(&expand_tilde(path)))
        .transpose()?;
    let logo = args
        .logo
        .as_deref()
        .map(|path| {
            let path = expand_tilde(path);
            std::fs::read(&path).with_context(|| format!("failed to read logo {}", path.display()))
        })
        .transpose()?;

    let options = ExportOptions {
        generated_at: local_now(cfg, now),
        team: cfg.export_team(),
        roster: roster.as_deref(),
        logo_png: logo.as_deref(),
    };
    let document = build_month_document(&events, month, &options);

    let path = resolve_output_path(args.out.as_deref(), &cfg.export_dir(), month);
    write_document(&path, &document.to_html()?)?;

    info!(
        path = %path.display(),
        month = %month,
        events = document.events.len(),
        "exported month document"
    );
    Ok(path)
}

fn cmd_holidays(
    cfg: &Config,
    renderer: &Renderer,
    args: &MonthArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    info!("command holidays");
    let month = resolve_month(cfg, args, now)?;
    renderer.print_holidays(&holidays_in_month(month))
}

fn cmd_show(cfg: &Config) -> anyhow::Result<()> {
    for path in &cfg.loaded_files {
        println!("# {}", path.display());
    }
    for (k, v) in cfg.iter() {
        println!("{k}={v}");
    }
    Ok(())
}

/// Requested month, filling missing parts from today's date in the
/// configured zone.
pub fn resolve_month(cfg: &Config, args: &MonthArgs, now: DateTime<Utc>) -> anyhow::Result<MonthRef> {
    let today = local_now(cfg, now).date();
    let year = args.year.unwrap_or_else(|| today.year());
    let month = args.month.unwrap_or_else(|| today.month());
    MonthRef::new(year, month)
}

fn load_month_source(
    cfg: &Config,
    args: &SourceArgs,
    now: DateTime<Utc>,
) -> anyhow::Result<(MonthRef, Vec<Event>)> {
    let month = resolve_month(cfg, &args.period, now)?;
    let mut events = read_events(&args.events)?;

    if args.holidays || cfg.export_holidays() {
        let holidays = holiday_events(month);
        debug!(count = holidays.len(), month = %month, "merging holidays");
        events.extend(holidays);
    }

    Ok((month, events))
}

/// Reads events from a file, or from stdin when the path is `-`.
pub fn read_events(path: &Path) -> anyhow::Result<Vec<Event>> {
    if path.as_os_str() != STDIN_PATH {
        return load_events(&expand_tilde(path));
    }

    let mut stdin = String::new();
    io::stdin()
        .read_to_string(&mut stdin)
        .context("failed reading stdin")?;

    let trimmed = stdin.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("events: empty input on stdin"));
    }
    parse_events_json(trimmed)
}

fn month_records(events: &[Event], month: MonthRef) -> Vec<DisplayRecord> {
    filter_events_by_month(events, month)
        .into_iter()
        .map(normalize_event)
        .collect()
}

fn local_now(cfg: &Config, now: DateTime<Utc>) -> NaiveDateTime {
    let tz = resolve_timezone(cfg.timezone());
    now.with_timezone(&tz).naive_local()
}
