//! `.agendarc`: `key = value` lines, `#`
//! comments and `include <path>` lines.

use std::collections::BTreeMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::datetime::DEFAULT_TIMEZONE;

pub const AGENDARC_ENV: &str =
  "AGENDARC";
pub const AGENDARC_FILE: &str =
  ".agendarc";

pub const KEY_COLOR: &str = "color";
pub const KEY_DEFAULT_COMMAND: &str =
  "default.command";
pub const KEY_EXPORT_DIR: &str =
  "export.dir";
pub const KEY_EXPORT_HOLIDAYS: &str =
  "export.holidays";
pub const KEY_EXPORT_TEAM: &str =
  "export.team";
pub const KEY_TIMEZONE: &str =
  "calendar.timezone";

/// Every key the commands read, with its
/// default.
pub const SETTINGS: [(&str, &str); 6] = [
  (KEY_COLOR, "on"),
  (KEY_DEFAULT_COMMAND, "list"),
  (KEY_EXPORT_DIR, "."),
  (KEY_EXPORT_HOLIDAYS, "off"),
  (KEY_EXPORT_TEAM, "on"),
  (KEY_TIMEZONE, DEFAULT_TIMEZONE)
];

const MAX_INCLUDE_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
enum RcLine<'a> {
  Blank,
  Include(&'a str),
  Setting {
    key:   &'a str,
    value: &'a str
  }
}

/// Classifies one rc line; the error is a
/// short reason without location.
fn parse_rc_line(
  raw: &str
) -> Result<RcLine<'_>, &'static str> {
  let line = match raw.split_once('#') {
    | Some((before, _)) => before,
    | None => raw
  }
  .trim();

  if line.is_empty() {
    return Ok(RcLine::Blank);
  }

  if let Some(rest) =
    line.strip_prefix("include")
    && (rest.is_empty()
      || rest
        .starts_with(char::is_whitespace))
  {
    let target = rest.trim();
    if target.is_empty() {
      return Err("include needs a path");
    }
    return Ok(RcLine::Include(target));
  }

  let (key, value) = line
    .split_once('=')
    .ok_or("expected `key = value`")?;
  let key = key.trim();
  if key.is_empty() {
    return Err("empty config key");
  }
  Ok(RcLine::Setting {
    key,
    value: value.trim()
  })
}

/// On/off switch values accepted for the
/// boolean keys.
fn parse_switch(raw: &str) -> Option<bool> {
  match raw
    .trim()
    .to_ascii_lowercase()
    .as_str()
  {
    | "on" | "yes" | "true" | "1" => {
      Some(true)
    }
    | "off" | "no" | "false" | "0" => {
      Some(false)
    }
    | _ => None
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  values:           BTreeMap<String, String>,
  /// Canonical paths, in load order.
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    Self {
      values:       SETTINGS
        .iter()
        .map(|(k, v)| {
          (k.to_string(), v.to_string())
        })
        .collect(),
      loaded_files: Vec::new()
    }
  }
}

impl Config {
  /// Defaults, then the first agendarc
  /// found: `explicit`, `$AGENDARC`
  /// (`/dev/null` disables), `~/.agendarc`.
  #[tracing::instrument(skip(explicit))]
  pub fn load(
    explicit: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::default();

    match locate_agendarc(explicit) {
      | Some(path) => {
        info!(agendarc = %path.display(), "loading agendarc");
        cfg.read_rc(&path, 0)?;
      }
      | None => {
        debug!("no agendarc; using defaults")
      }
    }

    Ok(cfg)
  }

  /// `rc.<key>=<value>` command-line
  /// values; the `rc.` prefix is optional.
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (raw_key, value) in overrides {
      let key = raw_key
        .strip_prefix("rc.")
        .unwrap_or(&raw_key);
      debug!(key, value = %value, "applying override");
      self.set(key, value);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<&str> {
    self.values.get(key).map(String::as_str)
  }

  pub fn iter(
    &self
  ) -> impl Iterator<Item = (&str, &str)> {
    self
      .values
      .iter()
      .map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Terminal coloring; an unrecognized
  /// value is an error.
  pub fn color(
    &self
  ) -> anyhow::Result<bool> {
    let raw = self.setting(KEY_COLOR);
    parse_switch(raw).ok_or_else(|| {
      anyhow!(
        "invalid color setting: {raw}"
      )
    })
  }

  pub fn default_command(&self) -> &str {
    self.setting(KEY_DEFAULT_COMMAND)
  }

  /// `export.dir` with `~/` expanded.
  pub fn export_dir(&self) -> PathBuf {
    expand_tilde(Path::new(
      self.setting(KEY_EXPORT_DIR)
    ))
  }

  pub fn export_holidays(&self) -> bool {
    self.flag(KEY_EXPORT_HOLIDAYS)
  }

  pub fn export_team(&self) -> bool {
    self.flag(KEY_EXPORT_TEAM)
  }

  pub fn timezone(&self) -> Option<&str> {
    self.get(KEY_TIMEZONE)
  }

  /// Value for a known key, falling back to
  /// its default.
  fn setting(&self, key: &str) -> &str {
    self.get(key).unwrap_or_else(|| {
      default_for(key).unwrap_or_default()
    })
  }

  /// Boolean key; unrecognized values warn
  /// and read as the default.
  fn flag(&self, key: &str) -> bool {
    let raw = self.setting(key);
    parse_switch(raw).unwrap_or_else(|| {
      warn!(
        key,
        value = raw,
        "not an on/off value; using default"
      );
      default_for(key)
        .and_then(parse_switch)
        .unwrap_or(false)
    })
  }

  fn set(
    &mut self,
    key: &str,
    value: String
  ) {
    if default_for(key).is_none() {
      warn!(key, "unknown agendarc key");
    }
    self.values.insert(key.to_string(), value);
  }

  #[tracing::instrument(skip(self))]
  fn read_rc(
    &mut self,
    path: &Path,
    depth: usize
  ) -> anyhow::Result<()> {
    let expanded = expand_tilde(path);
    let path = fs::canonicalize(&expanded)
      .unwrap_or(expanded);

    if self.loaded_files.contains(&path) {
      warn!(
        file = %path.display(),
        "agendarc already loaded; skipping include cycle"
      );
      return Ok(());
    }
    if depth > MAX_INCLUDE_DEPTH {
      return Err(anyhow!(
        "includes nested deeper than {} \
         at {}",
        MAX_INCLUDE_DEPTH,
        path.display()
      ));
    }

    let text = fs::read_to_string(&path)
      .with_context(|| {
        format!(
          "failed to read {}",
          path.display()
        )
      })?;
    self.loaded_files.push(path.clone());

    let base_dir = path
      .parent()
      .unwrap_or_else(|| Path::new("."))
      .to_path_buf();

    for (idx, raw) in
      text.lines().enumerate()
    {
      let line_no = idx + 1;
      match parse_rc_line(raw) {
        | Ok(RcLine::Blank) => {}
        | Ok(RcLine::Include(target)) => {
          let target = base_dir.join(
            expand_tilde(Path::new(target))
          );
          if target.exists() {
            debug!(
              file = %path.display(),
              include = %target.display(),
              line = line_no,
              "following include"
            );
            self.read_rc(&target, depth + 1)?;
          } else {
            warn!(include = %target.display(), "include file does not exist; skipping");
          }
        }
        | Ok(RcLine::Setting {
          key,
          value
        }) => {
          trace!(key, value, "agendarc setting");
          self.set(key, value.to_string());
        }
        | Err(reason) => {
          return Err(anyhow!(
            "{reason} at {}:{line_no}: {raw}",
            path.display()
          ));
        }
      }
    }

    Ok(())
  }
}

fn default_for(
  key: &str
) -> Option<&'static str> {
  SETTINGS
    .iter()
    .find(|(name, _)| *name == key)
    .map(|(_, value)| *value)
}

fn locate_agendarc(
  explicit: Option<&Path>
) -> Option<PathBuf> {
  if let Some(path) = explicit {
    return Some(path.to_path_buf());
  }

  if let Ok(env) =
    std::env::var(AGENDARC_ENV)
  {
    return (env != "/dev/null")
      .then(|| PathBuf::from(env));
  }

  let Some(home) = dirs::home_dir() else {
    warn!(
      "cannot determine home directory; \
       skipping agendarc"
    );
    return None;
  };
  let candidate = home.join(AGENDARC_FILE);
  candidate.exists().then_some(candidate)
}

pub fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}
