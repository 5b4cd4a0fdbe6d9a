use std::fmt;

use anyhow::anyhow;
use chrono::{
  DateTime,
  Datelike,
  Duration,
  NaiveDate,
  NaiveDateTime,
  NaiveTime,
  Weekday
};
use chrono_tz::Tz;
use serde::Serialize;

pub const TIMEZONE_ENV_VAR: &str =
  "AGENDA_TIMEZONE";
pub const DEFAULT_TIMEZONE: &str =
  "America/Maceio";

pub const BR_DATE_FORMAT: &str =
  "%d/%m/%Y";

const MONTH_NAMES_PT: [&str; 12] = [
  "Janeiro",
  "Fevereiro",
  "Março",
  "Abril",
  "Maio",
  "Junho",
  "Julho",
  "Agosto",
  "Setembro",
  "Outubro",
  "Novembro",
  "Dezembro"
];

/// Outcome of running a raw date string
/// through the parser ladder.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum ParsedDate {
  Parsed(NaiveDate),
  Unparseable
}

impl ParsedDate {
  #[must_use]
  pub fn date(self) -> Option<NaiveDate> {
    match self {
      | ParsedDate::Parsed(date) => {
        Some(date)
      }
      | ParsedDate::Unparseable => None
    }
  }
}

type DateAttempt =
  fn(&str) -> Option<NaiveDate>;

// Order matters: bare date first, then
// wall-clock date-times, then the wider
// ISO forms.
const DATE_ATTEMPTS: [DateAttempt; 4] = [
  parse_bare_date,
  parse_naive_datetime,
  parse_offset_datetime,
  parse_iso_fallback
];

/// Parses the date part of an event
/// `start`/`end` value. Offsets are not
/// applied: the calendar day is the one
/// written in the string.
pub fn parse_event_date(
  raw: Option<&str>
) -> ParsedDate {
  let Some(raw) = raw else {
    return ParsedDate::Unparseable;
  };
  let token = raw.trim();
  if token.is_empty()
    || token.eq_ignore_ascii_case("none")
  {
    return ParsedDate::Unparseable;
  }

  DATE_ATTEMPTS
    .iter()
    .find_map(|attempt| attempt(token))
    .map_or(
      ParsedDate::Unparseable,
      ParsedDate::Parsed
    )
}

fn parse_bare_date(
  token: &str
) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(
    token, "%Y-%m-%d"
  )
  .ok()
}

fn parse_naive_datetime(
  token: &str
) -> Option<NaiveDate> {
  NaiveDateTime::parse_from_str(
    token,
    "%Y-%m-%dT%H:%M:%S"
  )
  .ok()
  .map(|ndt| ndt.date())
}

fn parse_offset_datetime(
  token: &str
) -> Option<NaiveDate> {
  DateTime::parse_from_str(
    token,
    "%Y-%m-%dT%H:%M:%S%z"
  )
  .ok()
  .map(|dt| dt.naive_local().date())
}

fn parse_iso_fallback(
  token: &str
) -> Option<NaiveDate> {
  if let Ok(dt) =
    DateTime::parse_from_rfc3339(token)
  {
    return Some(
      dt.naive_local().date()
    );
  }

  for fmt in [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M"
  ] {
    if let Ok(ndt) =
      NaiveDateTime::parse_from_str(
        token, fmt
      )
    {
      return Some(ndt.date());
    }
  }

  None
}

/// Parses an `HH:MM` (or `HH:MM:SS`)
/// clock value.
pub fn parse_clock_time(
  raw: &str
) -> Option<NaiveTime> {
  let token = raw.trim();
  NaiveTime::parse_from_str(
    token, "%H:%M"
  )
  .or_else(|_| {
    NaiveTime::parse_from_str(
      token, "%H:%M:%S"
    )
  })
  .ok()
}

#[must_use]
pub fn format_clock_time(
  time: NaiveTime
) -> String {
  time.format("%H:%M").to_string()
}

#[must_use]
pub fn format_br_date(
  date: NaiveDate
) -> String {
  date.format(BR_DATE_FORMAT).to_string()
}

/// A validated `(month, year)` pair.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct MonthRef {
  year:  i32,
  month: u32
}

impl MonthRef {
  pub fn new(
    year: i32,
    month: u32
  ) -> anyhow::Result<Self> {
    if !(1..=12).contains(&month) {
      return Err(anyhow!(
        "month must be within 1..=12, \
         got {month}"
      ));
    }
    // The last day must also exist for
    // the range arithmetic below.
    if NaiveDate::from_ymd_opt(
      year, month, 1
    )
    .is_none()
      || NaiveDate::from_ymd_opt(
        year.saturating_add(1),
        1,
        1
      )
      .is_none()
    {
      return Err(anyhow!(
        "year out of supported range: \
         {year}"
      ));
    }
    Ok(Self { year, month })
  }

  #[must_use]
  pub fn year(self) -> i32 {
    self.year
  }

  #[must_use]
  pub fn month(self) -> u32 {
    self.month
  }

  #[must_use]
  pub fn first_day(self) -> NaiveDate {
    first_day_of_month(
      self.year, self.month
    )
  }

  #[must_use]
  pub fn last_day(self) -> NaiveDate {
    last_day_of_month(
      self.year, self.month
    )
  }

  #[must_use]
  pub fn days(self) -> u32 {
    days_in_month(self.year, self.month)
  }

  #[must_use]
  pub fn contains(
    self,
    date: NaiveDate
  ) -> bool {
    date.year() == self.year
      && date.month() == self.month
  }

  #[must_use]
  pub fn name_pt(self) -> &'static str {
    month_name_pt(self.month)
  }
}

impl fmt::Display for MonthRef {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    write!(
      f,
      "{:02}/{}",
      self.month, self.year
    )
  }
}

#[must_use]
pub fn month_name_pt(
  month: u32
) -> &'static str {
  MONTH_NAMES_PT[(month as usize)
    .saturating_sub(1)
    % 12]
}

pub fn first_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  NaiveDate::from_ymd_opt(
    year, month, 1
  )
  .unwrap_or(NaiveDate::MIN)
}

pub fn last_day_of_month(
  year: i32,
  month: u32
) -> NaiveDate {
  let (next_year, next_month) =
    if month >= 12 {
      (year.saturating_add(1), 1_u32)
    } else {
      (year, month + 1)
    };
  add_days(
    first_day_of_month(
      next_year, next_month
    ),
    -1
  )
}

pub fn days_in_month(
  year: i32,
  month: u32
) -> u32 {
  last_day_of_month(year, month).day()
}

pub fn add_days(
  date: NaiveDate,
  days: i64
) -> NaiveDate {
  date
    .checked_add_signed(Duration::days(
      days
    ))
    .unwrap_or(date)
}

pub fn start_of_week(
  day: NaiveDate,
  week_start: Weekday
) -> NaiveDate {
  let day_idx = day
    .weekday()
    .num_days_from_monday()
    as i64;
  let start_idx = week_start
    .num_days_from_monday()
    as i64;
  let diff =
    (7 + day_idx - start_idx) % 7;
  add_days(day, -diff)
}

/// Zone used to stamp generated documents
/// and to pick the default month:
/// `$AGENDA_TIMEZONE`, then the
/// `calendar.timezone` rc value, then
/// America/Maceio.
pub fn resolve_timezone(
  configured: Option<&str>
) -> Tz {
  let env =
    std::env::var(TIMEZONE_ENV_VAR).ok();
  pick_timezone(env.as_deref(), configured)
}

fn pick_timezone(
  env: Option<&str>,
  configured: Option<&str>
) -> Tz {
  let candidates = [
    (env, TIMEZONE_ENV_VAR),
    (configured, "calendar.timezone")
  ];
  candidates
    .into_iter()
    .find_map(|(raw, source)| {
      raw.and_then(|raw| {
        parse_timezone(raw, source)
      })
    })
    .unwrap_or(chrono_tz::America::Maceio)
}

fn parse_timezone(
  raw: &str,
  source: &str
) -> Option<Tz> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    tracing::warn!(
      source,
      "timezone source was empty"
    );
    return None;
  }

  match trimmed.parse::<Tz>() {
    | Ok(tz) => {
      tracing::debug!(
        source,
        timezone = %trimmed,
        "resolved timezone"
      );
      Some(tz)
    }
    | Err(err) => {
      tracing::error!(
        source,
        timezone = %trimmed,
        error = %err,
        "failed to parse timezone id"
      );
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    NaiveDate,
    NaiveTime
  };

  use super::{
    MonthRef,
    ParsedDate,
    days_in_month,
    parse_clock_time,
    parse_event_date,
    pick_timezone
  };

  fn ymd(
    y: i32,
    m: u32,
    d: u32
  ) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d)
      .expect("valid date")
  }

  #[test]
  fn parses_every_rung_of_the_ladder() {
    let cases = [
      ("2025-06-02", ymd(2025, 6, 2)),
      (
        "2025-06-02T09:00:00",
        ymd(2025, 6, 2)
      ),
      (
        "2025-06-02T23:30:00-0300",
        ymd(2025, 6, 2)
      ),
      (
        "2025-06-02T23:30:00-03:00",
        ymd(2025, 6, 2)
      ),
      (
        "2025-06-02T09:00:00.250",
        ymd(2025, 6, 2)
      ),
      (
        "2025-06-02T09:00:00Z",
        ymd(2025, 6, 2)
      ),
      ("2025-06-02 09:00", ymd(2025, 6, 2)),
      ("  2025-12-31  ", ymd(2025, 12, 31))
    ];

    for (raw, expected) in cases {
      assert_eq!(
        parse_event_date(Some(raw)),
        ParsedDate::Parsed(expected),
        "input {raw}"
      );
    }
  }

  #[test]
  fn keeps_wall_clock_day_for_offsets() {
    // 23:30 at -03:00 is already the
    // next day in UTC; the written day
    // is what counts.
    assert_eq!(
      parse_event_date(Some(
        "2025-01-31T23:30:00-03:00"
      ))
      .date(),
      Some(ymd(2025, 1, 31))
    );
  }

  #[test]
  fn unparseable_inputs_never_fail() {
    for raw in [
      None,
      Some(""),
      Some("   "),
      Some("None"),
      Some("amanhã"),
      Some("2025-13-01"),
      Some("02/06/2025")
    ] {
      assert_eq!(
        parse_event_date(raw),
        ParsedDate::Unparseable
      );
    }
  }

  #[test]
  fn parses_clock_values() {
    assert_eq!(
      parse_clock_time("09:00"),
      NaiveTime::from_hms_opt(9, 0, 0)
    );
    assert_eq!(
      parse_clock_time("17:45:00"),
      NaiveTime::from_hms_opt(17, 45, 0)
    );
    assert_eq!(
      parse_clock_time("9h"),
      None
    );
  }

  #[test]
  fn month_ref_rejects_bad_months() {
    assert!(MonthRef::new(2025, 0).is_err());
    assert!(
      MonthRef::new(2025, 13).is_err()
    );
    let feb = MonthRef::new(2024, 2)
      .expect("valid month");
    assert_eq!(feb.days(), 29);
    assert_eq!(feb.name_pt(), "Fevereiro");
    assert_eq!(feb.to_string(), "02/2024");
  }

  #[test]
  fn counts_days_in_month() {
    assert_eq!(days_in_month(2025, 2), 28);
    assert_eq!(days_in_month(2025, 12), 31);
    assert_eq!(days_in_month(2025, 4), 30);
  }

  #[test]
  fn environment_zone_wins_over_rc() {
    assert_eq!(
      pick_timezone(
        Some("America/Sao_Paulo"),
        Some("America/Manaus")
      ),
      chrono_tz::America::Sao_Paulo
    );
    assert_eq!(
      pick_timezone(
        Some("Mars/Base"),
        Some("America/Manaus")
      ),
      chrono_tz::America::Manaus
    );
  }

  #[test]
  fn unknown_zones_fall_back_to_maceio() {
    assert_eq!(
      pick_timezone(None, Some("  ")),
      chrono_tz::America::Maceio
    );
    assert_eq!(
      pick_timezone(
        Some("Mars/Base"),
        Some("Lua/Crater")
      ),
      chrono_tz::America::Maceio
    );
  }
}
