use std::collections::BTreeMap;

use chrono::{
  Datelike,
  Weekday
};
use serde::Serialize;

use crate::datetime::{
  MonthRef,
  add_days,
  start_of_week
};
use crate::normalize::DisplayRecord;

pub const WEEK_START: Weekday =
  Weekday::Sun;

pub const WEEKDAY_LABELS_PT: [&str; 7] = [
  "Dom", "Seg", "Ter", "Qua", "Qui",
  "Sex", "Sáb"
];

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct EventPill {
  pub title: String,
  pub label: String,
  pub color: String
}

impl EventPill {
  fn from_record(
    record: &DisplayRecord
  ) -> Self {
    Self {
      title: record.title.clone(),
      label: record.pill_label(),
      color: record.color.clone()
    }
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DayCell {
  Empty,
  Day {
    day:   u32,
    pills: Vec<EventPill>
  }
}

impl DayCell {
  #[must_use]
  pub fn day(&self) -> Option<u32> {
    match self {
      | DayCell::Empty => None,
      | DayCell::Day { day, .. } => {
        Some(*day)
      }
    }
  }

  #[must_use]
  pub fn pills(&self) -> &[EventPill] {
    match self {
      | DayCell::Empty => &[],
      | DayCell::Day { pills, .. } => {
        pills
      }
    }
  }
}

pub type Week = [DayCell; 7];

/// Sunday-first, week-major layout of one
/// month.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct MonthGrid {
  month: MonthRef,
  weeks: Vec<Week>
}

impl MonthGrid {
  #[must_use]
  pub fn month(&self) -> MonthRef {
    self.month
  }

  #[must_use]
  pub fn weeks(&self) -> &[Week] {
    &self.weeks
  }

  pub fn cells(
    &self
  ) -> impl Iterator<Item = &DayCell> {
    self.weeks.iter().flatten()
  }

  #[must_use]
  pub fn cell(
    &self,
    day: u32
  ) -> Option<&DayCell> {
    self
      .cells()
      .find(|cell| cell.day() == Some(day))
  }

  #[must_use]
  pub fn pill_count(&self) -> usize {
    self
      .cells()
      .map(|cell| cell.pills().len())
      .sum()
  }
}

/// Lays out `month` and drops each
/// record's pill into the cell of its
/// start day. Multi-day records are not
/// repeated over the days they span.
#[tracing::instrument(
  skip_all,
  fields(month = %month)
)]
pub fn build_month_grid(
  month: MonthRef,
  records: &[DisplayRecord]
) -> MonthGrid {
  let mut pills_by_day: BTreeMap<
    u32,
    Vec<EventPill>
  > = BTreeMap::new();

  for record in records {
    match record.start {
      | Some(start)
        if month.contains(start) =>
      {
        pills_by_day
          .entry(start.day())
          .or_default()
          .push(EventPill::from_record(
            record
          ));
      }
      | _ => {
        tracing::trace!(
          title = %record.title,
          "record starts outside the month; not placed"
        );
      }
    }
  }

  let first = month.first_day();
  let grid_start =
    start_of_week(first, WEEK_START);
  let leading = (first - grid_start)
    .num_days()
    .max(0) as u32;
  let row_count =
    (leading + month.days()).div_ceil(7);

  let weeks = (0..row_count)
    .map(|row| {
      std::array::from_fn(|col| {
        let offset =
          i64::from(row) * 7 + col as i64;
        let date =
          add_days(grid_start, offset);
        if month.contains(date) {
          DayCell::Day {
            day:   date.day(),
            pills: pills_by_day
              .remove(&date.day())
              .unwrap_or_default()
          }
        } else {
          DayCell::Empty
        }
      })
    })
    .collect::<Vec<Week>>();

  let grid = MonthGrid { month, weeks };
  let placed = grid.pill_count();
  tracing::debug!(
    rows = grid.weeks.len(),
    placed,
    skipped = records.len() - placed,
    "built month grid"
  );
  grid
}
