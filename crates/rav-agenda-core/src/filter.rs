use tracing::trace;

use crate::datetime::{
  MonthRef,
  ParsedDate
};
use crate::event::Event;

/// Keeps, in input order, the events
/// whose start falls inside `month`.
/// Events without a parseable start are
/// dropped silently.
#[tracing::instrument(
  skip_all,
  fields(month = %month)
)]
pub fn filter_events_by_month(
  events: &[Event],
  month: MonthRef
) -> Vec<&Event> {
  let selected = events
    .iter()
    .filter(|event| {
      match event.start_date() {
        | ParsedDate::Parsed(date) => {
          month.contains(date)
        }
        | ParsedDate::Unparseable => {
          trace!(
            title = %event.title,
            start = ?event.start,
            "excluding event without a parseable start"
          );
          false
        }
      }
    })
    .collect::<Vec<_>>();

  tracing::debug!(
    total = events.len(),
    selected = selected.len(),
    "filtered events by month"
  );
  selected
}

#[cfg(test)]
mod tests {
  use super::*;

  fn month(
    year: i32,
    month: u32
  ) -> MonthRef {
    MonthRef::new(year, month)
      .expect("valid month")
  }

  #[test]
  fn keeps_only_events_in_month() {
    let events = vec![
      Event::all_day("a", "2025-06-01"),
      Event::all_day("b", "2025-05-31"),
      Event::all_day(
        "c",
        "2025-06-30T18:00:00-03:00"
      ),
      Event::all_day("d", "2024-06-15"),
      Event::all_day("e", "2025-07-01"),
    ];

    let titles =
      filter_events_by_month(
        &events,
        month(2025, 6)
      )
      .into_iter()
      .map(|e| e.title.as_str())
      .collect::<Vec<_>>();

    assert_eq!(titles, vec!["a", "c"]);
  }

  #[test]
  fn unparseable_start_is_never_selected(
  ) {
    let mut no_start =
      Event::all_day("x", "");
    no_start.start = None;
    let events = vec![
      Event::all_day("bad", "31/06/2025"),
      Event::all_day("none", "None"),
      no_start,
    ];

    for m in 1..=12 {
      assert!(
        filter_events_by_month(
          &events,
          month(2025, m)
        )
        .is_empty()
      );
    }
  }

  #[test]
  fn preserves_input_order() {
    let events = vec![
      Event::all_day("z", "2025-03-20"),
      Event::all_day("a", "2025-03-02"),
      Event::all_day("m", "2025-03-11"),
    ];
    let titles =
      filter_events_by_month(
        &events,
        month(2025, 3)
      )
      .into_iter()
      .map(|e| e.title.as_str())
      .collect::<Vec<_>>();
    assert_eq!(titles, vec!["z", "a", "m"]);
  }
}
