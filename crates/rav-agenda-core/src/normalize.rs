use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::datetime::{
  format_br_date,
  format_clock_time
};
use crate::event::Event;
use crate::palette::resolve_color;

pub const PLACEHOLDER: &str = "—";
pub const WHOLE_DAY: &str =
  "Dia inteiro";
const MISSING_CLOCK: &str = "--";

/// Render-ready form of one event.
#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct DisplayRecord {
  pub title:       String,
  pub date:        String,
  pub date_end:    String,
  pub period:      String,
  /// Plain text; `\n` separates lines.
  pub description: String,
  pub location:    String,
  pub attendees:   String,
  pub link:        String,
  pub color:       String,
  #[serde(skip)]
  pub start:       Option<NaiveDate>,
  #[serde(skip)]
  pub timed:       bool
}

impl DisplayRecord {
  /// `date`, or `date a date_end` when
  /// the event spans several days.
  #[must_use]
  pub fn date_range(&self) -> String {
    if self.date_end.is_empty()
      || self.date_end == self.date
    {
      self.date.clone()
    } else {
      format!(
        "{} a {}",
        self.date, self.date_end
      )
    }
  }

  /// Text shown on the grid pill.
  #[must_use]
  pub fn pill_label(&self) -> String {
    if self.timed {
      format!(
        "{} — {}",
        self.title, self.period
      )
    } else {
      self.title.clone()
    }
  }
}

pub fn period_for(event: &Event) -> String {
  let Some(start) = event.start_time else {
    return WHOLE_DAY.to_string();
  };
  let end = event
    .end_time
    .map(format_clock_time)
    .unwrap_or_else(|| {
      MISSING_CLOCK.to_string()
    });
  format!(
    "{} - {}",
    format_clock_time(start),
    end
  )
}

/// Builds the display record. Never
/// fails: every unparseable piece turns
/// into a placeholder.
pub fn normalize_event(
  event: &Event
) -> DisplayRecord {
  let start = event.start_date().date();
  let end = event.end_date().date();

  let date = start
    .map(format_br_date)
    .unwrap_or_else(|| {
      PLACEHOLDER.to_string()
    });
  // A range needs a start, and an end
  // that does not precede it.
  let date_end = match (start, end) {
    | (Some(s), Some(e)) if e >= s => {
      format_br_date(e)
    }
    | _ => String::new()
  };

  let description = event
    .description
    .as_deref()
    .map(normalize_description)
    .filter(|text| !text.is_empty())
    .unwrap_or_else(|| {
      PLACEHOLDER.to_string()
    });

  let attendees = event
    .attendees
    .iter()
    .map(|a| a.trim())
    .filter(|a| !a.is_empty())
    .collect::<Vec<_>>()
    .join(", ");

  DisplayRecord {
    title: event.title.clone(),
    date,
    date_end,
    period: period_for(event),
    description,
    location: event
      .location
      .clone()
      .filter(|l| !l.trim().is_empty())
      .unwrap_or_else(|| {
        PLACEHOLDER.to_string()
      }),
    attendees: if attendees.is_empty() {
      PLACEHOLDER.to_string()
    } else {
      attendees
    },
    link: event
      .link
      .clone()
      .unwrap_or_default(),
    color: resolve_color(
      event.color_id.as_deref(),
      event.custom_color.as_deref(),
      &event.title
    ),
    start,
    timed: event.start_time.is_some()
  }
}

struct DescriptionRules {
  line_break:    Regex,
  block_close:   Regex,
  list_item:     Regex,
  list_wrapper:  Regex,
  paragraph:     Regex,
  any_tag:       Regex,
  blank_run:     Regex,
  horizontal_ws: Regex
}

impl DescriptionRules {
  fn compile()
  -> Result<Self, regex::Error> {
    Ok(Self {
      line_break:    Regex::new(
        r"(?i)<br\s*/?>"
      )?,
      block_close:   Regex::new(
        r"(?i)</(?:p|div|h[1-6])>"
      )?,
      list_item:     Regex::new(
        r"(?is)<li[^>]*>(.*?)</li>"
      )?,
      list_wrapper:  Regex::new(
        r"(?i)</?[uo]l[^>]*>"
      )?,
      paragraph:     Regex::new(
        r"(?i)<p(?:\s[^>]*)?>"
      )?,
      any_tag:       Regex::new(
        r"</?[A-Za-z!][^<>]*>"
      )?,
      blank_run:     Regex::new(
        r"\n{3,}"
      )?,
      horizontal_ws: Regex::new(
        r"[ \t]+"
      )?
    })
  }
}

fn description_rules()
-> Option<&'static DescriptionRules> {
  static RULES: OnceLock<
    Option<DescriptionRules>
  > = OnceLock::new();
  RULES
    .get_or_init(|| {
      DescriptionRules::compile()
        .map_err(|err| {
          tracing::error!(
            error = %err,
            "description rules failed to compile"
          );
        })
        .ok()
    })
    .as_ref()
}

const ENTITIES: [(&str, &str); 10] = [
  ("&nbsp;", " "),
  ("&lt;", "<"),
  ("&gt;", ">"),
  ("&quot;", "\""),
  ("&#39;", "'"),
  ("&apos;", "'"),
  ("&hellip;", "..."),
  ("&mdash;", "—"),
  ("&ndash;", "–"),
  ("&amp;", "&")
];

/// Turns a markup description into plain
/// text with `\n` line breaks. Entities
/// are decoded before tags are handled,
/// so the output carries no markup and
/// normalizing it again is a no-op.
pub fn normalize_description(
  raw: &str
) -> String {
  let mut text = raw
    .replace("\\n", "\n")
    .replace("\r\n", "\n");
  // Every decode shortens the text, so
  // this settles.
  loop {
    let decoded = ENTITIES.iter().fold(
      text.clone(),
      |acc, (entity, ch)| {
        acc.replace(entity, ch)
      }
    );
    if decoded == text {
      break;
    }
    text = decoded;
  }

  let Some(rules) = description_rules()
  else {
    return text.trim().to_string();
  };

  let text = rules
    .line_break
    .replace_all(&text, "\n");
  let text = rules
    .block_close
    .replace_all(&text, "\n");
  let text = rules
    .list_item
    .replace_all(&text, "• $1\n");
  let text = rules
    .list_wrapper
    .replace_all(&text, "");
  let text = rules
    .paragraph
    .replace_all(&text, "\n");
  let text =
    rules.any_tag.replace_all(&text, "");

  let text = text
    .split('\n')
    .map(|line| {
      rules
        .horizontal_ws
        .replace_all(line.trim(), " ")
        .into_owned()
    })
    .collect::<Vec<_>>()
    .join("\n");

  rules
    .blank_run
    .replace_all(&text, "\n\n")
    .trim()
    .to_string()
}
