use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

use crate::datetime::{ParsedDate, parse_clock_time, parse_event_date};

pub const UNTITLED: &str = "Sem título";

/// One calendar event as handed over by the calendar adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub title: String,
    pub start: Option<String>,
    pub end: Option<String>,
    pub all_day: bool,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub link: Option<String>,
    pub color_id: Option<String>,
    pub custom_color: Option<String>,
}

impl Event {
    pub fn all_day(title: impl Into<String>, date: impl Into<String>) -> Self {
        let date = date.into();
        Self {
            title: title.into(),
            start: Some(date.clone()),
            end: Some(date),
            all_day: true,
            start_time: None,
            end_time: None,
            description: None,
            location: None,
            attendees: vec![],
            link: None,
            color_id: None,
            custom_color: None,
        }
    }

    pub fn timed(
        title: impl Into<String>,
        date: &str,
        start_time: NaiveTime,
        end_time: Option<NaiveTime>,
    ) -> Self {
        let mut event = Self::all_day(title, date);
        event.start = Some(format!("{date}T{}", start_time.format("%H:%M:%S")));
        event.end = end_time.map(|end| format!("{date}T{}", end.format("%H:%M:%S")));
        event.all_day = false;
        event.start_time = Some(start_time);
        event.end_time = end_time;
        event
    }

    pub fn start_date(&self) -> ParsedDate {
        parse_event_date(self.start.as_deref())
    }

    pub fn end_date(&self) -> ParsedDate {
        parse_event_date(self.end.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExtendedPropsWire {
    #[serde(deserialize_with = "lenient_string")]
    start_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    end_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    location: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    description: Option<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    attendees: Vec<String>,
    #[serde(alias = "htmlLink", deserialize_with = "lenient_string")]
    html_link: Option<String>,
    #[serde(rename = "colorId", alias = "color_id", deserialize_with = "lenient_string")]
    color_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EventWire {
    #[serde(alias = "summary", deserialize_with = "lenient_string")]
    title: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    start: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    end: Option<String>,
    #[serde(rename = "allDay", alias = "all_day")]
    all_day: Option<bool>,
    #[serde(deserialize_with = "lenient_string")]
    description: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    location: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    start_time: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    end_time: Option<String>,
    #[serde(deserialize_with = "lenient_string_list")]
    attendees: Vec<String>,
    #[serde(alias = "html_link", deserialize_with = "lenient_string")]
    link: Option<String>,
    #[serde(alias = "colorId", deserialize_with = "lenient_string")]
    color_id: Option<String>,
    #[serde(alias = "customColor", alias = "color", deserialize_with = "lenient_string")]
    custom_color: Option<String>,
    #[serde(rename = "extendedProps")]
    extended_props: ExtendedPropsWire,
}

impl From<EventWire> for Event {
    fn from(wire: EventWire) -> Self {
        let ext = wire.extended_props;

        let title = non_empty(wire.title).unwrap_or_else(|| UNTITLED.to_string());

        let raw_start_time = non_empty(ext.start_time).or(non_empty(wire.start_time));
        let raw_end_time = non_empty(ext.end_time).or(non_empty(wire.end_time));

        let mut start_time = raw_start_time
            .as_deref()
            .and_then(|raw| clock_or_log(raw, &title, "start_time"))
            .or_else(|| time_of_day(wire.start.as_deref()));
        let mut end_time = raw_end_time
            .as_deref()
            .and_then(|raw| clock_or_log(raw, &title, "end_time"))
            .or_else(|| time_of_day(wire.end.as_deref()));

        let all_day = match wire.all_day {
            Some(true) => {
                if start_time.is_some() || end_time.is_some() {
                    debug!(title = %title, "all-day event carried clock times; dropping them");
                }
                start_time = None;
                end_time = None;
                true
            }
            _ => start_time.is_none(),
        };

        Self {
            title,
            start: non_empty(wire.start),
            end: non_empty(wire.end),
            all_day,
            start_time,
            end_time,
            description: non_empty(ext.description).or(non_empty(wire.description)),
            location: non_empty(ext.location).or(non_empty(wire.location)),
            attendees: if ext.attendees.is_empty() {
                wire.attendees
            } else {
                ext.attendees
            },
            link: non_empty(ext.html_link).or(non_empty(wire.link)),
            color_id: non_empty(ext.color_id).or(non_empty(wire.color_id)),
            custom_color: non_empty(wire.custom_color),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty() && !v.trim().eq_ignore_ascii_case("none"))
}

fn clock_or_log(raw: &str, title: &str, field: &str) -> Option<NaiveTime> {
    let parsed = parse_clock_time(raw);
    if parsed.is_none() {
        debug!(title = %title, field, value = %raw, "ignoring unparseable clock value");
    }
    parsed
}

fn time_of_day(raw: Option<&str>) -> Option<NaiveTime> {
    let (_, time_part) = raw?.trim().split_once('T')?;
    parse_clock_time(time_part.get(..5)?)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Object(map) => map
                    .get("email")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            })
            .collect(),
        _ => vec![],
    })
}

/// Accepts either a JSON array of events or an object holding them
/// under `items`.
#[tracing::instrument(skip_all)]
pub fn parse_events_json(text: &str) -> anyhow::Result<Vec<Event>> {
    let root: Value = serde_json::from_str(text).context("events input is not valid JSON")?;

    let items = match root {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("items") {
            Some(Value::Array(items)) => items,
            _ => return Err(anyhow!("expected a JSON array of events or an object with an `items` array")),
        },
        other => {
            return Err(anyhow!(
                "expected a JSON array of events, got {}",
                json_kind(&other)
            ));
        }
    };

    let total = items.len();
    let mut events = Vec::with_capacity(total);
    for (idx, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            warn!(index = idx, kind = json_kind(&item), "skipping non-object event entry");
            continue;
        }
        match serde_json::from_value::<EventWire>(item) {
            Ok(wire) => events.push(Event::from(wire)),
            Err(err) => warn!(index = idx, error = %err, "skipping malformed event entry"),
        }
    }

    debug!(total, loaded = events.len(), "parsed events");
    Ok(events)
}

#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_events(path: &Path) -> anyhow::Result<Vec<Event>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read events from {}", path.display()))?;
    parse_events_json(&text).with_context(|| format!("failed to parse {}", path.display()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
