//! Static color palette shared by the
//! export document and the terminal views.

use serde::Serialize;

pub const DEFAULT_COLOR: &str =
  "#3064ad";

/// Where a palette entry can be addressed
/// from.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum PaletteKey {
  /// Google Calendar `colorId`.
  ColorId(&'static str),
  /// Legacy custom-color keyword.
  Keyword(&'static str)
}

#[derive(Debug, Clone, Copy)]
pub struct PaletteEntry {
  pub key:   PaletteKey,
  pub label: &'static str,
  pub hex:   &'static str
}

const COLOR_ID_ENTRIES: [PaletteEntry; 11] = [
  color_id("1", "Lavender", "#7986cb"),
  color_id("2", "Sage", "#33b679"),
  color_id("3", "Grape", "#8e24aa"),
  color_id("4", "Flamingo", "#e67c73"),
  color_id("5", "Banana", "#f6bf26"),
  color_id("6", "Tangerine", "#f4511e"),
  color_id("7", "Peacock", "#039be5"),
  color_id("8", "Graphite", "#616161"),
  color_id("9", "Blueberry", "#3f51b5"),
  color_id("10", "Basil", "#0b8043"),
  color_id("11", "Tomato", "#d50000")
];

const KEYWORD_ENTRIES: [PaletteEntry; 5] = [
  keyword("feriado", "#006414"),
  keyword("maio laranja", "#fd7e14"),
  keyword("junho violeta", "#8b00ff"),
  keyword(
    "junho da diversidade",
    "#ff0000"
  ),
  keyword("agosto lilás", "#c79fef")
];

const fn color_id(
  id: &'static str,
  label: &'static str,
  hex: &'static str
) -> PaletteEntry {
  PaletteEntry {
    key: PaletteKey::ColorId(id),
    label,
    hex
  }
}

const fn keyword(
  name: &'static str,
  hex: &'static str
) -> PaletteEntry {
  PaletteEntry {
    key: PaletteKey::Keyword(name),
    label: name,
    hex
  }
}

pub fn entries()
-> impl Iterator<Item = &'static PaletteEntry>
{
  COLOR_ID_ENTRIES
    .iter()
    .chain(KEYWORD_ENTRIES.iter())
}

pub fn lookup_color_id(
  raw: &str
) -> Option<&'static PaletteEntry> {
  let id = raw.trim();
  COLOR_ID_ENTRIES.iter().find(|entry| {
    matches!(
      entry.key,
      PaletteKey::ColorId(key) if key == id
    )
  })
}

pub fn lookup_keyword(
  raw: &str
) -> Option<&'static PaletteEntry> {
  let wanted = raw.trim().to_lowercase();
  KEYWORD_ENTRIES.iter().find(|entry| {
    matches!(
      entry.key,
      PaletteKey::Keyword(name)
        if name == wanted
    )
  })
}

/// First campaign keyword contained in
/// `title`, ignoring case.
pub fn lookup_title_keyword(
  title: &str
) -> Option<&'static PaletteEntry> {
  let title = title.to_lowercase();
  KEYWORD_ENTRIES.iter().find(|entry| {
    matches!(
      entry.key,
      PaletteKey::Keyword(name)
        if title.contains(name)
    )
  })
}

/// Explicit color id, then the legacy
/// custom color (keyword or `#rrggbb`),
/// then a campaign keyword in the title,
/// then the default.
pub fn resolve_color(
  color_id: Option<&str>,
  custom_color: Option<&str>,
  title: &str
) -> String {
  if let Some(raw) = color_id
    && !raw.trim().is_empty()
  {
    if let Some(entry) =
      lookup_color_id(raw)
    {
      return entry.hex.to_string();
    }
    tracing::debug!(
      color_id = %raw,
      "unknown color id; trying custom color"
    );
  }

  if let Some(raw) = custom_color
    && !raw.trim().is_empty()
  {
    if let Some(entry) =
      lookup_keyword(raw)
    {
      return entry.hex.to_string();
    }
    if let Some(hex) = normalize_hex(raw)
    {
      return hex;
    }
    tracing::debug!(
      custom_color = %raw,
      "unrecognized custom color; trying title"
    );
  }

  lookup_title_keyword(title)
    .map_or_else(
      || DEFAULT_COLOR.to_string(),
      |entry| entry.hex.to_string()
    )
}

fn normalize_hex(
  raw: &str
) -> Option<String> {
  let trimmed = raw.trim();
  let digits =
    trimmed.strip_prefix('#')?;
  if matches!(digits.len(), 3 | 6)
    && digits
      .chars()
      .all(|c| c.is_ascii_hexdigit())
  {
    Some(format!(
      "#{}",
      digits.to_ascii_lowercase()
    ))
  } else {
    None
  }
}

#[derive(
  Debug, Clone, PartialEq, Eq, Serialize,
)]
pub struct LegendEntry {
  pub label: String,
  pub color: String
}

/// One legend row per palette color.
pub fn legend() -> Vec<LegendEntry> {
  entries()
    .map(|entry| LegendEntry {
      label: entry.label.to_string(),
      color: entry.hex.to_string()
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn color_id_ten_is_basil() {
    let entry = lookup_color_id("10")
      .expect("palette entry");
    assert_eq!(entry.label, "Basil");
    assert_eq!(
      resolve_color(Some("10"), None, ""),
      "#0b8043"
    );
  }

  #[test]
  fn missing_color_uses_default() {
    assert_eq!(
      resolve_color(None, None, ""),
      DEFAULT_COLOR
    );
    assert_eq!(
      resolve_color(Some(""), Some("  "), ""),
      DEFAULT_COLOR
    );
  }

  #[test]
  fn color_id_wins_over_custom_color() {
    assert_eq!(
      resolve_color(
        Some("11"),
        Some("feriado"),
        ""
      ),
      "#d50000"
    );
  }

  #[test]
  fn unknown_id_falls_through_to_custom()
  {
    assert_eq!(
      resolve_color(
        Some("42"),
        Some("Feriado"),
        ""
      ),
      "#006414"
    );
    assert_eq!(
      resolve_color(
        Some("42"),
        Some("#ABCDEF"),
        ""
      ),
      "#abcdef"
    );
    assert_eq!(
      resolve_color(
        Some("42"),
        Some("blue-ish"),
        ""
      ),
      DEFAULT_COLOR
    );
  }

  #[test]
  fn campaign_keyword_in_title_colors_event()
  {
    assert_eq!(
      resolve_color(
        None,
        None,
        "Campanha Maio Laranja"
      ),
      "#fd7e14"
    );
    assert_eq!(
      resolve_color(
        None,
        None,
        "Abertura do AGOSTO LILÁS"
      ),
      "#c79fef"
    );
    // explicit colors still win
    assert_eq!(
      resolve_color(
        Some("2"),
        None,
        "Maio Laranja"
      ),
      "#33b679"
    );
    assert_eq!(
      resolve_color(
        None,
        Some("#112233"),
        "Maio Laranja"
      ),
      "#112233"
    );
    assert_eq!(
      resolve_color(None, None, "Reunião"),
      DEFAULT_COLOR
    );
  }

  #[test]
  fn keyword_lookup_handles_accents() {
    let entry =
      lookup_keyword("Agosto Lilás")
        .expect("keyword entry");
    assert_eq!(entry.hex, "#c79fef");
  }

  #[test]
  fn legend_lists_every_palette_color() {
    let rows = legend();
    assert_eq!(rows.len(), 16);
    assert!(rows.iter().any(|entry| {
      entry.label == "Basil"
        && entry.color == "#0b8043"
    }));
  }
}
