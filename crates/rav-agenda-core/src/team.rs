use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::debug;

use crate::event::Event;
use crate::normalize::{PLACEHOLDER, normalize_description};

const TEAM_BLOCK_LABEL: &str = "Equipe:";
const ROSTER_NAME_HEADER: &str = "NOME";

/// Team section of the month document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamSummary {
    pub heading: String,
    pub members: Vec<String>,
}

/// Names listed in the `👥 Equipe:` block of an event description.
pub fn extract_participants(description: &str) -> Vec<String> {
    let text = normalize_description(description);
    let mut names = Vec::new();
    let mut in_block = false;

    for line in text.lines() {
        let line = line.trim();
        if !in_block {
            in_block = line.ends_with(TEAM_BLOCK_LABEL);
            continue;
        }
        // a blank line or the next block header closes the team block
        if line.is_empty() || line.ends_with(':') {
            break;
        }
        let entry = line.trim_start_matches(['•', '-', '*', ' ']);
        for name in entry.split(',') {
            let name = name.trim();
            if !name.is_empty() && name != PLACEHOLDER {
                names.push(name.to_string());
            }
        }
    }

    names
}

pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[tracing::instrument(skip_all, fields(events = events.len(), roster = ?roster.map(<[String]>::len)))]
pub fn build_team_summary(events: &[&Event], roster: Option<&[String]>) -> TeamSummary {
    // normalized name -> first spelling seen
    let mut detected: BTreeMap<String, String> = BTreeMap::new();
    for event in events {
        let Some(description) = event.description.as_deref() else {
            continue;
        };
        for name in extract_participants(description) {
            let key = normalize_name(&name);
            if !key.is_empty() {
                detected.entry(key).or_insert(name);
            }
        }
    }
    debug!(participants = detected.len(), "collected team participants");

    match roster {
        Some(roster) => {
            let mut seen = BTreeSet::new();
            let members = roster
                .iter()
                .map(|name| name.trim())
                .filter(|name| !name.is_empty())
                .filter(|name| {
                    let key = normalize_name(name);
                    detected.contains_key(&key) && seen.insert(key)
                })
                .map(str::to_string)
                .collect::<Vec<_>>();

            let heading = if members.is_empty() {
                "Nenhum membro com eventos neste mês.".to_string()
            } else {
                format!("Membros com eventos: {}", members.len())
            };
            TeamSummary { heading, members }
        }
        None => {
            let members = detected.into_values().collect::<Vec<_>>();
            let heading = if members.is_empty() {
                "Dados de equipe indisponíveis.".to_string()
            } else {
                format!("Participantes em eventos: {}", members.len())
            };
            TeamSummary { heading, members }
        }
    }
}

/// Roster names, one per line. Delimited files contribute their first
/// column; a leading `NOME` header is skipped.
pub fn parse_roster(text: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut first = true;

    for line in text.lines() {
        let line = line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let column = line
            .split([',', ';', '\t'])
            .next()
            .unwrap_or_default()
            .trim()
            .trim_matches('"')
            .trim();
        if first {
            first = false;
            if column.eq_ignore_ascii_case(ROSTER_NAME_HEADER) {
                continue;
            }
        }
        if !column.is_empty() {
            names.push(column.to_string());
        }
    }

    names
}

#[tracing::instrument(skip(path), fields(path = %path.display()))]
pub fn load_roster(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read roster {}", path.display()))?;
    let names = parse_roster(&text);
    debug!(count = names.len(), "loaded roster");
    Ok(names)
}
