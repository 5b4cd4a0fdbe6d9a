use std::collections::HashMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use base64::Engine;
use chrono::NaiveDateTime;
use serde::Serialize;
use tempfile::NamedTempFile;
use tera::{Context as TemplateContext, Tera, Value};
use tracing::{debug, info};

use crate::datetime::MonthRef;
use crate::event::Event;
use crate::filter::filter_events_by_month;
use crate::grid::{MonthGrid, WEEKDAY_LABELS_PT, build_month_grid};
use crate::normalize::{DisplayRecord, normalize_event};
use crate::palette::{LegendEntry, legend};
use crate::team::{TeamSummary, build_team_summary};

pub const NO_EVENTS: &str = "Nenhum evento para este mês.";

const MONTH_TEMPLATE_NAME: &str = "month.html";
const MONTH_TEMPLATE: &str = include_str!("templates/month.html");
const GENERATED_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Request-scoped inputs that are not events.
#[derive(Debug, Clone)]
pub struct ExportOptions<'a> {
    pub generated_at: NaiveDateTime,
    pub team: bool,
    pub roster: Option<&'a [String]>,
    pub logo_png: Option<&'a [u8]>,
}

impl ExportOptions<'_> {
    pub fn new(generated_at: NaiveDateTime) -> Self {
        Self {
            generated_at,
            team: true,
            roster: None,
            logo_png: None,
        }
    }
}

/// Everything the month export shows, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct MonthDocument {
    pub month: MonthRef,
    pub legend: Vec<LegendEntry>,
    pub events: Vec<DisplayRecord>,
    pub grid: MonthGrid,
    pub team: Option<TeamSummary>,
    pub generated_at: NaiveDateTime,
    #[serde(skip)]
    pub logo_data_uri: Option<String>,
}

impl MonthDocument {
    pub fn assemble(
        month: MonthRef,
        legend: Vec<LegendEntry>,
        events: Vec<DisplayRecord>,
        grid: MonthGrid,
        team: Option<TeamSummary>,
        generated_at: NaiveDateTime,
    ) -> Self {
        Self {
            month,
            legend,
            events,
            grid,
            team,
            generated_at,
            logo_data_uri: None,
        }
    }

    pub fn with_logo_png(mut self, png: &[u8]) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png);
        self.logo_data_uri = Some(format!("data:image/png;base64,{encoded}"));
        self
    }

    pub fn title(&self) -> String {
        format!("Agenda do mês — {} / {}", self.month.name_pt(), self.month.year())
    }

    /// Renders the self-contained HTML page.
    #[tracing::instrument(skip_all, fields(month = %self.month, events = self.events.len()))]
    pub fn to_html(&self) -> anyhow::Result<String> {
        let tera = month_template()?;

        let mut ctx =
            TemplateContext::from_serialize(self).context("failed to build template context")?;
        ctx.insert("title", &self.title());
        ctx.insert("month_name", self.month.name_pt());
        ctx.insert("generated_label", &self.generated_at.format(GENERATED_FORMAT).to_string());
        ctx.insert("logo", &self.logo_data_uri);
        ctx.insert("weekdays", &WEEKDAY_LABELS_PT);
        ctx.insert("no_events", NO_EVENTS);

        let html = tera
            .render(MONTH_TEMPLATE_NAME, &ctx)
            .context("failed to render month document")?;
        debug!(bytes = html.len(), "rendered month document");
        Ok(html)
    }
}

fn month_template() -> anyhow::Result<Tera> {
    let mut tera = Tera::default();
    tera.autoescape_on(vec![".html"]);
    tera.set_escape_fn(escape_text);
    tera.add_raw_template(MONTH_TEMPLATE_NAME, MONTH_TEMPLATE)
        .context("month template does not compile")?;
    tera.register_filter("linebreaksbr", linebreaksbr_filter);
    Ok(tera)
}

/// Tera's HTML escaper, leaving `/` as is so dates read `dd/mm/YYYY`
/// in the page source.
fn escape_text(input: &str) -> String {
    tera::escape_html(input).replace("&#x2F;", "/")
}

/// Escapes the text, then turns newlines into `<br>`.
fn linebreaksbr_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("linebreaksbr requires a string"))?;
    Ok(Value::String(escape_text(text).replace('\n', "<br>\n")))
}

/// Filters, normalizes, bins and assembles the export for `month`.
#[tracing::instrument(skip_all, fields(month = %month, events = events.len()))]
pub fn build_month_document(
    events: &[Event],
    month: MonthRef,
    options: &ExportOptions<'_>,
) -> MonthDocument {
    let selected = filter_events_by_month(events, month);
    let records = selected
        .iter()
        .copied()
        .map(normalize_event)
        .collect::<Vec<_>>();
    let grid = build_month_grid(month, &records);
    let team = options
        .team
        .then(|| build_team_summary(&selected, options.roster));

    debug!(
        selected = records.len(),
        pills = grid.pill_count(),
        "assembling month document"
    );

    let document = MonthDocument::assemble(
        month,
        legend(),
        records,
        grid,
        team,
        options.generated_at,
    );
    match options.logo_png {
        Some(png) => document.with_logo_png(png),
        None => document,
    }
}

pub fn default_file_name(month: MonthRef) -> String {
    format!("agenda_{}_{:02}.html", month.year(), month.month())
}

pub fn resolve_output_path(out: Option<&Path>, export_dir: &Path, month: MonthRef) -> PathBuf {
    match out {
        Some(path) => path.to_path_buf(),
        None => export_dir.join(default_file_name(month)),
    }
}

/// Writes through a temp file in the target directory, then renames.
#[tracing::instrument(skip(html), fields(path = %path.display(), bytes = html.len()))]
pub fn write_document(path: &Path, html: &str) -> anyhow::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    temp.write_all(html.as_bytes())?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    info!(path = %path.display(), "wrote month document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 6, 1)
            .and_then(|d| d.and_hms_opt(8, 30, 0))
            .expect("valid timestamp")
    }

    fn june() -> MonthRef {
        MonthRef::new(2025, 6).expect("valid month")
    }

    #[test]
    fn empty_month_still_renders_legend_and_grid() {
        let options = ExportOptions::new(generated_at());
        let document = build_month_document(&[], june(), &options);

        assert!(document.events.is_empty());
        assert_eq!(document.legend.len(), 16);
        assert_eq!(document.grid.weeks().len(), 5);

        let html = document.to_html().expect("render html");
        assert!(html.contains(NO_EVENTS));
        assert!(html.contains("Legenda"));
        assert!(html.contains("Basil"));
        assert!(html.contains("<div class=\"day-number\">30</div>"));
        assert!(html.contains("Gerado em 01/06/2025 08:30"));
        assert!(html.contains("Agenda do mês — Junho / 2025"));
    }

    #[test]
    fn cards_follow_filtered_order_and_escape_text() {
        let mut first = Event::all_day("Reunião <interna>", "2025-06-02");
        first.link = Some("https://calendar.example/e?id=1&x=2".to_string());
        first.description = Some("1 &lt; 2\nfim".to_string());
        let outside = Event::all_day("Maio", "2025-05-30");
        let second = Event::all_day("Visita", "2025-06-10");

        let events = vec![first, outside, second];
        let options = ExportOptions::new(generated_at());
        let document = build_month_document(&events, june(), &options);

        let titles = document
            .events
            .iter()
            .map(|r| r.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, vec!["Reunião <interna>", "Visita"]);

        let html = document.to_html().expect("render html");
        assert!(html.contains("Reunião &lt;interna&gt;"));
        assert!(!html.contains("<interna>"));
        assert!(html.contains("href=\"https://calendar.example/e?id=1&amp;x=2\""));
        assert!(html.contains("<div class=\"description\">1 &lt; 2<br>\nfim</div>"));
        assert!(html.contains("<span class=\"range\">02/06/2025</span>"));
        assert!(html.contains("Abrir no Google Calendar"));
        assert!(!html.contains(NO_EVENTS));
        assert!(html.find("Reunião").unwrap_or(usize::MAX) < html.find("Visita").unwrap_or(0));
    }

    #[test]
    fn team_section_follows_options() {
        let mut event = Event::all_day("Visita", "2025-06-10");
        event.description = Some("👥 Equipe:\n• Ana\n• Bruno".to_string());
        let events = vec![event];

        let options = ExportOptions::new(generated_at());
        let document = build_month_document(&events, june(), &options);
        let team = document.team.as_ref().expect("team summary");
        assert_eq!(team.heading, "Participantes em eventos: 2");
        let html = document.to_html().expect("render html");
        assert!(html.contains("Resumo da Equipe"));
        assert!(html.contains("<br>• Ana<br>• Bruno"));

        let mut hidden = ExportOptions::new(generated_at());
        hidden.team = false;
        let document = build_month_document(&events, june(), &hidden);
        assert!(document.team.is_none());
        let html = document.to_html().expect("render html");
        assert!(!html.contains("Resumo da Equipe"));
    }

    #[test]
    fn logo_is_embedded_as_data_uri() {
        let png = [0x89_u8, b'P', b'N', b'G'];
        let mut options = ExportOptions::new(generated_at());
        options.logo_png = Some(&png);
        let document = build_month_document(&[], june(), &options);
        assert_eq!(
            document.logo_data_uri.as_deref(),
            Some("data:image/png;base64,iVBORw==")
        );
        let html = document.to_html().expect("render html");
        assert!(html.contains("<img src=\"data:image/png;base64,iVBORw==\""));
    }

    #[test]
    fn default_output_name_is_zero_padded() {
        let march = MonthRef::new(2025, 3).expect("valid month");
        assert_eq!(default_file_name(march), "agenda_2025_03.html");
        assert_eq!(
            resolve_output_path(None, Path::new("out"), march),
            PathBuf::from("out/agenda_2025_03.html")
        );
    }

    #[test]
    fn writes_document_atomically() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("agenda.html");
        write_document(&path, "<html></html>").expect("write document");
        assert_eq!(
            std::fs::read_to_string(&path).expect("read back"),
            "<html></html>"
        );
    }
}
