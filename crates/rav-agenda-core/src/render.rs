use std::io::{self, IsTerminal, Write};

use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::grid::{DayCell, MonthGrid, WEEKDAY_LABELS_PT};
use crate::holidays::Holiday;
use crate::normalize::DisplayRecord;

const CELL_WIDTH: usize = 12;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            color: cfg.color()?,
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, records), fields(count = records.len()))]
    pub fn print_event_table(&self, records: &[DisplayRecord]) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_event_table(out, records)
    }

    pub fn write_event_table<W: Write>(
        &self,
        mut out: W,
        records: &[DisplayRecord],
    ) -> anyhow::Result<()> {
        if records.is_empty() {
            writeln!(out, "Nenhum evento para este mês.")?;
            return Ok(());
        }

        let headers = vec![
            "Data".to_string(),
            "Horário".to_string(),
            "Título".to_string(),
            "Local".to_string(),
            "Cor".to_string(),
        ];

        let rows = records
            .iter()
            .map(|record| {
                vec![
                    self.paint(&record.date_range(), "33"),
                    record.period.clone(),
                    record.title.clone(),
                    record.location.clone(),
                    record.color.clone(),
                ]
            })
            .collect::<Vec<_>>();

        write_table(&mut out, headers, rows)
    }

    #[tracing::instrument(skip(self, grid), fields(month = %grid.month()))]
    pub fn print_month_grid(&self, grid: &MonthGrid) -> anyhow::Result<()> {
        let out = io::stdout().lock();
        self.write_month_grid(out, grid)
    }

    /// Seven fixed-width columns; a day shows its number and as many pill
    /// lines as its busiest neighbour in the same week.
    pub fn write_month_grid<W: Write>(&self, mut out: W, grid: &MonthGrid) -> anyhow::Result<()> {
        let month = grid.month();
        writeln!(out, "{} {}", month.name_pt(), month.year())?;

        for label in WEEKDAY_LABELS_PT {
            write!(out, "{} ", pad(&self.paint(label, "1"), CELL_WIDTH))?;
        }
        writeln!(out)?;
        writeln!(out, "{}", "-".repeat((CELL_WIDTH + 1) * 7))?;

        for week in grid.weeks() {
            for cell in week {
                let text = match cell.day() {
                    Some(day) => format!("{day:>2}"),
                    None => String::new(),
                };
                write!(out, "{} ", pad(&text, CELL_WIDTH))?;
            }
            writeln!(out)?;

            let depth = week.iter().map(|cell| cell.pills().len()).max().unwrap_or(0);
            for line in 0..depth {
                for cell in week {
                    let text = match cell {
                        DayCell::Day { pills, .. } => pills
                            .get(line)
                            .map(|pill| truncate(&pill.label, CELL_WIDTH))
                            .unwrap_or_default(),
                        DayCell::Empty => String::new(),
                    };
                    write!(out, "{} ", pad(&self.paint(&text, "36"), CELL_WIDTH))?;
                }
                writeln!(out)?;
            }
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, holidays), fields(count = holidays.len()))]
    pub fn print_holidays(&self, holidays: &[Holiday]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        if holidays.is_empty() {
            writeln!(out, "Nenhum feriado neste mês.")?;
            return Ok(());
        }

        let headers = vec!["Data".to_string(), "Feriado".to_string(), "Tipo".to_string()];
        let rows = holidays
            .iter()
            .map(|holiday| {
                vec![
                    holiday.date.format("%d/%m/%Y").to_string(),
                    holiday.name.to_string(),
                    self.paint(holiday.kind.label(), "35"),
                ]
            })
            .collect();
        write_table(&mut out, headers, rows)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || text.is_empty() || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn pad(text: &str, width: usize) -> String {
    let visible = UnicodeWidthStr::width(strip_ansi(text).as_str());
    format!("{text}{}", " ".repeat(width.saturating_sub(visible)))
}

fn truncate(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{} ", pad(header, *width))?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            write!(writer, "{} ", pad(cell, *width))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}
