//! Fixed-date holidays observed in Maceió.

use chrono::NaiveDate;

use crate::datetime::MonthRef;
use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HolidayKind {
    National,
    State,
    Municipal,
}

impl HolidayKind {
    pub fn label(self) -> &'static str {
        match self {
            HolidayKind::National => "Nacional",
            HolidayKind::State => "Estadual",
            HolidayKind::Municipal => "Municipal",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            HolidayKind::National => "#ff6b6b",
            HolidayKind::State => "#4ecdc4",
            HolidayKind::Municipal => "#45b7d1",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FixedHoliday {
    month: u32,
    day: u32,
    name: &'static str,
    kind: HolidayKind,
}

const fn fixed(month: u32, day: u32, name: &'static str, kind: HolidayKind) -> FixedHoliday {
    FixedHoliday { month, day, name, kind }
}

const HOLIDAYS: [FixedHoliday; 17] = [
    fixed(1, 1, "Confraternização Universal", HolidayKind::National),
    fixed(4, 21, "Tiradentes", HolidayKind::National),
    fixed(5, 1, "Dia Mundial do Trabalho", HolidayKind::National),
    fixed(9, 7, "Independência do Brasil", HolidayKind::National),
    fixed(10, 12, "Nossa Senhora Aparecida", HolidayKind::National),
    fixed(11, 2, "Finados", HolidayKind::National),
    fixed(11, 15, "Proclamação da República", HolidayKind::National),
    fixed(11, 20, "Consciência Negra", HolidayKind::National),
    fixed(12, 25, "Natal", HolidayKind::National),
    fixed(6, 24, "São João", HolidayKind::State),
    fixed(6, 29, "São Pedro", HolidayKind::State),
    fixed(9, 16, "Emancipação Política de Alagoas", HolidayKind::State),
    fixed(11, 30, "Dia Estadual do Evangélico", HolidayKind::State),
    fixed(4, 18, "Sexta-feira da Paixão", HolidayKind::Municipal),
    fixed(6, 19, "Corpus Christi", HolidayKind::Municipal),
    fixed(8, 27, "Nossa Senhora dos Prazeres", HolidayKind::Municipal),
    fixed(12, 8, "Nossa Senhora da Conceição", HolidayKind::Municipal),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: &'static str,
    pub kind: HolidayKind,
}

impl Holiday {
    pub fn to_event(&self) -> Event {
        let mut event = Event::all_day(
            format!("🎉 {}", self.name),
            self.date.format("%Y-%m-%d").to_string(),
        );
        event.description = Some(format!("Feriado {}", self.kind.label().to_lowercase()));
        event.custom_color = Some(self.kind.color().to_string());
        event
    }
}

/// Holidays falling in `month`, by date.
pub fn holidays_in_month(month: MonthRef) -> Vec<Holiday> {
    let mut found = HOLIDAYS
        .iter()
        .filter(|h| h.month == month.month())
        .filter_map(|h| {
            NaiveDate::from_ymd_opt(month.year(), h.month, h.day).map(|date| Holiday {
                date,
                name: h.name,
                kind: h.kind,
            })
        })
        .collect::<Vec<_>>();
    found.sort_by_key(|h| (h.date, h.kind));
    found
}

pub fn holiday_events(month: MonthRef) -> Vec<Event> {
    holidays_in_month(month).iter().map(Holiday::to_event).collect()
}
