use std::fs;

use chrono::{NaiveDate, TimeZone, Utc};
use rav_agenda_core::cli::{ExportArgs, MonthArgs, SourceArgs};
use rav_agenda_core::commands::cmd_export;
use rav_agenda_core::config::Config;
use rav_agenda_core::datetime::MonthRef;
use rav_agenda_core::document::{ExportOptions, build_month_document};
use rav_agenda_core::event::{load_events, parse_events_json};
use tempfile::tempdir;

const EVENTS: &str = r#"{
  "items": [
    {
      "title": "Reunião de equipe",
      "start": "2025-06-02",
      "end": "2025-06-02",
      "allDay": true,
      "description": "<p>Pauta</p><p>👥 Equipe:</p><ul><li>Ana Souza</li><li>Bruno Lima</li></ul>",
      "extendedProps": { "colorId": "10", "location": "Sala 3" }
    },
    {
      "title": "Visita técnica",
      "start": "2025-06-02T09:00:00-03:00",
      "end": "2025-06-02T10:00:00-03:00",
      "extendedProps": {
        "start_time": "09:00",
        "end_time": "10:00",
        "html_link": "https://calendar.example/event?eid=abc",
        "attendees": ["ana@rav.gov", {"email": "carla@rav.gov"}]
      }
    },
    { "title": "Sem data", "start": 20250603 },
    { "title": "Julho", "start": "2025-07-01" },
    "not an event"
  ]
}"#;

#[test]
fn month_document_from_adapter_json() {
    let temp = tempdir().expect("tempdir");
    let events_path = temp.path().join("events.json");
    fs::write(&events_path, EVENTS).expect("write events");

    let events = load_events(&events_path).expect("load events");
    assert_eq!(events.len(), 4);

    let june = MonthRef::new(2025, 6).expect("valid month");
    let generated_at = NaiveDate::from_ymd_opt(2025, 6, 30)
        .and_then(|d| d.and_hms_opt(17, 45, 0))
        .expect("valid timestamp");
    let document = build_month_document(&events, june, &ExportOptions::new(generated_at));

    let titles = document
        .events
        .iter()
        .map(|record| record.title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["Reunião de equipe", "Visita técnica"]);

    let meeting = &document.events[0];
    assert_eq!(meeting.period, "Dia inteiro");
    assert_eq!(meeting.color, "#0b8043");
    assert_eq!(meeting.location, "Sala 3");

    let visit = &document.events[1];
    assert_eq!(visit.date, "02/06/2025");
    assert_eq!(visit.period, "09:00 - 10:00");
    assert_eq!(visit.attendees, "ana@rav.gov, carla@rav.gov");

    let day_two = document.grid.cell(2).expect("day two");
    assert_eq!(day_two.pills().len(), 2);
    assert_eq!(document.grid.pill_count(), 2);

    let team = document.team.as_ref().expect("team summary");
    assert_eq!(team.heading, "Participantes em eventos: 2");

    let html = document.to_html().expect("render html");
    assert!(html.contains("Gerado em 30/06/2025 17:45"));
    assert!(html.contains("Abrir no Google Calendar"));
    assert!(html.contains("Visita técnica — 09:00 - 10:00"));
    assert!(!html.contains("Julho"));
}

#[test]
fn export_command_honours_config_and_roster() {
    let temp = tempdir().expect("tempdir");
    let events_path = temp.path().join("events.json");
    fs::write(&events_path, EVENTS).expect("write events");

    let roster_path = temp.path().join("equipe.csv");
    fs::write(&roster_path, "NOME,EMAIL\nBruno Lima,bruno@rav.gov\nDavi,davi@rav.gov\n")
        .expect("write roster");

    let out_dir = temp.path().join("saida");
    let rc_path = temp.path().join("agendarc");
    fs::write(
        &rc_path,
        format!(
            "export.dir = {}\nexport.holidays = on\ncalendar.timezone = America/Maceio\n",
            out_dir.display()
        ),
    )
    .expect("write agendarc");

    let cfg = Config::load(Some(&rc_path)).expect("load config");
    let args = ExportArgs {
        source: SourceArgs {
            events: events_path,
            period: MonthArgs {
                month: Some(6),
                year: Some(2025),
            },
            holidays: false,
        },
        out: None,
        roster: Some(roster_path),
        logo: None,
    };
    let now = Utc
        .with_ymd_and_hms(2025, 6, 30, 20, 45, 0)
        .single()
        .expect("valid instant");

    let path = cmd_export(&cfg, &args, now).expect("export");
    assert_eq!(path, out_dir.join("agenda_2025_06.html"));

    let html = fs::read_to_string(&path).expect("read document");
    assert!(html.contains("Agenda do mês — Junho / 2025"));
    assert!(html.contains("🎉 Corpus Christi"));
    assert!(html.contains("Membros com eventos: 1<br>• Bruno Lima"));
    assert!(!html.contains("Davi"));

    let leftovers = fs::read_dir(&out_dir)
        .expect("read output dir")
        .filter_map(Result::ok)
        .count();
    assert_eq!(leftovers, 1);
}

#[test]
fn empty_month_exports_placeholder() {
    let temp = tempdir().expect("tempdir");
    let events_path = temp.path().join("events.json");
    fs::write(&events_path, "[]").expect("write events");
    let out = temp.path().join("vazio.html");

    let args = ExportArgs {
        source: SourceArgs {
            events: events_path,
            period: MonthArgs {
                month: Some(2),
                year: Some(2025),
            },
            holidays: false,
        },
        out: Some(out.clone()),
        roster: None,
        logo: None,
    };
    let now = Utc
        .with_ymd_and_hms(2025, 2, 10, 12, 0, 0)
        .single()
        .expect("valid instant");

    let path = cmd_export(&Config::default(), &args, now).expect("export");
    assert_eq!(path, out);

    let html = fs::read_to_string(&out).expect("read document");
    assert!(html.contains("Nenhum evento para este mês."));
    assert!(html.contains("Dados de equipe indisponíveis."));
    assert!(html.contains("<div class=\"day-number\">28</div>"));
}

#[test]
fn campaign_titles_take_their_palette_color() {
    let events = parse_events_json(
        r#"[
          {"title": "Campanha Maio Laranja", "start": "2025-05-10", "allDay": true},
          {"title": "Plantão", "start": "2025-05-11", "allDay": true}
        ]"#,
    )
    .expect("parse events");

    let may = MonthRef::new(2025, 5).expect("valid month");
    let generated_at = NaiveDate::from_ymd_opt(2025, 5, 31)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .expect("valid timestamp");
    let document = build_month_document(&events, may, &ExportOptions::new(generated_at));

    let colors = document
        .events
        .iter()
        .map(|record| record.color.as_str())
        .collect::<Vec<_>>();
    assert_eq!(colors, vec!["#fd7e14", "#3064ad"]);

    let pill = &document.grid.cell(10).expect("day ten").pills()[0];
    assert_eq!(pill.color, "#fd7e14");
}
