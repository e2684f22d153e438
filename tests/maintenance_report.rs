use chrono::{NaiveDate, NaiveDateTime};
use property_report::app::{ReportApplication, ReportError, ReportSettings};
use property_report::workflows::maintenance::render::{
    Highlight, HtmlDocument, OutlineDocument, Typography,
};
use property_report::workflows::maintenance::{
    FileStore, InMemoryPropertyStore, LoadBehavior, MonitoredItem, Property, PropertyStore,
    ReportModel, StorageError,
};
use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn at(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .expect("valid date")
        .and_hms_opt(0, 0, 0)
        .expect("valid time")
}

fn boiler_model() -> ReportModel {
    ReportModel::new(vec![Property::with_items(
        "123 Main St",
        vec![MonitoredItem::new(
            "Boiler service",
            at(2024, 1, 1),
            at(2024, 6, 1),
            at(2024, 7, 1),
        )],
    )])
}

fn settings_at(as_of: NaiveDateTime) -> ReportSettings {
    ReportSettings {
        load_timeout: Duration::from_millis(200),
        as_of: Some(as_of),
        ..ReportSettings::default()
    }
}

fn next_action_highlight(as_of: NaiveDateTime) -> Option<Highlight> {
    let store = Arc::new(InMemoryPropertyStore::immediate(boiler_model()));
    let app = ReportApplication::new(store, settings_at(as_of));
    let run = app
        .generate(|| Ok(OutlineDocument::new()))
        .expect("report generated");

    let tables = run.document.tables();
    assert_eq!(tables.len(), 1, "one table for the single property");
    let row = &tables[0].rows[0];
    assert_eq!(row[0].text, "Boiler service");
    assert_eq!(row[1].text, "01/01/2024");
    assert_eq!(row[2].text, "01/06/2024");
    assert_eq!(row[3].text, "01/07/2024");
    assert!(row[..3].iter().all(|cell| cell.highlight.is_none()));
    row[3].highlight
}

#[test]
fn past_next_action_is_flagged_danger() {
    assert_eq!(next_action_highlight(at(2024, 8, 1)), Some(Highlight::Danger));
}

#[test]
fn notice_window_is_flagged_warning() {
    assert_eq!(
        next_action_highlight(at(2024, 6, 15)),
        Some(Highlight::Warning)
    );
}

#[test]
fn future_deadlines_are_not_highlighted() {
    assert_eq!(next_action_highlight(at(2024, 1, 15)), None);
}

#[test]
fn load_timeout_leaves_no_report_file() {
    let dir = TempDir::new().expect("temp dir");
    let output = dir.path().join("property.html");
    let store = Arc::new(InMemoryPropertyStore::new(
        boiler_model(),
        LoadBehavior::Never,
    ));
    let app = ReportApplication::new(store, settings_at(at(2024, 8, 1)));

    let err = app
        .generate(|| HtmlDocument::create(&output, Typography::new("Helvetica")?))
        .expect_err("load never completes");

    assert!(matches!(err, ReportError::LoadTimeout { .. }));
    assert!(!output.exists(), "timed out run must not write a report");
    assert!(
        fs::read_dir(dir.path()).expect("dir readable").next().is_none(),
        "partial output is removed"
    );
}

#[test]
fn delayed_load_within_timeout_completes() {
    let store = Arc::new(InMemoryPropertyStore::new(
        boiler_model(),
        LoadBehavior::Delayed(Duration::from_millis(20)),
    ));
    let mut settings = settings_at(at(2024, 8, 1));
    settings.load_timeout = Duration::from_secs(2);
    let app = ReportApplication::new(store, settings);

    let run = app
        .generate(|| Ok(OutlineDocument::new()))
        .expect("report generated");
    assert_eq!(run.summary.overdue, 1);
}

#[test]
fn store_completing_after_timeout_is_harmless() {
    let store = Arc::new(InMemoryPropertyStore::new(
        boiler_model(),
        LoadBehavior::Delayed(Duration::from_millis(300)),
    ));
    let mut settings = settings_at(at(2024, 8, 1));
    settings.load_timeout = Duration::from_millis(50);
    let app = ReportApplication::new(Arc::clone(&store), settings);

    let err = app
        .generate(|| Ok(OutlineDocument::new()))
        .expect_err("load outlasts the wait");
    assert!(matches!(err, ReportError::LoadTimeout { .. }));

    thread::sleep(Duration::from_millis(600));
    let model = store
        .loaded_model()
        .expect("late load still publishes its snapshot");
    assert_eq!(model.properties()[0].label, "123 Main St");
}

#[test]
fn json_file_accepts_mixed_timestamp_forms() {
    let dir = TempDir::new().expect("temp dir");
    let data = dir.path().join("properties.json");
    fs::write(
        &data,
        r#"{"properties":[
            {"label":"123 Main St","items":[
                {"description":"Boiler service",
                 "last_action_performed":"2024-01-01",
                 "time_for_next_notice":"2024-06-01 00:00:00",
                 "time_for_next_action":"2024-07-01T00:00:00Z"}]},
            {"label":"4 Vacant Lot","items":[]}
        ]}"#,
    )
    .expect("data written");

    let store = Arc::new(FileStore::open(&data).expect("store opens"));
    let mut settings = settings_at(at(2024, 8, 1));
    settings.load_timeout = Duration::from_secs(5);
    let app = ReportApplication::new(store, settings);

    let run = app
        .generate(|| Ok(OutlineDocument::new()))
        .expect("report generated");
    assert_eq!(run.document.headings(), vec!["123 Main St", "4 Vacant Lot"]);
    let row = &run.document.tables()[0].rows[0];
    assert_eq!(row[1].text, "01/01/2024");
    assert_eq!(row[2].text, "01/06/2024");
    assert_eq!(row[3].text, "01/07/2024");
    assert_eq!(row[3].highlight, Some(Highlight::Danger));
}

#[test]
fn each_property_gets_a_table_separated_by_breaks() {
    let properties: Vec<Property> = (0..4)
        .map(|index| {
            let items = (0..index)
                .map(|n| {
                    MonitoredItem::new(
                        format!("Check {n}"),
                        at(2024, 1, 1),
                        at(2024, 9, 1),
                        at(2024, 10, 1),
                    )
                })
                .collect();
            Property::with_items(format!("{} High St", index + 1), items)
        })
        .collect();
    let store = Arc::new(InMemoryPropertyStore::immediate(ReportModel::new(properties)));
    let app = ReportApplication::new(store, settings_at(at(2024, 2, 1)));

    let run = app
        .generate(|| Ok(OutlineDocument::new()))
        .expect("report generated");

    let rows: Vec<usize> = run
        .document
        .tables()
        .iter()
        .map(|table| table.row_count())
        .collect();
    assert_eq!(rows, vec![1, 2, 3, 4]);
    assert_eq!(run.document.section_breaks(), 3);
    assert_eq!(run.summary.properties, 4);
    assert_eq!(run.summary.items, 6);
}

#[test]
fn csv_file_produces_html_report() {
    let dir = TempDir::new().expect("temp dir");
    let data = dir.path().join("properties.csv");
    fs::write(
        &data,
        "Property,Description,Last Action,Next Notice,Next Action\n\
         123 Main St,Boiler service,2024-01-01,2024-06-01,2024-07-01\n\
         9 Elm Rd,Gutter clearance,2024-02-01,2024-06-18,2024-06-20\n\
         4 Vacant Lot,,,,\n\
         123 Main St,Gas safety check,2024-01-10,2024-12-01,2025-01-10\n",
    )
    .expect("data written");
    let output = dir.path().join("property.html");

    let store = Arc::new(FileStore::open(&data).expect("store opens"));
    let mut settings = settings_at(at(2024, 6, 15));
    settings.load_timeout = Duration::from_secs(5);
    let app = ReportApplication::new(store, settings);

    let run = app
        .generate(|| HtmlDocument::create(&output, Typography::new("Helvetica")?))
        .expect("report generated");
    assert_eq!(run.summary.properties, 3);
    assert_eq!(run.summary.items, 3);
    assert_eq!(run.summary.notice_due, 1);
    assert_eq!(run.summary.overdue, 0);
    drop(run);

    let html = fs::read_to_string(&output).expect("report written");
    let main_st = html.find("123 Main St").expect("first property heading");
    let elm = html.find("9 Elm Rd").expect("second property heading");
    let vacant = html.find("4 Vacant Lot").expect("third property heading");
    assert!(main_st < elm && elm < vacant, "storage order is preserved");
    assert_eq!(html.matches("class=\"page-break\"").count(), 2);
    assert!(html.contains("<td class=\"normal warning\">01/07/2024</td>"));
    assert!(html.contains("<td class=\"normal\">20/06/2024</td>"));

    if let Ok(store) = Arc::try_unwrap(app.into_store()) {
        store.shutdown();
    }
}

#[test]
fn malformed_data_file_is_a_storage_error() {
    let dir = TempDir::new().expect("temp dir");
    let data = dir.path().join("properties.csv");
    fs::write(
        &data,
        "Property,Description,Last Action,Next Notice,Next Action\n\
         123 Main St,Boiler service,soon,2024-06-01,2024-07-01\n",
    )
    .expect("data written");

    let store = Arc::new(FileStore::open(&data).expect("store opens"));
    let mut settings = settings_at(at(2024, 6, 15));
    settings.load_timeout = Duration::from_secs(5);
    let app = ReportApplication::new(store, settings);

    let err = app
        .generate(|| Ok(OutlineDocument::new()))
        .expect_err("bad timestamp surfaces");
    match err {
        ReportError::Storage(StorageError::LoadFailed(reason)) => {
            assert!(reason.contains("row 2"), "reason: {reason}");
            assert!(reason.contains("Last Action"), "reason: {reason}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
