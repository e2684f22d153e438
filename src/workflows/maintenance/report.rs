use chrono::format::{Item, StrftimeItems};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt::Write as _;
use tracing::debug;

use super::domain::{MonitoredItem, Property, ReportModel, StatusCategory};
use super::render::{DocumentSink, Highlight, RenderError, TextStyle};

pub const DEFAULT_DATE_FORMAT: &str = "%d/%m/%Y";

pub const COLUMN_WEIGHTS: [f32; 4] = [4.0, 1.0, 1.0, 1.0];

pub const COLUMN_HEADERS: [&str; 4] = [
    "Description",
    "Last Action",
    "Next Notification",
    "Next Action",
];

/// Returns true when `format` is a strftime pattern a local timestamp can be
/// rendered with. Offset and zone specifiers parse but cannot format a
/// `NaiveDateTime`, so a sample is formatted as well.
pub fn is_valid_date_format(format: &str) -> bool {
    if format.trim().is_empty() {
        return false;
    }
    let items = StrftimeItems::new(format);
    if items.clone().any(|item| matches!(item, Item::Error)) {
        return false;
    }

    let Some(sample) = NaiveDate::from_ymd_opt(2024, 1, 31)
        .and_then(|date| date.and_hms_opt(13, 45, 30))
    else {
        return false;
    };
    let mut out = String::new();
    write!(out, "{}", sample.format_with_items(items)).is_ok()
}

impl StatusCategory {
    pub const fn highlight(self) -> Option<Highlight> {
        match self {
            Self::Overdue => Some(Highlight::Danger),
            Self::NoticeDue => Some(Highlight::Warning),
            Self::Normal => None,
        }
    }
}

/// Counts gathered while assembling one report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblySummary {
    pub properties: usize,
    pub items: usize,
    pub overdue: usize,
    pub notice_due: usize,
}

impl AssemblySummary {
    fn record(&mut self, status: StatusCategory) {
        self.items += 1;
        match status {
            StatusCategory::Overdue => self.overdue += 1,
            StatusCategory::NoticeDue => self.notice_due += 1,
            StatusCategory::Normal => {}
        }
    }
}

/// Emits one heading and table per property, judging every item against the
/// same instant.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    date_format: String,
    now: NaiveDateTime,
}

impl ReportAssembler {
    pub fn new(date_format: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            date_format: date_format.into(),
            now,
        }
    }

    pub fn starting_now(date_format: impl Into<String>) -> Self {
        Self::new(date_format, Local::now().naive_local())
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    pub fn assemble<S>(&self, model: &ReportModel, sink: &mut S) -> Result<AssemblySummary, RenderError>
    where
        S: DocumentSink + ?Sized,
    {
        let mut summary = AssemblySummary::default();

        for (index, property) in model.properties().iter().enumerate() {
            if index > 0 {
                sink.add_section_break()?;
            }
            debug!(property = %property.label, items = property.items().len(), "processing property");
            self.write_property(property, sink, &mut summary)?;
            summary.properties += 1;
        }

        Ok(summary)
    }

    fn write_property<S>(
        &self,
        property: &Property,
        sink: &mut S,
        summary: &mut AssemblySummary,
    ) -> Result<(), RenderError>
    where
        S: DocumentSink + ?Sized,
    {
        sink.add_heading(&property.label, TextStyle::Heading)?;
        sink.begin_table(&COLUMN_WEIGHTS)?;
        for header in COLUMN_HEADERS {
            sink.add_header_cell(header, TextStyle::Bold)?;
        }

        for item in property.items() {
            let status = item.status(self.now);
            debug!(item = %item.description, status = status.label(), "classified item");
            self.write_item(item, status, sink)?;
            summary.record(status);
        }

        sink.end_table()
    }

    fn write_item<S>(
        &self,
        item: &MonitoredItem,
        status: StatusCategory,
        sink: &mut S,
    ) -> Result<(), RenderError>
    where
        S: DocumentSink + ?Sized,
    {
        sink.add_data_cell(&item.description, TextStyle::Normal, None)?;
        sink.add_data_cell(
            &self.format_timestamp(item.last_action_performed)?,
            TextStyle::Normal,
            None,
        )?;
        sink.add_data_cell(
            &self.format_timestamp(item.time_for_next_notice)?,
            TextStyle::Normal,
            None,
        )?;
        sink.add_data_cell(
            &self.format_timestamp(item.time_for_next_action)?,
            TextStyle::Normal,
            status.highlight(),
        )
    }

    fn format_timestamp(&self, value: NaiveDateTime) -> Result<String, RenderError> {
        let mut out = String::new();
        write!(out, "{}", value.format(&self.date_format))?;
        Ok(out)
    }
}
