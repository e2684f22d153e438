use chrono::NaiveDateTime;
use serde::Serialize;

/// Display category derived for a monitored item at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    Normal,
    NoticeDue,
    Overdue,
}

impl StatusCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::NoticeDue => "Notice Due",
            Self::Overdue => "Overdue",
        }
    }
}

/// A maintenance task tracked with its last completion and two future deadlines.
///
/// Callers are expected to keep `last_action_performed <= time_for_next_notice <=
/// time_for_next_action`; nothing here enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoredItem {
    pub description: String,
    pub last_action_performed: NaiveDateTime,
    pub time_for_next_notice: NaiveDateTime,
    pub time_for_next_action: NaiveDateTime,
}

impl MonitoredItem {
    pub fn new(
        description: impl Into<String>,
        last_action_performed: NaiveDateTime,
        time_for_next_notice: NaiveDateTime,
        time_for_next_action: NaiveDateTime,
    ) -> Self {
        Self {
            description: description.into(),
            last_action_performed,
            time_for_next_notice,
            time_for_next_action,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Property {
    pub label: String,
    pub items: Vec<MonitoredItem>,
}

impl Property {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            items: Vec::new(),
        }
    }

    pub fn with_items(label: impl Into<String>, items: Vec<MonitoredItem>) -> Self {
        Self {
            label: label.into(),
            items,
        }
    }

    pub fn items(&self) -> &[MonitoredItem] {
        &self.items
    }
}

/// Snapshot of every property produced by one load cycle, in storage order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReportModel {
    pub properties: Vec<Property>,
}

impl ReportModel {
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn item_count(&self) -> usize {
        self.properties
            .iter()
            .map(|property| property.items.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}
