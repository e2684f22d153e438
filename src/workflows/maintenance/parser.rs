use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use std::io::Read;

use super::domain::{MonitoredItem, Property, ReportModel};
use super::storage::StorageError;

/// Data file layouts understood by the file-backed store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Csv,
    Json,
}

impl DataFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

pub(crate) fn parse_model<R: Read>(reader: R, format: DataFormat) -> Result<ReportModel, StorageError> {
    match format {
        DataFormat::Csv => parse_csv(reader),
        DataFormat::Json => parse_json(reader),
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    properties: Vec<SnapshotProperty>,
}

#[derive(Debug, Deserialize)]
struct SnapshotProperty {
    #[serde(default)]
    label: String,
    #[serde(default)]
    items: Vec<SnapshotItem>,
}

#[derive(Debug, Deserialize)]
struct SnapshotItem {
    #[serde(default)]
    description: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    last_action_performed: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    time_for_next_notice: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    time_for_next_action: Option<String>,
}

impl SnapshotItem {
    fn into_item(self, row: usize) -> Result<MonitoredItem, StorageError> {
        let last_action =
            required_timestamp(self.last_action_performed, "last_action_performed", row)?;
        let next_notice =
            required_timestamp(self.time_for_next_notice, "time_for_next_notice", row)?;
        let next_action =
            required_timestamp(self.time_for_next_action, "time_for_next_action", row)?;
        Ok(MonitoredItem::new(
            self.description,
            last_action,
            next_notice,
            next_action,
        ))
    }
}

/// JSON rows are numbered by item position across the whole file, starting
/// at 1; a missing label reports the property position instead.
fn parse_json<R: Read>(reader: R) -> Result<ReportModel, StorageError> {
    let snapshot: SnapshotFile = serde_json::from_reader(reader)?;
    let mut properties = Vec::with_capacity(snapshot.properties.len());
    let mut row = 0;

    for (index, entry) in snapshot.properties.into_iter().enumerate() {
        let label = entry.label.trim().to_string();
        if label.is_empty() {
            return Err(StorageError::MissingProperty { row: index + 1 });
        }

        let mut property = Property::new(label);
        for item in entry.items {
            row += 1;
            property.items.push(item.into_item(row)?);
        }
        properties.push(property);
    }

    Ok(ReportModel::new(properties))
}

#[derive(Debug, Deserialize)]
struct ItemRow {
    #[serde(rename = "Property")]
    property: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(
        rename = "Last Action",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    last_action: Option<String>,
    #[serde(
        rename = "Next Notice",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    next_notice: Option<String>,
    #[serde(
        rename = "Next Action",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    next_action: Option<String>,
}

impl ItemRow {
    fn is_placeholder(&self) -> bool {
        self.description.trim().is_empty()
            && self.last_action.is_none()
            && self.next_notice.is_none()
            && self.next_action.is_none()
    }

    fn into_item(self, row: usize) -> Result<MonitoredItem, StorageError> {
        let last_action = required_timestamp(self.last_action, "Last Action", row)?;
        let next_notice = required_timestamp(self.next_notice, "Next Notice", row)?;
        let next_action = required_timestamp(self.next_action, "Next Action", row)?;
        Ok(MonitoredItem::new(
            self.description,
            last_action,
            next_notice,
            next_action,
        ))
    }
}

fn parse_csv<R: Read>(reader: R) -> Result<ReportModel, StorageError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut properties: Vec<Property> = Vec::new();

    for (index, record) in csv_reader.deserialize::<ItemRow>().enumerate() {
        // header is line 1
        let row_number = index + 2;
        let row = record?;
        let label = row.property.trim().to_string();
        if label.is_empty() {
            return Err(StorageError::MissingProperty { row: row_number });
        }

        let position = match properties.iter().position(|property| property.label == label) {
            Some(position) => position,
            None => {
                properties.push(Property::new(label));
                properties.len() - 1
            }
        };

        if row.is_placeholder() {
            continue;
        }

        let item = row.into_item(row_number)?;
        properties[position].items.push(item);
    }

    Ok(ReportModel::new(properties))
}

fn required_timestamp(
    value: Option<String>,
    column: &'static str,
    row: usize,
) -> Result<NaiveDateTime, StorageError> {
    let raw = value.unwrap_or_default();
    parse_timestamp(&raw).ok_or(StorageError::InvalidTimestamp {
        row,
        column,
        value: raw,
    })
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Some(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}
