//! CSV import and export.
//!
//! Flow events can be exported to and imported from CSV, and a user's cycle
//! length history can be exported for charting elsewhere.

use crate::history::CycleHistory;
use crate::{ClotSize, CrampLevel, Error, FlowColor, FlowEvent, FlowLevel, Result};
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// CSV row format for flow events
#[derive(Debug, Serialize, Deserialize)]
struct EventRow {
    id: String,
    user_id: String,
    timestamp: String,
    first_day: bool,
    level: FlowLevel,
    color: FlowColor,
    clots: Option<ClotSize>,
    cramps: Option<CrampLevel>,
    comment: Option<String>,
}

impl From<&FlowEvent> for EventRow {
    fn from(event: &FlowEvent) -> Self {
        EventRow {
            id: event.id.to_string(),
            user_id: event.user_id.clone(),
            timestamp: event.timestamp.to_rfc3339(),
            first_day: event.first_day,
            level: event.level,
            color: event.color,
            clots: event.clots,
            cramps: event.cramps,
            comment: event.comment.clone(),
        }
    }
}

impl TryFrom<EventRow> for FlowEvent {
    type Error = Error;

    fn try_from(row: EventRow) -> Result<Self> {
        let id = if row.id.trim().is_empty() {
            Uuid::new_v4()
        } else {
            Uuid::parse_str(&row.id).map_err(|e| Error::Other(format!("Invalid UUID: {}", e)))?
        };

        let timestamp = DateTime::parse_from_rfc3339(&row.timestamp)
            .map_err(|e| Error::Other(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&Utc);

        let mut event = FlowEvent {
            id,
            user_id: row.user_id,
            timestamp,
            first_day: row.first_day,
            level: row.level,
            color: row.color,
            clots: row.clots,
            cramps: row.cramps,
            comment: None,
        };
        event.set_comment(row.comment.filter(|c| !c.is_empty()));
        Ok(event)
    }
}

/// One completed cycle in the exported history
#[derive(Debug, Serialize)]
struct CycleRow {
    start_date: String,
    cycle_length: i64,
}

/// Write flow events to a CSV file, replacing it
pub fn export_events(events: &[FlowEvent], path: &Path) -> Result<usize> {
    ensure_parent(path)?;
    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for event in events {
        writer.serialize(EventRow::from(event))?;
    }
    writer.flush()?;

    tracing::info!("Exported {} flow events to {:?}", events.len(), path);
    Ok(events.len())
}

/// Read flow events from a CSV file.
///
/// Rows that fail to parse are logged and skipped.
pub fn import_events(path: &Path) -> Result<Vec<FlowEvent>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut events = Vec::new();
    for (index, result) in reader.deserialize::<EventRow>().enumerate() {
        match result {
            Ok(row) => match FlowEvent::try_from(row) {
                Ok(event) => events.push(event),
                Err(e) => {
                    tracing::warn!("Skipping CSV row {}: {}", index + 1, e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to deserialize CSV row {}: {}", index + 1, e);
            }
        }
    }

    tracing::info!("Imported {} flow events from {:?}", events.len(), path);
    Ok(events)
}

/// Write a user's cycle start dates and lengths to a CSV file
pub fn export_cycle_history(history: &CycleHistory, path: &Path) -> Result<usize> {
    ensure_parent(path)?;
    let rows = history.length_history();

    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for (start, length) in &rows {
        writer.serialize(CycleRow {
            start_date: start.format("%Y-%m-%d").to_string(),
            cycle_length: *length,
        })?;
    }
    writer.flush()?;

    tracing::info!("Exported {} cycles to {:?}", rows.len(), path);
    Ok(rows.len())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
