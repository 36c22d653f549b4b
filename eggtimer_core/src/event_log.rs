//! JSON Lines event log for flow event persistence.
//!
//! Flow events are appended to a JSONL file. Updates and removals rewrite the
//! file through a temp file and an atomic rename. Every access holds the
//! log's sidecar [`LockFile`], so appends never land in a file that a
//! concurrent rewrite has already replaced.

use crate::lock::LockFile;
use crate::{Error, FlowEvent, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Read side of the persistence layer
pub trait EventSource {
    /// Every stored flow event, in storage order
    fn all_events(&self) -> Result<Vec<FlowEvent>>;

    /// All flow events of a user, in storage order
    fn events_for(&self, user_id: &str) -> Result<Vec<FlowEvent>> {
        Ok(self
            .all_events()?
            .into_iter()
            .filter(|e| e.user_id == user_id)
            .collect())
    }

    /// First-day events of a user, ascending by timestamp
    fn first_day_events(&self, user_id: &str) -> Result<Vec<FlowEvent>> {
        let mut events: Vec<FlowEvent> = self
            .events_for(user_id)?
            .into_iter()
            .filter(|e| e.first_day)
            .collect();
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(events)
    }

    fn find(&self, id: Uuid) -> Result<Option<FlowEvent>> {
        Ok(self.all_events()?.into_iter().find(|e| e.id == id))
    }
}

/// Write side of the persistence layer
pub trait EventSink {
    fn append(&mut self, event: &FlowEvent) -> Result<()>;

    /// Replace the stored event with the same id, returning the previous one
    fn update(&mut self, event: &FlowEvent) -> Result<FlowEvent>;

    /// Remove one of `user_id`'s events, returning what was removed.
    ///
    /// An id owned by another user is reported as not found.
    fn remove(&mut self, user_id: &str, id: Uuid) -> Result<FlowEvent>;
}

impl EventSource for [FlowEvent] {
    fn all_events(&self) -> Result<Vec<FlowEvent>> {
        Ok(self.to_vec())
    }
}

impl EventSource for Vec<FlowEvent> {
    fn all_events(&self) -> Result<Vec<FlowEvent>> {
        self.as_slice().all_events()
    }
}

impl EventSink for Vec<FlowEvent> {
    fn append(&mut self, event: &FlowEvent) -> Result<()> {
        self.push(event.clone());
        Ok(())
    }

    fn update(&mut self, event: &FlowEvent) -> Result<FlowEvent> {
        let slot = self
            .iter_mut()
            .find(|e| e.id == event.id)
            .ok_or_else(|| Error::NotFound(format!("flow event {}", event.id)))?;
        Ok(std::mem::replace(slot, event.clone()))
    }

    fn remove(&mut self, user_id: &str, id: Uuid) -> Result<FlowEvent> {
        let index = self
            .iter()
            .position(|e| e.id == id && e.user_id == user_id)
            .ok_or_else(|| Error::NotFound(format!("flow event {} for {}", id, user_id)))?;
        Ok(Vec::remove(self, index))
    }
}

/// JSONL-backed event log with file locking
pub struct JsonlEventLog {
    path: PathBuf,
}

impl JsonlEventLog {
    /// Create an event log for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `f` to the full event list and atomically write the result back
    fn rewrite<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Vec<FlowEvent>) -> Result<T>,
    {
        let _lock = LockFile::exclusive(&self.path)?;

        let mut events = read_unlocked(&self.path)?;
        let outcome = f(&mut events)?;

        let dir = self
            .path
            .parent()
            .ok_or_else(|| Error::Other("event log path missing parent".into()))?;
        let temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            for event in &events {
                serde_json::to_writer(&mut writer, event)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Rewrote event log with {} events", events.len());
        Ok(outcome)
    }
}

impl EventSink for JsonlEventLog {
    fn append(&mut self, event: &FlowEvent) -> Result<()> {
        let _lock = LockFile::exclusive(&self.path)?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        let mut line = Vec::new();
        if ends_mid_line(&mut file)? {
            tracing::warn!("Event log {:?} ends mid-line, starting a new line", self.path);
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, event)?;
        line.push(b'\n');

        file.write_all(&line)?;
        file.flush()?;

        tracing::debug!("Appended flow event {} to log", event.id);
        Ok(())
    }

    fn update(&mut self, event: &FlowEvent) -> Result<FlowEvent> {
        let previous = self.rewrite(|events| events.update(event))?;
        tracing::info!("Updated flow event {}", event.id);
        Ok(previous)
    }

    fn remove(&mut self, user_id: &str, id: Uuid) -> Result<FlowEvent> {
        let removed = self.rewrite(|events| EventSink::remove(events, user_id, id))?;
        tracing::info!("Removed flow event {}", id);
        Ok(removed)
    }
}

impl EventSource for JsonlEventLog {
    fn all_events(&self) -> Result<Vec<FlowEvent>> {
        read_events(&self.path)
    }
}

/// True when a non-empty file lacks a trailing newline
fn ends_mid_line(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Read all flow events from a log file
pub fn read_events(path: &Path) -> Result<Vec<FlowEvent>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let _lock = LockFile::shared(path)?;
    let events = read_unlocked(path)?;
    tracing::debug!("Read {} flow events from log", events.len());
    Ok(events)
}

/// Parse the log without taking its lock; a missing file is empty
fn read_unlocked(path: &Path) -> Result<Vec<FlowEvent>> {
    match File::open(path) {
        Ok(file) => parse_lines(BufReader::new(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

fn parse_lines(reader: impl BufRead) -> Result<Vec<FlowEvent>> {
    let mut events = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<FlowEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::warn!("Failed to parse flow event at line {}: {}", line_num + 1, e);
            }
        }
    }

    Ok(events)
}
