//! Cycle history extraction.
//!
//! A user's cycle history is the ascending sequence of their first-day flow
//! events. Cycle lengths are the whole-day gaps between consecutive
//! first days, measured on calendar dates in the user's timezone.

use crate::{Error, FlowEvent, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::BTreeMap;

/// Ordered first-day events for one user, with their cycle lengths
#[derive(Clone, Debug)]
pub struct CycleHistory {
    user_id: String,
    timezone: FixedOffset,
    first_days: Vec<FlowEvent>,
    cycle_lengths: Vec<i64>,
}

impl CycleHistory {
    /// Build a history from an arbitrary set of flow events.
    ///
    /// Keeps only this user's first-day events and sorts them by timestamp.
    pub fn from_events(
        user_id: &str,
        events: impl IntoIterator<Item = FlowEvent>,
        timezone: FixedOffset,
    ) -> Self {
        let mut first_days: Vec<FlowEvent> = events
            .into_iter()
            .filter(|e| e.first_day && e.user_id == user_id)
            .collect();
        first_days.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let cycle_lengths = derive_cycle_lengths(&first_days, timezone);
        tracing::debug!(
            "Extracted {} first days ({} cycles) for {}",
            first_days.len(),
            cycle_lengths.len(),
            user_id
        );

        Self {
            user_id: user_id.to_string(),
            timezone,
            first_days,
            cycle_lengths,
        }
    }

    /// Build a history from first-day events a persistence layer already ordered.
    ///
    /// Fails with [`Error::InvalidHistory`] instead of repairing bad input.
    pub fn from_ordered(
        user_id: &str,
        first_days: Vec<FlowEvent>,
        timezone: FixedOffset,
    ) -> Result<Self> {
        validate_ordered(user_id, &first_days)?;
        let cycle_lengths = derive_cycle_lengths(&first_days, timezone);

        Ok(Self {
            user_id: user_id.to_string(),
            timezone,
            first_days,
            cycle_lengths,
        })
    }

    /// Like [`CycleHistory::from_ordered`], reusing previously computed cycle lengths
    pub fn with_cached_lengths(
        user_id: &str,
        first_days: Vec<FlowEvent>,
        timezone: FixedOffset,
        cycle_lengths: Vec<i64>,
    ) -> Result<Self> {
        validate_ordered(user_id, &first_days)?;
        if cycle_lengths.len() != first_days.len().saturating_sub(1) {
            return Err(Error::InvalidHistory(format!(
                "{} cached cycle lengths do not match {} first days",
                cycle_lengths.len(),
                first_days.len()
            )));
        }

        Ok(Self {
            user_id: user_id.to_string(),
            timezone,
            first_days,
            cycle_lengths,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn timezone(&self) -> FixedOffset {
        self.timezone
    }

    /// First-day events, oldest first
    pub fn first_days(&self) -> &[FlowEvent] {
        &self.first_days
    }

    /// One length per adjacent pair of first days
    pub fn cycle_lengths(&self) -> &[i64] {
        &self.cycle_lengths
    }

    /// Calendar date of an instant in this history's timezone
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        local_date(at, self.timezone)
    }

    /// Most recent first day in the whole history
    pub fn latest(&self) -> Option<&FlowEvent> {
        self.first_days.last()
    }

    /// Latest first day at or before `at`
    pub fn previous_period(&self, at: DateTime<Utc>) -> Option<&FlowEvent> {
        self.first_days.iter().rev().find(|e| e.timestamp <= at)
    }

    /// Earliest first day at or after `at`
    pub fn next_period(&self, at: DateTime<Utc>) -> Option<&FlowEvent> {
        self.first_days.iter().find(|e| e.timestamp >= at)
    }

    /// How often each cycle length occurs, shortest length first
    pub fn frequency(&self) -> Vec<(i64, usize)> {
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for &length in &self.cycle_lengths {
            *counts.entry(length).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }

    /// Start date of each completed cycle paired with its length
    pub fn length_history(&self) -> Vec<(NaiveDate, i64)> {
        self.first_days
            .iter()
            .zip(self.cycle_lengths.iter())
            .map(|(event, &length)| (self.local_date(event.timestamp), length))
            .collect()
    }
}

/// Calendar date of an instant in the given timezone
pub fn local_date(at: DateTime<Utc>, timezone: FixedOffset) -> NaiveDate {
    at.with_timezone(&timezone).date_naive()
}

fn derive_cycle_lengths(first_days: &[FlowEvent], timezone: FixedOffset) -> Vec<i64> {
    first_days
        .windows(2)
        .map(|w| {
            let start = local_date(w[0].timestamp, timezone);
            let end = local_date(w[1].timestamp, timezone);
            (end - start).num_days()
        })
        .collect()
}

fn validate_ordered(user_id: &str, first_days: &[FlowEvent]) -> Result<()> {
    for (i, event) in first_days.iter().enumerate() {
        if event.user_id != user_id {
            return Err(Error::InvalidHistory(format!(
                "event {} belongs to {}, expected {}",
                event.id, event.user_id, user_id
            )));
        }
        if !event.first_day {
            return Err(Error::InvalidHistory(format!(
                "event {} is not a first-day event",
                event.id
            )));
        }
        if i > 0 && event.timestamp < first_days[i - 1].timestamp {
            return Err(Error::InvalidHistory(format!(
                "event {} at {} precedes its predecessor at {}",
                event.id,
                event.timestamp,
                first_days[i - 1].timestamp
            )));
        }
    }
    Ok(())
}
