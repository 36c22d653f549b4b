//! Application service tying persistence, cache and engine together.
//!
//! Every write goes through [`StatisticsService`], which invalidates the
//! user's cached cycle lengths and refreshes their stored averages before
//! returning. Reads reuse cached cycle lengths when available.

use crate::cache::CycleLengthCache;
use crate::engine::{CycleStatistics, EngineParams};
use crate::event_log::{EventSink, EventSource};
use crate::history::CycleHistory;
use crate::stats_store::{StoredStatistics, UserStatistics};
use crate::{CycleReference, CycleStatisticsResult, FlowEvent, Result};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};
use std::path::PathBuf;
use uuid::Uuid;

/// Outcome of a bulk import
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Events whose id was already stored, or repeated within the batch
    pub skipped: usize,
}

/// Statistics service over an event store
pub struct StatisticsService<S> {
    store: S,
    params: EngineParams,
    cache: CycleLengthCache,
    statistics_path: Option<PathBuf>,
}

impl<S> StatisticsService<S>
where
    S: EventSource + EventSink,
{
    pub fn new(store: S, params: EngineParams) -> Self {
        Self {
            store,
            params,
            cache: CycleLengthCache::new(),
            statistics_path: None,
        }
    }

    /// Persist recomputed averages to this file on every write
    pub fn with_statistics_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.statistics_path = Some(path.into());
        self
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &CycleLengthCache {
        &self.cache
    }

    /// Record a new flow event
    pub fn record_event(&mut self, event: &FlowEvent) -> Result<UserStatistics> {
        self.store.append(event)?;
        self.invalidate_and_recompute(&event.user_id)
    }

    /// Replace an existing flow event.
    ///
    /// When the event changes owner, both users are recomputed; the returned
    /// statistics are the new owner's.
    pub fn update_event(&mut self, event: &FlowEvent) -> Result<UserStatistics> {
        let previous = self.store.update(event)?;
        if previous.user_id != event.user_id {
            self.invalidate_and_recompute(&previous.user_id)?;
        }
        self.invalidate_and_recompute(&event.user_id)
    }

    /// Delete one of `user_id`'s flow events
    pub fn remove_event(&mut self, user_id: &str, id: Uuid) -> Result<FlowEvent> {
        let removed = self.store.remove(user_id, id)?;
        self.invalidate_and_recompute(&removed.user_id)?;
        Ok(removed)
    }

    /// Append events whose ids are not stored yet, recomputing each affected
    /// user once. Importing the same events again is a no-op.
    pub fn import_events(&mut self, events: &[FlowEvent]) -> Result<ImportSummary> {
        let mut known: HashSet<Uuid> = self.store.all_events()?.iter().map(|e| e.id).collect();
        let mut users: BTreeSet<&str> = BTreeSet::new();
        let mut summary = ImportSummary::default();

        for event in events {
            if !known.insert(event.id) {
                tracing::debug!("Skipping flow event {}: already stored", event.id);
                summary.skipped += 1;
                continue;
            }
            self.store.append(event)?;
            users.insert(&event.user_id);
            summary.imported += 1;
        }

        for user_id in users {
            self.invalidate_and_recompute(user_id)?;
        }
        if summary.skipped > 0 {
            tracing::info!("Skipped {} flow events already stored", summary.skipped);
        }
        Ok(summary)
    }

    /// Drop cached values for a user and refresh their stored averages.
    ///
    /// Call after any flow event write that bypassed this service.
    pub fn invalidate_and_recompute(&mut self, user_id: &str) -> Result<UserStatistics> {
        self.cache.invalidate(user_id);

        let history = self.history(user_id)?;
        let engine = CycleStatistics::new(&history, self.params);
        let stats = UserStatistics {
            average_cycle_length: engine.average_cycle_length(),
            all_time_average_cycle_length: engine.all_time_average_cycle_length(),
            updated_at: Utc::now(),
        };

        if let Some(path) = &self.statistics_path {
            StoredStatistics::record(path, user_id, &stats)?;
        }

        tracing::info!(
            "Recomputed statistics for {}: average {}, all-time {}",
            user_id,
            stats.average_cycle_length,
            stats.all_time_average_cycle_length
        );
        Ok(stats)
    }

    /// Cycle history for a user, using cached cycle lengths when present
    pub fn history(&mut self, user_id: &str) -> Result<CycleHistory> {
        let first_days = self.store.first_day_events(user_id)?;

        if let Some(lengths) = self.cache.get(user_id).map(<[i64]>::to_vec) {
            return CycleHistory::with_cached_lengths(
                user_id,
                first_days,
                self.params.timezone,
                lengths,
            );
        }

        let history = CycleHistory::from_ordered(user_id, first_days, self.params.timezone)?;
        self.cache.insert(user_id, history.cycle_lengths().to_vec());
        Ok(history)
    }

    /// Full statistics for a user at `now`
    pub fn statistics(
        &mut self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CycleStatisticsResult> {
        let history = self.history(user_id)?;
        Ok(CycleStatistics::new(&history, self.params).compute(now))
    }

    /// Calendar start date and cycle day for a reference instant
    pub fn reference(
        &mut self,
        user_id: &str,
        min_timestamp: DateTime<Utc>,
    ) -> Result<Option<CycleReference>> {
        let history = self.history(user_id)?;
        Ok(CycleStatistics::new(&history, self.params).reference(min_timestamp))
    }
}
