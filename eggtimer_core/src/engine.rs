//! Cycle statistics and prediction engine.
//!
//! Everything here is a pure function of a [`CycleHistory`], the caller's
//! reference instant and [`EngineParams`]:
//! - Rolling and all-time average cycle length
//! - Descriptive statistics over all cycle lengths
//! - Current cycle length relative to "now"
//! - Start date / cycle day for an arbitrary reference point
//! - Projected ovulations and periods for the next cycles

use crate::history::CycleHistory;
use crate::{
    stats, Config, CycleReference, CycleStatisticsResult, EventType, PredictedEvent, Result,
};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};

/// Number of future cycles projected from the latest period
pub const PROJECTED_CYCLES: i64 = 3;

/// Scalars the engine needs besides the history itself
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineParams {
    pub luteal_phase_length: i64,
    pub averaging_window: usize,
    pub default_cycle_length: i64,
    pub timezone: FixedOffset,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            luteal_phase_length: 14,
            averaging_window: 6,
            default_cycle_length: 28,
            timezone: Utc.fix(),
        }
    }
}

impl EngineParams {
    /// Parameters for the configured user
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            luteal_phase_length: config.user.luteal_phase_length,
            averaging_window: config.statistics.averaging_window,
            default_cycle_length: config.statistics.default_cycle_length,
            timezone: config.user.timezone()?,
        })
    }
}

/// Derived statistics over one user's cycle history
#[derive(Clone, Debug)]
pub struct CycleStatistics<'a> {
    history: &'a CycleHistory,
    params: EngineParams,
}

impl<'a> CycleStatistics<'a> {
    pub fn new(history: &'a CycleHistory, params: EngineParams) -> Self {
        Self { history, params }
    }

    pub fn history(&self) -> &CycleHistory {
        self.history
    }

    /// Rounded mean of the most recent `averaging_window` cycles, or the default
    pub fn average_cycle_length(&self) -> i64 {
        stats::rolling_average(self.history.cycle_lengths(), self.params.averaging_window)
            .unwrap_or(self.params.default_cycle_length)
    }

    /// Rounded mean of every recorded cycle, or the default
    pub fn all_time_average_cycle_length(&self) -> i64 {
        stats::rounded_average(self.history.cycle_lengths())
            .unwrap_or(self.params.default_cycle_length)
    }

    /// Days since the latest period that started at or before `now`
    pub fn current_cycle_length(&self, now: DateTime<Utc>) -> Option<i64> {
        let previous = self.history.previous_period(now)?;
        let days = self.history.local_date(now) - self.history.local_date(previous.timestamp);
        Some(days.num_days())
    }

    /// Calendar anchor for `min_timestamp`.
    ///
    /// With a period on or before the reference point, the reference date is
    /// kept and the day is counted from that period (day 1 = first day).
    /// Without one, the earliest later period is shown as day 1. With no
    /// periods at all there is nothing to show.
    pub fn reference(&self, min_timestamp: DateTime<Utc>) -> Option<CycleReference> {
        let previous = self.history.previous_period(min_timestamp);
        let next = self.history.next_period(min_timestamp);

        if let Some(previous) = previous {
            let first_date = self.history.local_date(min_timestamp);
            let days = first_date - self.history.local_date(previous.timestamp);
            Some(CycleReference {
                first_date,
                first_day: days.num_days() + 1,
            })
        } else if let Some(next) = next {
            Some(CycleReference {
                first_date: self.history.local_date(next.timestamp),
                first_day: 1,
            })
        } else {
            tracing::debug!("No periods recorded for {}", self.history.user_id());
            None
        }
    }

    /// Projected ovulations and periods, interleaved, from the latest period.
    ///
    /// Uses the rolling average cycle length and ignores any reference instant.
    pub fn predicted_events(&self) -> Vec<PredictedEvent> {
        let Some(latest) = self.history.latest() else {
            return Vec::new();
        };

        let anchor = self.history.local_date(latest.timestamp);
        let average = self.average_cycle_length();
        let luteal = self.params.luteal_phase_length;

        let mut events = Vec::with_capacity(2 * PROJECTED_CYCLES as usize);
        for i in 1..=PROJECTED_CYCLES {
            let period_offset = i.checked_mul(average);
            let ovulation_offset = period_offset.and_then(|d| d.checked_sub(luteal));
            let (Some(ovulation), Some(period)) = (
                shift_days(anchor, ovulation_offset),
                shift_days(anchor, period_offset),
            ) else {
                tracing::warn!(
                    "Projection {} for {} is outside the calendar range, stopping",
                    i,
                    self.history.user_id()
                );
                break;
            };

            events.push(PredictedEvent {
                date: ovulation,
                event_type: EventType::Ovulation,
            });
            events.push(PredictedEvent {
                date: period,
                event_type: EventType::Period,
            });
        }
        events
    }

    /// All derived values for the reference instant `now`
    pub fn compute(&self, now: DateTime<Utc>) -> CycleStatisticsResult {
        let lengths = self.history.cycle_lengths();

        let result = CycleStatisticsResult {
            average_cycle_length: self.average_cycle_length(),
            all_time_average_cycle_length: self.all_time_average_cycle_length(),
            cycle_length_minimum: stats::minimum(lengths),
            cycle_length_maximum: stats::maximum(lengths),
            cycle_length_mean: stats::mean(lengths),
            cycle_length_median: stats::median(lengths),
            cycle_length_mode: stats::mode(lengths),
            cycle_length_standard_deviation: stats::standard_deviation(lengths),
            current_cycle_length: self.current_cycle_length(now),
            predicted_events: self.predicted_events(),
        };

        tracing::debug!(
            "Computed statistics for {}: {} cycles, average {}",
            self.history.user_id(),
            lengths.len(),
            result.average_cycle_length
        );

        result
    }
}

/// `date` moved by `days`, or `None` when either overflows
fn shift_days(date: NaiveDate, days: Option<i64>) -> Option<NaiveDate> {
    days.and_then(Duration::try_days)
        .and_then(|delta| date.checked_add_signed(delta))
}
