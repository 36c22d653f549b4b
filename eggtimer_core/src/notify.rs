//! Upcoming-period notices.
//!
//! Buckets the first projected period relative to "today" the way reminder
//! emails are chosen: overdue, due today, due within three days, ovulation
//! day, or nothing noteworthy yet.

use crate::CycleStatisticsResult;
use chrono::NaiveDate;
use std::fmt;

/// Days ahead that still count as "due soon"
pub const DUE_SOON_DAYS: i64 = 3;

/// What to tell the user about their next period
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    /// Projected period is in the past
    Overdue { days: i64 },
    DueToday,
    DueSoon { days: i64 },
    /// Today is one luteal phase before the projected period
    OvulationToday,
    Upcoming { days: i64 },
}

impl Notice {
    /// Reminder subject line; `None` when there is nothing to send
    pub fn subject(&self) -> Option<String> {
        match self {
            Notice::Overdue { days } => Some(format!(
                "Period was expected {} {} ago",
                days,
                plural_days(*days)
            )),
            Notice::DueToday => Some("Period today!".into()),
            Notice::DueSoon { days } => Some(format!(
                "Period expected in {} {}",
                days,
                plural_days(*days)
            )),
            Notice::OvulationToday => Some("Ovulation today!".into()),
            Notice::Upcoming { .. } => None,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.subject()) {
            (_, Some(subject)) => write!(f, "{}", subject),
            (Notice::Upcoming { days }, None) => write!(
                f,
                "Next period expected in {} {}",
                days,
                plural_days(*days)
            ),
            _ => Ok(()),
        }
    }
}

/// Classify the first projected period against `today`.
///
/// Returns `None` when nothing is projected (no periods recorded).
pub fn classify(
    result: &CycleStatisticsResult,
    today: NaiveDate,
    luteal_phase_length: i64,
) -> Option<Notice> {
    let next_period = result.next_period()?;
    let offset = (next_period - today).num_days();

    let notice = if offset < 0 {
        Notice::Overdue { days: -offset }
    } else if offset == 0 {
        Notice::DueToday
    } else if offset <= DUE_SOON_DAYS {
        Notice::DueSoon { days: offset }
    } else if offset == luteal_phase_length {
        Notice::OvulationToday
    } else {
        Notice::Upcoming { days: offset }
    };

    tracing::debug!(
        "Next period {} is {} days from {}: {:?}",
        next_period,
        offset,
        today,
        notice
    );
    Some(notice)
}

fn plural_days(days: i64) -> &'static str {
    if days == 1 {
        "day"
    } else {
        "days"
    }
}
