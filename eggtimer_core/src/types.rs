//! Core domain types for the eggtimer system.
//!
//! This module defines the fundamental types used throughout the system:
//! - Flow events and their display-only attributes
//! - Projected events (ovulation/period)
//! - Statistics output values

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Maximum length of a flow event comment
pub const MAX_COMMENT_LEN: usize = 250;

// ============================================================================
// Flow Attributes
// ============================================================================

/// Amount of flow
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowLevel {
    Spotting,
    Light,
    #[default]
    Medium,
    Heavy,
}

/// Colour of flow
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowColor {
    Pink,
    LightRed,
    #[default]
    Red,
    DarkRed,
    Brown,
    Black,
}

/// Size of clots, when any were observed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClotSize {
    Small,
    Medium,
    Large,
}

/// Severity of cramps, when any were observed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CrampLevel {
    Slight,
    Moderate,
    Severe,
}

macro_rules! impl_parse_attr {
    ($ty:ty, $what:literal, { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl std::str::FromStr for $ty {
            type Err = crate::Error;

            fn from_str(s: &str) -> crate::Result<Self> {
                match s.to_lowercase().replace('-', "_").as_str() {
                    $($name => Ok($variant),)+
                    other => Err(crate::Error::Other(format!(
                        "Unknown {}: {}",
                        $what, other
                    ))),
                }
            }
        }
    };
}

impl_parse_attr!(FlowLevel, "flow level", {
    "spotting" => FlowLevel::Spotting,
    "light" => FlowLevel::Light,
    "medium" => FlowLevel::Medium,
    "heavy" => FlowLevel::Heavy,
});

impl_parse_attr!(FlowColor, "flow color", {
    "pink" => FlowColor::Pink,
    "light_red" => FlowColor::LightRed,
    "red" => FlowColor::Red,
    "dark_red" => FlowColor::DarkRed,
    "brown" => FlowColor::Brown,
    "black" => FlowColor::Black,
});

impl_parse_attr!(ClotSize, "clot size", {
    "small" => ClotSize::Small,
    "medium" => ClotSize::Medium,
    "large" => ClotSize::Large,
});

impl_parse_attr!(CrampLevel, "cramp level", {
    "slight" => CrampLevel::Slight,
    "moderate" => CrampLevel::Moderate,
    "severe" => CrampLevel::Severe,
});

// ============================================================================
// Flow Events
// ============================================================================

/// A recorded flow event
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FlowEvent {
    pub id: Uuid,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub first_day: bool,
    #[serde(default)]
    pub level: FlowLevel,
    #[serde(default)]
    pub color: FlowColor,
    #[serde(default)]
    pub clots: Option<ClotSize>,
    #[serde(default)]
    pub cramps: Option<CrampLevel>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl FlowEvent {
    /// New event with default attributes
    pub fn new(user_id: impl Into<String>, timestamp: DateTime<Utc>, first_day: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            timestamp,
            first_day,
            level: FlowLevel::default(),
            color: FlowColor::default(),
            clots: None,
            cramps: None,
            comment: None,
        }
    }

    /// Set the comment, cut to [`MAX_COMMENT_LEN`] characters
    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment.map(|c| {
            if c.chars().count() <= MAX_COMMENT_LEN {
                c
            } else {
                tracing::warn!("Comment on {} truncated to {} characters", self.id, MAX_COMMENT_LEN);
                c.chars().take(MAX_COMMENT_LEN).collect()
            }
        });
    }
}

// ============================================================================
// Projections and Statistics Output
// ============================================================================

/// Kind of projected event
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventType {
    #[serde(rename = "projected ovulation")]
    Ovulation,
    #[serde(rename = "projected period")]
    Period,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Ovulation => write!(f, "projected ovulation"),
            EventType::Period => write!(f, "projected period"),
        }
    }
}

/// A projected future ovulation or period start
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictedEvent {
    #[serde(rename = "timestamp")]
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub event_type: EventType,
}

/// Calendar anchor for a reference point: the date shown and its day within the cycle
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CycleReference {
    pub first_date: NaiveDate,
    pub first_day: i64,
}

/// Derived statistics for one user at one reference instant
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CycleStatisticsResult {
    pub average_cycle_length: i64,
    pub all_time_average_cycle_length: i64,
    pub cycle_length_minimum: Option<i64>,
    pub cycle_length_maximum: Option<i64>,
    pub cycle_length_mean: Option<f64>,
    pub cycle_length_median: Option<f64>,
    pub cycle_length_mode: Option<i64>,
    pub cycle_length_standard_deviation: Option<f64>,
    /// Absent when no period started at or before the reference instant.
    /// Serialized as `-1` in that case.
    #[serde(serialize_with = "serialize_or_sentinel")]
    pub current_cycle_length: Option<i64>,
    pub predicted_events: Vec<PredictedEvent>,
}

impl CycleStatisticsResult {
    /// Current cycle length with the legacy `-1` sentinel for "no data"
    pub fn current_cycle_length_or_sentinel(&self) -> i64 {
        self.current_cycle_length.unwrap_or(-1)
    }

    /// First projected period, if any
    pub fn next_period(&self) -> Option<NaiveDate> {
        self.predicted_events
            .iter()
            .find(|e| e.event_type == EventType::Period)
            .map(|e| e.date)
    }
}

fn serialize_or_sentinel<S: Serializer>(value: &Option<i64>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(value.unwrap_or(-1))
}
