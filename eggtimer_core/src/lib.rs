#![forbid(unsafe_code)]

//! Core domain model and cycle statistics for eggtimer.
//!
//! This crate provides:
//! - Domain types (flow events, projections, statistics results)
//! - Cycle history extraction and descriptive statistics
//! - The statistics and prediction engine
//! - Upcoming-period notices
//! - Persistence collaborators (JSONL event log, statistics store, CSV)
//! - A service layer with explicit cache invalidation

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod history;
pub mod stats;
pub mod engine;
pub mod notify;
pub mod cache;
pub mod lock;
pub mod event_log;
pub mod stats_store;
pub mod csv_io;
pub mod service;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use history::CycleHistory;
pub use engine::{CycleStatistics, EngineParams};
pub use notify::{classify, Notice};
pub use cache::CycleLengthCache;
pub use event_log::{EventSink, EventSource, JsonlEventLog};
pub use stats_store::{StoredStatistics, UserStatistics};
pub use service::{ImportSummary, StatisticsService};
