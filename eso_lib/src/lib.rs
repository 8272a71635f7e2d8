//! Library layer for the ESO integration: session handling, series
//! normalization, statistics sinks, and the periodic refresh pipeline.
//!
//! Wraps the `eso_api` portal client, which does the HTTP and HTML work.

pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod scheduler;
pub mod session;
pub mod statistics;

pub use eso_api;
pub use eso_api::types;
pub use eso_api::{Client, DisplayType, Period, ReportQuery, SelectOption, Session};

pub use config::{EsoConfig, PartialConfig};
pub use error::EsoError;
pub use normalize::{normalize, NormalizeOptions, SeriesKind};
pub use pipeline::{CycleReport, CycleState, RefreshPipeline, SeriesSummary};
pub use scheduler::{EntityState, Scheduler};
pub use session::{MemorySessionStore, SessionStore};
pub use statistics::{JsonLinesSink, MemorySink, Series, SeriesMetadata, StatisticPoint, StatisticsSink};
