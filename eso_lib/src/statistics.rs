//! Normalized statistics and the sinks they are published to.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EsoError;

/// Describes one external statistic series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesMetadata {
    pub source: String,
    pub name: String,
    pub statistic_id: String,
    pub unit_of_measurement: String,
    pub has_mean: bool,
    pub has_sum: bool,
}

/// One hourly statistic: the raw reading and the running total.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticPoint {
    pub start: DateTime<Utc>,
    pub state: Option<f64>,
    pub sum: f64,
}

/// A normalized series ready for publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub metadata: SeriesMetadata,
    pub points: Vec<StatisticPoint>,
}

impl Series {
    pub fn first_start(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.start)
    }

    pub fn last_start(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.start)
    }

    /// Cumulative sum after the last point, 0.0 for an empty series.
    pub fn total(&self) -> f64 {
        self.points.last().map(|p| p.sum).unwrap_or(0.0)
    }
}

/// Receives normalized series, keyed by `statistic_id` downstream.
pub trait StatisticsSink {
    fn publish(&mut self, series: &Series) -> Result<(), EsoError>;
}

impl<T: StatisticsSink + ?Sized> StatisticsSink for Box<T> {
    fn publish(&mut self, series: &Series) -> Result<(), EsoError> {
        (**self).publish(series)
    }
}

impl<T: StatisticsSink + ?Sized> StatisticsSink for &mut T {
    fn publish(&mut self, series: &Series) -> Result<(), EsoError> {
        (**self).publish(series)
    }
}

/// Keeps the latest series per statistic id in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    series: BTreeMap<String, Series>,
    publications: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, statistic_id: &str) -> Option<&Series> {
        self.series.get(statistic_id)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Number of `publish` calls received, including overwrites.
    pub fn publications(&self) -> usize {
        self.publications
    }

    pub fn iter(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }
}

impl StatisticsSink for MemorySink {
    fn publish(&mut self, series: &Series) -> Result<(), EsoError> {
        self.publications += 1;
        self.series
            .insert(series.metadata.statistic_id.clone(), series.clone());
        Ok(())
    }
}

#[derive(Serialize)]
struct ImportRecord<'a> {
    metadata: &'a SeriesMetadata,
    stats: &'a [StatisticPoint],
}

/// Writes each series as one JSON line: `{"metadata": {...}, "stats": [...]}`.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> StatisticsSink for JsonLinesSink<W> {
    fn publish(&mut self, series: &Series) -> Result<(), EsoError> {
        let record = ImportRecord {
            metadata: &series.metadata,
            stats: &series.points,
        };
        serde_json::to_writer(&mut self.writer, &record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
