//! Periodic refresh loop and the availability state of the tracked entity.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::MissedTickBehavior;

use crate::error::EsoError;
use crate::pipeline::{CycleReport, RefreshPipeline, SeriesSummary};
use crate::session::SessionStore;
use crate::statistics::StatisticsSink;

/// What the host exposes for the tracked meter between cycles.
#[derive(Debug, Clone, Serialize)]
pub struct EntityState {
    pub name: String,
    /// False until a cycle succeeds, and again after any failed cycle.
    pub available: bool,
    pub last_update_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub series: Vec<SeriesSummary>,
}

impl EntityState {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            available: false,
            last_update_success: None,
            last_error: None,
            series: Vec::new(),
        }
    }
}

/// Runs refresh cycles one at a time on a fixed interval.
pub struct Scheduler {
    interval: Duration,
    state: EntityState,
}

impl Scheduler {
    pub fn new(name: &str, interval: Duration) -> Self {
        Self {
            interval,
            state: EntityState::new(name),
        }
    }

    pub fn state(&self) -> &EntityState {
        &self.state
    }

    /// Runs a single cycle and updates the entity state.
    pub async fn tick<S, K>(
        &mut self,
        pipeline: &mut RefreshPipeline<S, K>,
    ) -> Result<CycleReport, EsoError>
    where
        S: SessionStore,
        K: StatisticsSink,
    {
        match pipeline.refresh().await {
            Ok(report) => {
                self.state.available = true;
                self.state.last_update_success = Some(Utc::now());
                self.state.last_error = None;
                self.state.series = report.summaries();
                Ok(report)
            }
            Err(e) => {
                self.state.available = false;
                self.state.last_error = Some(e.to_string());
                self.state.series.clear();
                Err(e)
            }
        }
    }

    /// Refreshes immediately, then every interval until `shutdown` resolves.
    ///
    /// A failing first cycle is returned as an error: the integration cannot
    /// start with a broken configuration. Later failures are logged and the
    /// loop waits for the next tick.
    pub async fn run_until<S, K, F>(
        &mut self,
        pipeline: &mut RefreshPipeline<S, K>,
        shutdown: F,
    ) -> Result<(), EsoError>
    where
        S: SessionStore,
        K: StatisticsSink,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut first = true;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested, stopping refresh loop");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            match self.tick(pipeline).await {
                Ok(report) => tracing::info!(
                    "{} refreshed: {} series",
                    self.state.name,
                    report.series.len()
                ),
                Err(e) if first => {
                    tracing::error!("{} initialization failed: {}", self.state.name, e);
                    return Err(e);
                }
                Err(e) => tracing::error!(
                    "{} refresh failed, retrying in {:?}: {}",
                    self.state.name,
                    self.interval,
                    e
                ),
            }
            first = false;
        }
    }
}
