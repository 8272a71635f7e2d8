//! One refresh cycle: login, form, report, normalize, publish.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use eso_api::types::RawDataset;
use eso_api::{Client, ReportQuery, Session};
use serde::Serialize;

use crate::config::EsoConfig;
use crate::error::EsoError;
use crate::normalize::{normalize, NormalizeOptions};
use crate::session::SessionStore;
use crate::statistics::{Series, StatisticsSink};

/// Progress of the current refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Authenticating,
    FormLoaded,
    DatasetFetched,
    Normalized,
    Published,
    Failed,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CycleState::Idle => "idle",
            CycleState::Authenticating => "authenticating",
            CycleState::FormLoaded => "form-loaded",
            CycleState::DatasetFetched => "dataset-fetched",
            CycleState::Normalized => "normalized",
            CycleState::Published => "published",
            CycleState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Per-series outcome of a successful cycle.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub statistic_id: String,
    pub name: String,
    pub points: usize,
    pub first: Option<DateTime<Utc>>,
    pub last: Option<DateTime<Utc>>,
    pub total: f64,
}

impl From<&Series> for SeriesSummary {
    fn from(series: &Series) -> Self {
        Self {
            statistic_id: series.metadata.statistic_id.clone(),
            name: series.metadata.name.clone(),
            points: series.points.len(),
            first: series.first_start(),
            last: series.last_start(),
            total: series.total(),
        }
    }
}

/// What one successful cycle published.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Whether this cycle had to log in.
    pub fresh_login: bool,
    pub series: Vec<Series>,
}

impl CycleReport {
    pub fn summaries(&self) -> Vec<SeriesSummary> {
        self.series.iter().map(SeriesSummary::from).collect()
    }
}

/// Drives refresh cycles against the portal, reusing the stored session and
/// forwarding normalized series to the sink.
pub struct RefreshPipeline<S, K> {
    client: Client,
    username: String,
    password: String,
    selector: String,
    options: NormalizeOptions,
    sessions: S,
    sink: K,
    state: CycleState,
}

impl<S: SessionStore, K: StatisticsSink> RefreshPipeline<S, K> {
    pub fn new(config: &EsoConfig, sessions: S, sink: K) -> Self {
        Self {
            client: Client::with_base_url(&config.base_url),
            username: config.username.clone(),
            password: config.password.clone(),
            selector: config.selector.clone(),
            options: config.normalize_options(),
            sessions,
            sink,
            state: CycleState::Idle,
        }
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sessions(&self) -> &S {
        &self.sessions
    }

    fn transition(&mut self, next: CycleState) {
        tracing::debug!(from = %self.state, to = %next, "Refresh cycle state");
        self.state = next;
    }

    /// Runs one cycle for the report ending today (portal time).
    pub async fn refresh(&mut self) -> Result<CycleReport, EsoError> {
        let today = Utc::now().with_timezone(&self.options.time_zone).date_naive();
        self.refresh_on(today).await
    }

    /// Runs one cycle for the report whose "next" boundary is `today`.
    pub async fn refresh_on(&mut self, today: NaiveDate) -> Result<CycleReport, EsoError> {
        self.transition(CycleState::Idle);
        match self.run_cycle(today).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.transition(CycleState::Failed);
                tracing::error!("Refresh cycle failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_cycle(&mut self, today: NaiveDate) -> Result<CycleReport, EsoError> {
        self.transition(CycleState::Authenticating);
        let (session, mut fresh_login) = match self.sessions.get() {
            Some(session) => (session, false),
            None => {
                tracing::debug!("No stored session, authenticating");
                (self.login().await?, true)
            }
        };

        let datasets = match self.fetch(&session, today).await {
            Ok(datasets) => datasets,
            Err(e) if !fresh_login && e.may_be_stale_session() => {
                tracing::warn!("Stored session rejected ({}), authenticating again", e);
                self.sessions.invalidate();
                self.transition(CycleState::Authenticating);
                let session = self.login().await?;
                fresh_login = true;
                self.fetch(&session, today).await?
            }
            Err(e) => return Err(e.into()),
        };

        let series = normalize(&datasets, &self.options)?;
        self.transition(CycleState::Normalized);

        for s in &series {
            self.sink.publish(s)?;
            tracing::debug!(
                statistic_id = %s.metadata.statistic_id,
                points = s.points.len(),
                "Series published"
            );
        }
        self.transition(CycleState::Published);
        tracing::info!("Published {} series", series.len());

        Ok(CycleReport {
            fresh_login,
            series,
        })
    }

    async fn login(&mut self) -> Result<Session, EsoError> {
        let session = self
            .client
            .authenticate(&self.username, &self.password)
            .await?;
        self.sessions.set(session.clone());
        Ok(session)
    }

    async fn fetch(
        &mut self,
        session: &Session,
        today: NaiveDate,
    ) -> Result<Vec<RawDataset>, eso_api::Error> {
        let form = self.client.consumption_form(session, &self.selector).await?;
        self.transition(CycleState::FormLoaded);

        let query = ReportQuery::new(form.selector).with_next_boundary(today);
        let datasets = self
            .client
            .fetch_dataset(session, &query, &form.fields)
            .await?;
        self.transition(CycleState::DatasetFetched);
        Ok(datasets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_state_display() {
        assert_eq!(CycleState::DatasetFetched.to_string(), "dataset-fetched");
        assert_eq!(CycleState::Failed.to_string(), "failed");
    }
}
