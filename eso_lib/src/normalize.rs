//! Conversion of raw portal datasets into cumulative statistic series.

use std::collections::BTreeMap;

use chrono::offset::LocalResult;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::{OffsetComponents, Tz};
use eso_api::types::RawDataset;

use crate::error::EsoError;
use crate::statistics::{Series, SeriesMetadata, StatisticPoint};

/// Source domain of every published statistic.
pub const DOMAIN: &str = "eso";
/// Unit of every published statistic.
pub const UNIT_KWH: &str = "kWh";
/// Format of the portal's local record timestamps.
pub const RECORD_DATE_FORMAT: &str = "%Y%m%d%H%M";

/// Category of a dataset, decided by its exact label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesKind {
    /// "Atiduota į tinklą": energy fed into the grid.
    Production,
    /// "Gauta iš tinklo": energy taken from the grid.
    Consumption,
    /// "Suprognozuotas pagal vidutinį suvartojimą".
    PredictedConsumption,
    /// "Suprognozuotas pagal vidutinę gamybą".
    PredictedProduction,
    /// Any other label; published under the shared fallback id.
    Unrecognized(String),
}

impl SeriesKind {
    pub fn classify(label: &str) -> Self {
        match label {
            "Atiduota į tinklą" => Self::Production,
            "Gauta iš tinklo" => Self::Consumption,
            "Suprognozuotas pagal vidutinį suvartojimą" => Self::PredictedConsumption,
            "Suprognozuotas pagal vidutinę gamybą" => Self::PredictedProduction,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    fn object_id(&self) -> &'static str {
        match self {
            Self::Production => "eso_electricity_production",
            Self::Consumption => "eso_electricity_consumption",
            Self::PredictedConsumption => "eso_prediction_electricity_consumption",
            Self::PredictedProduction => "eso_prediction_electricity_production",
            Self::Unrecognized(_) => "eso_electricity_new",
        }
    }

    /// External key, e.g. `eso:eso_electricity_production`.
    pub fn statistic_id(&self) -> String {
        format!("{}:{}", DOMAIN, self.object_id())
    }
}

/// Knobs of [`normalize`].
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Zone the portal reports local timestamps in.
    pub time_zone: Tz,
    /// Reject labels outside the four known categories instead of
    /// publishing them under the fallback id.
    pub strict_labels: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            time_zone: chrono_tz::Europe::Vilnius,
            strict_labels: false,
        }
    }
}

/// Interprets a `YYYYMMDDHHMM` portal timestamp in `tz` and converts it to UTC.
///
/// During the autumn fall-back hour the standard-time instant is chosen; a
/// wall time inside the spring-forward gap is read with the standard offset.
pub fn parse_local_timestamp(raw: &str, tz: Tz) -> Result<DateTime<Utc>, EsoError> {
    let naive = NaiveDateTime::parse_from_str(raw, RECORD_DATE_FORMAT)
        .map_err(|e| EsoError::Parse(format!("invalid record date `{}`: {}", raw, e)))?;

    let utc = match tz.from_local_datetime(&naive) {
        LocalResult::Single(local) => local.with_timezone(&Utc),
        LocalResult::Ambiguous(first, second) => {
            let standard = if first.offset().dst_offset() == chrono::Duration::zero() {
                first
            } else {
                second
            };
            standard.with_timezone(&Utc)
        }
        LocalResult::None => {
            let base = tz.offset_from_utc_datetime(&naive).base_utc_offset();
            Utc.from_utc_datetime(&(naive - base))
        }
    };
    Ok(utc)
}

fn normalize_series(
    dataset: &RawDataset,
    kind: &SeriesKind,
    tz: Tz,
) -> Result<Series, EsoError> {
    let mut sum = 0.0;
    let mut points = Vec::with_capacity(dataset.record.len());
    for record in &dataset.record {
        let start = parse_local_timestamp(&record.date, tz).map_err(|e| match e {
            EsoError::Parse(msg) => EsoError::Parse(format!("{} in series `{}`", msg, dataset.label)),
            other => other,
        })?;
        if let Some(value) = record.value {
            sum += value;
        }
        points.push(StatisticPoint {
            start,
            state: record.value,
            sum,
        });
    }

    Ok(Series {
        metadata: SeriesMetadata {
            source: DOMAIN.to_string(),
            name: dataset.label.clone(),
            statistic_id: kind.statistic_id(),
            unit_of_measurement: UNIT_KWH.to_string(),
            has_mean: false,
            has_sum: true,
        },
        points,
    })
}

/// Normalizes every dataset, preserving source order.
///
/// Fails without producing anything when a timestamp is malformed, when two
/// labels would land on the same statistic id, or (in strict mode) when a
/// label is unknown.
pub fn normalize(
    datasets: &[RawDataset],
    options: &NormalizeOptions,
) -> Result<Vec<Series>, EsoError> {
    let mut labels_by_id: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut series = Vec::with_capacity(datasets.len());

    for dataset in datasets {
        let kind = SeriesKind::classify(&dataset.label);
        if !kind.is_recognized() {
            if options.strict_labels {
                return Err(EsoError::UnknownLabel(dataset.label.clone()));
            }
            tracing::warn!(
                label = %dataset.label,
                "Unknown series label, publishing under {}",
                kind.statistic_id()
            );
        }
        labels_by_id
            .entry(kind.statistic_id())
            .or_default()
            .push(dataset.label.clone());
        series.push(normalize_series(dataset, &kind, options.time_zone)?);
    }

    if let Some((statistic_id, labels)) = labels_by_id.into_iter().find(|(_, l)| l.len() > 1) {
        return Err(EsoError::LabelCollision {
            statistic_id,
            labels,
        });
    }

    Ok(series)
}
