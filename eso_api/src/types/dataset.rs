use serde::{Deserialize, Serialize};

/// One labeled series of the consumption report, as sent by the portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataset {
    pub label: String,
    #[serde(default)]
    pub record: Vec<RawRecord>,
}

/// A single reading. `date` is local portal time formatted `YYYYMMDDHHMM`;
/// `value` is absent or null for hours without data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub date: String,
    #[serde(default)]
    pub value: Option<f64>,
}
