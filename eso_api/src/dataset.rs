//! Extraction of the chart datasets from a Drupal AJAX report response.
//!
//! The report endpoint answers with a JSON array of AJAX commands. One of
//! them is a `settings` command whose payload holds the chart configuration
//! under [`SETTINGS_KEY`], with the series at `graphics_data.datasets`.

use serde::Deserialize;
use serde_json::Value;

use crate::types::RawDataset;
use crate::Error;

/// Key of the consumption history block inside the `settings` object.
pub const SETTINGS_KEY: &str = "eso_consumption_history_form";

fn settings_block(entries: &[Value]) -> Option<&Value> {
    entries
        .iter()
        .find_map(|entry| entry.get("settings")?.get(SETTINGS_KEY))
}

/// Parses a report response body into its labeled datasets, in source order.
pub fn extract_datasets(body: &str) -> Result<Vec<RawDataset>, Error> {
    let entries: Vec<Value> = serde_json::from_str(body)?;
    let block = settings_block(&entries).ok_or(Error::DatasetMissing)?;
    let datasets = block
        .get("graphics_data")
        .and_then(|g| g.get("datasets"))
        .ok_or_else(|| {
            Error::Parse(format!(
                "`{}` has no graphics_data.datasets array",
                SETTINGS_KEY
            ))
        })?;
    Vec::<RawDataset>::deserialize(datasets)
        .map_err(|e| Error::Parse(format!("malformed `{}` datasets: {}", SETTINGS_KEY, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_settings_after_other_commands() {
        let body = r#"[
            null,
            {"command": "insert", "data": "<div></div>", "settings": null},
            {"command": "settings", "settings": {"ajaxPageState": {}}},
            {"command": "settings", "merge": true, "settings": {
                "eso_consumption_history_form": {
                    "graphics_data": {
                        "datasets": [
                            {"label": "Gauta iš tinklo", "record": [
                                {"date": "202401010000", "value": 0.25},
                                {"date": "202401010100", "value": null},
                                {"date": "202401010200"}
                            ]}
                        ]
                    }
                }
            }}
        ]"#;
        let datasets = extract_datasets(body).unwrap();
        assert_eq!(datasets.len(), 1);
        assert_eq!(datasets[0].label, "Gauta iš tinklo");
        let values: Vec<Option<f64>> = datasets[0].record.iter().map(|r| r.value).collect();
        assert_eq!(values, vec![Some(0.25), None, None]);
    }

    #[test]
    fn missing_settings_key() {
        let body = r#"[{"command": "settings", "settings": {"ajaxPageState": {}}}]"#;
        assert!(matches!(extract_datasets(body), Err(Error::DatasetMissing)));
    }

    #[test]
    fn empty_array_is_missing() {
        assert!(matches!(extract_datasets("[]"), Err(Error::DatasetMissing)));
    }

    #[test]
    fn malformed_body() {
        assert!(matches!(
            extract_datasets("<html>login</html>"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn record_without_date_is_parse_error() {
        let body = r#"[{"settings": {"eso_consumption_history_form": {"graphics_data": {
            "datasets": [{"label": "Gauta iš tinklo", "record": [{"value": 1.0}]}]
        }}}}]"#;
        let err = extract_datasets(body).unwrap_err();
        assert!(matches!(err, Error::Parse(ref msg) if msg.contains("date")));
        assert!(!err.may_be_stale_session());
    }

    #[test]
    fn non_numeric_value_is_parse_error() {
        let body = r#"[{"settings": {"eso_consumption_history_form": {"graphics_data": {
            "datasets": [{"label": "Gauta iš tinklo", "record": [{"date": "202401010000", "value": "n/a"}]}]
        }}}}]"#;
        assert!(matches!(extract_datasets(body), Err(Error::Parse(_))));
    }

    #[test]
    fn block_without_datasets() {
        let body = r#"[{"settings": {"eso_consumption_history_form": {"graphics_data": {}}}}]"#;
        assert!(matches!(extract_datasets(body), Err(Error::Parse(_))));
    }
}
