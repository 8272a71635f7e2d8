use eso_api::dataset::extract_datasets;
use eso_api::types::RawDataset;

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

#[test]
fn extract_report_fixture() {
    let datasets = extract_datasets(&load_fixture("report.json")).unwrap();
    assert_eq!(datasets.len(), 2);

    let production = &datasets[0];
    assert_eq!(production.label, "Atiduota į tinklą");
    assert_eq!(production.record[0].date, "202401010000");
    assert_eq!(production.record[0].value, Some(0.0));
    assert_eq!(production.record[2].value, Some(2.25));

    let consumption = &datasets[1];
    assert_eq!(consumption.label, "Gauta iš tinklo");
    assert_eq!(consumption.record[1].value, None);
}

#[test]
fn report_without_dataset_fixture() {
    let result = extract_datasets(&load_fixture("report_without_dataset.json"));
    assert!(matches!(result, Err(eso_api::Error::DatasetMissing)));
}

#[test]
fn deserialize_dataset_without_records() {
    let dataset: RawDataset = serde_json::from_str(r#"{"label": "Gauta iš tinklo"}"#).unwrap();
    assert!(dataset.record.is_empty());
}
