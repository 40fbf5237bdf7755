mod common;

use common::{burst_chunk, date, datenum, ExportBuilder};
use mooring_convert::classify::UnclassifiedReason;
use mooring_convert::models::array_from_json;
use mooring_convert::{build_chunk, AttrValue, BurstType, ConfigValue, Error, ExportLoader, JsonExportLoader};
use serde_json::json;
use std::fs;
use tempfile::tempdir;

// ============================================================================
// DATA ARRAYS
// ============================================================================

#[test]
fn test_null_leaves_become_nan() {
    let array = array_from_json(&json!([[1.0, null], [null, 4.0]])).unwrap();
    assert_eq!(array.shape(), &[2, 2]);
    assert_eq!(array[[0, 0]], 1.0);
    assert!(array[[0, 1]].is_nan());
    assert!(array[[1, 0]].is_nan());
    assert_eq!(array[[1, 1]], 4.0);
}

#[test]
fn test_ragged_arrays_fail() {
    for value in [json!([[1, 2], [3]]), json!([[1], [2, 3]]), json!([1, [2]])] {
        assert!(
            matches!(array_from_json(&value), Err(Error::Parse(_))),
            "{} should be rejected",
            value
        );
    }
}

#[test]
fn test_non_numeric_leaves_fail() {
    assert!(matches!(array_from_json(&json!(["a", "b"])), Err(Error::Parse(_))));
    assert!(matches!(array_from_json(&json!([{"x": 1}])), Err(Error::Parse(_))));
}

#[test]
fn test_bad_data_field_names_the_key() {
    let text = ExportBuilder::new()
        .field("Burst_Velocity", json!([[1, 2], [3]]))
        .to_json();

    match mooring_convert::RawExport::from_json_slice(text.as_bytes()) {
        Err(Error::Parse(msg)) => assert!(msg.contains("Burst_Velocity"), "{}", msg),
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_rank_zero_data_is_kept_and_reported() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4)
        .field("Burst_SerialNumber", json!(101))
        .build();
    assert_eq!(export.data["Burst_SerialNumber"].ndim(), 0);

    let chunk = build_chunk(&export).unwrap();
    let entry = chunk
        .report
        .unclassified
        .iter()
        .find(|u| u.key == "Burst_SerialNumber")
        .unwrap();
    assert_eq!(entry.shape, Vec::<usize>::new());
    assert_eq!(entry.reason, UnclassifiedReason::UnsupportedRank);
}

// ============================================================================
// CONFIG VALUES
// ============================================================================

#[test]
fn test_odd_config_values_do_not_abort() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4)
        .config("Burst_SomeSetting", json!(null))
        .config("Burst_Nested", json!({"a": 1}))
        .config("Burst_Cube", json!([[[1.0]]]))
        .build();

    let setting = &export.config["Burst_SomeSetting"];
    assert_eq!(setting, &ConfigValue::Other(json!(null)));
    assert_eq!(setting.as_f64(), None);
    assert!(!setting.is_true());
    assert_eq!(setting.to_array().unwrap(), None);
    assert!(matches!(export.config["Burst_Cube"], ConfigValue::Other(_)));

    let chunk = build_chunk(&export).unwrap();
    let ds = chunk.get(BurstType::Burst).unwrap();
    assert_eq!(ds.attr("SIGBurst_SomeSetting"), Some(&AttrValue::from("null")));
    assert_eq!(ds.attr("SIGBurst_Nested"), Some(&AttrValue::from(r#"{"a":1}"#)));
}

#[test]
fn test_config_value_kinds() {
    let export = ExportBuilder::new()
        .config("Flag", json!(true))
        .config("Text", json!("True"))
        .config("Number", json!(5))
        .config("Vector", json!([1.0, 2.0]))
        .config("Matrix", json!([[1.0, 0.0], [0.0, 1.0]]))
        .build();

    assert_eq!(export.config["Flag"], ConfigValue::Flag(true));
    assert!(export.config["Text"].is_true());
    assert_eq!(export.config["Number"].as_f64(), Some(5.0));
    assert_eq!(export.config["Vector"].to_array().unwrap().unwrap().shape(), &[2]);
    assert_eq!(export.config["Matrix"].to_array().unwrap().unwrap().shape(), &[2, 2]);
}

#[test]
fn test_missing_tables_default_to_empty() {
    let export = mooring_convert::RawExport::from_json_slice(b"{}").unwrap();
    assert!(export.config.is_empty());
    assert!(export.data.is_empty());
    assert!(build_chunk(&export).unwrap().datasets.is_empty());
}

// ============================================================================
// FILE LOADER
// ============================================================================

#[test]
fn test_load_written_export() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("SIG1234_1.json");
    burst_chunk(datenum(date(2021, 3, 1), 0.0), 3, 4).write_to(&path);

    let export = JsonExportLoader.load(&path).unwrap();
    assert_eq!(export.data["Burst_Velocity"].shape(), &[3, 4]);
    assert_eq!(export.units["Burst_Pressure"], "dBar");
    assert_eq!(build_chunk(&export).unwrap().kinds(), vec![BurstType::Burst]);
}

#[test]
fn test_load_malformed_file_is_json_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("SIG1234_1.json");
    fs::write(&path, "{\"Config\": {\"Plan_BurstEnabled\": ").unwrap();

    assert!(matches!(JsonExportLoader.load(&path), Err(Error::Json(_))));
}

#[test]
fn test_load_ragged_file_is_parse_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("SIG1234_2.json");
    ExportBuilder::bursting(4, 2)
        .field("Burst_Velocity", json!([[1, 2], [3]]))
        .write_to(&path);

    assert!(matches!(JsonExportLoader.load(&path), Err(Error::Parse(_))));
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        JsonExportLoader.load(&dir.path().join("absent.json")),
        Err(Error::Io(_))
    ));
}
