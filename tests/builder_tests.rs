mod common;

use common::{at, burst_chunk, date, datenum, ExportBuilder};
use mooring_convert::builder::{add_units, variable_name};
use mooring_convert::burst::{bin_distances, datenum_to_datetime};
use mooring_convert::classify::{classify, BurstShape, Classification, UnclassifiedReason};
use mooring_convert::{build_chunk, AttrValue, BurstType, Error};
use serde_json::json;

// ============================================================================
// ENABLED BURST TYPES
// ============================================================================

#[test]
fn test_four_beams_without_altimeter_builds_only_burst() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 3, 4).build();
    let chunk = build_chunk(&export).unwrap();

    assert_eq!(chunk.kinds(), vec![BurstType::Burst]);
    assert!(chunk.get(BurstType::IBurst).is_none());
    assert!(chunk.get(BurstType::BurstRawAltimeter).is_none());
}

#[test]
fn test_five_beams_enables_interleaved_bursts() {
    let t0 = datenum(date(2021, 3, 1), 0.0);
    let export = ExportBuilder::bursting(5, 2)
        .time("Burst", &[t0, t0 + 0.5])
        .time("IBurst", &[t0 + 0.25])
        .series("IBurst_Pressure", &[12.5])
        .build();

    let chunk = build_chunk(&export).unwrap();
    assert_eq!(chunk.kinds(), vec![BurstType::IBurst, BurstType::Burst]);

    let iburst = chunk.get(BurstType::IBurst).unwrap();
    assert_eq!(iburst.len(), 1);
    assert_eq!(iburst.data_type(), Some("IBurst"));
    assert!(iburst.contains("Pressure"));
    assert_eq!(chunk.get(BurstType::Burst).unwrap().len(), 2);
}

#[test]
fn test_raw_altimeter_has_no_bindist() {
    let t0 = datenum(date(2021, 3, 1), 0.0);
    let export = ExportBuilder::bursting(4, 2)
        .config("Burst_RawAltimeter", json!(1))
        .time("Burst", &[t0])
        .time("BurstRawAltimeter", &[t0, t0 + 0.5])
        .matrix("BurstRawAltimeter_AltimeterRawData", 2, 2)
        .build();

    let chunk = build_chunk(&export).unwrap();
    assert_eq!(
        chunk.kinds(),
        vec![BurstType::BurstRawAltimeter, BurstType::Burst]
    );

    let alt = chunk.get(BurstType::BurstRawAltimeter).unwrap();
    assert!(!alt.contains("bindist"));
    assert!(!alt.contains("AltimeterRawData"));

    let entry = chunk
        .report
        .unclassified
        .iter()
        .find(|u| u.key == "BurstRawAltimeter_AltimeterRawData")
        .unwrap();
    assert_eq!(entry.reason, UnclassifiedReason::UnmatchedSecondAxis { cells: None });
}

#[test]
fn test_bursting_disabled_builds_nothing() {
    let export = ExportBuilder::new()
        .config("Plan_BurstEnabled", json!("False"))
        .series("Burst_Pressure", &[1.0, 2.0])
        .build();

    let chunk = build_chunk(&export).unwrap();
    assert!(chunk.datasets.is_empty());
    assert_eq!(chunk.report.ignored, vec!["Burst_Pressure".to_string()]);
    assert!(chunk.report.unclassified.is_empty());
}

#[test]
fn test_missing_time_for_enabled_type_is_schema_error() {
    let export = ExportBuilder::bursting(5, 2)
        .time("Burst", &[datenum(date(2021, 3, 1), 0.0)])
        .build();

    match build_chunk(&export) {
        Err(Error::Schema(msg)) => assert!(msg.contains("IBurst_Time")),
        other => panic!("expected a schema error, got {:?}", other),
    }
}

// ============================================================================
// TIME AND BINDIST
// ============================================================================

#[test]
fn test_datenum_conversion() {
    assert_eq!(datenum_to_datetime(737791.0).unwrap(), at(2020, 1, 1, 0, 0, 0));
    assert_eq!(datenum_to_datetime(737791.75).unwrap(), at(2020, 1, 1, 18, 0, 0));
    assert!(matches!(datenum_to_datetime(f64::NAN), Err(Error::Parse(_))));
}

#[test]
fn test_time_axis_from_export() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.5), 3, 4).build();
    let chunk = build_chunk(&export).unwrap();
    let ds = chunk.get(BurstType::Burst).unwrap();

    assert_eq!(
        ds.time(),
        &[
            at(2021, 3, 1, 12, 0, 0),
            at(2021, 3, 1, 18, 0, 0),
            at(2021, 3, 2, 0, 0, 0),
        ]
    );
}

#[test]
fn test_bindist_coordinate_from_config() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4).build();
    let chunk = build_chunk(&export).unwrap();
    let ds = chunk.get(BurstType::Burst).unwrap();

    let bindist = ds.variable("bindist").unwrap();
    assert!(ds.is_coord("bindist"));
    assert!(!bindist.is_time_dependent());
    assert_eq!(ds.dim_len("bindist"), Some(4));

    let expected: Vec<f64> = (0..4).map(|i| 0.1 + 0.5 / 2.0 + 0.5 * i as f64).collect();
    assert_eq!(bindist.data.iter().copied().collect::<Vec<_>>(), expected);
}

#[test]
fn test_bindist_missing_cell_size_is_schema_error() {
    let export = ExportBuilder::new()
        .config("Plan_BurstEnabled", json!(true))
        .config("Burst_NBeams", json!(4))
        .config("Burst_NCells", json!(4))
        .config("Burst_BlankingDistance", json!(0.1))
        .time("Burst", &[datenum(date(2021, 3, 1), 0.0)])
        .build();

    assert!(matches!(build_chunk(&export), Err(Error::Schema(_))));
}

// ============================================================================
// FIELD CLASSIFICATION
// ============================================================================

#[test]
fn test_profile_and_scalar_dims() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 3, 4).build();
    let chunk = build_chunk(&export).unwrap();
    let ds = chunk.get(BurstType::Burst).unwrap();

    let velocity = ds.variable("Velocity").unwrap();
    assert_eq!(velocity.dims, vec!["time", "bindist"]);
    assert_eq!(velocity.data.shape(), &[3, 4]);
    assert_eq!(velocity.data[[2, 3]], 203.0);

    let pressure = ds.variable("Pressure").unwrap();
    assert_eq!(pressure.dims, vec!["time"]);
    assert_eq!(pressure.data.iter().copied().collect::<Vec<_>>(), vec![10.0, 11.0, 12.0]);
}

#[test]
fn test_fixed_vectors_get_private_dims() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4)
        .matrix("Burst_AHRSRotationMatrix", 2, 9)
        .matrix("Burst_Magnetometer", 2, 3)
        .matrix("Burst_Accelerometer", 2, 3)
        .build();

    let chunk = build_chunk(&export).unwrap();
    let ds = chunk.get(BurstType::Burst).unwrap();

    assert_eq!(ds.variable("AHRSRotationMatrix").unwrap().dims, vec!["time", "dimRM"]);
    assert_eq!(ds.variable("Magnetometer").unwrap().dims, vec!["time", "dimM"]);
    assert_eq!(ds.variable("Accelerometer").unwrap().dims, vec!["time", "dimA"]);
    assert_eq!(ds.dim_len("dimRM"), Some(9));
    assert!(chunk.report.unclassified.is_empty());
}

#[test]
fn test_fixed_vector_takes_observed_width() {
    // Four columns against a nominal three; also matches the cell count,
    // which must not win over the fixed-vector rule.
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4)
        .matrix("Burst_Magnetometer", 2, 4)
        .matrix("Burst_AHRSRotationMatrix", 2, 6)
        .build();

    let chunk = build_chunk(&export).unwrap();
    let ds = chunk.get(BurstType::Burst).unwrap();

    assert!(chunk.report.unclassified.is_empty());
    let magnetometer = ds.variable("Magnetometer").unwrap();
    assert_eq!(magnetometer.dims, vec!["time", "dimM"]);
    assert_eq!(ds.dim_len("dimM"), Some(4));
    assert_eq!(ds.dim_len("dimRM"), Some(6));
    assert!(chunk
        .report
        .attached
        .contains(&(BurstType::Burst, "Magnetometer".to_string())));
}

#[test]
fn test_unmatched_second_axis_is_reported_not_attached() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4)
        .matrix("Burst_Spectrum", 2, 7)
        .build();

    let chunk = build_chunk(&export).unwrap();
    let ds = chunk.get(BurstType::Burst).unwrap();

    assert!(!ds.contains("Spectrum"));
    assert!(chunk.report.is_unclassified("Burst_Spectrum"));
    let entry = chunk.report.shape_rejected().next().unwrap();
    assert_eq!(entry.shape, vec![2, 7]);
    assert_eq!(entry.reason, UnclassifiedReason::UnmatchedSecondAxis { cells: Some(4) });
}

#[test]
fn test_unknown_prefix_is_surfaced() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4)
        .series("Average_Pressure", &[1.0, 2.0])
        .series("Temperature", &[1.0, 2.0])
        .build();

    let chunk = build_chunk(&export).unwrap();
    let keys: Vec<&str> = chunk
        .report
        .unknown_prefix()
        .map(|u| u.key.as_str())
        .collect();
    assert_eq!(keys, vec!["Average_Pressure", "Temperature"]);
    assert_eq!(chunk.report.shape_rejected().count(), 0);
}

#[test]
fn test_disabled_type_fields_are_ignored() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4)
        .matrix("IBurst_Velocity", 2, 4)
        .build();

    let chunk = build_chunk(&export).unwrap();
    assert_eq!(chunk.report.ignored, vec!["IBurst_Velocity".to_string()]);
    assert!(!chunk.report.is_unclassified("IBurst_Velocity"));
}

#[test]
fn test_unsupported_ranks() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4)
        .field("Burst_Serial", json!(1234))
        .field("Burst_Cube", json!([[[1, 2], [3, 4]], [[5, 6], [7, 8]]]))
        .build();

    let chunk = build_chunk(&export).unwrap();
    for key in ["Burst_Serial", "Burst_Cube"] {
        let entry = chunk.report.unclassified.iter().find(|u| u.key == key).unwrap();
        assert_eq!(entry.reason, UnclassifiedReason::UnsupportedRank);
    }
}

#[test]
fn test_sample_count_mismatch() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4)
        .series("Burst_Extra", &[1.0, 2.0, 3.0])
        .build();

    let chunk = build_chunk(&export).unwrap();
    let entry = chunk.report.unclassified.iter().find(|u| u.key == "Burst_Extra").unwrap();
    assert_eq!(entry.reason, UnclassifiedReason::SampleCountMismatch { samples: 2 });
}

#[test]
fn test_first_sample_cell_count_conflicting_with_bindist() {
    // Config says 4 cells, the recorded cell count says 5.
    let t0 = datenum(date(2021, 3, 1), 0.0);
    let export = ExportBuilder::bursting(4, 4)
        .time("Burst", &[t0, t0 + 0.25])
        .series("Burst_NCells", &[5.0, 5.0])
        .matrix("Burst_Velocity", 2, 5)
        .build();

    let chunk = build_chunk(&export).unwrap();
    let entry = chunk.report.unclassified.iter().find(|u| u.key == "Burst_Velocity").unwrap();
    assert!(matches!(entry.reason, UnclassifiedReason::DimensionConflict { .. }));
    assert!(!chunk.get(BurstType::Burst).unwrap().contains("Velocity"));
}

#[test]
fn test_classification_is_key_order_independent() {
    let shapes = [BurstShape {
        kind: BurstType::Burst,
        samples: 2,
        cells: Some(4),
    }];

    match classify("Burst_Amplitude", &[2, 4], &shapes) {
        Classification::Attach(placement) => {
            assert_eq!(placement.kind, BurstType::Burst);
            assert_eq!(placement.name, "Amplitude");
            assert_eq!(placement.dims, vec!["time", "bindist"]);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        classify("Burst_Time", &[2], &shapes),
        Classification::TimeAxis(BurstType::Burst)
    );
    assert_eq!(
        classify("IBurst_Time", &[2], &shapes),
        Classification::Disabled(BurstType::IBurst)
    );
}

// ============================================================================
// ENRICHMENT
// ============================================================================

#[test]
fn test_config_becomes_sig_attributes() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4).build();
    let chunk = build_chunk(&export).unwrap();
    let ds = chunk.get(BurstType::Burst).unwrap();

    assert_eq!(ds.attr("SIGPlan_BurstEnabled"), Some(&AttrValue::from("True")));
    assert_eq!(ds.attr("SIGBurst_NBeams").and_then(AttrValue::as_f64), Some(4.0));
    assert_eq!(ds.attr("SIGBurst_CellSize").and_then(AttrValue::as_f64), Some(0.5));
    assert_eq!(ds.data_type(), Some("Burst"));
}

#[test]
fn test_descriptions_and_units() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4)
        .unit("Burst_Velocity", "m/s")
        .build();
    let chunk = build_chunk(&export).unwrap();
    let ds = chunk.get(BurstType::Burst).unwrap();

    let pressure = ds.variable("Pressure").unwrap();
    assert_eq!(pressure.attr("long_name"), Some(&AttrValue::from("Pressure")));
    assert_eq!(pressure.attr("units"), Some(&AttrValue::from("dBar")));
    assert_eq!(
        ds.variable("Velocity").unwrap().attr("units"),
        Some(&AttrValue::from("m/s"))
    );
}

#[test]
fn test_own_prefix_units_win_over_other_types() {
    let t0 = datenum(date(2021, 3, 1), 0.0);
    let export = ExportBuilder::bursting(5, 2)
        .time("Burst", &[t0])
        .time("IBurst", &[t0])
        .series("Burst_Pressure", &[10.0])
        .series("IBurst_Pressure", &[11.0])
        .unit("Burst_Pressure", "dBar")
        .unit("IBurst_Pressure", "Pa")
        .build();

    let chunk = build_chunk(&export).unwrap();
    let unit = |kind| {
        chunk
            .get(kind)
            .unwrap()
            .variable("Pressure")
            .unwrap()
            .attr("units")
            .cloned()
    };
    assert_eq!(unit(BurstType::Burst), Some(AttrValue::from("dBar")));
    assert_eq!(unit(BurstType::IBurst), Some(AttrValue::from("Pa")));
}

#[test]
fn test_time_text_lands_on_own_time_axis() {
    let t0 = datenum(date(2021, 3, 1), 0.0);
    let export = ExportBuilder::bursting(5, 2)
        .time("Burst", &[t0])
        .time("IBurst", &[t0])
        .description("Burst_Time", "Burst time")
        .unit("IBurst_Time", "days")
        .build();

    let chunk = build_chunk(&export).unwrap();
    let burst = chunk.get(BurstType::Burst).unwrap();
    let iburst = chunk.get(BurstType::IBurst).unwrap();

    assert_eq!(burst.time_attrs.get("long_name"), Some(&AttrValue::from("Burst time")));
    assert!(burst.time_attrs.get("units").is_none());
    assert_eq!(iburst.time_attrs.get("units"), Some(&AttrValue::from("days")));
    assert!(iburst.time_attrs.get("long_name").is_none());
}

#[test]
fn test_existing_units_are_never_overwritten() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4).build();
    let mut chunk = build_chunk(&export).unwrap();
    let burst = chunk
        .datasets
        .iter_mut()
        .find(|d| d.kind() == BurstType::Burst)
        .unwrap();
    let ds = burst.dataset_mut();
    ds.variable_mut("Pressure").unwrap().set_attr("units", "psi");

    add_units(&export, BurstType::Burst, ds);
    assert_eq!(
        ds.variable("Pressure").unwrap().attr("units"),
        Some(&AttrValue::from("psi"))
    );
}

#[test]
fn test_beam_to_xyz_matrix_is_attached_without_time() {
    let export = burst_chunk(datenum(date(2021, 3, 1), 0.0), 2, 4)
        .config(
            "Burst_Beam2xyz",
            json!([
                [1.18, 0.0, -1.18, 0.0],
                [0.0, -1.18, 0.0, 1.18],
                [0.27, 0.0, 0.27, 0.0],
                [0.0, 0.27, 0.0, 0.27]
            ]),
        )
        .build();

    let chunk = build_chunk(&export).unwrap();
    let ds = chunk.get(BurstType::Burst).unwrap();

    let matrix = ds.variable("Beam2xyz").unwrap();
    assert_eq!(matrix.dims, vec!["Beam2xyz_row", "Beam2xyz_col"]);
    assert_eq!(matrix.data.shape(), &[4, 4]);
    assert_eq!(matrix.data[[1, 3]], 1.18);
    assert!(!matrix.is_time_dependent());
    assert!(matches!(ds.attr("SIGBurst_Beam2xyz"), Some(AttrValue::Text(_))));
}

#[test]
fn test_variable_name_strips_first_prefix_only() {
    assert_eq!(variable_name("Burst_Velocity_Beam"), "Velocity_Beam");
    assert_eq!(variable_name("Plain"), "Plain");
}

// ============================================================================
// PROPERTIES
// ============================================================================

mod properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_bindist_formula(
            blanking in 0.0f64..5.0,
            cell_size in 0.01f64..4.0,
            n_cells in 0usize..200,
        ) {
            let bindist = bin_distances(blanking, cell_size, n_cells);
            prop_assert_eq!(bindist.len(), n_cells);
            for (i, d) in bindist.iter().enumerate() {
                prop_assert_eq!(*d, blanking + cell_size / 2.0 + cell_size * i as f64);
            }
        }
    }
}
