//! Test utilities for building instrument exports and tide files
#![allow(dead_code)]

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use mooring_convert::RawExport;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;

/// Day number of `date` plus a fraction of a day, in the instrument's
/// days-since-year-0 convention.
///
/// Use dyadic fractions (0.5, 0.25, ...) so the value is exact in `f64`.
pub fn datenum(date: NaiveDate, fraction: f64) -> f64 {
    f64::from(date.num_days_from_ce() + 366) + fraction
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, mi, s).unwrap()
}

/// Builder for raw Signature exports
pub struct ExportBuilder {
    config: Map<String, Value>,
    data: Map<String, Value>,
    descriptions: Map<String, Value>,
    units: Map<String, Value>,
}

impl ExportBuilder {
    /// Empty export: no settings, no fields
    pub fn new() -> Self {
        Self {
            config: Map::new(),
            data: Map::new(),
            descriptions: Map::new(),
            units: Map::new(),
        }
    }

    /// Bursting enabled with the given beam and cell counts
    /// (blanking 0.1 m, cell size 0.5 m, raw altimeter off)
    pub fn bursting(beams: u32, cells: u32) -> Self {
        Self::new()
            .config("Plan_BurstEnabled", json!("True"))
            .config("Burst_NBeams", json!(beams))
            .config("Burst_NCells", json!(cells))
            .config("Burst_CellSize", json!(0.5))
            .config("Burst_BlankingDistance", json!(0.1))
            .config("Burst_RawAltimeter", json!(0))
    }

    pub fn config(mut self, key: &str, value: Value) -> Self {
        self.config.insert(key.to_string(), value);
        self
    }

    pub fn field(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }

    /// `<kind>_Time` from day numbers
    pub fn time(self, kind: &str, datenums: &[f64]) -> Self {
        let key = format!("{}_Time", kind);
        self.field(&key, json!(datenums))
    }

    /// Rank-1 field
    pub fn series(self, key: &str, values: &[f64]) -> Self {
        self.field(key, json!(values))
    }

    /// Rank-2 field of `rows` x `cols` filled with `row * 100 + col`
    pub fn matrix(self, key: &str, rows: usize, cols: usize) -> Self {
        let value: Vec<Vec<f64>> = (0..rows)
            .map(|r| (0..cols).map(|c| (r * 100 + c) as f64).collect())
            .collect();
        self.field(key, json!(value))
    }

    pub fn description(mut self, key: &str, text: &str) -> Self {
        self.descriptions.insert(key.to_string(), json!(text));
        self
    }

    pub fn unit(mut self, key: &str, text: &str) -> Self {
        self.units.insert(key.to_string(), json!(text));
        self
    }

    pub fn to_json(&self) -> String {
        json!({
            "Config": self.config,
            "Data": self.data,
            "Descriptions": self.descriptions,
            "Units": self.units,
        })
        .to_string()
    }

    pub fn build(&self) -> RawExport {
        RawExport::from_json_slice(self.to_json().as_bytes()).unwrap()
    }

    pub fn write_to(&self, path: &Path) {
        fs::write(path, self.to_json()).unwrap();
    }
}

/// A Burst-only chunk with `samples` samples starting at `start`, one
/// profile field and one scalar field.
pub fn burst_chunk(start: f64, samples: usize, cells: u32) -> ExportBuilder {
    let times: Vec<f64> = (0..samples).map(|i| start + i as f64 * 0.25).collect();
    let pressure: Vec<f64> = (0..samples).map(|i| 10.0 + i as f64).collect();
    ExportBuilder::bursting(4, cells)
        .time("Burst", &times)
        .series("Burst_Pressure", &pressure)
        .series("Burst_NCells", &vec![f64::from(cells); samples])
        .matrix("Burst_Velocity", samples, cells as usize)
        .unit("Burst_Pressure", "dBar")
        .description("Burst_Pressure", "Pressure")
}

/// Builder for `.tid` text
pub struct TideBuilder {
    lines: Vec<String>,
}

impl TideBuilder {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn record(mut self, sample: i64, date: &str, time: &str, psia: f64, temp: f64) -> Self {
        self.lines
            .push(format!("{:6} {} {} {:10.4} {:8.4}", sample, date, time, psia, temp));
        self
    }

    pub fn raw_line(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn build(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}
