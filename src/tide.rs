//! Seagauge tide record parsing.
//!
//! A `.tid` file holds one record per line with five whitespace-separated
//! columns: sample index, date, time, pressure (psia) and temperature.

use crate::dataset::{AttrValue, Attrs, Dataset, Variable, TIME_DIM};
use crate::error::{Error, Result};
use chrono::NaiveDateTime;

/// psia per dbar / 10; `dbar = psia / PSI_PER_DBAR_DIV10 * 10`.
pub const PSI_PER_DBAR_DIV10: f64 = 14.503773800722;

const DATETIME_FORMATS: [&str; 2] = ["%m/%d/%Y %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

#[derive(Debug, Clone, PartialEq)]
pub struct TideRecord {
    pub sample: i64,
    pub time: NaiveDateTime,
    /// Absolute pressure in psia, as recorded.
    pub pressure: f64,
    pub temperature: f64,
}

/// Convert absolute pressure from psia to dbar.
pub fn psia_to_dbar(psia: f64) -> f64 {
    psia / PSI_PER_DBAR_DIV10 * 10.0
}

fn parse_datetime(date: &str, time: &str, line_no: usize) -> Result<NaiveDateTime> {
    let joined = format!("{} {}", date, time);
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&joined, fmt).ok())
        .ok_or_else(|| Error::Parse(format!("line {}: invalid date/time '{}'", line_no, joined)))
}

fn parse_number<T: std::str::FromStr>(token: &str, column: &str, line_no: usize) -> Result<T> {
    token
        .parse()
        .map_err(|_| Error::Parse(format!("line {}: invalid {} '{}'", line_no, column, token)))
}

/// Parse one record line. `line_no` is 1-based and only used in errors.
pub fn parse_record(line: &str, line_no: usize) -> Result<TideRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [sample, date, time, pressure, temperature] = fields.as_slice() else {
        return Err(Error::Parse(format!(
            "line {}: expected 5 columns, found {}",
            line_no,
            fields.len()
        )));
    };

    Ok(TideRecord {
        sample: parse_number(sample, "sample index", line_no)?,
        time: parse_datetime(date, time, line_no)?,
        pressure: parse_number(pressure, "pressure", line_no)?,
        temperature: parse_number(temperature, "temperature", line_no)?,
    })
}

/// Parse every record in file order. Blank lines are skipped; any other
/// malformed line fails the whole parse.
pub fn parse_records(text: &str) -> Result<Vec<TideRecord>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_record(line, idx + 1))
        .collect()
}

/// Build the raw tide dataset. Pressure is converted to dbar.
pub fn records_to_dataset(records: &[TideRecord]) -> Result<Dataset> {
    let mut ds = Dataset::with_time(records.iter().map(|r| r.time).collect());

    let sample = records.iter().map(|r| r.sample as f64).collect();
    let pressure = records.iter().map(|r| psia_to_dbar(r.pressure)).collect();
    let temperature = records.iter().map(|r| r.temperature).collect();

    ds.insert_variable("Sample", Variable::from_vec(TIME_DIM, sample))?;
    ds.insert_variable("P_1", Variable::from_vec(TIME_DIM, pressure))?;
    ds.insert_variable("Temp", Variable::from_vec(TIME_DIM, temperature))?;
    Ok(ds)
}

/// Parse the `*`-prefixed header of a `.hex` file into metadata entries.
///
/// Header lines look like `* key = value` or `* key: value`; lines without
/// a separator are ignored. Parsing stops at the first non-header line.
pub fn parse_hex_header(text: &str) -> Attrs {
    let mut attrs = Attrs::new();
    for line in text.lines() {
        let Some(body) = line.trim_start().strip_prefix('*') else {
            break;
        };
        let split = body.split_once('=').or_else(|| body.split_once(':'));
        let Some((key, value)) = split else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        let value = match value.parse::<f64>() {
            Ok(n) => AttrValue::Number(n),
            Err(_) => AttrValue::Text(value.to_string()),
        };
        attrs.insert(key.to_string(), value);
    }
    attrs
}
