use arrow::array::{
    Array, ArrayRef, FixedSizeListArray, Float64Array, Int32Array, RecordBatch,
    TimestampNanosecondArray,
};
use arrow::datatypes::{DataType, Field, FieldRef, Schema, TimeUnit};
use chrono::{DateTime, Duration, NaiveDateTime};
use log::debug;
use ndarray::{ArrayD, IxDyn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use crate::dataset::{Attrs, Dataset, Variable, TIME_DIM};
use crate::error::{Error, Result};

/// Schema metadata key holding the JSON dataset header.
const HEADER_KEY: &str = "dataset";

/// How the `time` column is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeEncoding {
    /// 64-bit nanosecond timestamps.
    #[default]
    Nanoseconds,
    /// 32-bit integer seconds since the first sample.
    Int32Seconds,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "snake_case")]
enum TimeHeader {
    Nanoseconds,
    Int32Seconds { units: String, epoch: NaiveDateTime },
}

#[derive(Debug, Serialize, Deserialize)]
struct VariableHeader {
    name: String,
    dims: Vec<String>,
    shape: Vec<usize>,
    #[serde(default)]
    coord: bool,
    #[serde(default)]
    attrs: Attrs,
    /// Inline values for variables without a time axis or without any
    /// value per sample; NaN is stored as null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveHeader {
    attrs: Attrs,
    time: TimeHeader,
    #[serde(default)]
    time_attrs: Attrs,
    variables: Vec<VariableHeader>,
}

fn list_item_field() -> FieldRef {
    Arc::new(Field::new_list_field(DataType::Float64, true))
}

/// Values per time sample for a time-dependent variable.
fn row_width(variable: &Variable) -> usize {
    variable.data.shape().iter().skip(1).product()
}

fn encode_time(time: &[NaiveDateTime], encoding: TimeEncoding) -> Result<(ArrayRef, TimeHeader)> {
    match encoding {
        TimeEncoding::Nanoseconds => {
            let nanos = time
                .iter()
                .map(|t| {
                    t.and_utc()
                        .timestamp_nanos_opt()
                        .ok_or_else(|| Error::Archive(format!("time {} out of range", t)))
                })
                .collect::<Result<Vec<i64>>>()?;
            Ok((
                Arc::new(TimestampNanosecondArray::from(nanos)),
                TimeHeader::Nanoseconds,
            ))
        }
        TimeEncoding::Int32Seconds => {
            let epoch = time.first().copied().unwrap_or_default();
            let seconds = time
                .iter()
                .map(|t| {
                    i32::try_from((*t - epoch).num_seconds()).map_err(|_| {
                        Error::Archive(format!("time {} does not fit a 32-bit encoding", t))
                    })
                })
                .collect::<Result<Vec<i32>>>()?;
            let units = format!("seconds since {}", epoch.format("%Y-%m-%d %H:%M:%S"));
            Ok((
                Arc::new(Int32Array::from(seconds)),
                TimeHeader::Int32Seconds { units, epoch },
            ))
        }
    }
}

fn time_data_type(encoding: TimeEncoding) -> DataType {
    match encoding {
        TimeEncoding::Nanoseconds => DataType::Timestamp(TimeUnit::Nanosecond, None),
        TimeEncoding::Int32Seconds => DataType::Int32,
    }
}

/// Write `ds` to a single archive file at `output_path`.
///
/// Time-dependent variables become one column each (a fixed-size list when
/// they have trailing axes); everything else, including time variables with
/// an empty trailing axis, travels in the JSON header.
pub fn write_archive(ds: &Dataset, output_path: &Path, encoding: TimeEncoding) -> Result<()> {
    let (time_array, time_header) = encode_time(ds.time(), encoding)?;

    let mut fields = vec![Field::new(TIME_DIM, time_data_type(encoding), false)];
    let mut arrays: Vec<ArrayRef> = vec![time_array];
    let mut headers = Vec::new();

    for (name, variable) in ds.variables() {
        let mut header = VariableHeader {
            name: name.clone(),
            dims: variable.dims.clone(),
            shape: variable.data.shape().to_vec(),
            coord: ds.is_coord(name),
            attrs: variable.attrs.clone(),
            values: None,
        };

        // A zero-width list column cannot carry a row count.
        if !variable.is_time_dependent() || row_width(variable) == 0 {
            header.values = Some(
                variable
                    .data
                    .iter()
                    .map(|v| if v.is_nan() { None } else { Some(*v) })
                    .collect(),
            );
            headers.push(header);
            continue;
        }

        let flat: Vec<f64> = variable.data.iter().copied().collect();
        if variable.data.ndim() == 1 {
            fields.push(Field::new(name.as_str(), DataType::Float64, false));
            arrays.push(Arc::new(Float64Array::from(flat)));
        } else {
            let width = i32::try_from(row_width(variable))
                .map_err(|_| Error::Archive(format!("variable '{}' is too wide", name)))?;
            let list = FixedSizeListArray::try_new(
                list_item_field(),
                width,
                Arc::new(Float64Array::from(flat)),
                None,
            )?;
            fields.push(Field::new(
                name.as_str(),
                DataType::FixedSizeList(list_item_field(), width),
                false,
            ));
            arrays.push(Arc::new(list));
        }
        headers.push(header);
    }

    let header = ArchiveHeader {
        attrs: ds.attrs.clone(),
        time: time_header,
        time_attrs: ds.time_attrs.clone(),
        variables: headers,
    };
    let mut metadata = HashMap::new();
    metadata.insert(HEADER_KEY.to_string(), serde_json::to_string(&header)?);

    let schema = Arc::new(Schema::new_with_metadata(fields, metadata));
    let batch = RecordBatch::try_new(schema.clone(), arrays)?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(output_path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;

    writer.write(&batch)?;
    writer.close()?;

    debug!("wrote {} sample(s) to {}", ds.len(), output_path.display());
    Ok(())
}

fn decode_time(column: &dyn Array, header: &TimeHeader, out: &mut Vec<NaiveDateTime>) -> Result<()> {
    match header {
        TimeHeader::Nanoseconds => {
            let values = column
                .as_any()
                .downcast_ref::<TimestampNanosecondArray>()
                .ok_or_else(|| Error::Archive("time column is not a nanosecond timestamp".to_string()))?;
            for ns in values.values().iter() {
                let t = DateTime::from_timestamp(ns.div_euclid(1_000_000_000), ns.rem_euclid(1_000_000_000) as u32)
                    .ok_or_else(|| Error::Archive(format!("timestamp {} out of range", ns)))?;
                out.push(t.naive_utc());
            }
        }
        TimeHeader::Int32Seconds { epoch, .. } => {
            let values = column
                .as_any()
                .downcast_ref::<Int32Array>()
                .ok_or_else(|| Error::Archive("time column is not a 32-bit integer".to_string()))?;
            for s in values.values().iter() {
                out.push(*epoch + Duration::seconds(i64::from(*s)));
            }
        }
    }
    Ok(())
}

fn decode_column(column: &dyn Array, name: &str, out: &mut Vec<f64>) -> Result<()> {
    if let Some(values) = column.as_any().downcast_ref::<Float64Array>() {
        out.extend_from_slice(values.values());
        return Ok(());
    }
    let list = column
        .as_any()
        .downcast_ref::<FixedSizeListArray>()
        .ok_or_else(|| Error::Archive(format!("column '{}' has an unexpected type", name)))?;
    for i in 0..list.len() {
        let row = list.value(i);
        let values = row
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| Error::Archive(format!("column '{}' is not a list of doubles", name)))?;
        out.extend_from_slice(values.values());
    }
    Ok(())
}

/// Read an archive written by [`write_archive`].
pub fn read_archive(path: &Path) -> Result<Dataset> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let header_json = builder
        .schema()
        .metadata()
        .get(HEADER_KEY)
        .cloned()
        .ok_or_else(|| Error::Archive(format!("{} has no dataset header", path.display())))?;
    let header: ArchiveHeader = serde_json::from_str(&header_json)?;

    let mut time = Vec::new();
    let mut columns: HashMap<String, Vec<f64>> = HashMap::new();
    for batch in builder.build()? {
        let batch = batch?;
        let time_column = batch
            .column_by_name(TIME_DIM)
            .ok_or_else(|| Error::Archive(format!("{} has no time column", path.display())))?;
        decode_time(time_column.as_ref(), &header.time, &mut time)?;

        for var in header.variables.iter().filter(|v| v.values.is_none()) {
            let column = batch
                .column_by_name(&var.name)
                .ok_or_else(|| Error::Archive(format!("missing column '{}'", var.name)))?;
            decode_column(column.as_ref(), &var.name, columns.entry(var.name.clone()).or_default())?;
        }
    }

    let samples = time.len();
    let mut ds = Dataset::with_time(time);
    ds.attrs = header.attrs;
    ds.time_attrs = header.time_attrs;

    for var in header.variables {
        let (shape, flat) = match var.values {
            Some(values) => (
                var.shape,
                values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect(),
            ),
            None => {
                let mut shape = var.shape;
                if let Some(first) = shape.first_mut() {
                    *first = samples;
                }
                (shape, columns.remove(&var.name).unwrap_or_default())
            }
        };
        let data = ArrayD::from_shape_vec(IxDyn(&shape), flat)?;
        let mut variable = Variable::new(var.dims, data)?;
        variable.attrs = var.attrs;
        if var.coord {
            ds.insert_coord_variable(&var.name, variable)?;
        } else {
            ds.insert_variable(var.name, variable)?;
        }
    }

    Ok(ds)
}
