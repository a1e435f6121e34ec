//! Tabular input and output.
//!
//! Parquet tables go through Arrow record batches. The silhouette inputs can
//! also come from plain CSV files with a header line.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::compute::{cast, concat_batches};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use ndarray::Array2;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;

use crate::error::{Error, Result};

/// Supported on-disk table formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => Ok(TableFormat::Csv),
            Some("parquet") => Ok(TableFormat::Parquet),
            _ => Err(Error::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Read a whole Parquet file into a single record batch.
pub fn read_parquet(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let batches = builder
        .build()?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Load a numeric feature matrix, one row per sample.
///
/// Every column must be numeric. Nulls and `nan` cells become NaN.
pub fn read_feature_matrix(path: &Path) -> Result<Array2<f64>> {
    let (columns, values) = match TableFormat::from_path(path)? {
        TableFormat::Csv => read_csv_matrix(path)?,
        TableFormat::Parquet => read_parquet_matrix(path)?,
    };
    if columns == 0 {
        return Err(Error::EmptyInput("feature table has no columns"));
    }
    let rows = values.len() / columns;
    Ok(Array2::from_shape_vec((rows, columns), values)?)
}

/// Load cluster labels from `column`, or from the first column when `None`.
///
/// Labels must be non-negative integers; `3.0` is accepted as `3`.
pub fn read_labels(path: &Path, column: Option<&str>) -> Result<Vec<usize>> {
    match TableFormat::from_path(path)? {
        TableFormat::Csv => read_csv_labels(path, column),
        TableFormat::Parquet => read_parquet_labels(path, column),
    }
}

fn parse_error(path: &Path, row: usize, column: &str, message: impl Into<String>) -> Error {
    Error::TableParse {
        path: path.to_path_buf(),
        row,
        column: column.to_string(),
        message: message.into(),
    }
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',').map(|f| f.trim().trim_matches('"')).collect()
}

/// Returns (column count, row-major values).
fn read_csv_matrix(path: &Path) -> Result<(usize, Vec<f64>)> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(Error::EmptyInput("feature table is empty")),
    };
    let names: Vec<String> = split_fields(&header).into_iter().map(String::from).collect();

    let mut values = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = idx + 1;
        let fields = split_fields(&line);
        if fields.len() != names.len() {
            return Err(parse_error(
                path,
                row,
                "*",
                format!("expected {} fields, found {}", names.len(), fields.len()),
            ));
        }
        for (name, field) in names.iter().zip(fields) {
            let v = if field.is_empty() {
                f64::NAN
            } else {
                field
                    .parse::<f64>()
                    .map_err(|_| parse_error(path, row, name, format!("not a number: '{}'", field)))?
            };
            values.push(v);
        }
    }
    Ok((names.len(), values))
}

fn read_csv_labels(path: &Path, column: Option<&str>) -> Result<Vec<usize>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(Error::EmptyInput("label table is empty")),
    };
    let names = split_fields(&header);
    let col_idx = match column {
        Some(name) => names
            .iter()
            .position(|n| *n == name)
            .ok_or_else(|| Error::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })?,
        None => 0,
    };
    let col_name = names.get(col_idx).copied().unwrap_or("").to_string();

    let mut labels = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let row = idx + 1;
        let fields = split_fields(&line);
        // Quoted commas are not supported; they show up as extra fields here.
        if fields.len() != names.len() {
            return Err(parse_error(
                path,
                row,
                "*",
                format!("expected {} fields, found {}", names.len(), fields.len()),
            ));
        }
        let field = fields[col_idx];
        let value = field
            .parse::<f64>()
            .map_err(|_| parse_error(path, row, &col_name, format!("not a label: '{}'", field)))?;
        labels.push(to_label(value).ok_or_else(|| {
            parse_error(path, row, &col_name, format!("not a non-negative integer: {}", value))
        })?);
    }
    Ok(labels)
}

fn to_label(value: f64) -> Option<usize> {
    (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then_some(value as usize)
}

fn as_f64_column(path: &Path, name: &str, array: &ArrayRef) -> Result<Float64Array> {
    if !array.data_type().is_numeric() {
        return Err(parse_error(
            path,
            0,
            name,
            format!("non-numeric column type {}", array.data_type()),
        ));
    }
    let casted = cast(array, &DataType::Float64)?;
    casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .cloned()
        .ok_or_else(|| parse_error(path, 0, name, "cast to f64 failed"))
}

fn read_parquet_matrix(path: &Path) -> Result<(usize, Vec<f64>)> {
    let batch = read_parquet(path)?;
    let schema = batch.schema();
    let columns = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, array)| as_f64_column(path, field.name(), array))
        .collect::<Result<Vec<_>>>()?;

    let mut values = Vec::with_capacity(batch.num_rows() * columns.len());
    for row in 0..batch.num_rows() {
        for col in &columns {
            values.push(if col.is_null(row) { f64::NAN } else { col.value(row) });
        }
    }
    Ok((columns.len(), values))
}

fn read_parquet_labels(path: &Path, column: Option<&str>) -> Result<Vec<usize>> {
    let batch = read_parquet(path)?;
    let schema = batch.schema();
    let col_idx = match column {
        Some(name) => schema.index_of(name).map_err(|_| Error::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        })?,
        None => 0,
    };
    if col_idx >= batch.num_columns() {
        return Err(Error::EmptyInput("label table has no columns"));
    }
    let name = schema.field(col_idx).name().clone();
    let values = as_f64_column(path, &name, batch.column(col_idx))?;

    (0..values.len())
        .map(|row| {
            if values.is_null(row) {
                return Err(parse_error(path, row, &name, "missing label"));
            }
            let v = values.value(row);
            to_label(v).ok_or_else(|| {
                parse_error(path, row, &name, format!("not a non-negative integer: {}", v))
            })
        })
        .collect()
}
