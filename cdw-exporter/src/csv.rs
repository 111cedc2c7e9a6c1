use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::error::ExportError;
use crate::table::{decode_row, FieldSource, FieldValue, MetricsTable};

/// Nothing is created on disk when the table fails validation.
pub fn write_csv(table: &MetricsTable, path: &Path) -> Result<(), ExportError> {
    table.validate()?;
    let file = std::fs::File::create(path)?;
    write_csv_to(table, file)?;
    log::info!("wrote {} rows to {:?}", table.rows.len(), path);
    Ok(())
}

/// Validates the table, then writes a header and one record per cluster.
pub fn write_csv_to<W: Write>(table: &MetricsTable, writer: W) -> Result<(), ExportError> {
    table.validate()?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(table.columns())?;
    for row in &table.rows {
        let record: Vec<String> = table
            .encoded_fields(row)
            .into_iter()
            .map(|(_, value)| format_field(value))
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn format_field(value: FieldValue) -> String {
    match value {
        FieldValue::Integer(v) => v.to_string(),
        FieldValue::Number(v) => format_number(v),
        FieldValue::Missing => String::new(),
        FieldValue::Flag(v) => v.to_string(),
    }
}

/// Shortest representation that parses back to the same value; exponent
/// notation for very large or very small magnitudes.
fn format_number(v: f64) -> String {
    let magnitude = v.abs();
    if magnitude != 0.0 && !(1e-5..1e15).contains(&magnitude) {
        format!("{v:e}")
    } else {
        v.to_string()
    }
}

pub fn read_csv(path: &Path) -> Result<MetricsTable, ExportError> {
    read_csv_from(std::fs::File::open(path)?)
}

pub fn read_csv_from<R: Read>(reader: R) -> Result<MetricsTable, ExportError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let columns: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(index, name)| (name.trim().to_string(), index))
        .collect();
    let include_intensity = columns.contains_key("intensity_min");

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let source = CsvRecord {
            columns: &columns,
            record: &record,
        };
        rows.push(decode_row(&source, include_intensity)?);
    }
    Ok(MetricsTable::new(rows, include_intensity))
}

struct CsvRecord<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a StringRecord,
}

impl CsvRecord<'_> {
    fn cell(&self, column: &'static str) -> Result<&str, ExportError> {
        self.columns
            .get(column)
            .and_then(|&index| self.record.get(index))
            .map(str::trim)
            .ok_or(ExportError::MissingColumn(column))
    }
}

impl FieldSource for CsvRecord<'_> {
    fn number(&self, column: &'static str) -> Result<Option<f64>, ExportError> {
        let cell = self.cell(column)?;
        if cell.is_empty() {
            return Ok(None);
        }
        cell.parse::<f64>()
            .map(Some)
            .map_err(|_| ExportError::InvalidValue {
                column,
                value: cell.to_string(),
            })
    }

    fn flag(&self, column: &'static str) -> Result<bool, ExportError> {
        let cell = self.cell(column)?;
        match cell.to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ExportError::InvalidValue {
                column,
                value: cell.to_string(),
            }),
        }
    }
}
