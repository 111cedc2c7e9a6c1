use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::ExportError;
use crate::table::{decode_row, FieldSource, FieldValue, MetricsTable};

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Integer(v) => Value::from(v),
            FieldValue::Number(v) => Value::from(v),
            FieldValue::Missing => Value::Null,
            FieldValue::Flag(v) => Value::Bool(v),
        }
    }
}

/// One JSON object per cluster, keys in column order.
pub fn to_records(table: &MetricsTable) -> Result<Vec<Map<String, Value>>, ExportError> {
    table.validate()?;
    Ok(table
        .rows
        .iter()
        .map(|row| {
            table
                .encoded_fields(row)
                .into_iter()
                .map(|(name, value)| (name.to_string(), Value::from(value)))
                .collect()
        })
        .collect())
}

/// Nothing is created on disk when the table fails validation.
pub fn write_json(table: &MetricsTable, path: &Path) -> Result<(), ExportError> {
    table.validate()?;
    let file = File::create(path)?;
    write_json_to(table, BufWriter::new(file))?;
    log::info!("wrote {} records to {:?}", table.rows.len(), path);
    Ok(())
}

pub fn write_json_to<W: Write>(table: &MetricsTable, mut writer: W) -> Result<(), ExportError> {
    let records = to_records(table)?;
    serde_json::to_writer_pretty(&mut writer, &records)?;
    writer.flush()?;
    Ok(())
}

pub fn read_json(path: &Path) -> Result<MetricsTable, ExportError> {
    read_json_from(BufReader::new(File::open(path)?))
}

pub fn read_json_from<R: Read>(reader: R) -> Result<MetricsTable, ExportError> {
    let records: Vec<Map<String, Value>> = serde_json::from_reader(reader)?;
    let include_intensity = records
        .first()
        .is_some_and(|record| record.contains_key("intensity_min"));

    let rows = records
        .iter()
        .map(|record| decode_row(&JsonRecord(record), include_intensity))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(MetricsTable::new(rows, include_intensity))
}

struct JsonRecord<'a>(&'a Map<String, Value>);

impl JsonRecord<'_> {
    fn value(&self, column: &'static str) -> Result<&Value, ExportError> {
        self.0.get(column).ok_or(ExportError::MissingColumn(column))
    }
}

impl FieldSource for JsonRecord<'_> {
    fn number(&self, column: &'static str) -> Result<Option<f64>, ExportError> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::Number(n) => n.as_f64().map(Some).ok_or(ExportError::InvalidValue {
                column,
                value: n.to_string(),
            }),
            other => Err(ExportError::InvalidValue {
                column,
                value: other.to_string(),
            }),
        }
    }

    fn flag(&self, column: &'static str) -> Result<bool, ExportError> {
        match self.value(column)? {
            Value::Bool(v) => Ok(*v),
            other => Err(ExportError::InvalidValue {
                column,
                value: other.to_string(),
            }),
        }
    }
}
