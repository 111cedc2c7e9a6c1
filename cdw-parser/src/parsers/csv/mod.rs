use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder, StringRecord};

use cdw_core::pointcloud::point::{Point, PointAttributes, PointCloud};

use super::{Parser, ParserProvider};
use crate::error::ParseError;

/// Canonical column names and the header spellings accepted for them.
/// Headers are compared without case, underscores or hyphens.
const COLUMNS: &[(&str, &[&str])] = &[
    ("x", &["x"]),
    ("y", &["y"]),
    ("z", &["z", "elevation"]),
    ("hag", &["hag", "height_above_ground", "heightaboveground"]),
    ("intensity", &["intensity"]),
    ("classification", &["classification", "class"]),
];

pub struct CsvParserProvider {
    pub filenames: Vec<PathBuf>,
}

impl ParserProvider for CsvParserProvider {
    fn get_parser(&self) -> Box<dyn Parser> {
        Box::new(CsvParser {
            filenames: self.filenames.clone(),
        })
    }
}

pub struct CsvParser {
    pub filenames: Vec<PathBuf>,
}

impl Parser for CsvParser {
    fn parse(&self) -> Result<PointCloud, ParseError> {
        let mut points = Vec::new();
        for filename in &self.filenames {
            let start = std::time::Instant::now();
            let before = points.len();
            read_file(filename, &mut points)?;
            log::info!(
                "read {} points from {:?} in {:?}",
                points.len() - before,
                filename,
                start.elapsed()
            );
        }
        Ok(PointCloud::new(points))
    }
}

fn read_file(path: &Path, points: &mut Vec<Point>) -> Result<(), ParseError> {
    let delimiter = sniff_delimiter(path)?;
    let mut builder = ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All);

    if delimiter == b' ' {
        // runs of spaces separate one field; line numbers are kept
        let text = std::fs::read_to_string(path)?;
        let collapsed = text
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n");
        read_records(builder.from_reader(collapsed.as_bytes()), points)
    } else {
        read_records(builder.from_path(path)?, points)
    }
}

fn read_records<R: Read>(
    mut reader: Reader<R>,
    points: &mut Vec<Point>,
) -> Result<(), ParseError> {
    let field_mapping = create_field_mapping(reader.headers()?)?;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());

        let x = parse_required(&record, &field_mapping, "x", line)?;
        let y = parse_required(&record, &field_mapping, "y", line)?;
        let z = parse_required(&record, &field_mapping, "z", line)?;

        let attributes = PointAttributes {
            intensity: parse_optional_field(&record, &field_mapping, "intensity", line)?,
            classification: parse_optional_field(
                &record,
                &field_mapping,
                "classification",
                line,
            )?,
        };

        points.push(Point {
            x,
            y,
            z,
            hag: parse_optional_field(&record, &field_mapping, "hag", line)?,
            attributes,
        });
    }
    Ok(())
}

/// Picks the separator that occurs most often in the header line. Ties go to
/// the earlier candidate, so `x, y, z` stays comma separated.
fn sniff_delimiter(path: &Path) -> Result<u8, ParseError> {
    let mut header = String::new();
    BufReader::new(File::open(path)?).read_line(&mut header)?;

    let mut best = (b',', 0);
    for delimiter in [b',', b'\t', b';', b' '] {
        let count = header.bytes().filter(|&b| b == delimiter).count();
        if count > best.1 {
            best = (delimiter, count);
        }
    }
    Ok(best.0)
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(['_', '-'], "")
}

fn create_field_mapping(
    headers: &StringRecord,
) -> Result<HashMap<&'static str, usize>, ParseError> {
    let mut mapping = HashMap::new();

    for (index, header) in headers.iter().enumerate() {
        let normalized_header = normalize_header(header);
        for (name, aliases) in COLUMNS {
            if aliases
                .iter()
                .any(|alias| normalize_header(alias) == normalized_header)
            {
                mapping.entry(*name).or_insert(index);
                break;
            }
        }
    }

    for name in ["x", "y", "z"] {
        if !mapping.contains_key(name) {
            return Err(ParseError::MissingField(name));
        }
    }

    Ok(mapping)
}

fn get_field_value<'a>(
    record: &'a StringRecord,
    field_mapping: &HashMap<&'static str, usize>,
    field_name: &str,
) -> Option<&'a str> {
    field_mapping
        .get(field_name)
        .and_then(|&index| record.get(index))
}

fn parse_required(
    record: &StringRecord,
    field_mapping: &HashMap<&'static str, usize>,
    field_name: &'static str,
    line: u64,
) -> Result<f64, ParseError> {
    parse_optional_field(record, field_mapping, field_name, line)?
        .ok_or(ParseError::MissingField(field_name))
}

fn parse_optional_field<T: std::str::FromStr>(
    record: &StringRecord,
    field_mapping: &HashMap<&'static str, usize>,
    field_name: &'static str,
    line: u64,
) -> Result<Option<T>, ParseError> {
    match get_field_value(record, field_mapping, field_name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ParseError::InvalidNumber {
                field: field_name,
                value: value.to_string(),
                line,
            }),
        _ => Ok(None),
    }
}
