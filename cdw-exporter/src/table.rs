use cdw_core::metrics::MetricsRow;

use crate::error::ExportError;

/// Finite stand-in for `+inf` in interchange formats that cannot carry it.
pub const INFINITY_SENTINEL: f64 = f64::MAX;

/// Every column, in output order.
pub const COLUMNS: [&str; 38] = [
    "cluster_id",
    "centroid_x",
    "centroid_y",
    "pixel_count",
    "area_m2",
    "perimeter_m",
    "compactness",
    "bbox_height_m",
    "bbox_width_m",
    "length_m",
    "width_m",
    "orientation_deg",
    "elongation",
    "convex_area_m2",
    "convex_perimeter_m",
    "solidity",
    "hag_min_m",
    "hag_max_m",
    "hag_mean_m",
    "hag_std_m",
    "hag_median_m",
    "hag_p25_m",
    "hag_p75_m",
    "z_min_m",
    "z_max_m",
    "z_mean_m",
    "z_std_m",
    "z_range_m",
    "intensity_min",
    "intensity_max",
    "intensity_mean",
    "intensity_std",
    "point_count",
    "point_density_per_m2",
    "length_width_ratio",
    "is_elongated",
    "is_low_height",
    "cwd_score",
];

/// Columns that may legitimately hold `+inf` (a zero-width cluster).
pub const UNBOUNDED_COLUMNS: [&str; 3] = ["elongation", "length_width_ratio", "cwd_score"];

pub const INTENSITY_COLUMNS: [&str; 4] = [
    "intensity_min",
    "intensity_max",
    "intensity_mean",
    "intensity_std",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Integer(u64),
    Number(f64),
    /// No data for this statistic.
    Missing,
    Flag(bool),
}

/// Rows ready to be written, ordered by cluster id.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsTable {
    pub rows: Vec<MetricsRow>,
    /// Intensity columns are only emitted for point clouds that carry intensity.
    pub include_intensity: bool,
}

impl MetricsTable {
    pub fn new(mut rows: Vec<MetricsRow>, include_intensity: bool) -> Self {
        rows.sort_by_key(|row| row.cluster_id);
        Self {
            rows,
            include_intensity,
        }
    }

    pub fn columns(&self) -> Vec<&'static str> {
        COLUMNS
            .into_iter()
            .filter(|name| self.include_intensity || !INTENSITY_COLUMNS.contains(name))
            .collect()
    }

    /// Fails on the first NaN, or on an infinity outside the unbounded columns.
    pub fn validate(&self) -> Result<(), ExportError> {
        for row in &self.rows {
            for (field, value) in row_fields(row) {
                let valid = match value {
                    FieldValue::Number(v) if v.is_nan() => false,
                    FieldValue::Number(v) if v == f64::INFINITY => {
                        UNBOUNDED_COLUMNS.contains(&field)
                    }
                    FieldValue::Number(v) => v.is_finite(),
                    _ => true,
                };
                if !valid {
                    return Err(ExportError::Serialization {
                        cluster_id: row.cluster_id,
                        field,
                    });
                }
            }
        }
        Ok(())
    }

    /// The row's fields for the emitted columns, with `+inf` replaced by
    /// [`INFINITY_SENTINEL`].
    pub fn encoded_fields(&self, row: &MetricsRow) -> Vec<(&'static str, FieldValue)> {
        row_fields(row)
            .into_iter()
            .filter(|(name, _)| self.include_intensity || !INTENSITY_COLUMNS.contains(name))
            .map(|(name, value)| match value {
                FieldValue::Number(v) if v == f64::INFINITY => {
                    (name, FieldValue::Number(INFINITY_SENTINEL))
                }
                other => (name, other),
            })
            .collect()
    }
}

fn optional(value: Option<f64>) -> FieldValue {
    value.map_or(FieldValue::Missing, FieldValue::Number)
}

/// All fields of a row, in [`COLUMNS`] order.
pub fn row_fields(row: &MetricsRow) -> Vec<(&'static str, FieldValue)> {
    use FieldValue::{Flag, Integer, Number};

    vec![
        ("cluster_id", Integer(u64::from(row.cluster_id))),
        ("centroid_x", Number(row.centroid_x)),
        ("centroid_y", Number(row.centroid_y)),
        ("pixel_count", Integer(row.pixel_count as u64)),
        ("area_m2", Number(row.area_m2)),
        ("perimeter_m", Number(row.perimeter_m)),
        ("compactness", Number(row.compactness)),
        ("bbox_height_m", Number(row.bbox_height_m)),
        ("bbox_width_m", Number(row.bbox_width_m)),
        ("length_m", Number(row.length_m)),
        ("width_m", Number(row.width_m)),
        ("orientation_deg", Number(row.orientation_deg)),
        ("elongation", Number(row.elongation)),
        ("convex_area_m2", Number(row.convex_area_m2)),
        ("convex_perimeter_m", Number(row.convex_perimeter_m)),
        ("solidity", Number(row.solidity)),
        ("hag_min_m", optional(row.hag_min_m)),
        ("hag_max_m", optional(row.hag_max_m)),
        ("hag_mean_m", optional(row.hag_mean_m)),
        ("hag_std_m", optional(row.hag_std_m)),
        ("hag_median_m", optional(row.hag_median_m)),
        ("hag_p25_m", optional(row.hag_p25_m)),
        ("hag_p75_m", optional(row.hag_p75_m)),
        ("z_min_m", optional(row.z_min_m)),
        ("z_max_m", optional(row.z_max_m)),
        ("z_mean_m", optional(row.z_mean_m)),
        ("z_std_m", optional(row.z_std_m)),
        ("z_range_m", optional(row.z_range_m)),
        ("intensity_min", optional(row.intensity_min)),
        ("intensity_max", optional(row.intensity_max)),
        ("intensity_mean", optional(row.intensity_mean)),
        ("intensity_std", optional(row.intensity_std)),
        ("point_count", Integer(row.point_count as u64)),
        ("point_density_per_m2", Number(row.point_density_per_m2)),
        ("length_width_ratio", Number(row.length_width_ratio)),
        ("is_elongated", Flag(row.is_elongated)),
        ("is_low_height", Flag(row.is_low_height)),
        ("cwd_score", Number(row.cwd_score)),
    ]
}

/// Column lookup over one stored record, implemented per format.
pub trait FieldSource {
    /// `Ok(None)` for an empty cell or null; `MissingColumn` when the column
    /// itself is absent.
    fn number(&self, column: &'static str) -> Result<Option<f64>, ExportError>;

    fn flag(&self, column: &'static str) -> Result<bool, ExportError>;
}

fn required<S: FieldSource + ?Sized>(src: &S, column: &'static str) -> Result<f64, ExportError> {
    let value = src.number(column)?.ok_or(ExportError::InvalidValue {
        column,
        value: String::new(),
    })?;
    if UNBOUNDED_COLUMNS.contains(&column) && value >= INFINITY_SENTINEL {
        return Ok(f64::INFINITY);
    }
    Ok(value)
}

fn integer<S: FieldSource + ?Sized>(src: &S, column: &'static str) -> Result<u64, ExportError> {
    let value = required(src, column)?;
    if value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(ExportError::InvalidValue {
            column,
            value: value.to_string(),
        });
    }
    Ok(value as u64)
}

/// Rebuilds a row from a stored record.
pub fn decode_row<S: FieldSource + ?Sized>(
    src: &S,
    include_intensity: bool,
) -> Result<MetricsRow, ExportError> {
    let intensity = |column: &'static str| -> Result<Option<f64>, ExportError> {
        if include_intensity {
            src.number(column)
        } else {
            Ok(None)
        }
    };
    let cluster_id = integer(src, "cluster_id")?;

    Ok(MetricsRow {
        cluster_id: u32::try_from(cluster_id).map_err(|_| ExportError::InvalidValue {
            column: "cluster_id",
            value: cluster_id.to_string(),
        })?,
        centroid_x: required(src, "centroid_x")?,
        centroid_y: required(src, "centroid_y")?,
        pixel_count: integer(src, "pixel_count")? as usize,
        area_m2: required(src, "area_m2")?,
        perimeter_m: required(src, "perimeter_m")?,
        compactness: required(src, "compactness")?,
        bbox_height_m: required(src, "bbox_height_m")?,
        bbox_width_m: required(src, "bbox_width_m")?,
        length_m: required(src, "length_m")?,
        width_m: required(src, "width_m")?,
        orientation_deg: required(src, "orientation_deg")?,
        elongation: required(src, "elongation")?,
        convex_area_m2: required(src, "convex_area_m2")?,
        convex_perimeter_m: required(src, "convex_perimeter_m")?,
        solidity: required(src, "solidity")?,
        hag_min_m: src.number("hag_min_m")?,
        hag_max_m: src.number("hag_max_m")?,
        hag_mean_m: src.number("hag_mean_m")?,
        hag_std_m: src.number("hag_std_m")?,
        hag_median_m: src.number("hag_median_m")?,
        hag_p25_m: src.number("hag_p25_m")?,
        hag_p75_m: src.number("hag_p75_m")?,
        z_min_m: src.number("z_min_m")?,
        z_max_m: src.number("z_max_m")?,
        z_mean_m: src.number("z_mean_m")?,
        z_std_m: src.number("z_std_m")?,
        z_range_m: src.number("z_range_m")?,
        intensity_min: intensity("intensity_min")?,
        intensity_max: intensity("intensity_max")?,
        intensity_mean: intensity("intensity_mean")?,
        intensity_std: intensity("intensity_std")?,
        point_count: integer(src, "point_count")? as usize,
        point_density_per_m2: required(src, "point_density_per_m2")?,
        length_width_ratio: required(src, "length_width_ratio")?,
        is_elongated: src.flag("is_elongated")?,
        is_low_height: src.flag("is_low_height")?,
        cwd_score: required(src, "cwd_score")?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_row(cluster_id: u32) -> MetricsRow {
        MetricsRow {
            cluster_id,
            centroid_x: 512_345.125,
            centroid_y: 6_789_012.875,
            pixel_count: 100,
            area_m2: 4.0,
            perimeter_m: 7.2,
            compactness: 0.969_627_362_011_921,
            bbox_height_m: 2.0,
            bbox_width_m: 2.0,
            length_m: 2.0,
            width_m: 0.25,
            orientation_deg: 33.5,
            elongation: 8.0,
            convex_area_m2: 4.1,
            convex_perimeter_m: 8.05,
            solidity: 0.975_609_756_097_561,
            hag_min_m: Some(0.12),
            hag_max_m: Some(0.9),
            hag_mean_m: Some(0.41),
            hag_std_m: Some(0.173),
            hag_median_m: Some(0.4),
            hag_p25_m: Some(0.3),
            hag_p75_m: Some(0.55),
            z_min_m: Some(101.2),
            z_max_m: Some(102.0),
            z_mean_m: Some(101.5),
            z_std_m: Some(0.2),
            z_range_m: Some(0.8),
            intensity_min: Some(12.0),
            intensity_max: Some(88.0),
            intensity_mean: Some(41.25),
            intensity_std: Some(19.5),
            point_count: 57,
            point_density_per_m2: 14.25,
            length_width_ratio: 8.0,
            is_elongated: true,
            is_low_height: true,
            cwd_score: 0.8,
        }
    }

    #[test]
    fn row_fields_follow_column_order() {
        let names: Vec<&str> = row_fields(&sample_row(1)).into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, COLUMNS.to_vec());
    }

    #[test]
    fn intensity_columns_are_optional() {
        let with = MetricsTable::new(vec![], true);
        let without = MetricsTable::new(vec![], false);
        assert_eq!(with.columns().len(), 38);
        assert_eq!(without.columns().len(), 34);
        assert!(!without.columns().contains(&"intensity_mean"));
        assert_eq!(without.columns()[28], "point_count");
    }

    #[test]
    fn rows_are_sorted_by_cluster_id() {
        let table = MetricsTable::new(vec![sample_row(9), sample_row(2), sample_row(5)], true);
        let ids: Vec<u32> = table.rows.iter().map(|r| r.cluster_id).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn infinity_is_only_allowed_in_unbounded_columns() {
        let mut row = sample_row(4);
        row.elongation = f64::INFINITY;
        row.length_width_ratio = f64::INFINITY;
        row.cwd_score = f64::INFINITY;
        let table = MetricsTable::new(vec![row.clone()], true);
        table.validate().unwrap();

        let encoded = table.encoded_fields(&row);
        assert!(encoded.contains(&("elongation", FieldValue::Number(INFINITY_SENTINEL))));
        assert!(encoded.contains(&("cwd_score", FieldValue::Number(INFINITY_SENTINEL))));

        row.solidity = f64::INFINITY;
        let err = MetricsTable::new(vec![row], true).validate().unwrap_err();
        assert!(matches!(
            err,
            ExportError::Serialization {
                cluster_id: 4,
                field: "solidity"
            }
        ));
    }

    #[test]
    fn nan_is_rejected_everywhere() {
        let mut row = sample_row(6);
        row.hag_std_m = Some(f64::NAN);
        let err = MetricsTable::new(vec![row], true).validate().unwrap_err();
        assert!(matches!(
            err,
            ExportError::Serialization {
                cluster_id: 6,
                field: "hag_std_m"
            }
        ));

        let mut row = sample_row(7);
        row.elongation = f64::NAN;
        assert!(MetricsTable::new(vec![row], true).validate().is_err());

        let mut row = sample_row(8);
        row.cwd_score = f64::NEG_INFINITY;
        assert!(MetricsTable::new(vec![row], true).validate().is_err());
    }
}
