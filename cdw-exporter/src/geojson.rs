use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ExportError;
use crate::json::to_records;
use crate::table::MetricsTable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

/// A point feature at each cluster centroid, carrying the full row as
/// properties.
pub fn centroid_collection(table: &MetricsTable) -> Result<FeatureCollection, ExportError> {
    let records = to_records(table)?;
    let features = table
        .rows
        .iter()
        .zip(records)
        .map(|(row, properties)| Feature {
            geometry: Geometry::Point {
                coordinates: [row.centroid_x, row.centroid_y],
            },
            properties,
        })
        .collect();
    Ok(FeatureCollection { features })
}

pub fn write_geojson(table: &MetricsTable, path: &Path) -> Result<(), ExportError> {
    let collection = centroid_collection(table)?;
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;
    log::info!("wrote {} centroids to {:?}", collection.features.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::table::tests::sample_row;

    #[test]
    fn feature_collection_shape() {
        let table = MetricsTable::new(vec![sample_row(8), sample_row(3)], true);

        let value = serde_json::to_value(centroid_collection(&table).unwrap()).unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["type"], "Feature");
        assert_eq!(
            features[0]["geometry"],
            json!({"type": "Point", "coordinates": [512345.125, 6789012.875]})
        );
        assert_eq!(features[0]["properties"]["cluster_id"], 3);
        assert_eq!(features[1]["properties"]["cluster_id"], 8);
        assert_eq!(features[1]["properties"]["cwd_score"], 0.8);
    }

    #[test]
    fn written_file_parses_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("centroids.geojson");
        let table = MetricsTable::new(vec![sample_row(1)], false);

        write_geojson(&table, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let collection: FeatureCollection = serde_json::from_str(&text).unwrap();
        assert_eq!(collection.features.len(), 1);
        assert!(!collection.features[0]
            .properties
            .contains_key("intensity_mean"));
    }
}
