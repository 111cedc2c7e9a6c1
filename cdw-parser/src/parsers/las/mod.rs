use std::path::PathBuf;

use las::Reader;

use cdw_core::pointcloud::point::{Point, PointAttributes, PointCloud};

use super::{Parser, ParserProvider};
use crate::error::ParseError;

pub struct LasParserProvider {
    pub filenames: Vec<PathBuf>,
}

impl ParserProvider for LasParserProvider {
    fn get_parser(&self) -> Box<dyn Parser> {
        Box::new(LasParser {
            filenames: self.filenames.clone(),
        })
    }
}

/// Reads LAS and LAZ files. Height above ground is not part of the format,
/// so every point comes back without it.
pub struct LasParser {
    pub filenames: Vec<PathBuf>,
}

impl Parser for LasParser {
    fn parse(&self) -> Result<PointCloud, ParseError> {
        let mut points = Vec::new();

        for filename in &self.filenames {
            let start = std::time::Instant::now();
            let mut reader = Reader::from_path(filename)?;
            let before = points.len();

            for las_point in reader.points() {
                points.push(convert_las_point(las_point?));
            }
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

fn convert_las_point(las_point: las::Point) -> Point {
    let attributes = PointAttributes {
        intensity: Some(f64::from(las_point.intensity)),
        classification: Some(u8::from(las_point.classification)),
    };

    Point {
        x: las_point.x,
        y: las_point.y,
        z: las_point.z,
        hag: None,
        attributes,
    }
}

#[cfg(test)]
mod tests {
    use las::point::Classification;
    use las::{Builder, Writer};

    use super::*;

    #[test]
    fn reads_coordinates_and_attributes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tile.las");

        let header = Builder::from((1, 2)).into_header().unwrap();
        let mut writer = Writer::from_path(&path, header).unwrap();
        for (i, class) in [(0u16, Classification::Ground), (1, Classification::HighVegetation)] {
            writer
                .write_point(las::Point {
                    x: 10.0 + i as f64,
                    y: 20.0,
                    z: 5.5,
                    intensity: 100 + i,
                    return_number: 1,
                    classification: class,
                    ..Default::default()
                })
                .unwrap();
        }
        writer.close().unwrap();

        let cloud = LasParserProvider {
            filenames: vec![path],
        }
        .get_parser()
        .parse()
        .unwrap();

        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.points[0].x, 10.0);
        assert_eq!(cloud.points[1].x, 11.0);
        assert_eq!(cloud.points[0].attributes.classification, Some(2));
        assert_eq!(cloud.points[1].attributes.classification, Some(5));
        assert_eq!(cloud.points[1].attributes.intensity, Some(101.0));
        assert!(cloud.points.iter().all(|p| p.hag.is_none()));
        assert!(!cloud.metadata.has_hag);
    }
}
