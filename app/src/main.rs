use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;
use env_logger::Builder;
use glob::glob;
use log::LevelFilter;
use serde::Deserialize;
use thiserror::Error;

use cdw_core::metrics::{ClusterMetricsExtractor, MetricsConfig};
use cdw_core::pointcloud::normalize::{GroundNormalizer, NormalizationConfig};
use cdw_core::pointcloud::point::PointCloud;
use cdw_core::CoreError;
use cdw_exporter::{csv::write_csv, geojson::write_geojson, json::write_json};
use cdw_exporter::{ExportError, MetricsTable};
use cdw_parser::parsers::{provider_for, Parser as _, ParserProvider as _};
use cdw_parser::raster::load_label_raster;
use cdw_parser::ParseError;

#[derive(Parser, Debug)]
#[command(
    name = "cdwmetrics",
    about = "Per-cluster metrics for coarse woody debris candidates in a labeled CHM raster",
    version = "0.1.0"
)]
struct Cli {
    /// Label raster (GeoTIFF) of connected-component cluster ids
    #[arg(short, long, value_name = "FILE")]
    labels: PathBuf,

    /// Point cloud files or glob patterns (las, laz, csv, txt)
    #[arg(short, long, num_args = 1.., value_name = "FILE")]
    points: Vec<String>,

    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Base name of the output files
    #[arg(short, long, default_value = "cdw_metrics")]
    name: String,

    /// JSON file with metric and normalization settings
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    hag_min: Option<f64>,

    #[arg(long)]
    elongation_threshold: Option<f64>,

    #[arg(long)]
    low_height_threshold: Option<f64>,

    #[arg(long)]
    score_decimals: Option<u32>,

    /// Drop clusters smaller than this area (m2)
    #[arg(long, value_name = "M2")]
    min_area: Option<f64>,

    /// Only these cluster ids
    #[arg(long, num_args = 1..)]
    ids: Vec<u32>,

    /// Worker threads (default: one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// Evaluate clusters one after another
    #[arg(long)]
    sequential: bool,

    /// Class code of ground returns used to derive height above ground
    #[arg(long)]
    ground_class: Option<u8>,

    #[arg(long, value_name = "M")]
    hag_clip_max: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    #[serde(flatten)]
    metrics: MetricsConfig,
    normalization: NormalizationConfig,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("invalid config file {path:?}: {source}")]
    Config {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Glob(#[from] glob::PatternError),
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn expand_globs(input_patterns: &[String]) -> Result<Vec<PathBuf>, AppError> {
    let mut paths = Vec::new();
    for pattern in input_patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            for entry in glob(pattern)? {
                match entry {
                    Ok(path) => paths.push(path),
                    Err(e) => log::warn!("skipping unreadable path: {e}"),
                }
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    Ok(paths)
}

/// Settings from the config file, overridden by the flags given on the
/// command line.
fn load_config(args: &Cli) -> Result<(MetricsConfig, NormalizationConfig), AppError> {
    let file = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<ConfigFile>(&text).map_err(|source| AppError::Config {
                path: path.clone(),
                source,
            })?
        }
        None => ConfigFile::default(),
    };
    let (mut metrics, mut normalization) = (file.metrics, file.normalization);

    if let Some(v) = args.hag_min {
        metrics.hag_min = v;
    }
    if let Some(v) = args.elongation_threshold {
        metrics.elongation_threshold = v;
    }
    if let Some(v) = args.low_height_threshold {
        metrics.low_height_threshold = v;
    }
    if let Some(v) = args.score_decimals {
        metrics.score_decimals = v;
    }
    if let Some(v) = args.min_area {
        metrics.min_area_m2 = v;
    }
    if let Some(v) = args.ground_class {
        normalization.ground_class = v;
    }
    if args.hag_clip_max.is_some() {
        normalization.hag_clip_max = args.hag_clip_max;
    }

    metrics.validate()?;
    Ok((metrics, normalization))
}

fn read_points(
    patterns: &[String],
    normalization: NormalizationConfig,
) -> Result<PointCloud, AppError> {
    if patterns.is_empty() {
        log::warn!("no point cloud given, attribute statistics will be empty");
        return Ok(PointCloud::empty());
    }

    let input_files = expand_globs(patterns)?;
    log::info!("expanded input files: {:?}", input_files);

    let start = std::time::Instant::now();
    let parser = provider_for(input_files)?.get_parser();
    let mut cloud = parser.parse()?;
    log::info!(
        "finish parsing {} points in {:?}",
        cloud.len(),
        start.elapsed()
    );
    if !cloud.is_empty() {
        let bounds = &cloud.metadata.bounding_volume;
        log::info!("point bounds: min {:?}, max {:?}", bounds.min, bounds.max);
    }

    if !cloud.is_empty() && !cloud.metadata.has_hag {
        log::info!(
            "some points carry no height above ground, normalizing against ground returns..."
        );
        let start = std::time::Instant::now();
        let summary = GroundNormalizer::new(normalization)?.normalize(&mut cloud)?;
        log::info!(
            "finish normalizing {} points with {} ground points in {:?}",
            summary.filled,
            summary.ground_points,
            start.elapsed()
        );
    }
    Ok(cloud)
}

fn output_paths(dir: &Path, name: &str) -> [PathBuf; 3] {
    [
        dir.join(format!("{name}.csv")),
        dir.join(format!("{name}.json")),
        dir.join(format!("{name}_centroids.geojson")),
    ]
}

fn run(args: &Cli) -> Result<(), AppError> {
    let (metrics_config, normalization_config) = load_config(args)?;
    log::info!("metrics config: {:?}", metrics_config);

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }

    let raster = load_label_raster(&args.labels)?;
    let cloud = read_points(&args.points, normalization_config)?;

    let extractor =
        ClusterMetricsExtractor::new(metrics_config)?.with_parallelism(!args.sequential);
    let rows = if args.ids.is_empty() {
        extractor.extract(&raster, &cloud)?
    } else {
        extractor.extract_ids(&raster, &cloud, &args.ids)?
    };
    let table = MetricsTable::new(rows, cloud.metadata.has_intensity);

    std::fs::create_dir_all(&args.output)?;
    let [csv_path, json_path, geojson_path] = output_paths(&args.output, &args.name);
    write_csv(&table, &csv_path)?;
    write_json(&table, &json_path)?;
    write_geojson(&table, &geojson_path)?;

    Ok(())
}

fn main() {
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, LevelFilter::Info)
        .init();

    let args = Cli::parse();

    log::info!("label raster: {:?}", args.labels);
    log::info!("point inputs: {:?}", args.points);
    log::info!("output folder: {:?}", args.output);

    let start = std::time::Instant::now();
    if let Err(e) = run(&args) {
        log::error!("{e}");
        std::process::exit(1);
    }
    log::info!("Elapsed: {:?}", start.elapsed());
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use tiff::encoder::{colortype, TiffEncoder};
    use tiff::tags::Tag;

    use super::*;

    fn cli(extra: &[&str]) -> Cli {
        let mut argv = vec!["cdwmetrics", "--labels", "labels.tif", "--output", "out"];
        argv.extend_from_slice(extra);
        Cli::parse_from(argv)
    }

    #[test]
    fn flags_override_the_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        std::fs::write(
            &config,
            r#"{"hag_min": 0.3, "score_decimals": 2, "normalization": {"ground_class": 9}}"#,
        )
        .unwrap();
        let config = config.to_string_lossy().into_owned();

        let args = cli(&["--config", &config, "--score-decimals", "4", "--hag-clip-max", "3"]);
        let (metrics, normalization) = load_config(&args).unwrap();

        assert_eq!(metrics.hag_min, 0.3);
        assert_eq!(metrics.score_decimals, 4);
        assert_eq!(metrics.elongation_threshold, 3.0);
        assert_eq!(normalization.ground_class, 9);
        assert_eq!(normalization.neighbors, 3);
        assert_eq!(normalization.hag_clip_max, Some(3.0));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let args = cli(&["--low-height-threshold", "0"]);
        assert!(matches!(
            load_config(&args),
            Err(AppError::Core(CoreError::InvalidConfig(_)))
        ));
    }

    #[test]
    fn end_to_end_with_csv_points() {
        let dir = tempfile::tempdir().unwrap();

        // 4 x 6 grid at 0.5 m; cluster 1 is a 1 x 5 strip, cluster 2 a 2 x 2 block
        let labels = dir.path().join("labels.tif");
        #[rustfmt::skip]
        let data: [u16; 24] = [
            0, 0, 0, 0, 0, 0,
            1, 1, 1, 1, 1, 0,
            0, 0, 0, 0, 2, 2,
            0, 0, 0, 0, 2, 2,
        ];
        {
            let mut file = File::create(&labels).unwrap();
            let mut tiff = TiffEncoder::new(&mut file).unwrap();
            let mut image = tiff.new_image::<colortype::Gray16>(6, 4).unwrap();
            image
                .encoder()
                .write_tag(Tag::ModelPixelScaleTag, &[0.5f64, 0.5, 0.0][..])
                .unwrap();
            image
                .encoder()
                .write_tag(Tag::ModelTiepointTag, &[0.0f64, 0.0, 0.0, 100.0, 202.0, 0.0][..])
                .unwrap();
            image.write_data(&data).unwrap();
        }

        let points = dir.path().join("points.csv");
        let mut csv = String::from("x,y,z,hag,intensity\n");
        for i in 0..10 {
            let x = 100.1 + i as f64 * 0.24;
            csv.push_str(&format!("{x},201.3,50.{i},0.{},{}\n", i % 5 + 2, 10 + i));
        }
        csv.push_str("102.3,200.7,52.0,2.5,30\n");
        csv.push_str("102.8,200.3,52.0,2.8,31\n");
        std::fs::write(&points, csv).unwrap();

        let output = dir.path().join("out");
        let args = Cli::parse_from([
            "cdwmetrics",
            "--labels",
            labels.to_str().unwrap(),
            "--points",
            points.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--name",
            "plot7",
            "--sequential",
        ]);

        run(&args).unwrap();

        let table = cdw_exporter::csv::read_csv(&output.join("plot7.csv")).unwrap();
        assert!(table.include_intensity);
        assert_eq!(table.rows.len(), 2);

        let strip = &table.rows[0];
        assert_eq!(strip.cluster_id, 1);
        assert_eq!(strip.pixel_count, 5);
        assert_eq!(strip.point_count, 10);
        assert!(strip.is_elongated);
        assert!(strip.is_low_height);

        let block = &table.rows[1];
        assert_eq!(block.point_count, 2);
        assert!(!block.is_low_height);
        assert_eq!(block.intensity_min, Some(30.0));

        assert!(output.join("plot7.json").exists());
        let geojson = std::fs::read_to_string(output.join("plot7_centroids.geojson")).unwrap();
        assert!(geojson.contains("FeatureCollection"));
    }
}
