pub mod attributes;
pub mod cluster;
pub mod config;
pub mod extractor;
pub mod geometry;
pub mod heuristic;
pub mod hull;
pub mod pixel;
pub mod row;
pub mod shape;

pub use cluster::{AssignmentStats, Cluster, ClusterIndex};
pub use config::MetricsConfig;
pub use extractor::ClusterMetricsExtractor;
pub use geometry::GeometrySource;
pub use row::MetricsRow;
