//! Writers and readers for the per-cluster metrics table.

pub mod csv;
pub mod error;
pub mod geojson;
pub mod json;
pub mod table;

pub use error::ExportError;
pub use table::MetricsTable;
