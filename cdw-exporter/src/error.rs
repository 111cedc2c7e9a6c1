use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cluster {cluster_id}: field '{field}' is not a finite number")]
    Serialization {
        cluster_id: u32,
        field: &'static str,
    },
    #[error("column '{0}' is missing")]
    MissingColumn(&'static str),
    #[error("column '{column}' has invalid value '{value}'")]
    InvalidValue { column: &'static str, value: String },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
