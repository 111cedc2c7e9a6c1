use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cluster {cluster_id} has no pixels in the label raster")]
    DataIntegrity { cluster_id: u32 },

    #[error("invalid label raster: {0}")]
    InvalidRaster(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("at least 3 ground points are required for height normalization, found {found}")]
    InsufficientGround { found: usize },
}
