use thiserror::Error;

#[derive(Error, Debug)]
pub enum HaloError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Topology construction failed: {0}")]
    Topology(String),

    #[error("Domain decomposition failed: {0}")]
    Decomposition(String),

    #[error("Halo exchange failed on rank {rank}: {message}")]
    Exchange { rank: usize, message: String },

    #[error("Gather failed: {0}")]
    Gather(String),

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Grid parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type HaloResult<T> = Result<T, HaloError>;
