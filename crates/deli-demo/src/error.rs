use std::path::PathBuf;

/// Errors that can occur while running the demo.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// Failed to load shift data from the data directory.
    #[error("data load error in {dir}: {source}")]
    DataLoad {
        dir: PathBuf,
        source: deli_data::DataLoadError,
    },

    /// Two runs with the same seed and inputs drifted apart.
    #[error("desync at frame {frame}: {left:#018x} != {right:#018x}")]
    Desync { frame: u64, left: u64, right: u64 },

    /// The run options cannot drive a shift.
    #[error("invalid run options: {detail}")]
    InvalidOptions { detail: String },

    /// The report could not be written as JSON.
    #[error("report serialization error: {0}")]
    Report(#[from] serde_json::Error),
}
