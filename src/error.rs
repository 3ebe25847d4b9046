//! Error taxonomy for the conditioning and dataset-construction pipeline.
//!
//! Every variant is fail-fast: nothing in the crate retries or skips past one.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("invalid cutoff: {0}")]
    InvalidCutoff(String),

    #[error(
        "channel {channel:?} has {len} samples; more than {required} are needed for stable filtering"
    )]
    EmptyChannel {
        channel: String,
        len: usize,
        required: usize,
    },

    #[error("electrode {electrode_id:?} matched {matches} label rows, expected exactly one")]
    UnknownElectrode { electrode_id: String, matches: usize },

    #[error("malformed {field} for electrode {electrode_id:?}: {value:?}")]
    MalformedLabel {
        electrode_id: String,
        field: &'static str,
        value: String,
    },

    #[error("class weighting needs at least 2 distinct classes, found {found}")]
    DegenerateLabels { found: usize },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PrepError>;
