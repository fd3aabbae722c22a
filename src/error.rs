use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong between reading the csv and writing the charts.
/// None of these is recovered from; the binary reports them and exits.
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("input file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid data in {}: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    #[error("column {0} not found in the dataset")]
    ColumnNotFound(String),

    #[error("could not draw {}: {reason}", .path.display())]
    Render { path: PathBuf, reason: String },

    #[error("could not write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
}

impl PlotError {
    pub(crate) fn format<P: Into<PathBuf>, S: Into<String>>(path: P, reason: S) -> PlotError {
        PlotError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
