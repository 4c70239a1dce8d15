use std::path::PathBuf;
use thiserror::Error;

/// The main error type for yoloprep operations.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed annotation {path}: {message}")]
    MalformedAnnotation { path: PathBuf, message: String },

    #[error("Unknown class '{name}' (not in the class mapping)")]
    UnknownClass { name: String },

    #[error("Unknown class id {id} (class mapping has {class_count} class(es))")]
    UnknownClassId { id: usize, class_count: usize },

    #[error("Failed to parse label file {path} at line {line}: {message}")]
    LabelParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Cannot write {path}: {source}")]
    UnwritableDestination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move {from} to {to}: {source}")]
    RelocationError {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("No label file found for image {image_path} (expected stem '{expected_stem}')")]
    MissingLabel {
        image_path: PathBuf,
        expected_stem: String,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid split parameters: {message}")]
    InvalidSplitParams { message: String },

    #[error("Image and annotation lists are not aligned: {message}")]
    PartitionMismatch { message: String },

    #[error("Invalid dataset layout at {path}: {message}")]
    LayoutInvalid { path: PathBuf, message: String },

    #[error("Conversion failed for {failed} of {total} file(s)")]
    ConversionFailed { failed: usize, total: usize },
}
