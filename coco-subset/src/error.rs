//! Failure taxonomy of the conversion.

use crate::store::{AnnotationId, CategoryId, ImageId};
use std::{fmt, io, path::PathBuf};
use thiserror::Error;

/// The coarse class of a conversion failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing directories, unreadable annotation files or bad options.
    Configuration,
    /// Inconsistent or degenerate dataset content.
    Data,
    /// Failures reading image files or writing shard files.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Configuration => "configuration",
            Self::Data => "data",
            Self::Io => "I/O",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("data directory '{}' does not exist", path.display())]
    MissingDataDir { path: PathBuf },
    #[error("image directory '{}' does not exist", path.display())]
    MissingImageDir { path: PathBuf },
    #[error("failed to read annotation file '{}'", path.display())]
    AnnotationRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse annotation file '{}'", path.display())]
    AnnotationParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
    #[error("image {image_id} has degenerate size {width}x{height}")]
    DegenerateImage {
        image_id: ImageId,
        height: u64,
        width: u64,
    },
    #[error("bounding box {bbox:?} of annotation {annotation_id} does not normalize to finite values")]
    NonFiniteBox {
        annotation_id: AnnotationId,
        bbox: [f64; 4],
    },
    #[error("bounding box {bbox:?} of annotation {annotation_id} has negative extent")]
    MalformedBox {
        annotation_id: AnnotationId,
        bbox: [f64; 4],
    },
    #[error("annotation {annotation_id} references unknown category {category_id}")]
    UnknownCategory {
        annotation_id: AnnotationId,
        category_id: CategoryId,
    },
    #[error("image {image_id} is not defined in the annotation file")]
    UnknownImage { image_id: ImageId },
    #[error("duplicated {kind} id {id}")]
    DuplicateId { kind: &'static str, id: u64 },
    #[error("failed to read image file '{}'", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to create shard file '{}'", path.display())]
    ShardOpen {
        path: PathBuf,
        #[source]
        source: tfrecord::Error,
    },
    #[error("failed to write to shard file '{}'", path.display())]
    ShardWrite {
        path: PathBuf,
        #[source]
        source: tfrecord::Error,
    },
}

impl ConvertError {
    pub fn kind(&self) -> ErrorKind {
        use ConvertError as E;

        match self {
            E::MissingDataDir { .. }
            | E::MissingImageDir { .. }
            | E::AnnotationRead { .. }
            | E::AnnotationParse { .. }
            | E::InvalidConfig { .. } => ErrorKind::Configuration,
            E::DegenerateImage { .. }
            | E::NonFiniteBox { .. }
            | E::MalformedBox { .. }
            | E::UnknownCategory { .. }
            | E::UnknownImage { .. }
            | E::DuplicateId { .. } => ErrorKind::Data,
            E::ImageRead { .. } | E::ShardOpen { .. } | E::ShardWrite { .. } => ErrorKind::Io,
        }
    }

    /// Find the first conversion error in the cause chain of an error.
    pub fn find(error: &anyhow::Error) -> Option<&ConvertError> {
        error
            .chain()
            .find_map(|cause| cause.downcast_ref::<ConvertError>())
    }
}
