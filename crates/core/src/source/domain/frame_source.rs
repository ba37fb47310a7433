use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("no image frames found at {0}")]
    Empty(PathBuf),
    #[error("source not opened")]
    NotOpened,
}

/// What a source knows about itself once opened.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceMetadata {
    /// Dimensions of the first frame. Later frames may differ.
    pub width: u32,
    pub height: u32,
    pub total_frames: usize,
    pub source_path: Option<PathBuf>,
}

/// Produces frames for the capture pipeline.
///
/// Implementations own the decoding; the pipeline only sees [`Frame`]s.
pub trait FrameSource: Send {
    fn open(&mut self, path: &Path) -> Result<SourceMetadata, SourceError>;

    /// Frames in presentation order, each tagged with its sequence index.
    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, SourceError>> + '_>;

    fn close(&mut self);
}
