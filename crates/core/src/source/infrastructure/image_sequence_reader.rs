use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::source::domain::frame_source::{FrameSource, SourceError, SourceMetadata};

/// Reads a single image, or every image in a directory, as a frame sequence.
///
/// Directory entries are ordered by file name and anything without an image
/// extension is skipped. Frames are decoded lazily, one per iteration step.
pub struct ImageSequenceReader {
    paths: Option<Vec<PathBuf>>,
}

impl ImageSequenceReader {
    pub fn new() -> Self {
        Self { paths: None }
    }
}

impl Default for ImageSequenceReader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let io_err = |source| SourceError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && is_image_file(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn decode(path: &Path, index: usize) -> Result<Frame, SourceError> {
    let img = image::open(path).map_err(|source| SourceError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Frame::from_image(img.to_rgb8(), index))
}

impl FrameSource for ImageSequenceReader {
    fn open(&mut self, path: &Path) -> Result<SourceMetadata, SourceError> {
        let meta = std::fs::metadata(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let paths = if meta.is_dir() {
            list_images(path)?
        } else {
            vec![path.to_path_buf()]
        };
        let first = paths
            .first()
            .ok_or_else(|| SourceError::Empty(path.to_path_buf()))?;

        let (width, height) =
            image::image_dimensions(first).map_err(|source| SourceError::Decode {
                path: first.clone(),
                source,
            })?;

        log::debug!("Opened {} ({} frames)", path.display(), paths.len());
        let metadata = SourceMetadata {
            width,
            height,
            total_frames: paths.len(),
            source_path: Some(path.to_path_buf()),
        };
        self.paths = Some(paths);
        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, SourceError>> + '_> {
        match &self.paths {
            Some(paths) => Box::new(paths.iter().enumerate().map(|(i, p)| decode(p, i))),
            None => Box::new(std::iter::once(Err(SourceError::NotOpened))),
        }
    }

    fn close(&mut self) {
        self.paths = None;
    }
}
