use std::io::Cursor;

use thiserror::Error;

use crate::capture::best_face::BestFaceRecord;
use crate::shared::constants::MAX_UPLOAD_BYTES;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("image is empty")]
    EmptyImage,
    #[error("image is {0} bytes, limit is {limit}", limit = MAX_UPLOAD_BYTES)]
    TooLarge(usize),
    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("upload worker stopped")]
    WorkerGone,
}

/// The best face of a cycle, ready to send.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadPayload {
    /// PNG-encoded aligned crop.
    pub png: Vec<u8>,
    pub score: f64,
    pub processed_count: u32,
    pub blur_score: f64,
    pub quality_score: f64,
    /// Unix time in milliseconds when the payload was built.
    pub timestamp_ms: u64,
}

impl UploadPayload {
    pub fn from_record(
        record: &BestFaceRecord,
        processed_count: u32,
        timestamp_ms: u64,
    ) -> Result<Self, UploadError> {
        let img = record.crop.to_image().ok_or(UploadError::EmptyImage)?;
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)?;

        Ok(Self {
            png,
            score: record.analysis.overall_score,
            processed_count,
            blur_score: record.analysis.blur_score,
            quality_score: record.analysis.quality_score,
            timestamp_ms,
        })
    }

    pub fn file_name(&self) -> String {
        format!("best_face_{}.png", self.timestamp_ms)
    }

    /// Size checks applied before any request is made.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.png.is_empty() {
            return Err(UploadError::EmptyImage);
        }
        if self.png.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge(self.png.len()));
        }
        Ok(())
    }

    /// Text form fields sent alongside the image, in send order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("score", self.score.to_string()),
            ("timestamp", self.timestamp_ms.to_string()),
            ("processed_faces", self.processed_count.to_string()),
            ("blur_score", self.blur_score.to_string()),
            ("quality_score", self.quality_score.to_string()),
        ]
    }
}

/// Sends a cycle's best face somewhere. Returns the server's reply body.
pub trait FaceUploader: Send {
    fn upload(&self, payload: &UploadPayload) -> Result<String, UploadError>;
}
