use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::capture_cycle::CycleTiming;
use crate::shared::constants::{
    DEFAULT_ALIGNMENT_PADDING, DEFAULT_BLUR_THRESHOLD, DEFAULT_DETECTION_THRESHOLD,
    DEFAULT_NMS_THRESHOLD,
};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000/query";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Tunables for a capture run, stored as JSON. Missing keys take defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub detection_threshold: f32,
    pub nms_threshold: f32,
    pub blur_threshold: f64,
    pub alignment_padding: u32,
    pub server_url: String,
    /// Where to fetch the detector model when it is not cached locally.
    pub model_url: Option<String>,
    pub warmup_ms: u64,
    pub detection_ms: u64,
    pub min_detection_interval_ms: u64,
    pub resend_delay_ms: u64,
    pub upload_timeout_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        let timing = CycleTiming::default();
        Self {
            detection_threshold: DEFAULT_DETECTION_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
            alignment_padding: DEFAULT_ALIGNMENT_PADDING,
            server_url: DEFAULT_SERVER_URL.to_string(),
            model_url: None,
            warmup_ms: timing.warmup.as_millis() as u64,
            detection_ms: timing.detection.as_millis() as u64,
            min_detection_interval_ms: timing.min_detection_interval.as_millis() as u64,
            resend_delay_ms: timing.resend_delay.as_millis() as u64,
            upload_timeout_ms: 30_000,
        }
    }
}

impl CaptureSettings {
    /// `<config dir>/FaceCapture/settings.json`, if the platform has one.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FaceCapture").join("settings.json"))
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Settings from the default location, or defaults when there is no
    /// readable file. A file that exists but fails to parse is logged.
    pub fn load_or_default() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!("{e}; using defaults");
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(io_err)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(0.0..=1.0).contains(&self.detection_threshold) {
            return Err(SettingsError::Invalid(format!(
                "detection_threshold must be in [0, 1], got {}",
                self.detection_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.nms_threshold) {
            return Err(SettingsError::Invalid(format!(
                "nms_threshold must be in [0, 1], got {}",
                self.nms_threshold
            )));
        }
        if !(self.blur_threshold >= 0.0) {
            return Err(SettingsError::Invalid(format!(
                "blur_threshold must be >= 0, got {}",
                self.blur_threshold
            )));
        }
        if self.server_url.trim().is_empty() {
            return Err(SettingsError::Invalid("server_url is empty".into()));
        }
        if self.detection_ms == 0 {
            return Err(SettingsError::Invalid("detection_ms must be > 0".into()));
        }
        Ok(())
    }

    pub fn timing(&self) -> CycleTiming {
        CycleTiming {
            warmup: Duration::from_millis(self.warmup_ms),
            detection: Duration::from_millis(self.detection_ms),
            min_detection_interval: Duration::from_millis(self.min_detection_interval_ms),
            resend_delay: Duration::from_millis(self.resend_delay_ms),
        }
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let s = CaptureSettings::default();
        assert_eq!(s.detection_threshold, 0.5);
        assert_eq!(s.nms_threshold, 0.4);
        assert_eq!(s.blur_threshold, 50.0);
        assert_eq!(s.alignment_padding, 2);
        assert_eq!(s.timing(), CycleTiming::default());
        assert_eq!(s.upload_timeout(), Duration::from_secs(30));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "blur_threshold": 80.0, "server_url": "http://x/y" }"#).unwrap();

        let s = CaptureSettings::load(&path).unwrap();
        assert_eq!(s.blur_threshold, 80.0);
        assert_eq!(s.server_url, "http://x/y");
        assert_eq!(s.detection_threshold, 0.5);
        assert_eq!(s.detection_ms, 5000);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let s = CaptureSettings {
            detection_threshold: 0.7,
            model_url: Some("http://models/scrfd.onnx".into()),
            ..CaptureSettings::default()
        };
        s.save(&path).unwrap();
        assert_eq!(CaptureSettings::load(&path).unwrap(), s);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            CaptureSettings::load(&path),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CaptureSettings::load(Path::new("/nonexistent/settings.json")),
            Err(SettingsError::Io { .. })
        ));
    }

    #[rstest]
    #[case::threshold_high(CaptureSettings { detection_threshold: 1.5, ..CaptureSettings::default() })]
    #[case::nms_negative(CaptureSettings { nms_threshold: -0.1, ..CaptureSettings::default() })]
    #[case::blur_negative(CaptureSettings { blur_threshold: -1.0, ..CaptureSettings::default() })]
    #[case::blur_nan(CaptureSettings { blur_threshold: f64::NAN, ..CaptureSettings::default() })]
    #[case::empty_url(CaptureSettings { server_url: "  ".into(), ..CaptureSettings::default() })]
    #[case::zero_window(CaptureSettings { detection_ms: 0, ..CaptureSettings::default() })]
    fn test_validate_rejects(#[case] s: CaptureSettings) {
        assert!(matches!(s.validate(), Err(SettingsError::Invalid(_))));
    }
}
