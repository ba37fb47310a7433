use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};

use facecapture_core::alignment::face_aligner::FaceAligner;
use facecapture_core::capture::capture_cycle::CaptureMode;
use facecapture_core::config::capture_settings::CaptureSettings;
use facecapture_core::detection::infrastructure::onnx_scrfd_detector::OnnxScrfdDetector;
use facecapture_core::pipeline::capture_faces_use_case::CaptureFacesUseCase;
use facecapture_core::pipeline::capture_logger::StdoutCaptureLogger;
use facecapture_core::pipeline::run_capture_use_case::{
    CaptureSummary, RunCaptureUseCase, SystemClock, UploadStatus,
};
use facecapture_core::shared::constants::SCRFD_MODEL_NAME;
use facecapture_core::shared::model_resolver::{self, ModelLocation};
use facecapture_core::source::infrastructure::image_sequence_reader::ImageSequenceReader;
use facecapture_core::upload::domain::face_uploader::FaceUploader;
use facecapture_core::upload::infrastructure::http_face_uploader::HttpFaceUploader;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Timed warmup / detect / send cycles.
    Cycle,
    /// One window over the whole input, every frame detected.
    Sequence,
}

impl From<Mode> for CaptureMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Cycle => CaptureMode::Cycle,
            Mode::Sequence => CaptureMode::Sequence,
        }
    }
}

/// Find the sharpest, best-posed face in an image sequence and upload it.
#[derive(Parser)]
#[command(name = "facecapture")]
struct Cli {
    /// Input image file or directory of frames.
    input: PathBuf,

    /// SCRFD model file (default: cached or bundled model).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Download URL used when the model is not available locally.
    #[arg(long)]
    model_url: Option<String>,

    /// Upload endpoint for the best face of each cycle.
    #[arg(long)]
    server: Option<String>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    threshold: Option<f32>,

    /// Minimum Laplacian variance for a face to be kept.
    #[arg(long)]
    blur_threshold: Option<f64>,

    /// IoU above which overlapping detections are suppressed (0.0-1.0).
    #[arg(long)]
    nms_threshold: Option<f32>,

    /// Pixels added around the aligned face crop.
    #[arg(long)]
    padding: Option<u32>,

    /// Capture mode. Files and directories are read far faster than real
    /// time, so timed cycles are only useful for paced frame feeds.
    #[arg(long, value_enum, default_value = "sequence")]
    mode: Mode,

    /// Stop after this many completed cycles.
    #[arg(long)]
    cycles: Option<u32>,

    /// Settings file (default: per-user config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the best face of the run to this PNG.
    #[arg(long)]
    save_best: Option<PathBuf>,

    /// Score faces without uploading them.
    #[arg(long)]
    no_upload: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let settings = load_settings(&cli)?;
    settings.validate()?;

    let model_path = resolve_model(&cli, &settings)?;
    let detector = OnnxScrfdDetector::new(&model_path, settings.nms_threshold)?;
    log::info!("Loaded {} ({:?})", model_path.display(), detector.variant());

    let capture = CaptureFacesUseCase::new(
        Box::new(detector),
        FaceAligner::new(settings.alignment_padding),
        settings.detection_threshold,
    );

    let uploader: Option<Box<dyn FaceUploader>> = if cli.no_upload {
        None
    } else {
        Some(Box::new(HttpFaceUploader::new(
            settings.server_url.clone(),
            settings.upload_timeout(),
        )?))
    };

    let mut use_case = RunCaptureUseCase::new(
        capture,
        uploader,
        Box::new(SystemClock::new()),
        Box::new(StdoutCaptureLogger::default()),
        settings.timing(),
        settings.blur_threshold,
    );
    let mut source = ImageSequenceReader::new();
    let summary = use_case.execute(&mut source, &cli.input, cli.mode.into(), cli.cycles)?;

    report(&summary);
    if let Some(path) = &cli.save_best {
        save_best(&summary, path)?;
    }
    Ok(())
}

fn load_settings(cli: &Cli) -> Result<CaptureSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => CaptureSettings::load(path)?,
        None => CaptureSettings::load_or_default(),
    };

    if let Some(url) = &cli.server {
        settings.server_url = url.clone();
    }
    if let Some(url) = &cli.model_url {
        settings.model_url = Some(url.clone());
    }
    if let Some(t) = cli.threshold {
        settings.detection_threshold = t;
    }
    if let Some(t) = cli.blur_threshold {
        settings.blur_threshold = t;
    }
    if let Some(t) = cli.nms_threshold {
        settings.nms_threshold = t;
    }
    if let Some(p) = cli.padding {
        settings.alignment_padding = p;
    }
    Ok(settings)
}

fn resolve_model(
    cli: &Cli,
    settings: &CaptureSettings,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {SCRFD_MODEL_NAME}");
    let bundled = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")));
    let location = ModelLocation {
        explicit: cli.model.as_deref(),
        bundled_dir: bundled.as_deref(),
        url: settings.model_url.as_deref(),
    };
    let path = model_resolver::resolve(
        SCRFD_MODEL_NAME,
        &location,
        Some(Box::new(download_progress)),
    )?;
    Ok(path)
}

fn report(summary: &CaptureSummary) {
    for cycle in &summary.cycles {
        let score = cycle
            .best_score
            .map(|s| format!("{s:.3}"))
            .unwrap_or_else(|| "-".into());
        let upload = match &cycle.upload {
            UploadStatus::NoFace => "no face".to_string(),
            UploadStatus::Skipped => "not uploaded".to_string(),
            UploadStatus::Pending => "pending".to_string(),
            UploadStatus::Sent(body) => format!("sent ({body})"),
            UploadStatus::Failed(e) => format!("failed: {e}"),
        };
        log::info!(
            "Cycle {}: {} frames with faces, {} faces scored, best {score}, {upload}",
            cycle.cycle,
            cycle.frames_with_faces,
            cycle.faces_processed
        );
    }
    log::info!(
        "Read {} frames, ran detection on {}, finished {} cycles",
        summary.frames_read,
        summary.frames_detected,
        summary.cycles.len()
    );
}

fn save_best(summary: &CaptureSummary, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let Some(best) = &summary.best else {
        log::warn!("No face passed the quality gate; nothing written to {}", path.display());
        return Ok(());
    };
    let image = best.crop.to_image().ok_or("best face crop has no pixels")?;
    image.save(path)?;
    log::info!(
        "Best face (score {:.3}) written to {}",
        best.analysis.overall_score,
        path.display()
    );
    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    if let Some(t) = cli.threshold {
        if !(0.0..=1.0).contains(&t) {
            return Err(format!("Threshold must be between 0.0 and 1.0, got {t}").into());
        }
    }
    if let Some(t) = cli.nms_threshold {
        if !(0.0..=1.0).contains(&t) {
            return Err(format!("NMS threshold must be between 0.0 and 1.0, got {t}").into());
        }
    }
    if let Some(b) = cli.blur_threshold {
        if b < 0.0 {
            return Err(format!("Blur threshold must be non-negative, got {b}").into());
        }
    }
    if cli.cycles == Some(0) {
        return Err("--cycles must be at least 1".into());
    }
    if cli.no_upload && cli.server.is_some() {
        return Err("--server and --no-upload are mutually exclusive".into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
