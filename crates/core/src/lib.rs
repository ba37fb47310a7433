//! Best-face capture: SCRFD detection decoding, face alignment, quality
//! scoring, and the capture cycle that uploads each cycle's best face.

pub mod alignment {
    pub mod face_aligner;
}

pub mod capture {
    pub mod best_face;
    pub mod capture_cycle;
}

pub mod config {
    pub mod capture_settings;
}

pub mod detection {
    pub mod domain {
        pub mod anchor_grid;
        pub mod detection;
        pub mod detector_variant;
        pub mod distance_decoder;
        pub mod face_detector;
        pub mod face_landmarks;
        pub mod suppressor;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod capture_faces_use_case;
    pub mod capture_logger;
    pub mod run_capture_use_case;
}

pub mod quality {
    pub mod face_quality_analyzer;
    pub mod geometry_score;
    pub mod sharpness;
}

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
}

pub mod source {
    pub mod domain {
        pub mod frame_source;
    }
    pub mod infrastructure {
        pub mod image_sequence_reader;
    }
}

pub mod upload {
    pub mod domain {
        pub mod face_uploader;
    }
    pub mod infrastructure;
}
