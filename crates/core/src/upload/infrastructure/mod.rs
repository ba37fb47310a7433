pub mod background_uploader;
pub mod http_face_uploader;
