pub mod onnx_scrfd_detector;
pub mod scrfd_decoder;
