// Domain layer: OCR/document models and the ports (storage, OCR, encoder, pipeline) the core depends on.

pub mod model;
pub mod ports;
