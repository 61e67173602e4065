// Adapters layer: concrete implementations for external systems (OCR service, document format).

pub mod docx;
pub mod gemini;

pub use docx::DocxEncoder;
pub use gemini::{GeminiClient, GeminiSettings};
