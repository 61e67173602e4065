pub mod assembler;
pub mod engine;
pub mod images;
pub mod pipeline;

pub use crate::domain::model::{AssemblyResult, OcrResult, StyledBlock, TextRun};
pub use crate::domain::ports::{ConfigProvider, DocumentEncoder, OcrProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
