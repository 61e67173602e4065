pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

pub use adapters::{DocxEncoder, GeminiClient, GeminiSettings};
pub use core::{
    assembler::{Assembler, AssemblerConfig},
    engine::ConversionEngine,
    pipeline::DocumentPipeline,
};
pub use domain::model::{AssemblyResult, OcrResult, StyledBlock, TextRun};
pub use utils::error::{ConvertError, Result};
