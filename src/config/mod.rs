pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "cli")]
use toml_config::TomlConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "ocr-docx")]
#[command(about = "Extract text from staged images and assemble it into a Word document")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory holding the staged images
    #[arg(short, long)]
    pub input: Option<String>,

    /// Output directory for the document
    #[arg(short, long)]
    pub output: Option<String>,

    /// Output file name
    #[arg(long)]
    pub filename: Option<String>,

    /// Do not emit a "Page N" header per image
    #[arg(long)]
    pub no_headers: bool,

    /// Maximum key length (exclusive) for "label: value" lines
    #[arg(long)]
    pub label_threshold: Option<usize>,

    /// Number of OCR requests in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,

    /// Check inputs and configuration without calling the OCR service
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 載入 TOML (若有指定) 並套用命令列覆蓋設定
    pub fn resolve(&self) -> crate::Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(input) = &self.input {
            config.input.directory = input.clone();
        }
        if let Some(output) = &self.output {
            config.output.path = output.clone();
        }
        if let Some(filename) = &self.filename {
            config.output.filename = filename.clone();
        }
        if self.no_headers {
            config.assembler.include_headers = false;
        }
        if let Some(threshold) = self.label_threshold {
            config.assembler.label_threshold = threshold;
        }
        if let Some(concurrency) = self.concurrency {
            config.ocr.concurrent_requests = concurrency;
        }
    }
}
