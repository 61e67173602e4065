use crate::adapters::gemini::{
    GeminiSettings, DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_PROMPT, DEFAULT_TIMEOUT_SECONDS,
};
use crate::core::assembler::AssemblerConfig;
use crate::core::ConfigProvider;
use crate::utils::error::{ConvertError, Result};
use crate::utils::validation::{
    validate_file_name, validate_non_empty_string, validate_path, validate_positive_number,
    validate_range, validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub input: InputConfig,
    pub ocr: OcrConfig,
    pub assembler: AssemblerConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub directory: String,
    pub max_image_bytes: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            directory: "/tmp/uploads".to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub prompt: String,
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub retry_delay_seconds: u64,
    pub concurrent_requests: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            prompt: DEFAULT_PROMPT.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            retry_attempts: 2,
            retry_delay_seconds: 2,
            concurrent_requests: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: String,
    pub filename: String,
    pub title: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./output".to_string(),
            filename: "extracted_document.docx".to_string(),
            title: "Extracted Document".to_string(),
        }
    }
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ConvertError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ConvertError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GOOGLE_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConvertError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_path("input.directory", &self.input.directory)?;
        validate_positive_number("input.max_image_bytes", self.input.max_image_bytes, 1)?;

        validate_url("ocr.endpoint", &self.ocr.endpoint)?;
        validate_non_empty_string("ocr.model", &self.ocr.model)?;
        validate_non_empty_string("ocr.prompt", &self.ocr.prompt)?;
        validate_range("ocr.timeout_seconds", self.ocr.timeout_seconds, 1, 600)?;
        validate_range("ocr.retry_attempts", self.ocr.retry_attempts, 0, 10)?;
        validate_range(
            "ocr.concurrent_requests",
            self.ocr.concurrent_requests,
            1,
            32,
        )?;

        self.assembler.validate()?;

        validate_path("output.path", &self.output.path)?;
        validate_file_name("output.filename", &self.output.filename)?;

        Ok(())
    }

    /// API 金鑰：優先取配置，其次環境變數 GOOGLE_API_KEY
    pub fn api_key(&self) -> Result<String> {
        let configured = self
            .ocr
            .api_key
            .as_deref()
            .map(str::trim)
            // 未被替換的 ${VAR} 視為未設定
            .filter(|key| !key.is_empty() && !key.starts_with("${"));

        if let Some(key) = configured {
            return Ok(key.to_string());
        }

        let from_env = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty());
        let key = validate_required_field(&format!("ocr.api_key (or {})", API_KEY_ENV), &from_env)?;
        Ok(key.clone())
    }

    pub fn gemini_settings(&self) -> Result<GeminiSettings> {
        Ok(GeminiSettings {
            endpoint: self.ocr.endpoint.clone(),
            model: self.ocr.model.clone(),
            api_key: self.api_key()?,
            prompt: self.ocr.prompt.clone(),
            timeout_seconds: self.ocr.timeout_seconds,
        })
    }
}

impl ConfigProvider for TomlConfig {
    fn input_dir(&self) -> &str {
        &self.input.directory
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_filename(&self) -> &str {
        &self.output.filename
    }

    fn concurrent_requests(&self) -> usize {
        self.ocr.concurrent_requests
    }

    fn retry_attempts(&self) -> u32 {
        self.ocr.retry_attempts
    }

    fn retry_delay_seconds(&self) -> u64 {
        self.ocr.retry_delay_seconds
    }

    fn max_image_bytes(&self) -> usize {
        self.input.max_image_bytes
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
