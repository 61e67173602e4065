use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("XML write error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("OCR service returned {status}: {message}")]
    ServiceError { status: u16, message: String },

    #[error("OCR failed for '{source_id}': {message}")]
    OcrError { source_id: String, message: String },

    #[error("No images found in {location}")]
    NoInputError { location: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

/// 錯誤分類，用於日誌與退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Io,
    Configuration,
    Input,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ConvertError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ConvertError::ApiError(_)
            | ConvertError::ServiceError { .. }
            | ConvertError::OcrError { .. } => ErrorCategory::Network,
            ConvertError::IoError(_) | ConvertError::ZipError(_) => ErrorCategory::Io,
            ConvertError::ConfigError { .. }
            | ConvertError::ConfigValidationError { .. }
            | ConvertError::InvalidConfigValueError { .. }
            | ConvertError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ConvertError::NoInputError { .. } => ErrorCategory::Input,
            ConvertError::XmlError(_) | ConvertError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路錯誤通常重試即可
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Input | ErrorCategory::Processing => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::Io => ErrorSeverity::Critical,
        }
    }

    /// 暫時性錯誤 (逾時、連線失敗、429、5xx) 才值得重試
    pub fn is_retryable(&self) -> bool {
        match self {
            ConvertError::ApiError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ConvertError::ServiceError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ConvertError::ApiError(_)
            | ConvertError::ServiceError { .. }
            | ConvertError::OcrError { .. } => {
                "Check network connectivity and the OCR endpoint, then retry"
            }
            ConvertError::MissingConfigError { .. } => {
                "Provide the missing value in the TOML config or via environment variable (e.g. GOOGLE_API_KEY)"
            }
            ConvertError::ConfigError { .. }
            | ConvertError::ConfigValidationError { .. }
            | ConvertError::InvalidConfigValueError { .. } => {
                "Fix the configuration value and run again"
            }
            ConvertError::NoInputError { .. } => {
                "Place images (png, jpg, webp, ...) in the input directory before converting"
            }
            ConvertError::IoError(_) | ConvertError::ZipError(_) => {
                "Check file permissions and free disk space for the input and output paths"
            }
            ConvertError::XmlError(_) | ConvertError::ProcessingError { .. } => {
                "Run with --verbose and inspect the logs"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ConvertError::NoInputError { location } => {
                format!("No files uploaded yet ({})", location)
            }
            ConvertError::MissingConfigError { field } => {
                format!("Missing configuration: {}", field)
            }
            ConvertError::OcrError { source_id, .. } => {
                format!("Text extraction failed for {}", source_id)
            }
            ConvertError::ApiError(_) => "Could not reach the OCR service".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
