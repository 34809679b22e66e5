use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("{backend} fetch failed: {message}")]
    Fetch { backend: String, message: String },

    #[error("Product not found: {product_id}")]
    NotFound { product_id: String },

    #[error("{backend} operation failed: {message}")]
    Operation { backend: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
}

/// 錯誤分類，用於日誌與 CLI 輸出
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Decode,
    Network,
    Commerce,
    Configuration,
    System,
}

/// 錯誤嚴重程度，CLI 依此決定退出碼
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl SyncError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn fetch(backend: &str, message: impl Into<String>) -> Self {
        Self::Fetch {
            backend: backend.to_string(),
            message: message.into(),
        }
    }

    pub fn operation(backend: &str, message: impl Into<String>) -> Self {
        Self::Operation {
            backend: backend.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode { .. } | Self::Serialization(_) => ErrorCategory::Decode,
            Self::Fetch { .. } | Self::Http(_) => ErrorCategory::Network,
            Self::NotFound { .. } | Self::Operation { .. } => ErrorCategory::Commerce,
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::MissingConfig { .. } => {
                ErrorCategory::Configuration
            }
            Self::Io(_) | Self::Csv(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Decode => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Commerce | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 網路類錯誤可以直接重試
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Network
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::Decode { .. } | Self::Serialization(_) => {
                "Check the paywall JSON configured in the backend dashboard"
            }
            Self::Fetch { .. } | Self::Http(_) => {
                "Check network connectivity and the backend base URL, then retry"
            }
            Self::NotFound { .. } => {
                "Make sure the package id exists in the paywall and in the store catalog"
            }
            Self::Operation { .. } => "Retry the purchase or restore; the backend rejected it",
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::MissingConfig { .. } => {
                "Fix the configuration file and run again"
            }
            Self::Io(_) => "Check file paths and permissions",
            Self::Csv(_) => "Check the output destination",
        }
    }

    /// 給終端使用者看的訊息，不含內部細節
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Decode { .. } | Self::Serialization(_) => {
                "The subscription configuration could not be read.".to_string()
            }
            Self::Fetch { backend, .. } => format!("Could not reach {}.", backend),
            Self::Http(_) => "A network request failed.".to_string(),
            Self::NotFound { .. } => "Product not found!".to_string(),
            Self::Operation { message, .. } => message.clone(),
            Self::Config { message } => format!("Configuration problem: {}", message),
            Self::InvalidConfigValue { field, reason, .. } => {
                format!("Invalid setting '{}': {}", field, reason)
            }
            Self::MissingConfig { field } => format!("Missing setting '{}'", field),
            Self::Io(e) => format!("File error: {}", e),
            Self::Csv(e) => format!("Export failed: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
