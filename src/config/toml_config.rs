use crate::utils::error::{Result, SyncError};
use crate::utils::logger::LOG_LEVELS;
use crate::utils::validation::{
    validate_api_key, validate_base_url, validate_non_empty_string, validate_positive_number,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_EVENT_CAPACITY: usize = 64;
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub backend: BackendConfig,
    pub sync: Option<SyncOptions>,
    pub logging: Option<LoggingConfig>,
}

/// 兩種後端擇一，由 `type` 欄位決定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Apphud(ApphudConfig),
    #[serde(rename = "revenuecat", alias = "revenue_cat")]
    RevenueCat(RevenueCatConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApphudConfig {
    pub api_key: String,
    pub base_url: String,
    pub user_id: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueCatConfig {
    pub api_key: String,
    pub base_url: String,
    pub entitlement_id: String,
    pub app_user_id: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncOptions {
    /// 事件通道容量
    pub event_capacity: Option<usize>,
    /// refresh 後是否自動抓取 commerce facts
    pub fetch_commerce: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl SyncConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SyncError::Config {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${APPHUD_API_KEY})，未設定的保持原樣交給驗證處理
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::Config {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            BackendConfig::Apphud(_) => "apphud",
            BackendConfig::RevenueCat(_) => "revenuecat",
        }
    }

    pub fn event_capacity(&self) -> usize {
        self.sync
            .as_ref()
            .and_then(|s| s.event_capacity)
            .unwrap_or(DEFAULT_EVENT_CAPACITY)
    }

    pub fn fetch_commerce(&self) -> bool {
        self.sync
            .as_ref()
            .and_then(|s| s.fetch_commerce)
            .unwrap_or(true)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }
}

impl ApphudConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }
}

impl RevenueCatConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS))
    }
}

impl Validate for ApphudConfig {
    fn validate(&self) -> Result<()> {
        validate_api_key("backend.api_key", &self.api_key)?;
        validate_base_url("backend.base_url", &self.base_url)?;
        if let Some(timeout) = self.timeout_seconds {
            validate_positive_number("backend.timeout_seconds", timeout as usize, 1)?;
        }
        Ok(())
    }
}

impl Validate for RevenueCatConfig {
    fn validate(&self) -> Result<()> {
        validate_api_key("backend.api_key", &self.api_key)?;
        validate_base_url("backend.base_url", &self.base_url)?;
        validate_non_empty_string("backend.entitlement_id", &self.entitlement_id)?;
        if let Some(timeout) = self.timeout_seconds {
            validate_positive_number("backend.timeout_seconds", timeout as usize, 1)?;
        }
        Ok(())
    }
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<()> {
        match &self.backend {
            BackendConfig::Apphud(config) => config.validate()?,
            BackendConfig::RevenueCat(config) => config.validate()?,
        }
        validate_positive_number("sync.event_capacity", self.event_capacity(), 1)?;
        if let Some(level) = self.log_level() {
            if !LOG_LEVELS.contains(&level.trim().to_ascii_lowercase().as_str()) {
                return Err(SyncError::InvalidConfigValue {
                    field: "logging.level".to_string(),
                    value: level.to_string(),
                    reason: format!("expected one of {}", LOG_LEVELS.join(", ")),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_apphud_config() {
        let toml_content = r#"
[backend]
type = "apphud"
api_key = "app_123"
base_url = "https://paywalls.example.com/apphud"
timeout_seconds = 5

[sync]
event_capacity = 8
"#;

        let config = SyncConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.backend_name(), "apphud");
        assert_eq!(config.event_capacity(), 8);
        assert!(config.fetch_commerce());
        match &config.backend {
            BackendConfig::Apphud(apphud) => {
                assert_eq!(apphud.timeout(), std::time::Duration::from_secs(5));
            }
            other => panic!("unexpected backend: {:?}", other),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_revenuecat_config() {
        let toml_content = r#"
[backend]
type = "revenuecat"
api_key = "rc_key"
base_url = "https://paywalls.example.com/rc"
entitlement_id = "pro"

[sync]
fetch_commerce = false

[logging]
json = true
"#;

        let config = SyncConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.backend_name(), "revenuecat");
        assert!(!config.fetch_commerce());
        assert!(config.json_logs());
        assert_eq!(config.event_capacity(), 64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_logging_level() {
        let base = r#"
[backend]
type = "apphud"
api_key = "app_123"
base_url = "https://paywalls.example.com"
"#;

        let config = SyncConfig::from_toml_str(&format!("{}\n[logging]\nlevel = \"warn\"\n", base)).unwrap();
        assert_eq!(config.log_level(), Some("warn"));
        assert!(config.validate().is_ok());

        let config = SyncConfig::from_toml_str(&format!("{}\n[logging]\nlevel = \"loud\"\n", base)).unwrap();
        assert!(matches!(
            config.validate(),
            Err(SyncError::InvalidConfigValue { ref field, .. }) if field == "logging.level"
        ));

        let config = SyncConfig::from_toml_str(base).unwrap();
        assert_eq!(config.log_level(), None);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("SUBSCRIPTION_SYNC_TEST_KEY", "secret_from_env");

        let toml_content = r#"
[backend]
type = "apphud"
api_key = "${SUBSCRIPTION_SYNC_TEST_KEY}"
base_url = "https://paywalls.example.com"
"#;

        let config = SyncConfig::from_toml_str(toml_content).unwrap();
        match config.backend {
            BackendConfig::Apphud(apphud) => assert_eq!(apphud.api_key, "secret_from_env"),
            other => panic!("unexpected backend: {:?}", other),
        }

        std::env::remove_var("SUBSCRIPTION_SYNC_TEST_KEY");
    }

    #[test]
    fn test_unset_env_var_fails_validation() {
        let toml_content = r#"
[backend]
type = "apphud"
api_key = "${SUBSCRIPTION_SYNC_SURELY_UNSET}"
base_url = "https://paywalls.example.com"
"#;

        let config = SyncConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(SyncError::MissingConfig { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let toml_content = r#"
[backend]
type = "revenuecat"
api_key = "rc_key"
base_url = "invalid-url"
entitlement_id = "pro"
"#;

        let config = SyncConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_backend_type() {
        let toml_content = r#"
[backend]
type = "stripe"
api_key = "sk"
base_url = "https://example.com"
"#;

        assert!(matches!(
            SyncConfig::from_toml_str(toml_content),
            Err(SyncError::Config { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[backend]
type = "revenuecat"
api_key = "rc_key"
base_url = "https://paywalls.example.com"
entitlement_id = "premium"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = SyncConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.backend_name(), "revenuecat");
    }
}
