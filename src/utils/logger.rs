use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `[logging].level` 可用的值
pub const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// 沒有 RUST_LOG 時使用的 filter；`--verbose` 優先於設定檔的 level
pub fn filter_directive(verbose: bool, level: Option<&str>) -> String {
    if verbose {
        return "subscription_sync=debug,info".to_string();
    }
    match level.map(|l| l.trim().to_ascii_lowercase()) {
        Some(level) if LOG_LEVELS.contains(&level.as_str()) => {
            format!("subscription_sync={}", level)
        }
        _ => "subscription_sync=info".to_string(),
    }
}

fn default_filter(verbose: bool, level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(verbose, level)))
}

/// 日誌寫到 stderr，stdout 留給 `--dump` 與 CSV 輸出
pub fn init_cli_logger(verbose: bool, level: Option<&str>) {
    tracing_subscriber::registry()
        .with(default_filter(verbose, level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON 格式輸出，方便收集到集中式日誌
pub fn init_json_logger(verbose: bool, level: Option<&str>) {
    tracing_subscriber::registry()
        .with(default_filter(verbose, level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_level_sets_crate_filter() {
        assert_eq!(filter_directive(false, Some("warn")), "subscription_sync=warn");
        assert_eq!(filter_directive(false, Some(" DEBUG ")), "subscription_sync=debug");
    }

    #[test]
    fn test_verbose_and_fallback() {
        assert_eq!(
            filter_directive(true, Some("error")),
            "subscription_sync=debug,info"
        );
        assert_eq!(filter_directive(false, None), "subscription_sync=info");
        assert_eq!(filter_directive(false, Some("loud")), "subscription_sync=info");
    }
}
