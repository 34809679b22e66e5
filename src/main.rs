use clap::Parser;
use subscription_sync::config::{BackendConfig, CliArgs, SyncConfig};
use subscription_sync::utils::error::{ErrorSeverity, SyncError};
use subscription_sync::utils::{logger, validation::Validate};
use subscription_sync::{Backend, SyncEngine, SyncReport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 載入 TOML 配置
    let config = match SyncConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 初始化日誌
    if args.json_logs || config.json_logs() {
        logger::init_json_logger(args.verbose, config.log_level());
    } else {
        logger::init_cli_logger(args.verbose, config.log_level());
    }

    tracing::info!("🚀 Starting subscription-sync");
    tracing::info!("📁 Configuration loaded from: {}", args.config);

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no requests will be sent");
        return Ok(());
    }

    let backend = match Backend::from_config(&config.backend) {
        Ok(backend) => backend,
        Err(e) => exit_with(e),
    };
    let fetch_commerce = config.fetch_commerce() && !args.no_commerce;
    let mut engine =
        SyncEngine::new(backend, config.event_capacity()).with_commerce(fetch_commerce);

    match engine.start().await {
        Ok(report) => {
            tracing::info!("✅ Sync completed successfully!");
            print_report(&report, engine.is_active());

            if let Some(message) = engine.last_error() {
                println!("⚠️ Last warning: {}", message);
            }

            if args.dump {
                if let Some(response) = engine.response() {
                    println!("{}", serde_json::to_string_pretty(response)?);
                }
            }
        }
        Err(e) => exit_with(e),
    }

    Ok(())
}

fn exit_with(e: SyncError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Sync failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 4,
        ErrorSeverity::Medium => 2, // 可重試
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn display_config_summary(config: &SyncConfig, args: &CliArgs) {
    println!("📋 Configuration Summary:");
    println!("  Backend: {}", config.backend_name());
    match &config.backend {
        BackendConfig::Apphud(apphud) => {
            println!("  Base URL: {}", apphud.base_url);
            println!("  User: {}", apphud.user_id.as_deref().unwrap_or("anonymous"));
        }
        BackendConfig::RevenueCat(revenuecat) => {
            println!("  Base URL: {}", revenuecat.base_url);
            println!("  Entitlement: {}", revenuecat.entitlement_id);
        }
    }
    println!(
        "  Fetch store prices: {}",
        config.fetch_commerce() && !args.no_commerce
    );

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
}

fn print_report(report: &SyncReport, entitled: bool) {
    println!("✅ Synced from {} at {}", report.backend, report.fetched_at.to_rfc3339());
    println!("  Generation: {}", report.generation);
    println!("  Fragments: {}", report.fragments);
    println!("  Subscriptions: {}", report.subscriptions);
    println!(
        "  Packages: {} ({} priced)",
        report.packages, report.priced_packages
    );
    println!("  Entitlement active: {}", entitled);
}
