use httpmock::prelude::*;
use serde_json::json;
use std::io::Write;
use subscription_sync::utils::validation::Validate;
use subscription_sync::{Backend, SyncConfig, SyncEngine, SyncError, SyncEvent};
use tempfile::NamedTempFile;

fn write_config(server: &MockServer) -> anyhow::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[backend]
type = "apphud"
api_key = "app_engine_key"
base_url = "{}"
user_id = "engine-user"

[sync]
event_capacity = 32
"#,
        server.base_url()
    )?;
    Ok(file)
}

async fn mock_store(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET).path("/products");
            then.status(200).json_body(json!({
                "products": [
                    {"product_id": "premium_monthly", "price": "9.99", "subscription_period": {"unit": "month", "value": 1}},
                    {"product_id": "basic_yearly", "price": "29.99", "subscription_period": "yearly"}
                ]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/subscription_status");
            then.status(200)
                .json_body(json!({"has_active_subscription": true}));
        })
        .await;
}

#[tokio::test]
async fn test_sync_from_config_end_to_end() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let placements = server
        .mock_async(|when, then| {
            when.method(GET).path("/placements");
            then.status(200).json_body(json!({
                "placements": [
                    {"identifier": "P1", "paywall": {"json": {
                        "subscriptions": [{"identifier": "premium", "packages": [
                            {"id": "premium_monthly"}, {"id": "premium_yearly"}
                        ]}],
                        "styles": {"title": {"font": {"size": 20}}}
                    }}},
                    {"identifier": "P2", "paywall": {"json": {
                        "subscriptions": [{"identifier": "basic", "packages": [{"id": "basic_yearly"}]}]
                    }}}
                ]
            }));
        })
        .await;
    mock_store(&server).await;

    let file = write_config(&server)?;
    let config = SyncConfig::from_file(file.path())?;
    config.validate()?;

    let backend = Backend::from_config(&config.backend)?;
    let mut engine = SyncEngine::new(backend, config.event_capacity());
    let mut events = engine.subscribe();

    let report = engine.start().await?;
    placements.assert_async().await;

    assert_eq!(report.backend, "apphud");
    assert_eq!(report.fragments, 2);
    assert_eq!(report.subscriptions, 2);
    assert_eq!(report.packages, 3);
    assert_eq!(report.priced_packages, 2);
    assert!(engine.is_active());

    let ids: Vec<&str> = engine
        .response()
        .unwrap()
        .subscriptions
        .iter()
        .map(|s| s.identifier.as_str())
        .collect();
    assert_eq!(ids, vec!["premium", "basic"]);
    assert_eq!(engine.styles().len(), 1);
    assert!(!engine
        .subscription("premium")
        .unwrap()
        .package("premium_yearly")
        .unwrap()
        .is_priced());

    let mut saw_entitlement = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SyncEvent::EntitlementChanged(true)) {
            saw_entitlement = true;
        }
    }
    assert!(saw_entitlement);
    Ok(())
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_response() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let placements = server
        .mock_async(|when, then| {
            when.method(GET).path("/placements");
            then.status(200).json_body(json!({
                "placements": [{"identifier": "P1", "paywall": {"json": {
                    "subscriptions": [{"identifier": "premium", "packages": [{"id": "premium_monthly"}]}]
                }}}]
            }));
        })
        .await;
    mock_store(&server).await;

    let file = write_config(&server)?;
    let config = SyncConfig::from_file(file.path())?;
    let mut engine = SyncEngine::new(Backend::from_config(&config.backend)?, 8);

    engine.refresh().await?;
    let before = engine.response().cloned();
    assert!(before.is_some());

    placements.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/placements");
            then.status(502).body("bad gateway");
        })
        .await;

    let err = engine.refresh().await.unwrap_err();
    assert!(matches!(err, SyncError::Fetch { .. }));
    assert!(err.is_retryable());
    assert_eq!(engine.response().cloned(), before);
    assert_eq!(engine.generation(), 1);
    Ok(())
}

#[tokio::test]
async fn test_purchase_through_engine() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/placements");
            then.status(200).json_body(json!({
                "placements": [{"identifier": "P1", "paywall": {"json": {
                    "subscriptions": [{"identifier": "premium", "offers": [{"packId": "premium_monthly", "text": "1 week free"}]}]
                }}}]
            }));
        })
        .await;
    let purchase = server
        .mock_async(|when, then| {
            when.method(POST).path("/purchases");
            then.status(200)
                .json_body(json!({"subscription": {"is_active": true}}));
        })
        .await;

    let file = write_config(&server)?;
    let config = SyncConfig::from_file(file.path())?;
    let mut engine =
        SyncEngine::new(Backend::from_config(&config.backend)?, 8).with_commerce(false);
    engine.refresh().await?;

    let package = engine.response().unwrap().find_package("premium_monthly").unwrap();
    assert_eq!(package.offer.as_deref(), Some("1 week free"));

    let missing = engine.purchase("premium_yearly").await;
    assert!(!missing.success);
    assert_eq!(missing.message.as_deref(), Some("Product not found!"));
    purchase.assert_hits_async(0).await;

    let outcome = engine.purchase("premium_monthly").await;
    assert!(outcome.success);
    assert!(engine.is_active());
    purchase.assert_hits_async(1).await;
    Ok(())
}
