//! HTTP plumbing shared by both backend adapters.

use crate::utils::error::{Result, SyncError};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

pub(crate) fn build_client(backend: &'static str, timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SyncError::fetch(backend, format!("could not build HTTP client: {}", e)))
}

/// 送出請求並解析 JSON；傳輸錯誤、非 2xx、格式錯誤皆轉為 `SyncError::Fetch`
pub(crate) async fn send_json<T: DeserializeOwned>(
    backend: &'static str,
    request: RequestBuilder,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| SyncError::fetch(backend, e.to_string()))?;

    let status = response.status();
    tracing::debug!("{} response status: {}", backend, status);

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let snippet: String = body.chars().take(200).collect();
        return Err(SyncError::fetch(
            backend,
            format!("HTTP {}: {}", status, snippet),
        ));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SyncError::fetch(backend, format!("unexpected response body: {}", e)))
}

/// 購買與恢復流程的錯誤一律以 `SyncError::Operation` 呈現
pub(crate) fn into_operation(backend: &'static str, error: SyncError) -> SyncError {
    match error {
        SyncError::Fetch { message, .. } => SyncError::operation(backend, message),
        other => other,
    }
}
