use crate::core::styles::{decode_styles, json_type};
use crate::domain::model::{Subscription, SubscriptionResponse};
use crate::utils::error::{Result, SyncError};
use serde_json::Value;

/// 解析單一 paywall 文件
///
/// - 物件需包含 `subscriptions` 陣列，`styles` 可省略
/// - 字串會先當成 JSON 文字解析（部分後端把 metadata 當字串傳回）
/// - 未知欄位一律忽略；任何一筆 subscription 缺 `identifier` 即整份文件失敗
/// - 純函式，不做 I/O
pub fn decode_document(raw: &Value) -> Result<SubscriptionResponse> {
    match raw {
        Value::String(text) => {
            let parsed: Value = serde_json::from_str(text)
                .map_err(|e| SyncError::decode(format!("fragment is not valid JSON: {}", e)))?;
            if parsed.is_string() {
                return Err(SyncError::decode("fragment is a JSON string, expected an object"));
            }
            decode_document(&parsed)
        }
        Value::Object(document) => {
            let subscriptions = match document.get("subscriptions") {
                Some(Value::Array(entries)) => decode_subscriptions(entries)?,
                Some(Value::Null) | None => {
                    return Err(SyncError::decode("missing `subscriptions` sequence"));
                }
                Some(other) => {
                    return Err(SyncError::decode(format!(
                        "`subscriptions` must be an array, got {}",
                        json_type(other)
                    )));
                }
            };

            Ok(SubscriptionResponse {
                subscriptions,
                styles: decode_styles(document.get("styles")),
            })
        }
        other => Err(SyncError::decode(format!(
            "expected a JSON object, got {}",
            json_type(other)
        ))),
    }
}

/// 從 JSON 文字解析
pub fn decode_document_str(text: &str) -> Result<SubscriptionResponse> {
    decode_document(&Value::String(text.to_string()))
}

fn decode_subscriptions(entries: &[Value]) -> Result<Vec<Subscription>> {
    let mut subscriptions: Vec<Subscription> = Vec::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let subscription: Subscription = serde_json::from_value(entry.clone())
            .map_err(|e| SyncError::decode(format!("subscription #{}: {}", index, e)))?;

        // 同一文件內重複的 identifier：後者覆蓋前者
        match subscriptions
            .iter_mut()
            .find(|s| s.identifier == subscription.identifier)
        {
            Some(existing) => *existing = subscription,
            None => subscriptions.push(subscription),
        }
    }

    Ok(subscriptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "subscriptions": [
                {
                    "identifier": "premium",
                    "titles": ["Unlock everything"],
                    "isShowCloseButton": true,
                    "titleStyleId": "title",
                    "packages": [
                        {"id": "premium_monthly", "priceTextStyleId": "price"},
                        {"id": "premium_yearly", "offer": "Best value"}
                    ]
                },
                {"identifier": "basic"}
            ],
            "styles": {
                "title": {"font": {"size": 28, "weight": "bold"}},
                "price": {"color": {"foreground": ["#111111"]}}
            },
            "experiment": {"variant": "b"}
        })
    }

    #[test]
    fn test_decode_full_document() {
        let response = decode_document(&sample()).unwrap();

        assert_eq!(response.subscriptions.len(), 2);
        let premium = response.subscription("premium").unwrap();
        assert_eq!(premium.is_show_close_button, Some(true));
        assert_eq!(premium.title_style_id.as_deref(), Some("title"));
        assert_eq!(premium.packages.len(), 2);
        assert_eq!(
            premium.packages[0].price_text_style_id.as_deref(),
            Some("price")
        );
        assert!(premium.packages.iter().all(|p| !p.is_priced()));

        let basic = response.subscription("basic").unwrap();
        assert!(basic.packages.is_empty());
        assert!(basic.titles.is_none());

        assert_eq!(response.styles().len(), 2);
    }

    #[test]
    fn test_decode_is_deterministic() {
        let first = decode_document(&sample()).unwrap();
        let second = decode_document(&sample()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_identifier_fails_document() {
        let raw = json!({
            "subscriptions": [{"identifier": "ok"}, {"titles": ["no id"]}]
        });
        let err = decode_document(&raw).unwrap_err();
        assert!(matches!(err, SyncError::Decode { .. }));
        assert!(err.to_string().contains("identifier"));
    }

    #[test]
    fn test_missing_package_id_fails_document() {
        let raw = json!({
            "subscriptions": [{"identifier": "ok", "packages": [{"offer": "x"}]}]
        });
        assert!(decode_document(&raw).is_err());
    }

    #[test]
    fn test_json_text_fragment() {
        let response =
            decode_document_str(r#"{"subscriptions":[{"identifier":"x"}]}"#).unwrap();
        assert_eq!(response.subscriptions[0].identifier, "x");
        assert!(response.styles.is_none());

        assert!(decode_document_str("not json").is_err());
        assert!(decode_document_str(r#""nested""#).is_err());
    }

    #[test]
    fn test_wrong_top_level_shapes() {
        assert!(decode_document(&json!([1, 2, 3])).is_err());
        assert!(decode_document(&json!({"styles": {}})).is_err());
        assert!(decode_document(&json!({"subscriptions": {"identifier": "x"}})).is_err());
    }

    #[test]
    fn test_bad_styles_do_not_fail_document() {
        let raw = json!({
            "subscriptions": [{"identifier": "x"}],
            "styles": {"broken": {"font": 12}, "fine": {}}
        });
        let response = decode_document(&raw).unwrap();
        assert_eq!(response.styles().len(), 1);
        assert_eq!(response.styles()[0].id, "fine");
    }

    #[test]
    fn test_duplicate_identifier_in_one_document() {
        let raw = json!({
            "subscriptions": [
                {"identifier": "a", "singlePackText": "old"},
                {"identifier": "b"},
                {"identifier": "a", "singlePackText": "new"}
            ]
        });
        let response = decode_document(&raw).unwrap();
        assert_eq!(response.subscriptions.len(), 2);
        assert_eq!(response.subscriptions[0].identifier, "a");
        assert_eq!(
            response.subscriptions[0].single_pack_text.as_deref(),
            Some("new")
        );
    }
}
