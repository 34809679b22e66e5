use crate::core::document::decode_document;
use crate::domain::model::SubscriptionResponse;
use crate::utils::error::Result;
use serde_json::Value;

/// 合併多個 placement 的 fragment 成為一份 canonical response
///
/// - subscriptions 依 identifier 聯集，後出現的 fragment 整筆覆蓋前者（保留原本位置）
/// - styles 依 id 聯集，先出現者為準
/// - 解析失敗的 fragment 記錄後丟棄，不影響其他 fragment
#[derive(Debug, Default)]
pub struct FragmentMerger {
    merged: SubscriptionResponse,
    accepted: usize,
    dropped: usize,
}

impl FragmentMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析並合併一個 fragment；失敗時回傳錯誤且不改變目前狀態
    pub fn push_fragment(&mut self, fragment: &Value) -> Result<()> {
        match decode_document(fragment) {
            Ok(document) => {
                self.absorb(document);
                Ok(())
            }
            Err(e) => {
                self.dropped += 1;
                Err(e)
            }
        }
    }

    pub fn absorb(&mut self, document: SubscriptionResponse) {
        self.accepted += 1;

        for subscription in document.subscriptions {
            match self
                .merged
                .subscriptions
                .iter_mut()
                .find(|s| s.identifier == subscription.identifier)
            {
                Some(existing) => {
                    tracing::debug!(
                        "Subscription '{}' redefined by a later fragment, replacing it",
                        subscription.identifier
                    );
                    *existing = subscription;
                }
                None => self.merged.subscriptions.push(subscription),
            }
        }

        if let Some(styles) = document.styles {
            let registry = self.merged.styles.get_or_insert_with(Vec::new);
            for style in styles {
                if !registry.iter().any(|s| s.id == style.id) {
                    registry.push(style);
                }
            }
        }
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn finish(self) -> SubscriptionResponse {
        self.merged
    }
}

/// 依輸入順序合併所有 fragment
pub fn merge_fragments(fragments: &[Value]) -> SubscriptionResponse {
    let mut merger = FragmentMerger::new();

    for (index, fragment) in fragments.iter().enumerate() {
        if let Err(e) = merger.push_fragment(fragment) {
            tracing::warn!("⚠️ Dropping fragment #{}: {}", index, e);
        }
    }

    tracing::debug!(
        "🧩 Merged {} fragment(s), dropped {}",
        merger.accepted(),
        merger.dropped()
    );
    merger.finish()
}
