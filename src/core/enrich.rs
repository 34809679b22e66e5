use crate::core::duration::normalize;
use crate::domain::model::{CommerceFact, Price, SubscriptionResponse};

/// 一次 enrichment 的統計
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    /// 被寫入 price/duration 的 package 數（同 id 出現在多個 subscription 時分別計算）
    pub updated_packages: usize,
    /// 沒有任何 package 對應的 product id
    pub unmatched_facts: Vec<String>,
}

/// 將 commerce facts 寫入對應的 package
///
/// 以 id 完全相等比對；命中的 package 其 price 與 duration 整個覆蓋，未命中的保持原狀。
/// 同一 product id 有多筆 fact 時以最後一筆為準。重複套用同一組 facts 結果不變。
pub fn apply_commerce_facts(
    response: &mut SubscriptionResponse,
    facts: &[CommerceFact],
) -> EnrichmentReport {
    let mut report = EnrichmentReport::default();

    for package in response.packages_mut() {
        let Some(fact) = facts.iter().rev().find(|f| f.product_id == package.id) else {
            continue;
        };
        package.price = Some(Price { amount: fact.price });
        package.duration = Some(normalize(fact.period_unit, fact.period_value));
        report.updated_packages += 1;
    }

    for fact in facts {
        let known = response.find_package(&fact.product_id).is_some();
        if !known && !report.unmatched_facts.contains(&fact.product_id) {
            report.unmatched_facts.push(fact.product_id.clone());
        }
    }

    if !report.unmatched_facts.is_empty() {
        tracing::debug!(
            "Commerce facts without a matching package: {:?}",
            report.unmatched_facts
        );
    }

    report
}
