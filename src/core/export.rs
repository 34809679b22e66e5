use crate::domain::model::{DurationFormat, SubscriptionResponse};
use crate::utils::error::{Result, SyncError};

/// 輸出每個 package 的價格表 (CSV)
pub fn price_sheet_csv(response: &SubscriptionResponse) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["subscription", "package", "price", "duration", "display_price"])?;

    for subscription in &response.subscriptions {
        for package in &subscription.packages {
            let price = package
                .price
                .as_ref()
                .and_then(|p| p.amount)
                .map(|amount| amount.to_string())
                .unwrap_or_default();
            let duration = package
                .duration
                .map(|d| d.render(DurationFormat::DurationOnly))
                .unwrap_or_default();

            writer.write_record([
                subscription.identifier.as_str(),
                package.id.as_str(),
                price.as_str(),
                duration.as_str(),
                package.display_price().as_str(),
            ])?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| SyncError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| SyncError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}
