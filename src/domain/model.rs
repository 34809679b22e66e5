use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Styles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FontStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorStyle {
    #[serde(
        default,
        deserialize_with = "string_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub foreground: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "string_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub background: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorderStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(
        default,
        alias = "colors",
        deserialize_with = "string_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub color: Option<Vec<String>>,
    #[serde(default, alias = "cornerRadius", skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

/// A named style. Absent sub-sections stay absent; defaults are a rendering concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<FontStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<BorderStyle>,
}

/// Accepts `null`, a single string or a list of strings.
fn string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => None,
        Some(OneOrMany::One(value)) => Some(vec![value]),
        Some(OneOrMany::Many(values)) => Some(values),
    })
}

// ---------------------------------------------------------------------------
// Commerce values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
    Year,
}

impl PeriodUnit {
    /// Lenient parse: `day`, `days`, `DAY`, `D` all map to `Day`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "d" | "day" | "days" | "daily" => Some(Self::Day),
            "w" | "week" | "weeks" | "weekly" => Some(Self::Week),
            "m" | "month" | "months" | "monthly" => Some(Self::Month),
            "y" | "year" | "years" | "yearly" | "annual" => Some(Self::Year),
            _ => None,
        }
    }
}

/// Canonical billing period of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "count")]
pub enum Duration {
    Weekly,
    EveryTwoWeeks,
    Monthly,
    EveryTwoMonths,
    EveryThreeMonths,
    EverySixMonths,
    Yearly,
    Lifetime,
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationFormat {
    /// "Week", "Month", "Year"
    DurationOnly,
    /// "Weekly", "Monthly", "Yearly"
    DurationAdjective,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Price {
    pub amount: Option<Decimal>,
}

/// Authoritative store data for one product, as translated by a backend adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct CommerceFact {
    pub product_id: String,
    pub price: Option<Decimal>,
    pub period_unit: Option<PeriodUnit>,
    pub period_value: u32,
}

impl CommerceFact {
    pub fn new(
        product_id: impl Into<String>,
        price: Option<Decimal>,
        period_unit: Option<PeriodUnit>,
        period_value: u32,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            price,
            period_unit,
            period_value,
        }
    }
}

/// Facts tagged with the fetch generation they were requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct CommerceBatch {
    pub generation: u64,
    pub facts: Vec<CommerceFact>,
}

// ---------------------------------------------------------------------------
// Paywall entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_style_id: Option<String>,
    #[serde(default, alias = "subtitleStyleId", skip_serializing_if = "Option::is_none")]
    pub sub_title_style_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continue_button_style_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_text_style_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_text_style_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<String>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Duration>,
}

impl Package {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title_style_id: None,
            sub_title_style_id: None,
            continue_button_style_id: None,
            duration_text_style_id: None,
            price_text_style_id: None,
            offer: None,
            price: None,
            duration: None,
        }
    }

    pub fn is_priced(&self) -> bool {
        self.price.is_some()
    }

    /// `"9.99/Monthly"`, or an empty string while no amount is known.
    pub fn display_price(&self) -> String {
        let Some(amount) = self.price.as_ref().and_then(|p| p.amount) else {
            return String::new();
        };
        let duration = self.duration.unwrap_or(Duration::Lifetime);
        format!(
            "{}/{}",
            amount.round_dp(2),
            duration.render(DurationFormat::DurationAdjective)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SubscriptionWire")]
pub struct Subscription {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub titles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_titles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub single_pack_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_show_close_button: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_show_skip_button: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_style_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_title_style_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_style_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_button_style_id: Option<String>,
    pub packages: Vec<Package>,
}

impl Subscription {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            titles: None,
            sub_titles: None,
            single_pack_text: None,
            is_show_close_button: None,
            is_show_skip_button: None,
            title_style_id: None,
            sub_title_style_id: None,
            background_style_id: None,
            close_button_style_id: None,
            packages: Vec::new(),
        }
    }

    pub fn package(&self, id: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.id == id)
    }
}

/// Shape accepted on the wire, including keys renamed across SDK versions.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionWire {
    identifier: String,
    #[serde(default, deserialize_with = "string_list")]
    titles: Option<Vec<String>>,
    #[serde(default, alias = "subtitles", deserialize_with = "string_list")]
    sub_titles: Option<Vec<String>>,
    #[serde(default)]
    single_pack_text: Option<String>,
    #[serde(default)]
    is_show_close_button: Option<bool>,
    #[serde(default)]
    is_show_skip_button: Option<bool>,
    #[serde(default)]
    title_style_id: Option<String>,
    #[serde(default, alias = "subtitleStyleId")]
    sub_title_style_id: Option<String>,
    #[serde(default)]
    background_style_id: Option<String>,
    #[serde(default)]
    close_button_style_id: Option<String>,
    #[serde(default)]
    packages: Option<Vec<Package>>,
    /// 舊版 paywall 只有 offers 沒有 packages
    #[serde(default)]
    offers: Option<Vec<OfferWire>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferWire {
    #[serde(alias = "packageId", alias = "productId")]
    pack_id: String,
    #[serde(default)]
    text: Option<String>,
}

impl From<SubscriptionWire> for Subscription {
    fn from(wire: SubscriptionWire) -> Self {
        let offers = wire.offers.unwrap_or_default();

        let packages = match wire.packages {
            Some(mut packages) => {
                for package in packages.iter_mut().filter(|p| p.offer.is_none()) {
                    package.offer = offers
                        .iter()
                        .find(|o| o.pack_id == package.id)
                        .and_then(|o| o.text.clone());
                }
                packages
            }
            None => offers
                .into_iter()
                .map(|offer| Package {
                    offer: offer.text,
                    ..Package::new(offer.pack_id)
                })
                .collect(),
        };

        Self {
            identifier: wire.identifier,
            titles: wire.titles,
            sub_titles: wire.sub_titles,
            single_pack_text: wire.single_pack_text,
            is_show_close_button: wire.is_show_close_button,
            is_show_skip_button: wire.is_show_skip_button,
            title_style_id: wire.title_style_id,
            sub_title_style_id: wire.sub_title_style_id,
            background_style_id: wire.background_style_id,
            close_button_style_id: wire.close_button_style_id,
            packages: dedup_packages(packages),
        }
    }
}

/// Package ids are unique per subscription; a repeated id replaces the earlier entry in place.
fn dedup_packages(packages: Vec<Package>) -> Vec<Package> {
    let mut unique: Vec<Package> = Vec::with_capacity(packages.len());
    for package in packages {
        match unique.iter_mut().find(|p| p.id == package.id) {
            Some(existing) => *existing = package,
            None => unique.push(package),
        }
    }
    unique
}

/// The canonical response: the only aggregate handed to observers.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SubscriptionResponse {
    pub subscriptions: Vec<Subscription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub styles: Option<Vec<StyleDefinition>>,
}

impl SubscriptionResponse {
    pub fn subscription(&self, identifier: &str) -> Option<&Subscription> {
        self.subscriptions
            .iter()
            .find(|s| s.identifier == identifier)
    }

    pub fn styles(&self) -> &[StyleDefinition] {
        self.styles.as_deref().unwrap_or(&[])
    }

    pub fn style(&self, id: &str) -> Option<&StyleDefinition> {
        self.styles().iter().find(|s| s.id == id)
    }

    /// 依出現順序列出所有 package id（去重）
    pub fn product_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for package in self.subscriptions.iter().flat_map(|s| s.packages.iter()) {
            if !ids.contains(&package.id) {
                ids.push(package.id.clone());
            }
        }
        ids
    }

    pub fn find_package(&self, id: &str) -> Option<&Package> {
        self.subscriptions.iter().find_map(|s| s.package(id))
    }

    pub fn packages_mut(&mut self) -> impl Iterator<Item = &mut Package> {
        self.subscriptions
            .iter_mut()
            .flat_map(|s| s.packages.iter_mut())
    }
}

/// Result handed back for purchase and restore; never an error past the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseOutcome {
    pub success: bool,
    pub message: Option<String>,
}

impl PurchaseOutcome {
    pub fn succeeded() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_offers_become_packages() {
        let subscription: Subscription = serde_json::from_value(serde_json::json!({
            "identifier": "premium",
            "offers": [
                {"packId": "premium_weekly", "text": "Try it"},
                {"packId": "premium_yearly"}
            ]
        }))
        .unwrap();

        assert_eq!(subscription.packages.len(), 2);
        assert_eq!(subscription.packages[0].id, "premium_weekly");
        assert_eq!(subscription.packages[0].offer.as_deref(), Some("Try it"));
        assert_eq!(subscription.packages[1].offer, None);
    }

    #[test]
    fn test_offer_text_fills_matching_package() {
        let subscription: Subscription = serde_json::from_value(serde_json::json!({
            "identifier": "premium",
            "packages": [{"id": "a"}, {"id": "b", "offer": "own"}],
            "offers": [{"packId": "a", "text": "Save 50%"}, {"packId": "b", "text": "ignored"}]
        }))
        .unwrap();

        assert_eq!(subscription.packages[0].offer.as_deref(), Some("Save 50%"));
        assert_eq!(subscription.packages[1].offer.as_deref(), Some("own"));
    }

    #[test]
    fn test_renamed_keys_and_single_string_lists() {
        let subscription: Subscription = serde_json::from_value(serde_json::json!({
            "identifier": "basic",
            "titles": "Go Pro",
            "subtitles": ["Line one", "Line two"],
            "isShowCloseButton": null
        }))
        .unwrap();

        assert_eq!(subscription.titles, Some(vec!["Go Pro".to_string()]));
        assert_eq!(subscription.sub_titles.as_ref().map(Vec::len), Some(2));
        assert_eq!(subscription.is_show_close_button, None);
    }

    #[test]
    fn test_duplicate_package_ids_collapse() {
        let subscription: Subscription = serde_json::from_value(serde_json::json!({
            "identifier": "premium",
            "packages": [
                {"id": "a", "offer": "first"},
                {"id": "b"},
                {"id": "a", "offer": "second"}
            ]
        }))
        .unwrap();

        assert_eq!(subscription.packages.len(), 2);
        assert_eq!(subscription.packages[0].offer.as_deref(), Some("second"));
    }

    #[test]
    fn test_price_is_never_decoded_from_config() {
        let package: Package = serde_json::from_value(serde_json::json!({
            "id": "a",
            "price": {"amount": "1.00"},
            "duration": "monthly"
        }))
        .unwrap();

        assert!(!package.is_priced());
        assert_eq!(package.duration, None);
    }

    #[test]
    fn test_display_price() {
        let mut package = Package::new("premium_monthly");
        assert_eq!(package.display_price(), "");

        package.price = Some(Price {
            amount: Some(Decimal::new(999, 2)),
        });
        package.duration = Some(Duration::Monthly);
        assert_eq!(package.display_price(), "9.99/Monthly");
    }

    #[test]
    fn test_period_unit_parse() {
        assert_eq!(PeriodUnit::parse("Month"), Some(PeriodUnit::Month));
        assert_eq!(PeriodUnit::parse("weeks"), Some(PeriodUnit::Week));
        assert_eq!(PeriodUnit::parse("D"), Some(PeriodUnit::Day));
        assert_eq!(PeriodUnit::parse("fortnight"), None);
    }

    #[test]
    fn test_product_ids_are_unique_in_encounter_order() {
        let mut first = Subscription::new("premium");
        first.packages = vec![Package::new("a"), Package::new("b")];
        let mut second = Subscription::new("basic");
        second.packages = vec![Package::new("b"), Package::new("c")];

        let response = SubscriptionResponse {
            subscriptions: vec![first, second],
            styles: None,
        };

        assert_eq!(response.product_ids(), vec!["a", "b", "c"]);
    }
}
