//! Security master constants and oracle label tables.

use super::securities_model::AssetClass;

/// Data source tag for securities created from an oracle match.
pub const DATA_SOURCE_OPENFIGI: &str = "openfigi";

/// Data source tag for placeholders and hand-entered securities.
pub const DATA_SOURCE_MANUAL: &str = "manual";

/// Currency used when neither the request nor the oracle supplies one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Securities enriched more recently than this are not re-queried.
pub const DEFAULT_ENRICHMENT_COOLDOWN_DAYS: i64 = 7;

/// Concurrent resolutions in flight during a batch.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Asset class for the oracle's fine-grained security type label.
pub fn asset_class_for_security_type(label: &str) -> Option<AssetClass> {
    match label {
        "Common Stock" | "Preferred Stock" | "Depositary Receipt" | "REIT" | "Warrant" => {
            Some(AssetClass::Equity)
        }
        "ETP" | "Mutual Fund" | "Unit" => Some(AssetClass::Fund),
        "Bond" => Some(AssetClass::FixedIncome),
        "Option" => Some(AssetClass::Option),
        "Future" => Some(AssetClass::Future),
        "Index" => Some(AssetClass::Other),
        _ => None,
    }
}

/// Asset class for the oracle's coarse market sector label.
pub fn asset_class_for_market_sector(label: &str) -> Option<AssetClass> {
    match label {
        "Equity" | "Pfd" => Some(AssetClass::Equity),
        "Corp" | "Govt" | "Mtge" | "Muni" | "M-Mkt" => Some(AssetClass::FixedIncome),
        "Comdty" => Some(AssetClass::Commodity),
        "Curncy" => Some(AssetClass::Fx),
        "Index" => Some(AssetClass::Other),
        _ => None,
    }
}

/// Classify a candidate from its labels.
///
/// A security type label decides on its own; the market sector is consulted
/// only when no type was sent. Unmapped labels yield `Other`, no labels at all
/// yield `Equity`.
pub fn classify_asset(security_type: Option<&str>, market_sector: Option<&str>) -> AssetClass {
    if let Some(label) = non_blank(security_type) {
        return asset_class_for_security_type(label).unwrap_or(AssetClass::Other);
    }
    if let Some(label) = non_blank(market_sector) {
        return asset_class_for_market_sector(label).unwrap_or(AssetClass::Other);
    }
    AssetClass::Equity
}

fn non_blank(label: Option<&str>) -> Option<&str> {
    label.map(str::trim).filter(|s| !s.is_empty())
}
