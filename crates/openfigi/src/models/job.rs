//! Outbound mapping job and the oracle's identifier vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier types understood by the OpenFIGI mapping endpoint.
///
/// Serialized with the exact strings the API expects in `idType`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
    #[serde(rename = "TICKER")]
    Ticker,
    #[serde(rename = "ID_CUSIP")]
    Cusip,
    #[serde(rename = "ID_ISIN")]
    Isin,
    #[serde(rename = "ID_SEDOL")]
    Sedol,
    #[serde(rename = "ID_WERTPAPIER")]
    Wertpapier,
    #[serde(rename = "ID_BB_UNIQUE")]
    BbUnique,
    /// The FIGI itself, used for reverse lookups.
    #[serde(rename = "ID_BB_GLOBAL")]
    Figi,
    #[serde(rename = "COMPOSITE_FIGI")]
    CompositeFigi,
    #[serde(rename = "ID_BB_GLOBAL_SHARE_CLASS_LEVEL")]
    ShareClassFigi,
}

impl IdType {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            IdType::Ticker => "TICKER",
            IdType::Cusip => "ID_CUSIP",
            IdType::Isin => "ID_ISIN",
            IdType::Sedol => "ID_SEDOL",
            IdType::Wertpapier => "ID_WERTPAPIER",
            IdType::BbUnique => "ID_BB_UNIQUE",
            IdType::Figi => "ID_BB_GLOBAL",
            IdType::CompositeFigi => "COMPOSITE_FIGI",
            IdType::ShareClassFigi => "ID_BB_GLOBAL_SHARE_CLASS_LEVEL",
        }
    }
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// A single identifier mapping request.
///
/// Optional qualifiers are omitted from the wire format when absent or empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingJob {
    pub id_type: IdType,
    pub id_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exch_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mic_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Market sector filter ("Equity", "Corp", "Govt", ...).
    #[serde(rename = "marketSecDes", skip_serializing_if = "Option::is_none")]
    pub market_sector: Option<String>,
}

impl MappingJob {
    pub fn new(id_type: IdType, id_value: impl Into<String>) -> Self {
        Self {
            id_type,
            id_value: id_value.into(),
            exch_code: None,
            mic_code: None,
            currency: None,
            market_sector: None,
        }
    }

    pub fn with_exch_code(mut self, exch_code: Option<&str>) -> Self {
        self.exch_code = non_empty(exch_code);
        self
    }

    pub fn with_mic_code(mut self, mic_code: Option<&str>) -> Self {
        self.mic_code = non_empty(mic_code);
        self
    }

    pub fn with_currency(mut self, currency: Option<&str>) -> Self {
        self.currency = non_empty(currency);
        self
    }

    pub fn with_market_sector(mut self, market_sector: Option<&str>) -> Self {
        self.market_sector = non_empty(market_sector);
        self
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
