//! Security master domain models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use secmaster_openfigi::{FigiMatch, IdType};
use serde::{Deserialize, Serialize};

use super::securities_constants::{
    classify_asset, DATA_SOURCE_MANUAL, DATA_SOURCE_OPENFIGI, DEFAULT_CURRENCY,
};
use crate::errors::{Error, Result, ValidationError};

/// Length of a FIGI.
pub const FIGI_LENGTH: usize = 12;

/// Broad asset classification of a security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    #[default]
    Equity,
    FixedIncome,
    Option,
    Future,
    Fund,
    Commodity,
    Fx,
    Other,
}

impl AssetClass {
    /// Returns the database string representation.
    pub const fn as_db_str(&self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::FixedIncome => "fixed_income",
            AssetClass::Option => "option",
            AssetClass::Future => "future",
            AssetClass::Fund => "fund",
            AssetClass::Commodity => "commodity",
            AssetClass::Fx => "fx",
            AssetClass::Other => "other",
        }
    }

    /// Parses an asset class from its database string.
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "equity" => Some(AssetClass::Equity),
            "fixed_income" => Some(AssetClass::FixedIncome),
            "option" => Some(AssetClass::Option),
            "future" => Some(AssetClass::Future),
            "fund" => Some(AssetClass::Fund),
            "commodity" => Some(AssetClass::Commodity),
            "fx" => Some(AssetClass::Fx),
            "other" => Some(AssetClass::Other),
            _ => None,
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Closed set of identifier types the security master stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    Ticker,
    Cusip,
    Isin,
    Sedol,
    Wertpapier,
    /// The canonical key.
    Figi,
    CompositeFigi,
    ShareClassFigi,
}

impl IdentifierType {
    pub const fn as_db_str(&self) -> &'static str {
        match self {
            IdentifierType::Ticker => "ticker",
            IdentifierType::Cusip => "cusip",
            IdentifierType::Isin => "isin",
            IdentifierType::Sedol => "sedol",
            IdentifierType::Wertpapier => "wertpapier",
            IdentifierType::Figi => "figi",
            IdentifierType::CompositeFigi => "composite_figi",
            IdentifierType::ShareClassFigi => "share_class_figi",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "ticker" => Some(IdentifierType::Ticker),
            "cusip" => Some(IdentifierType::Cusip),
            "isin" => Some(IdentifierType::Isin),
            "sedol" => Some(IdentifierType::Sedol),
            "wertpapier" => Some(IdentifierType::Wertpapier),
            "figi" => Some(IdentifierType::Figi),
            "composite_figi" => Some(IdentifierType::CompositeFigi),
            "share_class_figi" => Some(IdentifierType::ShareClassFigi),
            _ => None,
        }
    }

    /// The oracle's vocabulary for this type.
    pub const fn to_oracle(&self) -> IdType {
        match self {
            IdentifierType::Ticker => IdType::Ticker,
            IdentifierType::Cusip => IdType::Cusip,
            IdentifierType::Isin => IdType::Isin,
            IdentifierType::Sedol => IdType::Sedol,
            IdentifierType::Wertpapier => IdType::Wertpapier,
            IdentifierType::Figi => IdType::Figi,
            IdentifierType::CompositeFigi => IdType::CompositeFigi,
            IdentifierType::ShareClassFigi => IdType::ShareClassFigi,
        }
    }
}

impl FromStr for IdentifierType {
    type Err = Error;

    /// Accepts the stored names and the oracle's names, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TICKER" => Ok(IdentifierType::Ticker),
            "CUSIP" | "ID_CUSIP" => Ok(IdentifierType::Cusip),
            "ISIN" | "ID_ISIN" => Ok(IdentifierType::Isin),
            "SEDOL" | "ID_SEDOL" => Ok(IdentifierType::Sedol),
            "WERTPAPIER" | "ID_WERTPAPIER" => Ok(IdentifierType::Wertpapier),
            "FIGI" | "ID_BB_GLOBAL" => Ok(IdentifierType::Figi),
            "COMPOSITE_FIGI" => Ok(IdentifierType::CompositeFigi),
            "SHARE_CLASS_FIGI" | "ID_BB_GLOBAL_SHARE_CLASS_LEVEL" => {
                Ok(IdentifierType::ShareClassFigi)
            }
            _ => Err(Error::Validation(ValidationError::UnknownIdentifierType(
                s.to_string(),
            ))),
        }
    }
}

impl fmt::Display for IdentifierType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// Canonical security record.
///
/// Identity is an opaque UUID that never changes. The FIGI is the external
/// canonical key and is absent for unverified placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Security {
    pub id: String,
    pub figi: Option<String>,
    pub name: String,
    pub asset_class: AssetClass,
    /// Raw security type label from the oracle.
    pub security_type: Option<String>,
    pub currency: String,
    pub exchange_code: Option<String>,
    pub data_source: String,
    pub is_active: bool,
    pub is_verified: bool,
    pub last_enriched_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Security {
    /// Whether enrichment ran within `cooldown` of `now`.
    pub fn enriched_within(&self, now: NaiveDateTime, cooldown: chrono::Duration) -> bool {
        self.last_enriched_at
            .is_some_and(|at| at > now - cooldown)
    }
}

/// Input model for creating a new security.
///
/// If `id` is None, the store generates a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewSecurity {
    pub id: Option<String>,
    pub figi: Option<String>,
    pub name: String,
    pub asset_class: AssetClass,
    pub security_type: Option<String>,
    pub currency: String,
    pub exchange_code: Option<String>,
    pub data_source: String,
    pub is_verified: bool,
    pub last_enriched_at: Option<NaiveDateTime>,
}

impl NewSecurity {
    /// Validates the new security data
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "name".to_string(),
            )));
        }
        if self.currency.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "currency".to_string(),
            )));
        }
        if let Some(figi) = &self.figi {
            if figi.len() != FIGI_LENGTH || !figi.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(Error::Validation(ValidationError::InvalidInput(format!(
                    "FIGI '{}' must be {} alphanumeric characters",
                    figi, FIGI_LENGTH
                ))));
            }
        }
        if self.is_verified && self.figi.is_none() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "A verified security requires a FIGI".to_string(),
            )));
        }
        Ok(())
    }

    /// Creates a verified security from the oracle's authoritative candidate.
    ///
    /// - `asset_class`: from the candidate's type or sector labels
    /// - `currency`: candidate currency, else USD
    /// - `exchange_code`: candidate exchange, else the requested one
    pub fn from_match(
        candidate: &FigiMatch,
        requested_exchange: Option<&str>,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            id: None,
            figi: Some(candidate.figi.clone()),
            name: candidate.display_name(),
            asset_class: classify_asset(
                candidate.security_type.as_deref(),
                candidate.market_sector.as_deref(),
            ),
            security_type: candidate.security_type.clone(),
            currency: candidate
                .currency
                .clone()
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            exchange_code: candidate
                .exch_code
                .clone()
                .or_else(|| requested_exchange.map(str::to_string)),
            data_source: DATA_SOURCE_OPENFIGI.to_string(),
            is_verified: true,
            last_enriched_at: Some(now),
        }
    }

    /// Creates an unverified placeholder for an identifier the oracle could not map.
    pub fn placeholder(
        identifier_type: IdentifierType,
        identifier_value: &str,
        exchange: Option<&str>,
        currency: Option<&str>,
    ) -> Self {
        Self {
            id: None,
            figi: None,
            name: placeholder_name(identifier_type, identifier_value),
            asset_class: AssetClass::Other,
            security_type: None,
            currency: currency.unwrap_or(DEFAULT_CURRENCY).to_string(),
            exchange_code: exchange.map(str::to_string),
            data_source: DATA_SOURCE_MANUAL.to_string(),
            is_verified: false,
            last_enriched_at: None,
        }
    }
}

/// Display name given to placeholders, e.g. `Unknown (TICKER: ZZZZ99)`.
pub fn placeholder_name(identifier_type: IdentifierType, identifier_value: &str) -> String {
    format!(
        "Unknown ({}: {})",
        identifier_type.as_db_str().to_uppercase(),
        identifier_value
    )
}

/// Outcome of inserting a security whose FIGI may already be taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityInsert {
    /// The row was written.
    Created(Security),
    /// An active security already holds the FIGI; this is it.
    Existing(Security),
}

impl SecurityInsert {
    pub fn is_created(&self) -> bool {
        matches!(self, SecurityInsert::Created(_))
    }

    pub fn into_security(self) -> Security {
        match self {
            SecurityInsert::Created(security) | SecurityInsert::Existing(security) => security,
        }
    }
}

/// External identifier attached to a security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityIdentifier {
    pub id: String,
    pub security_id: String,
    pub identifier_type: IdentifierType,
    pub identifier_value: String,
    /// None acts as a wildcard during lookups.
    pub exchange_code: Option<String>,
    pub is_primary: bool,
    pub created_at: NaiveDateTime,
}

/// Input model for attaching an identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSecurityIdentifier {
    pub security_id: String,
    pub identifier_type: IdentifierType,
    pub identifier_value: String,
    pub exchange_code: Option<String>,
    pub is_primary: bool,
}

impl NewSecurityIdentifier {
    pub fn new(
        security_id: &str,
        identifier_type: IdentifierType,
        identifier_value: &str,
        exchange_code: Option<&str>,
    ) -> Self {
        Self {
            security_id: security_id.to_string(),
            identifier_type,
            identifier_value: identifier_value.trim().to_string(),
            exchange_code: exchange_code
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            is_primary: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

/// One identifier to resolve.
///
/// Batch files may use the oracle's field names (`idType`, `idValue`,
/// `exchCode`) or the short forms `type` and `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[serde(alias = "type", alias = "idType")]
    pub identifier_type: String,
    #[serde(alias = "value", alias = "idValue")]
    pub identifier_value: String,
    #[serde(default, alias = "exchCode")]
    pub exchange: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl ResolveRequest {
    pub fn new(identifier_type: impl Into<String>, identifier_value: impl Into<String>) -> Self {
        Self {
            identifier_type: identifier_type.into(),
            identifier_value: identifier_value.into(),
            ..Default::default()
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}

/// What a resolution produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSecurity {
    pub security_id: String,
    pub figi: Option<String>,
    pub name: String,
    pub ticker: Option<String>,
    pub asset_class: AssetClass,
    pub currency: String,
    /// The security was created by this call.
    pub is_new: bool,
    /// The oracle's data was applied by this call.
    pub enriched: bool,
}

impl ResolvedSecurity {
    pub fn from_security(
        security: &Security,
        ticker: Option<String>,
        is_new: bool,
        enriched: bool,
    ) -> Self {
        Self {
            security_id: security.id.clone(),
            figi: security.figi.clone(),
            name: security.name.clone(),
            ticker,
            asset_class: security.asset_class,
            currency: security.currency.clone(),
            is_new,
            enriched,
        }
    }
}

/// Per-item outcome of a batch resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResolveOutcome {
    Resolved(ResolvedSecurity),
    NotFound,
    Failed { reason: String },
}

impl ResolveOutcome {
    pub fn resolved(&self) -> Option<&ResolvedSecurity> {
        match self {
            ResolveOutcome::Resolved(resolved) => Some(resolved),
            _ => None,
        }
    }
}
