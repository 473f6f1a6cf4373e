//! Mapping candidates and per-job outcomes.

use serde::{Deserialize, Serialize};

use crate::errors::MappingError;

/// One candidate security returned by the oracle.
///
/// Field names follow the OpenFIGI response schema. Everything except the
/// FIGI itself may be missing or null.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FigiMatch {
    pub figi: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub exch_code: Option<String>,
    #[serde(default, rename = "compositeFIGI")]
    pub composite_figi: Option<String>,
    #[serde(default, rename = "shareClassFIGI")]
    pub share_class_figi: Option<String>,
    /// Fine-grained type label, e.g. "Common Stock", "ETP".
    #[serde(default)]
    pub security_type: Option<String>,
    #[serde(default)]
    pub security_type2: Option<String>,
    /// Coarse sector label, e.g. "Equity", "Corp", "Curncy".
    #[serde(default)]
    pub market_sector: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub mic_code: Option<String>,
}

impl FigiMatch {
    /// Display name, falling back to ticker then FIGI when the oracle sent none.
    pub fn display_name(&self) -> String {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(self.ticker.as_deref())
            .unwrap_or(self.figi.as_str())
            .to_string()
    }
}

/// Outcome of one [`MappingJob`](crate::MappingJob).
///
/// The client always returns exactly one of these per input job, in input order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MappingResult {
    /// One or more candidates. The first is treated as authoritative.
    Matched(Vec<FigiMatch>),
    /// The oracle knows nothing about this identifier.
    NoMatch,
    /// The job could not be answered.
    Failed(MappingError),
}

impl MappingResult {
    pub fn is_match(&self) -> bool {
        matches!(self, MappingResult::Matched(matches) if !matches.is_empty())
    }

    pub fn matches(&self) -> &[FigiMatch] {
        match self {
            MappingResult::Matched(matches) => matches,
            _ => &[],
        }
    }

    pub fn first(&self) -> Option<&FigiMatch> {
        self.matches().first()
    }

    pub fn into_first(self) -> Option<FigiMatch> {
        match self {
            MappingResult::Matched(matches) => matches.into_iter().next(),
            _ => None,
        }
    }

    /// Human-readable reason when this result carries no candidate.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            MappingResult::Matched(matches) if !matches.is_empty() => None,
            MappingResult::Matched(_) | MappingResult::NoMatch => {
                Some("No match found".to_string())
            }
            MappingResult::Failed(error) => Some(error.to_string()),
        }
    }
}
