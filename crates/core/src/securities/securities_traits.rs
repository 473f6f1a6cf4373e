use secmaster_openfigi::FigiMatch;

use super::securities_model::{
    IdentifierType, NewSecurity, NewSecurityIdentifier, ResolveOutcome, ResolveRequest,
    ResolvedSecurity, Security, SecurityIdentifier, SecurityInsert,
};
use crate::errors::Result;

/// Trait defining the contract for security master operations.
#[async_trait::async_trait]
pub trait SecurityMasterServiceTrait: Send + Sync {
    /// Resolves one external identifier to its canonical security.
    /// Returns `None` when nothing matched and creation was not requested.
    async fn resolve(
        &self,
        request: &ResolveRequest,
        create_if_missing: bool,
    ) -> Result<Option<ResolvedSecurity>>;

    /// Resolves many identifiers. The output is aligned with `requests` and
    /// per-item errors never abort the batch.
    async fn resolve_many(
        &self,
        requests: Vec<ResolveRequest>,
        create_if_missing: bool,
    ) -> Vec<ResolveOutcome>;

    /// Fills in missing oracle data for an existing security.
    /// Returns whether anything changed.
    async fn enrich(&self, security_id: &str) -> Result<bool>;

    fn get_security(&self, security_id: &str) -> Result<Security>;
    fn list_identifiers(&self, security_id: &str) -> Result<Vec<SecurityIdentifier>>;
    async fn deactivate(&self, security_id: &str) -> Result<()>;

    /// Free-text lookup against the oracle. Best-effort.
    async fn search(&self, query: &str, limit: usize) -> Vec<FigiMatch>;
}

/// Trait defining the contract for security repository operations.
///
/// Lookups only ever return active securities.
#[async_trait::async_trait]
pub trait SecurityRepositoryTrait: Send + Sync {
    /// Find the security owning (type, value). When `exchange` is given, a
    /// stored identifier matches if its exchange is equal or NULL, preferring
    /// the exact match.
    fn find_by_identifier(
        &self,
        identifier_type: IdentifierType,
        identifier_value: &str,
        exchange: Option<&str>,
    ) -> Result<Option<Security>>;

    fn find_by_canonical_key(&self, figi: &str) -> Result<Option<Security>>;

    /// Any security by id, active or not.
    fn get_by_id(&self, security_id: &str) -> Result<Option<Security>>;

    /// The primary identifier of a type, else any identifier of that type.
    fn get_primary_identifier(
        &self,
        security_id: &str,
        identifier_type: IdentifierType,
    ) -> Result<Option<SecurityIdentifier>>;

    fn list_identifiers(&self, security_id: &str) -> Result<Vec<SecurityIdentifier>>;

    /// Inserts a security. If an active security already holds the FIGI the
    /// insert is skipped and that security is returned instead.
    async fn insert_security(&self, new_security: NewSecurity) -> Result<SecurityInsert>;

    /// Attaches an identifier. Returns false when the (type, value, exchange)
    /// triple already exists.
    async fn insert_identifier_if_absent(&self, identifier: NewSecurityIdentifier)
        -> Result<bool>;

    /// Records an enrichment: sets the FIGI when given, sets the verified flag
    /// and stamps `last_enriched_at`.
    async fn update_enrichment(
        &self,
        security_id: &str,
        figi: Option<String>,
        verified: bool,
    ) -> Result<()>;

    /// Clears the active flag. Returns false when no such security exists.
    async fn deactivate(&self, security_id: &str) -> Result<bool>;
}
