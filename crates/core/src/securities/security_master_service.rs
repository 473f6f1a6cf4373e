use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use secmaster_openfigi::{FigiMatch, MappingJob, MappingResult, MappingService};

use super::securities_constants::{DEFAULT_BATCH_CONCURRENCY, DEFAULT_ENRICHMENT_COOLDOWN_DAYS};
use super::securities_model::{
    IdentifierType, NewSecurity, NewSecurityIdentifier, ResolveOutcome, ResolveRequest,
    ResolvedSecurity, Security, SecurityIdentifier, SecurityInsert,
};
use super::securities_traits::{SecurityMasterServiceTrait, SecurityRepositoryTrait};
use crate::errors::{Error, Result, ValidationError};

/// Tunables for [`SecurityMasterService`].
#[derive(Debug, Clone)]
pub struct SecurityMasterConfig {
    /// Keyed securities enriched more recently than this are skipped.
    pub enrichment_cooldown: chrono::Duration,
    /// Resolutions in flight at once during `resolve_many`.
    pub batch_concurrency: usize,
}

impl Default for SecurityMasterConfig {
    fn default() -> Self {
        Self {
            enrichment_cooldown: chrono::Duration::days(DEFAULT_ENRICHMENT_COOLDOWN_DAYS),
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }
}

/// Resolves external identifiers to canonical securities.
///
/// The local store is always consulted first; the oracle is only called on a
/// miss. Securities are never deleted, and a FIGI is never removed once set.
pub struct SecurityMasterService {
    repository: Arc<dyn SecurityRepositoryTrait>,
    mapper: Arc<dyn MappingService>,
    config: SecurityMasterConfig,
}

impl SecurityMasterService {
    pub fn new(
        repository: Arc<dyn SecurityRepositoryTrait>,
        mapper: Arc<dyn MappingService>,
    ) -> Self {
        Self {
            repository,
            mapper,
            config: SecurityMasterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: SecurityMasterConfig) -> Self {
        self.config = config;
        self
    }

    fn primary_ticker(&self, security_id: &str) -> Option<String> {
        match self
            .repository
            .get_primary_identifier(security_id, IdentifierType::Ticker)
        {
            Ok(identifier) => identifier.map(|i| i.identifier_value),
            Err(e) => {
                warn!("Could not load ticker for security {}: {}", security_id, e);
                None
            }
        }
    }

    /// Attach an identifier, logging and swallowing store failures.
    async fn attach(&self, identifier: NewSecurityIdentifier) -> bool {
        let label = format!(
            "{}={}",
            identifier.identifier_type, identifier.identifier_value
        );
        let security_id = identifier.security_id.clone();

        match self.repository.insert_identifier_if_absent(identifier).await {
            Ok(inserted) => {
                if inserted {
                    debug!("Added identifier {} to security {}", label, security_id);
                }
                inserted
            }
            Err(e) => {
                warn!(
                    "Could not add identifier {} to security {}: {}",
                    label, security_id, e
                );
                false
            }
        }
    }

    async fn create_placeholder(
        &self,
        identifier_type: IdentifierType,
        identifier_value: &str,
        exchange: Option<&str>,
        currency: Option<&str>,
    ) -> Result<ResolvedSecurity> {
        let new_security =
            NewSecurity::placeholder(identifier_type, identifier_value, exchange, currency);
        new_security.validate()?;

        let security = self
            .repository
            .insert_security(new_security)
            .await?
            .into_security();

        let identifier =
            NewSecurityIdentifier::new(&security.id, identifier_type, identifier_value, exchange)
                .primary();

        if !self.repository.insert_identifier_if_absent(identifier).await? {
            // Another caller attached this identifier first; defer to its security.
            // A placeholder without its identifier is unreachable, so it never survives.
            let winner = self
                .repository
                .find_by_identifier(identifier_type, identifier_value, exchange)?
                .filter(|winner| winner.id != security.id);
            self.repository.deactivate(&security.id).await?;

            let Some(winner) = winner else {
                return Err(Error::Unexpected(format!(
                    "Identifier {}={} is taken but has no active owner",
                    identifier_type, identifier_value
                )));
            };
            warn!(
                "Identifier {}={} was claimed by security {}, retired placeholder {}",
                identifier_type, identifier_value, winner.id, security.id
            );
            let ticker = self.primary_ticker(&winner.id);
            return Ok(ResolvedSecurity::from_security(
                &winner, ticker, false, false,
            ));
        }

        warn!("Created placeholder security: {}", security.name);

        let ticker =
            (identifier_type == IdentifierType::Ticker).then(|| identifier_value.to_string());
        Ok(ResolvedSecurity::from_security(&security, ticker, true, false))
    }

    async fn create_from_match(
        &self,
        candidate: FigiMatch,
        identifier_type: IdentifierType,
        identifier_value: &str,
        exchange: Option<&str>,
    ) -> Result<ResolvedSecurity> {
        let new_security = NewSecurity::from_match(&candidate, exchange, Utc::now().naive_utc());
        new_security.validate()?;

        let security = match self.repository.insert_security(new_security).await? {
            SecurityInsert::Created(security) => security,
            SecurityInsert::Existing(winner) => {
                info!(
                    "FIGI {} was created concurrently as security {}",
                    candidate.figi, winner.id
                );
                self.attach(NewSecurityIdentifier::new(
                    &winner.id,
                    identifier_type,
                    identifier_value,
                    exchange,
                ))
                .await;
                let ticker = self.primary_ticker(&winner.id);
                return Ok(ResolvedSecurity::from_security(&winner, ticker, false, true));
            }
        };

        // The security is committed; identifier failures below are not fatal.
        let candidate_exchange = candidate.exch_code.as_deref();
        let mut identifiers = vec![NewSecurityIdentifier::new(
            &security.id,
            IdentifierType::Figi,
            &candidate.figi,
            candidate_exchange,
        )
        .primary()];
        if let Some(ticker) = non_blank(candidate.ticker.as_deref()) {
            identifiers.push(NewSecurityIdentifier::new(
                &security.id,
                IdentifierType::Ticker,
                ticker,
                candidate_exchange,
            ));
        }
        if let Some(composite) = non_blank(candidate.composite_figi.as_deref()) {
            identifiers.push(NewSecurityIdentifier::new(
                &security.id,
                IdentifierType::CompositeFigi,
                composite,
                None,
            ));
        }
        identifiers.push(NewSecurityIdentifier::new(
            &security.id,
            identifier_type,
            identifier_value,
            exchange,
        ));

        for identifier in identifiers {
            self.attach(identifier).await;
        }

        info!(
            "Created new security: {} (ID: {})",
            security.name, security.id
        );
        Ok(ResolvedSecurity::from_security(
            &security,
            candidate.ticker.clone(),
            true,
            true,
        ))
    }

    /// Query the oracle with each identifier in turn; first match wins.
    async fn find_candidate(&self, identifiers: &[SecurityIdentifier]) -> Option<FigiMatch> {
        for identifier in identifiers {
            let job = MappingJob::new(
                identifier.identifier_type.to_oracle(),
                identifier.identifier_value.as_str(),
            )
            .with_exch_code(identifier.exchange_code.as_deref());

            match self.mapper.map_one(job).await {
                MappingResult::Matched(matches) if !matches.is_empty() => {
                    return matches.into_iter().next();
                }
                other => debug!(
                    "No oracle match for {}={}: {}",
                    identifier.identifier_type,
                    identifier.identifier_value,
                    other.failure_reason().unwrap_or_default()
                ),
            }
        }
        None
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait::async_trait]
impl SecurityMasterServiceTrait for SecurityMasterService {
    async fn resolve(
        &self,
        request: &ResolveRequest,
        create_if_missing: bool,
    ) -> Result<Option<ResolvedSecurity>> {
        let identifier_type: IdentifierType = request.identifier_type.parse()?;
        let identifier_value = non_blank(Some(request.identifier_value.as_str())).ok_or_else(
            || Error::Validation(ValidationError::MissingField("identifier_value".to_string())),
        )?;
        let exchange = non_blank(request.exchange.as_deref());
        let currency = non_blank(request.currency.as_deref());

        info!("Resolving {}: {}", identifier_type, identifier_value);

        if let Some(security) =
            self.repository
                .find_by_identifier(identifier_type, identifier_value, exchange)?
        {
            debug!("Found existing security {}", security.id);
            let ticker = self.primary_ticker(&security.id);
            return Ok(Some(ResolvedSecurity::from_security(
                &security, ticker, false, false,
            )));
        }

        let job = MappingJob::new(identifier_type.to_oracle(), identifier_value)
            .with_exch_code(exchange)
            .with_currency(currency);

        let candidate = match self.mapper.map_one(job).await {
            MappingResult::Matched(matches) if !matches.is_empty() => {
                matches.into_iter().next()
            }
            other => {
                warn!(
                    "OpenFIGI lookup failed for {}: {} - {}",
                    identifier_type,
                    identifier_value,
                    other.failure_reason().unwrap_or_default()
                );
                None
            }
        };

        let Some(candidate) = candidate else {
            if !create_if_missing {
                return Ok(None);
            }
            return self
                .create_placeholder(identifier_type, identifier_value, exchange, currency)
                .await
                .map(Some);
        };

        if let Some(existing) = self.repository.find_by_canonical_key(&candidate.figi)? {
            info!(
                "FIGI {} already known as security {}, attaching {}",
                candidate.figi, existing.id, identifier_type
            );
            self.attach(NewSecurityIdentifier::new(
                &existing.id,
                identifier_type,
                identifier_value,
                exchange,
            ))
            .await;
            let ticker = self.primary_ticker(&existing.id);
            return Ok(Some(ResolvedSecurity::from_security(
                &existing, ticker, false, true,
            )));
        }

        if !create_if_missing {
            return Ok(None);
        }

        self.create_from_match(candidate, identifier_type, identifier_value, exchange)
            .await
            .map(Some)
    }

    async fn resolve_many(
        &self,
        requests: Vec<ResolveRequest>,
        create_if_missing: bool,
    ) -> Vec<ResolveOutcome> {
        let concurrency = self.config.batch_concurrency.max(1);

        stream::iter(requests)
            .map(move |request| async move {
                match self.resolve(&request, create_if_missing).await {
                    Ok(Some(resolved)) => ResolveOutcome::Resolved(resolved),
                    Ok(None) => ResolveOutcome::NotFound,
                    Err(e) => {
                        error!(
                            "Error resolving {}={}: {}",
                            request.identifier_type, request.identifier_value, e
                        );
                        ResolveOutcome::Failed {
                            reason: e.to_string(),
                        }
                    }
                }
            })
            .buffered(concurrency)
            .collect()
            .await
    }

    async fn enrich(&self, security_id: &str) -> Result<bool> {
        let Some(security) = self.repository.get_by_id(security_id)? else {
            warn!("Security not found: {}", security_id);
            return Ok(false);
        };

        let now = Utc::now().naive_utc();
        if security.figi.is_some()
            && security.enriched_within(now, self.config.enrichment_cooldown)
        {
            info!("Security {} recently enriched, skipping", security_id);
            return Ok(false);
        }

        let identifiers = self.repository.list_identifiers(security_id)?;
        let Some(candidate) = self.find_candidate(&identifiers).await else {
            warn!(
                "Could not enrich security {} - no OpenFIGI match",
                security_id
            );
            return Ok(false);
        };

        let mut new_figi = None;
        if security.figi.is_none() {
            match self.repository.find_by_canonical_key(&candidate.figi)? {
                // The candidate describes another security; none of its identifiers apply here.
                Some(owner) if owner.id != security.id => {
                    warn!(
                        "FIGI {} already belongs to security {}, leaving {} unchanged",
                        candidate.figi, owner.id, security_id
                    );
                    return Ok(false);
                }
                _ => new_figi = Some(candidate.figi.clone()),
            }
        }

        // Claim the key before attaching any identifiers.
        let key_filled = match new_figi {
            Some(figi) => {
                match self
                    .repository
                    .update_enrichment(security_id, Some(figi), true)
                    .await
                {
                    Ok(()) => true,
                    Err(e) if e.is_unique_violation() => {
                        warn!(
                            "FIGI {} was claimed concurrently, leaving security {} unchanged",
                            candidate.figi, security_id
                        );
                        return Ok(false);
                    }
                    Err(e) => return Err(e),
                }
            }
            None => false,
        };

        let candidate_exchange = candidate.exch_code.as_deref();
        let mut identifiers_added = false;
        if let Some(ticker) = non_blank(candidate.ticker.as_deref()) {
            identifiers_added |= self
                .attach(NewSecurityIdentifier::new(
                    security_id,
                    IdentifierType::Ticker,
                    ticker,
                    candidate_exchange,
                ))
                .await;
        }
        if let Some(composite) = non_blank(candidate.composite_figi.as_deref()) {
            identifiers_added |= self
                .attach(NewSecurityIdentifier::new(
                    security_id,
                    IdentifierType::CompositeFigi,
                    composite,
                    None,
                ))
                .await;
        }

        if key_filled {
            self.attach(
                NewSecurityIdentifier::new(
                    security_id,
                    IdentifierType::Figi,
                    &candidate.figi,
                    candidate_exchange,
                )
                .primary(),
            )
            .await;
        } else if identifiers_added {
            self.repository
                .update_enrichment(security_id, None, security.figi.is_some())
                .await?;
        } else {
            debug!("Enrichment found nothing new for security {}", security_id);
            return Ok(false);
        }

        info!("Enriched security {}", security_id);
        Ok(true)
    }

    fn get_security(&self, security_id: &str) -> Result<Security> {
        self.repository
            .get_by_id(security_id)?
            .ok_or_else(|| Error::NotFound(format!("Security {}", security_id)))
    }

    fn list_identifiers(&self, security_id: &str) -> Result<Vec<SecurityIdentifier>> {
        self.get_security(security_id)?;
        self.repository.list_identifiers(security_id)
    }

    async fn deactivate(&self, security_id: &str) -> Result<()> {
        if !self.repository.deactivate(security_id).await? {
            return Err(Error::NotFound(format!("Security {}", security_id)));
        }
        info!("Deactivated security {}", security_id);
        Ok(())
    }

    async fn search(&self, query: &str, limit: usize) -> Vec<FigiMatch> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }
        self.mapper.search(query, limit).await
    }
}
