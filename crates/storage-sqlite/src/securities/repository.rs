use async_trait::async_trait;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use log::{debug, warn};
use std::sync::Arc;

use secmaster_core::errors::{DatabaseError, Error, Result, ValidationError};
use secmaster_core::securities::{
    IdentifierType, NewSecurity, NewSecurityIdentifier, Security, SecurityIdentifier,
    SecurityInsert, SecurityRepositoryTrait,
};

use super::model::{SecurityDB, SecurityEnrichmentDB, SecurityIdentifierDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::StorageError;
use crate::schema::{securities, security_identifiers};

/// Repository for securities and their external identifiers
pub struct SecurityRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl SecurityRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }

    fn to_identifiers(rows: Vec<SecurityIdentifierDB>) -> Vec<SecurityIdentifier> {
        rows.into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                SecurityIdentifier::try_from(row)
                    .map_err(|e| warn!("Skipping identifier {}: {}", id, e))
                    .ok()
            })
            .collect()
    }
}

/// Active security currently holding `figi`, read on the writer's connection.
fn active_by_figi(conn: &mut SqliteConnection, figi: &str) -> Result<Option<SecurityDB>> {
    let row = securities::table
        .filter(securities::figi.eq(figi))
        .filter(securities::is_active.eq(true))
        .select(SecurityDB::as_select())
        .first::<SecurityDB>(conn)
        .optional()
        .map_err(StorageError::from)?;
    Ok(row)
}

#[async_trait]
impl SecurityRepositoryTrait for SecurityRepository {
    fn find_by_identifier(
        &self,
        identifier_type: IdentifierType,
        identifier_value: &str,
        exchange: Option<&str>,
    ) -> Result<Option<Security>> {
        let mut conn = get_connection(&self.pool)?;

        let mut query = securities::table
            .inner_join(security_identifiers::table)
            .filter(security_identifiers::identifier_type.eq(identifier_type.as_db_str()))
            .filter(security_identifiers::identifier_value.eq(identifier_value.trim()))
            .filter(security_identifiers::is_active.eq(true))
            .filter(securities::is_active.eq(true))
            .select(SecurityDB::as_select())
            .into_boxed();

        match exchange.map(str::trim).filter(|e| !e.is_empty()) {
            // NULLs sort last when descending, so the exact exchange wins.
            Some(exchange) => {
                query = query
                    .filter(
                        security_identifiers::exchange_code
                            .eq(exchange)
                            .or(security_identifiers::exchange_code.is_null()),
                    )
                    .order((
                        security_identifiers::exchange_code.desc(),
                        security_identifiers::created_at.asc(),
                    ));
            }
            None => {
                query = query.order((
                    security_identifiers::is_primary.desc(),
                    security_identifiers::created_at.asc(),
                ));
            }
        }

        let result = query
            .first::<SecurityDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        Ok(result.map(Security::from))
    }

    fn find_by_canonical_key(&self, figi: &str) -> Result<Option<Security>> {
        let mut conn = get_connection(&self.pool)?;
        Ok(active_by_figi(&mut conn, figi.trim())?.map(Security::from))
    }

    fn get_by_id(&self, security_id: &str) -> Result<Option<Security>> {
        let mut conn = get_connection(&self.pool)?;

        let result = securities::table
            .find(security_id)
            .select(SecurityDB::as_select())
            .first::<SecurityDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;

        Ok(result.map(Security::from))
    }

    fn get_primary_identifier(
        &self,
        security_id: &str,
        identifier_type: IdentifierType,
    ) -> Result<Option<SecurityIdentifier>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = security_identifiers::table
            .filter(security_identifiers::security_id.eq(security_id))
            .filter(security_identifiers::identifier_type.eq(identifier_type.as_db_str()))
            .order((
                security_identifiers::is_primary.desc(),
                security_identifiers::created_at.asc(),
            ))
            .limit(1)
            .select(SecurityIdentifierDB::as_select())
            .load::<SecurityIdentifierDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(Self::to_identifiers(rows).into_iter().next())
    }

    fn list_identifiers(&self, security_id: &str) -> Result<Vec<SecurityIdentifier>> {
        let mut conn = get_connection(&self.pool)?;

        let rows = security_identifiers::table
            .filter(security_identifiers::security_id.eq(security_id))
            .order((
                security_identifiers::identifier_type.asc(),
                security_identifiers::is_primary.desc(),
                security_identifiers::created_at.asc(),
            ))
            .select(SecurityIdentifierDB::as_select())
            .load::<SecurityIdentifierDB>(&mut conn)
            .map_err(StorageError::from)?;

        Ok(Self::to_identifiers(rows))
    }

    async fn insert_security(&self, new_security: NewSecurity) -> Result<SecurityInsert> {
        new_security.validate()?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<SecurityInsert> {
                let row: SecurityDB = new_security.into();

                let inserted = diesel::insert_into(securities::table)
                    .values(&row)
                    .on_conflict_do_nothing()
                    .execute(conn)
                    .map_err(StorageError::from)?;

                if inserted > 0 {
                    debug!("Created security {} ({})", row.id, row.name);
                    return Ok(SecurityInsert::Created(row.into()));
                }

                let existing = match row.figi.as_deref() {
                    Some(figi) => active_by_figi(conn, figi)?,
                    None => None,
                };
                match existing {
                    Some(existing) => Ok(SecurityInsert::Existing(existing.into())),
                    None => Err(Error::Database(DatabaseError::UniqueViolation(format!(
                        "security id {} already exists",
                        row.id
                    )))),
                }
            })
            .await
    }

    async fn insert_identifier_if_absent(
        &self,
        identifier: NewSecurityIdentifier,
    ) -> Result<bool> {
        if identifier.identifier_value.is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "identifier_value".to_string(),
            )));
        }

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let row: SecurityIdentifierDB = identifier.into();

                let inserted = diesel::insert_into(security_identifiers::table)
                    .values(&row)
                    .on_conflict_do_nothing()
                    .execute(conn)
                    .map_err(StorageError::from)?;

                Ok(inserted > 0)
            })
            .await
    }

    async fn update_enrichment(
        &self,
        security_id: &str,
        figi: Option<String>,
        verified: bool,
    ) -> Result<()> {
        let id_owned = security_id.to_string();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let now = chrono::Utc::now().naive_utc();
                let changes = SecurityEnrichmentDB {
                    figi,
                    is_verified: verified,
                    last_enriched_at: now,
                    updated_at: now,
                };

                let updated = diesel::update(securities::table.find(&id_owned))
                    .set(&changes)
                    .execute(conn)
                    .map_err(StorageError::from)?;

                if updated == 0 {
                    return Err(Error::Database(DatabaseError::NotFound(format!(
                        "Security {} not found",
                        id_owned
                    ))));
                }
                Ok(())
            })
            .await
    }

    async fn deactivate(&self, security_id: &str) -> Result<bool> {
        let id_owned = security_id.to_string();

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let updated = diesel::update(securities::table.find(&id_owned))
                    .set((
                        securities::is_active.eq(false),
                        securities::updated_at.eq(chrono::Utc::now().naive_utc()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;

                // Release the identifiers so a successor can claim them.
                diesel::update(
                    security_identifiers::table
                        .filter(security_identifiers::security_id.eq(&id_owned)),
                )
                .set(security_identifiers::is_active.eq(false))
                .execute(conn)
                .map_err(StorageError::from)?;

                Ok(updated > 0)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, write_actor::spawn_writer};
    use secmaster_core::securities::{AssetClass, DATA_SOURCE_OPENFIGI};
    use tempfile::tempdir;

    async fn create_test_repository() -> (SecurityRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db");
        let db_path_str = db_path.to_string_lossy().to_string();

        let pool = create_pool(&db_path_str).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());

        (SecurityRepository::new(Arc::clone(&pool), writer), temp_dir)
    }

    fn verified(figi: &str, name: &str) -> NewSecurity {
        NewSecurity {
            figi: Some(figi.to_string()),
            name: name.to_string(),
            asset_class: AssetClass::Equity,
            security_type: Some("Common Stock".to_string()),
            currency: "USD".to_string(),
            exchange_code: Some("US".to_string()),
            data_source: DATA_SOURCE_OPENFIGI.to_string(),
            is_verified: true,
            last_enriched_at: Some(chrono::Utc::now().naive_utc()),
            ..Default::default()
        }
    }

    async fn created(repo: &SecurityRepository, new_security: NewSecurity) -> Security {
        let insert = repo.insert_security(new_security).await.unwrap();
        assert!(insert.is_created());
        insert.into_security()
    }

    // =========================================================================
    // Securities
    // =========================================================================

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let (repo, _dir) = create_test_repository().await;
        let security = created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;

        let loaded = repo.get_by_id(&security.id).unwrap().unwrap();
        assert_eq!(loaded.name, "APPLE INC");
        assert_eq!(loaded.figi.as_deref(), Some("BBG000B9XRY4"));
        assert_eq!(loaded.asset_class, AssetClass::Equity);
        assert!(loaded.is_active);
        assert!(loaded.is_verified);

        let by_key = repo.find_by_canonical_key("BBG000B9XRY4").unwrap().unwrap();
        assert_eq!(by_key.id, security.id);
        assert!(repo.get_by_id("missing").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_figi_returns_existing() {
        let (repo, _dir) = create_test_repository().await;
        let first = created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;

        let second = repo
            .insert_security(verified("BBG000B9XRY4", "Apple Inc."))
            .await
            .unwrap();
        assert!(!second.is_created());
        assert_eq!(second.into_security().id, first.id);
    }

    #[tokio::test]
    async fn test_invalid_security_is_rejected_before_writing() {
        let (repo, _dir) = create_test_repository().await;
        let mut new_security = verified("BBG000B9XRY4", "APPLE INC");
        new_security.figi = Some("SHORT".to_string());

        assert!(matches!(
            repo.insert_security(new_security).await,
            Err(Error::Validation(_))
        ));
        assert!(repo.find_by_canonical_key("SHORT").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deactivated_security_releases_its_figi() {
        let (repo, _dir) = create_test_repository().await;
        let old = created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;

        assert!(repo.deactivate(&old.id).await.unwrap());
        assert!(repo.find_by_canonical_key("BBG000B9XRY4").unwrap().is_none());
        assert!(!repo.get_by_id(&old.id).unwrap().unwrap().is_active);

        let new = created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;
        assert_ne!(new.id, old.id);
        assert!(!repo.deactivate("missing").await.unwrap());
    }

    // =========================================================================
    // Identifiers
    // =========================================================================

    #[tokio::test]
    async fn test_identifier_triple_is_unique() {
        let (repo, _dir) = create_test_repository().await;
        let security = created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;

        let ticker =
            NewSecurityIdentifier::new(&security.id, IdentifierType::Ticker, "AAPL", Some("US"));
        assert!(repo.insert_identifier_if_absent(ticker.clone()).await.unwrap());
        assert!(!repo.insert_identifier_if_absent(ticker).await.unwrap());

        // A NULL exchange is one value for uniqueness.
        let bare = NewSecurityIdentifier::new(&security.id, IdentifierType::Cusip, "037833100", None);
        assert!(repo.insert_identifier_if_absent(bare.clone()).await.unwrap());
        assert!(!repo.insert_identifier_if_absent(bare).await.unwrap());

        assert_eq!(repo.list_identifiers(&security.id).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_one_primary_per_type() {
        let (repo, _dir) = create_test_repository().await;
        let security = created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;

        let first = NewSecurityIdentifier::new(&security.id, IdentifierType::Ticker, "AAPL", Some("US"))
            .primary();
        let second =
            NewSecurityIdentifier::new(&security.id, IdentifierType::Ticker, "AAPL", Some("UW"))
                .primary();
        assert!(repo.insert_identifier_if_absent(first).await.unwrap());
        assert!(!repo.insert_identifier_if_absent(second).await.unwrap());
    }

    #[tokio::test]
    async fn test_primary_identifier_falls_back_to_any() {
        let (repo, _dir) = create_test_repository().await;
        let security = created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;

        repo.insert_identifier_if_absent(NewSecurityIdentifier::new(
            &security.id,
            IdentifierType::Ticker,
            "AAPL",
            Some("UW"),
        ))
        .await
        .unwrap();

        let fallback = repo
            .get_primary_identifier(&security.id, IdentifierType::Ticker)
            .unwrap()
            .unwrap();
        assert_eq!(fallback.exchange_code.as_deref(), Some("UW"));
        assert!(!fallback.is_primary);

        repo.insert_identifier_if_absent(
            NewSecurityIdentifier::new(&security.id, IdentifierType::Ticker, "AAPL", Some("US"))
                .primary(),
        )
        .await
        .unwrap();

        let primary = repo
            .get_primary_identifier(&security.id, IdentifierType::Ticker)
            .unwrap()
            .unwrap();
        assert_eq!(primary.exchange_code.as_deref(), Some("US"));
        assert!(primary.is_primary);
        assert!(repo
            .get_primary_identifier(&security.id, IdentifierType::Isin)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_identifier_for_unknown_security_fails() {
        let (repo, _dir) = create_test_repository().await;
        let result = repo
            .insert_identifier_if_absent(NewSecurityIdentifier::new(
                "missing",
                IdentifierType::Ticker,
                "AAPL",
                None,
            ))
            .await;

        assert!(matches!(
            result,
            Err(Error::Database(DatabaseError::ForeignKeyViolation(_)))
        ));
    }

    // =========================================================================
    // Lookup by identifier
    // =========================================================================

    #[tokio::test]
    async fn test_exchange_matching() {
        let (repo, _dir) = create_test_repository().await;
        let us = created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;
        let any = created(&repo, verified("BBG000B9Y5X2", "APPLE INC GLOBAL")).await;

        repo.insert_identifier_if_absent(NewSecurityIdentifier::new(
            &us.id,
            IdentifierType::Ticker,
            "AAPL",
            Some("US"),
        ))
        .await
        .unwrap();
        repo.insert_identifier_if_absent(NewSecurityIdentifier::new(
            &any.id,
            IdentifierType::Ticker,
            "AAPL",
            None,
        ))
        .await
        .unwrap();

        let exact = repo
            .find_by_identifier(IdentifierType::Ticker, "AAPL", Some("US"))
            .unwrap()
            .unwrap();
        assert_eq!(exact.id, us.id);

        // A stored NULL exchange matches any requested exchange.
        let wildcard = repo
            .find_by_identifier(IdentifierType::Ticker, "AAPL", Some("LN"))
            .unwrap()
            .unwrap();
        assert_eq!(wildcard.id, any.id);

        assert!(repo
            .find_by_identifier(IdentifierType::Ticker, "AAPL", None)
            .unwrap()
            .is_some());
        assert!(repo
            .find_by_identifier(IdentifierType::Isin, "AAPL", None)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_inactive_securities_are_not_found() {
        let (repo, _dir) = create_test_repository().await;
        let security = created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;
        repo.insert_identifier_if_absent(NewSecurityIdentifier::new(
            &security.id,
            IdentifierType::Isin,
            "US0378331005",
            None,
        ))
        .await
        .unwrap();

        repo.deactivate(&security.id).await.unwrap();

        assert!(repo
            .find_by_identifier(IdentifierType::Isin, "US0378331005", None)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_deactivated_security_releases_its_identifiers() {
        let (repo, _dir) = create_test_repository().await;
        let old = created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;
        let ticker = |security_id: &str| {
            NewSecurityIdentifier::new(security_id, IdentifierType::Ticker, "AAPL", Some("US"))
                .primary()
        };
        assert!(repo.insert_identifier_if_absent(ticker(&old.id)).await.unwrap());

        repo.deactivate(&old.id).await.unwrap();

        let successor = created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;
        assert!(repo
            .insert_identifier_if_absent(ticker(&successor.id))
            .await
            .unwrap());

        let found = repo
            .find_by_identifier(IdentifierType::Ticker, "AAPL", Some("US"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, successor.id);
        // The retired security keeps its history.
        assert_eq!(repo.list_identifiers(&old.id).unwrap().len(), 1);
        assert!(!repo.insert_identifier_if_absent(ticker(&successor.id)).await.unwrap());
    }

    // =========================================================================
    // Enrichment
    // =========================================================================

    #[tokio::test]
    async fn test_update_enrichment_sets_figi_and_flags() {
        let (repo, _dir) = create_test_repository().await;
        let placeholder = created(
            &repo,
            NewSecurity::placeholder(IdentifierType::Ticker, "ZZZZ99", None, None),
        )
        .await;
        assert!(placeholder.last_enriched_at.is_none());

        repo.update_enrichment(&placeholder.id, Some("BBG000B9XRY4".to_string()), true)
            .await
            .unwrap();

        let loaded = repo.get_by_id(&placeholder.id).unwrap().unwrap();
        assert_eq!(loaded.figi.as_deref(), Some("BBG000B9XRY4"));
        assert!(loaded.is_verified);
        assert!(loaded.last_enriched_at.is_some());

        // None leaves the FIGI in place.
        repo.update_enrichment(&placeholder.id, None, true).await.unwrap();
        let loaded = repo.get_by_id(&placeholder.id).unwrap().unwrap();
        assert_eq!(loaded.figi.as_deref(), Some("BBG000B9XRY4"));
    }

    #[tokio::test]
    async fn test_update_enrichment_cannot_take_an_owned_figi() {
        let (repo, _dir) = create_test_repository().await;
        created(&repo, verified("BBG000B9XRY4", "APPLE INC")).await;
        let placeholder = created(
            &repo,
            NewSecurity::placeholder(IdentifierType::Ticker, "AAPL", None, None),
        )
        .await;

        let err = repo
            .update_enrichment(&placeholder.id, Some("BBG000B9XRY4".to_string()), true)
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
        assert!(repo
            .get_by_id(&placeholder.id)
            .unwrap()
            .unwrap()
            .figi
            .is_none());
    }

    #[tokio::test]
    async fn test_update_enrichment_missing_security() {
        let (repo, _dir) = create_test_repository().await;
        assert!(matches!(
            repo.update_enrichment("missing", None, false).await,
            Err(Error::Database(DatabaseError::NotFound(_)))
        ));
    }
}
