//! Database models for securities and their identifiers.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use log::warn;

use secmaster_core::securities::{
    AssetClass, IdentifierType, NewSecurity, NewSecurityIdentifier, Security, SecurityIdentifier,
};

/// Database model for securities
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::securities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SecurityDB {
    pub id: String,
    pub figi: Option<String>,
    pub name: String,
    pub asset_class: String,
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

/// Database model for security identifiers
#[derive(Queryable, Identifiable, Insertable, Selectable, Associations, PartialEq, Debug, Clone)]
#[diesel(belongs_to(SecurityDB, foreign_key = security_id))]
#[diesel(table_name = crate::schema::security_identifiers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SecurityIdentifierDB {
    pub id: String,
    pub security_id: String,
    pub identifier_type: String,
    pub identifier_value: String,
    pub exchange_code: Option<String>,
    pub is_primary: bool,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

/// Changeset written by an enrichment. `None` leaves the column untouched.
#[derive(AsChangeset, Debug, Clone)]
#[diesel(table_name = crate::schema::securities)]
pub struct SecurityEnrichmentDB {
    pub figi: Option<String>,
    pub is_verified: bool,
    pub last_enriched_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<SecurityDB> for Security {
    fn from(db: SecurityDB) -> Self {
        let asset_class = AssetClass::from_db_str(&db.asset_class).unwrap_or_else(|| {
            warn!(
                "Security {} has unknown asset class '{}'",
                db.id, db.asset_class
            );
            AssetClass::Other
        });

        Self {
            id: db.id,
            figi: db.figi,
            name: db.name,
            asset_class,
            security_type: db.security_type,
            currency: db.currency,
            exchange_code: db.exchange_code,
            data_source: db.data_source,
            is_active: db.is_active,
            is_verified: db.is_verified,
            last_enriched_at: db.last_enriched_at,
            created_at: db.created_at,
            updated_at: db.updated_at,
        }
    }
}

impl From<NewSecurity> for SecurityDB {
    fn from(domain: NewSecurity) -> Self {
        let now = chrono::Utc::now().naive_utc();

        Self {
            id: domain.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            figi: domain.figi,
            name: domain.name,
            asset_class: domain.asset_class.as_db_str().to_string(),
            security_type: domain.security_type,
            currency: domain.currency,
            exchange_code: domain.exchange_code,
            data_source: domain.data_source,
            is_active: true,
            is_verified: domain.is_verified,
            last_enriched_at: domain.last_enriched_at,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TryFrom<SecurityIdentifierDB> for SecurityIdentifier {
    type Error = String;

    fn try_from(db: SecurityIdentifierDB) -> Result<Self, Self::Error> {
        let identifier_type = IdentifierType::from_db_str(&db.identifier_type)
            .ok_or_else(|| format!("unknown identifier type '{}'", db.identifier_type))?;

        Ok(Self {
            id: db.id,
            security_id: db.security_id,
            identifier_type,
            identifier_value: db.identifier_value,
            exchange_code: db.exchange_code,
            is_primary: db.is_primary,
            created_at: db.created_at,
        })
    }
}

impl From<NewSecurityIdentifier> for SecurityIdentifierDB {
    fn from(domain: NewSecurityIdentifier) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            security_id: domain.security_id,
            identifier_type: domain.identifier_type.as_db_str().to_string(),
            identifier_value: domain.identifier_value,
            exchange_code: domain.exchange_code,
            is_primary: domain.is_primary,
            is_active: true,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}
