//! Securities module - canonical security records, identifier resolution and enrichment.

mod securities_constants;
mod securities_model;
mod securities_traits;
mod security_master_service;


// Re-export the public interface
pub use securities_constants::*;
pub use securities_model::{
    placeholder_name, AssetClass, IdentifierType, NewSecurity, NewSecurityIdentifier,
    ResolveOutcome, ResolveRequest, ResolvedSecurity, Security, SecurityIdentifier,
    SecurityInsert, FIGI_LENGTH,
};
pub use security_master_service::{SecurityMasterConfig, SecurityMasterService};
pub use securities_traits::{SecurityMasterServiceTrait, SecurityRepositoryTrait};
