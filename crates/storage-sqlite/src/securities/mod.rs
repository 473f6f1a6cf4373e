//! SQLite storage implementation for securities.

mod model;
mod repository;

pub use model::{SecurityDB, SecurityIdentifierDB};
pub use repository::SecurityRepository;
