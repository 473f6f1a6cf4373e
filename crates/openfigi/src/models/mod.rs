//! Data models for the OpenFIGI client.

mod job;
mod result;

pub use job::{IdType, MappingJob};
pub use result::{FigiMatch, MappingResult};
