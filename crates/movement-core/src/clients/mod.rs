//! Data service adapters

pub mod memory;
pub mod rest;

pub use memory::{InMemoryMovementRepository, RepositoryCall};
pub use rest::{RestCatalog, RestClient, RestMovementRepository};
