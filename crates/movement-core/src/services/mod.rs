//! Service layers wrapped around the adapters

pub mod catalog_cache;

pub use catalog_cache::CachedCatalog;
