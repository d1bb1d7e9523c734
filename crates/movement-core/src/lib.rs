//! Movement Core Library
//!
//! Workflow logic for operational movements: the five-step wizard controller,
//! its per-step components, the data-service seams and their adapters.

pub mod config;
pub mod clients;
pub mod constants;
pub mod services;
pub mod workflow;
pub mod types;
pub mod error;

// Re-export main types for easy access
pub use config::MovementConfig;
pub use error::{MovementError, Result};
pub use types::{CloseRequest, SessionContext};

// Re-export adapters
pub use clients::{
    InMemoryMovementRepository,
    RepositoryCall,
    RestCatalog,
    RestClient,
    RestMovementRepository,
};

pub use services::CachedCatalog;

// Re-export workflow types
pub use workflow::{
    AssignmentSet,
    Completion,
    MovementPatch,
    MovementRepository,
    MovementWizard,
    RatingCollector,
    ResourceCatalog,
    TaskLedger,
    WorkingCopy,
};
