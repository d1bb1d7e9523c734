//! Movement wizard: controller, per-step components and data-service seams

pub mod assignments;
pub mod controller;
pub mod dynamic_fields;
pub mod ratings;
pub mod task_ledger;
pub mod traits;
pub mod validators;
pub mod working_copy;

pub use assignments::AssignmentSet;
pub use controller::{Completion, MovementWizard};
pub use ratings::RatingCollector;
pub use task_ledger::TaskLedger;
pub use traits::{MovementRepository, ResourceCatalog};
pub use working_copy::{MovementPatch, WorkingCopy};
