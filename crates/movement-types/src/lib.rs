//! Shared types for the movement lifecycle workflow
//!
//! Plain data only: identifiers, lifecycle states, wizard steps, the movement
//! aggregate with its sub-records, and the catalog entries the forms offer.

pub mod catalog;
pub mod fields;
pub mod ids;
pub mod movement;
pub mod state;

pub use catalog::*;
pub use fields::*;
pub use ids::*;
pub use movement::*;
pub use state::*;
