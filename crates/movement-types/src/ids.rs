//! Strongly typed identifiers
//! Every record kind gets its own id type so a movement id can never be passed
//! where an assignment id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Movement id, assigned by the data service on first insert
    MovementId
);

impl MovementId {
    /// Fresh random id, used by stores that assign ids locally
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

string_id!(
    /// Id of an employee or equipment assignment row (not the linked entity)
    AssignmentId
);

impl AssignmentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

string_id!(EmployeeId);
string_id!(EquipmentId);
string_id!(ClientId);
string_id!(QuoteId);
string_id!(BusinessUnitId);
string_id!(MovementTypeId);
string_id!(MovementSubtypeId);
string_id!(
    /// Tenant the session operates on
    CompanyId
);
string_id!(
    /// Console user (supervisor, validator)
    UserId
);
