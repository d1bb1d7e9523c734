//! Movement aggregate and its sub-records

use crate::fields::DynamicFields;
use crate::ids::*;
use crate::state::MovementState;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Step 1: what is requested, for whom, where
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestDetails {
    pub date: NaiveDate,
    pub client_id: Option<ClientId>,
    pub quote_id: Option<QuoteId>,
    pub requester: String,
    pub subject: String,
    pub location: String,
    pub scope: String,
}

impl RequestDetails {
    pub fn blank(date: NaiveDate) -> Self {
        Self {
            date,
            client_id: None,
            quote_id: None,
            requester: String::new(),
            subject: String::new(),
            location: String::new(),
            scope: String::new(),
        }
    }
}

/// Step 2: business unit, type, subtype and the subtype's dynamic answers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub business_unit_id: Option<BusinessUnitId>,
    pub movement_type_id: Option<MovementTypeId>,
    pub movement_subtype_id: Option<MovementSubtypeId>,
    #[serde(default)]
    pub dynamic_fields: DynamicFields,
}

/// Step 3 scalar fields. The assignment sets are separate sub-records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Planning {
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub supervisor_id: Option<EmployeeId>,
}

/// Step 4 scalar fields. Tasks and odometers are separate sub-records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLog {
    pub receipt_image: Option<String>,
    #[serde(default)]
    pub operator_observations: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Step 5 scalar fields. Ratings are separate sub-records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Closeout {
    #[serde(default)]
    pub supervisor_observations: String,
    pub validated_at: Option<DateTime<Utc>>,
    pub validated_by: Option<UserId>,
}

/// Aggregate root for one field-service operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Option<MovementId>,
    #[serde(rename = "estado")]
    pub state: Option<MovementState>,
    pub request: RequestDetails,
    #[serde(default)]
    pub classification: Classification,
    #[serde(default)]
    pub planning: Planning,
    #[serde(default)]
    pub execution: ExecutionLog,
    #[serde(default)]
    pub closeout: Closeout,
}

impl Movement {
    /// Unpersisted movement dated `date`
    pub fn draft(date: NaiveDate) -> Self {
        Self {
            id: None,
            state: None,
            request: RequestDetails::blank(date),
            classification: Classification::default(),
            planning: Planning::default(),
            execution: ExecutionLog::default(),
            closeout: Closeout::default(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Completed and cancelled movements are read-only
    pub fn is_read_only(&self) -> bool {
        self.state.map(|s| s.is_terminal()).unwrap_or(false)
    }
}

/// Partial movement write; absent slices are left untouched by the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementUpdate {
    #[serde(rename = "estado", skip_serializing_if = "Option::is_none")]
    pub state: Option<MovementState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planning: Option<Planning>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionLog>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closeout: Option<Closeout>,
}

impl MovementUpdate {
    pub fn state(state: MovementState) -> Self {
        Self {
            state: Some(state),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the present slices into `movement`
    pub fn apply_to(&self, movement: &mut Movement) {
        if let Some(state) = self.state {
            movement.state = Some(state);
        }
        if let Some(request) = &self.request {
            movement.request = request.clone();
        }
        if let Some(classification) = &self.classification {
            movement.classification = classification.clone();
        }
        if let Some(planning) = &self.planning {
            movement.planning = planning.clone();
        }
        if let Some(execution) = &self.execution {
            movement.execution = execution.clone();
        }
        if let Some(closeout) = &self.closeout {
            movement.closeout = closeout.clone();
        }
    }
}

/// Role an employee plays on a movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeRole {
    Operator,
    Lead,
    Driver,
    Helper,
    Support,
}

impl EmployeeRole {
    pub const ALL: [EmployeeRole; 5] = [
        Self::Operator,
        Self::Lead,
        Self::Driver,
        Self::Helper,
        Self::Support,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Lead => "lead",
            Self::Driver => "driver",
            Self::Helper => "helper",
            Self::Support => "support",
        }
    }
}

impl fmt::Display for EmployeeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Employee to link to a movement (input of a full-replace write)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployeeAssignment {
    pub employee_id: EmployeeId,
    pub role: EmployeeRole,
}

/// Persisted employee assignment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeAssignment {
    pub id: AssignmentId,
    pub employee_id: EmployeeId,
    pub role: EmployeeRole,
}

/// Odometer pair recorded for an equipment assignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OdometerReading {
    pub start: i64,
    pub end: i64,
}

impl OdometerReading {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn distance(&self) -> i64 {
        self.end - self.start
    }
}

/// Persisted equipment assignment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentAssignment {
    pub id: AssignmentId,
    pub equipment_id: EquipmentId,
    #[serde(default)]
    pub odometer: OdometerReading,
}

/// One row of the execution task ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskEntry {
    pub description: String,
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    /// Equipment assignment the task was performed with, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_assignment_id: Option<AssignmentId>,
}

impl TaskEntry {
    pub fn new(description: impl Into<String>, start: Option<NaiveTime>, end: Option<NaiveTime>) -> Self {
        Self {
            description: description.into(),
            start,
            end,
            equipment_assignment_id: None,
        }
    }

    /// Nothing entered yet
    pub fn is_blank(&self) -> bool {
        self.description.trim().is_empty()
            && self.start.is_none()
            && self.end.is_none()
            && self.equipment_assignment_id.is_none()
    }
}

/// Closeout rating for one operator assignment. `rating == 0` means unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorRating {
    pub operator_assignment_id: AssignmentId,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl OperatorRating {
    pub const UNSET: u8 = 0;
    pub const MAX: u8 = 5;

    pub fn unset(operator_assignment_id: AssignmentId) -> Self {
        Self {
            operator_assignment_id,
            rating: Self::UNSET,
            comment: String::new(),
        }
    }

    pub fn is_set(&self) -> bool {
        self.rating != Self::UNSET
    }
}
