//! Uncommitted wizard state
//!
//! The working copy is what the forms edit. A clone of it taken after the
//! last successful commit (the baseline) is what dirty tracking compares
//! against.

use super::assignments::AssignmentSet;
use super::ratings::RatingCollector;
use super::task_ledger::TaskLedger;
use chrono::{DateTime, NaiveDate, Utc};
use movement_types::*;

#[derive(Debug, Clone, PartialEq)]
pub struct WorkingCopy {
    pub movement: Movement,
    pub assignments: AssignmentSet,
    pub ledger: TaskLedger,
    pub ratings: RatingCollector,
}

impl WorkingCopy {
    /// Fresh draft for a new movement dated `date`
    pub fn blank(date: NaiveDate) -> Self {
        Self::from_movement(Movement::draft(date))
    }

    pub fn from_movement(movement: Movement) -> Self {
        Self {
            movement,
            assignments: AssignmentSet::new(),
            ledger: TaskLedger::new(),
            ratings: RatingCollector::new(),
        }
    }

    /// Steps whose slice differs from `baseline`
    pub fn dirty_steps(&self, baseline: &WorkingCopy) -> Vec<WizardStep> {
        WizardStep::ALL
            .iter()
            .copied()
            .filter(|step| !self.slice_matches(baseline, *step))
            .collect()
    }

    fn slice_matches(&self, other: &WorkingCopy, step: WizardStep) -> bool {
        let (a, b) = (&self.movement, &other.movement);
        match step {
            WizardStep::Request => a.request == b.request,
            WizardStep::Classification => a.classification == b.classification,
            WizardStep::Planning => a.planning == b.planning && self.assignments == other.assignments,
            WizardStep::Execution => {
                a.execution.receipt_image == b.execution.receipt_image
                    && a.execution.operator_observations == b.execution.operator_observations
                    && self.ledger.rows() == other.ledger.rows()
                    && self.ledger.odometers().eq(other.ledger.odometers())
            }
            WizardStep::Closeout => {
                a.closeout.supervisor_observations == b.closeout.supervisor_observations
                    && self.ratings.ratings() == other.ratings.ratings()
            }
        }
    }
}

/// Field-level edit of the movement's scalar fields.
///
/// `None` leaves a field alone. For optional fields, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovementPatch {
    pub date: Option<NaiveDate>,
    pub client_id: Option<Option<ClientId>>,
    pub quote_id: Option<Option<QuoteId>>,
    pub requester: Option<String>,
    pub subject: Option<String>,
    pub location: Option<String>,
    pub scope: Option<String>,

    pub business_unit_id: Option<Option<BusinessUnitId>>,
    pub movement_type_id: Option<Option<MovementTypeId>>,
    pub movement_subtype_id: Option<Option<MovementSubtypeId>>,
    /// Merged key by key into the current answers
    pub dynamic_fields: Option<DynamicFields>,

    pub scheduled_start: Option<Option<DateTime<Utc>>>,
    pub scheduled_end: Option<Option<DateTime<Utc>>>,
    pub supervisor_id: Option<Option<EmployeeId>>,

    pub receipt_image: Option<Option<String>>,
    pub operator_observations: Option<String>,

    pub supervisor_observations: Option<String>,
}

impl MovementPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the present fields to `movement`.
    ///
    /// Changing the business unit clears type and subtype, and changing the
    /// type clears the subtype, unless the same patch sets them.
    pub fn apply_to(self, movement: &mut Movement) {
        let request = &mut movement.request;
        if let Some(date) = self.date {
            request.date = date;
        }
        if let Some(client_id) = self.client_id {
            request.client_id = client_id;
        }
        if let Some(quote_id) = self.quote_id {
            request.quote_id = quote_id;
        }
        if let Some(requester) = self.requester {
            request.requester = requester;
        }
        if let Some(subject) = self.subject {
            request.subject = subject;
        }
        if let Some(location) = self.location {
            request.location = location;
        }
        if let Some(scope) = self.scope {
            request.scope = scope;
        }

        let classification = &mut movement.classification;
        if let Some(unit) = self.business_unit_id {
            if classification.business_unit_id != unit {
                classification.movement_type_id = None;
                classification.movement_subtype_id = None;
            }
            classification.business_unit_id = unit;
        }
        if let Some(movement_type) = self.movement_type_id {
            if classification.movement_type_id != movement_type {
                classification.movement_subtype_id = None;
            }
            classification.movement_type_id = movement_type;
        }
        if let Some(subtype) = self.movement_subtype_id {
            classification.movement_subtype_id = subtype;
        }
        if let Some(fields) = self.dynamic_fields {
            classification.dynamic_fields.extend(fields);
        }

        let planning = &mut movement.planning;
        if let Some(start) = self.scheduled_start {
            planning.scheduled_start = start;
        }
        if let Some(end) = self.scheduled_end {
            planning.scheduled_end = end;
        }
        if let Some(supervisor) = self.supervisor_id {
            planning.supervisor_id = supervisor;
        }

        if let Some(receipt) = self.receipt_image {
            movement.execution.receipt_image = receipt;
        }
        if let Some(observations) = self.operator_observations {
            movement.execution.operator_observations = observations;
        }
        if let Some(observations) = self.supervisor_observations {
            movement.closeout.supervisor_observations = observations;
        }
    }
}
