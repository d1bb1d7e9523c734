//! Closeout rating collector
//!
//! One rating slot per operator assignment. Slots start unset (0) and only
//! ratings that were actually given are submitted.

use crate::error::{MovementError, Result};
use movement_types::*;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingCollector {
    operators: Vec<EmployeeAssignment>,
    ratings: Vec<OperatorRating>,
}

impl RatingCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Align the slots with the current operator assignments.
    ///
    /// Each operator keeps the in-memory rating if one exists, otherwise the
    /// stored one, otherwise an unset slot. Ratings whose assignment is gone
    /// are dropped.
    pub fn sync(&mut self, operators: Vec<EmployeeAssignment>, persisted: Vec<OperatorRating>) {
        let ratings = operators
            .iter()
            .map(|operator| {
                self.find(&operator.id)
                    .cloned()
                    .or_else(|| {
                        persisted
                            .iter()
                            .find(|r| r.operator_assignment_id == operator.id)
                            .cloned()
                    })
                    .unwrap_or_else(|| OperatorRating::unset(operator.id.clone()))
            })
            .collect();

        let dropped = persisted
            .iter()
            .filter(|r| !operators.iter().any(|o| o.id == r.operator_assignment_id))
            .count();
        if dropped > 0 {
            log::warn!("Dropped {} ratings for operators no longer assigned", dropped);
        }

        self.ratings = ratings;
        self.operators = operators;
    }

    pub fn operators(&self) -> &[EmployeeAssignment] {
        &self.operators
    }

    pub fn ratings(&self) -> &[OperatorRating] {
        &self.ratings
    }

    pub fn rating_for(&self, assignment_id: &AssignmentId) -> Option<&OperatorRating> {
        self.find(assignment_id)
    }

    /// Set a 1-5 rating, or 0 to clear it
    pub fn rate(&mut self, assignment_id: &AssignmentId, rating: u8) -> Result<()> {
        if rating > OperatorRating::MAX {
            return Err(MovementError::Validation {
                step: WizardStep::Closeout,
                violations: vec![format!(
                    "rating must be between 1 and {}, got {}",
                    OperatorRating::MAX,
                    rating
                )],
            });
        }
        self.slot_mut(assignment_id)?.rating = rating;
        Ok(())
    }

    pub fn comment(&mut self, assignment_id: &AssignmentId, comment: impl Into<String>) -> Result<()> {
        self.slot_mut(assignment_id)?.comment = comment.into();
        Ok(())
    }

    /// Ratings to submit: set ones whose assignment is still live
    pub fn submission(&self, live: &[EmployeeAssignment]) -> Vec<OperatorRating> {
        self.ratings
            .iter()
            .filter(|r| r.is_set())
            .filter(|r| live.iter().any(|o| o.id == r.operator_assignment_id))
            .cloned()
            .collect()
    }

    fn find(&self, assignment_id: &AssignmentId) -> Option<&OperatorRating> {
        self.ratings
            .iter()
            .find(|r| &r.operator_assignment_id == assignment_id)
    }

    fn slot_mut(&mut self, assignment_id: &AssignmentId) -> Result<&mut OperatorRating> {
        self.ratings
            .iter_mut()
            .find(|r| &r.operator_assignment_id == assignment_id)
            .ok_or_else(|| MovementError::NotFound(format!("operator assignment {}", assignment_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator(id: &str) -> EmployeeAssignment {
        EmployeeAssignment {
            id: AssignmentId::new(id),
            employee_id: EmployeeId::new(format!("emp-{}", id)),
            role: EmployeeRole::Operator,
        }
    }

    fn rated(id: &str, rating: u8) -> OperatorRating {
        OperatorRating {
            operator_assignment_id: AssignmentId::new(id),
            rating,
            comment: String::new(),
        }
    }

    #[test]
    fn test_sync_seeds_unset_slots() {
        let mut collector = RatingCollector::new();
        collector.sync(vec![operator("a"), operator("b")], Vec::new());

        assert_eq!(collector.ratings().len(), 2);
        assert!(collector.ratings().iter().all(|r| !r.is_set()));
    }

    #[test]
    fn test_sync_loads_persisted_and_drops_orphans() {
        let mut collector = RatingCollector::new();
        collector.sync(vec![operator("a")], vec![rated("a", 4), rated("gone", 2)]);

        assert_eq!(collector.ratings(), &[rated("a", 4)]);
    }

    #[test]
    fn test_sync_keeps_in_memory_edits() {
        let mut collector = RatingCollector::new();
        collector.sync(vec![operator("a")], vec![rated("a", 2)]);
        collector.rate(&AssignmentId::new("a"), 5).unwrap();

        collector.sync(vec![operator("a"), operator("b")], vec![rated("a", 2)]);

        assert_eq!(collector.rating_for(&AssignmentId::new("a")).unwrap().rating, 5);
        assert!(!collector.rating_for(&AssignmentId::new("b")).unwrap().is_set());
    }

    #[test]
    fn test_rating_bounds_and_unknown_operator() {
        let mut collector = RatingCollector::new();
        collector.sync(vec![operator("a")], Vec::new());

        assert!(collector.rate(&AssignmentId::new("a"), 6).unwrap_err().is_validation());
        assert!(matches!(
            collector.rate(&AssignmentId::new("x"), 3),
            Err(MovementError::NotFound(_))
        ));
        collector.comment(&AssignmentId::new("a"), "Puntual").unwrap();
        assert_eq!(collector.ratings()[0].comment, "Puntual");
    }

    #[test]
    fn test_submission_skips_unset_and_removed() {
        let mut collector = RatingCollector::new();
        collector.sync(vec![operator("a"), operator("b"), operator("c")], Vec::new());
        collector.rate(&AssignmentId::new("a"), 4).unwrap();
        collector.rate(&AssignmentId::new("c"), 3).unwrap();

        let submitted = collector.submission(&[operator("a"), operator("b")]);
        assert_eq!(submitted, vec![rated("a", 4)]);
    }
}
