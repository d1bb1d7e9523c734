//! Per-step gates checked before a commit
//!
//! Validators are pure: they look at the working copy only and never touch the
//! data service. An empty violation list means the step may be committed.

use super::working_copy::WorkingCopy;
use movement_types::WizardStep;

pub fn validate(step: WizardStep, copy: &WorkingCopy) -> Vec<String> {
    match step {
        WizardStep::Request => validate_request(copy),
        WizardStep::Classification => validate_classification(copy),
        // Planning, execution and closeout accept whatever was entered
        WizardStep::Planning | WizardStep::Execution | WizardStep::Closeout => Vec::new(),
    }
}

pub fn can_commit(step: WizardStep, copy: &WorkingCopy) -> bool {
    validate(step, copy).is_empty()
}

fn validate_request(copy: &WorkingCopy) -> Vec<String> {
    let mut violations = Vec::new();
    if copy.movement.request.subject.trim().is_empty() {
        violations.push("subject is required".to_string());
    }
    violations
}

/// Structural checks only; answers are checked against the subtype's
/// declarations at commit time.
fn validate_classification(copy: &WorkingCopy) -> Vec<String> {
    let classification = &copy.movement.classification;
    let mut violations = Vec::new();
    if classification.movement_type_id.is_some() && classification.business_unit_id.is_none() {
        violations.push("movement type requires a business unit".to_string());
    }
    if classification.movement_subtype_id.is_some() && classification.movement_type_id.is_none() {
        violations.push("movement subtype requires a movement type".to_string());
    }
    violations
}
