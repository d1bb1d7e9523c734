//! Common types used throughout the movement workflow

use movement_types::{CompanyId, UserId};
use serde::{Deserialize, Serialize};

/// Tenant and user a repository call is made on behalf of.
///
/// Passed explicitly into every repository and catalog call instead of being
/// read from ambient session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub company_id: CompanyId,
    pub user_id: Option<UserId>,
}

impl SessionContext {
    pub fn new(company_id: CompanyId, user_id: Option<UserId>) -> Self {
        Self { company_id, user_id }
    }
}

/// Result of asking the wizard to close
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseRequest {
    /// Nothing uncommitted; the wizard is closed
    Closed,
    /// Uncommitted edits exist; call `discard_and_close` to confirm
    UnsavedChanges { dirty_steps: Vec<movement_types::WizardStep> },
}
