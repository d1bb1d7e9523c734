//! Movement wizard controller
//!
//! Drives one movement through the five wizard steps. The controller owns the
//! working copy and the step pointer; every step boundary is a commit against
//! the repository, and the step pointer and `estado` only move once that
//! commit has fully succeeded.

use super::assignments::AssignmentSet;
use super::dynamic_fields;
use super::ratings::RatingCollector;
use super::task_ledger::TaskLedger;
use super::traits::{MovementRepository, ResourceCatalog};
use super::validators;
use super::working_copy::{MovementPatch, WorkingCopy};
use crate::error::{MovementError, Result};
use crate::types::{CloseRequest, SessionContext};
use chrono::{Local, NaiveDate, Utc};
use movement_types::*;
use std::sync::Arc;

/// Outcome handed back by a successful `complete()`
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub movement_id: MovementId,
    pub ratings_submitted: usize,
}

pub struct MovementWizard<R: ?Sized, C: ?Sized> {
    repo: Arc<R>,
    catalog: Arc<C>,
    ctx: SessionContext,
    step: WizardStep,
    working: WorkingCopy,
    baseline: WorkingCopy,
    closed: bool,
}

impl<R, C> MovementWizard<R, C>
where
    R: MovementRepository + ?Sized,
    C: ResourceCatalog + ?Sized,
{
    /// Open the wizard.
    ///
    /// Without an id this starts a blank draft dated today at step 1. With an
    /// id the movement and its sub-records are loaded and the wizard resumes
    /// at the step its `estado` implies.
    pub async fn open(
        repo: Arc<R>,
        catalog: Arc<C>,
        ctx: SessionContext,
        existing: Option<&MovementId>,
    ) -> Result<Self> {
        match existing {
            None => Ok(Self::new_draft(repo, catalog, ctx, Local::now().date_naive())),
            Some(id) => Self::resume(repo, catalog, ctx, id).await,
        }
    }

    /// Blank draft dated `date`, at step 1, nothing persisted
    pub fn new_draft(repo: Arc<R>, catalog: Arc<C>, ctx: SessionContext, date: NaiveDate) -> Self {
        log::info!("Opening new movement draft for company {}", ctx.company_id);
        let working = WorkingCopy::blank(date);
        Self {
            repo,
            catalog,
            ctx,
            step: WizardStep::Request,
            baseline: working.clone(),
            working,
            closed: false,
        }
    }

    async fn resume(repo: Arc<R>, catalog: Arc<C>, ctx: SessionContext, id: &MovementId) -> Result<Self> {
        let movement = repo
            .get_movement(&ctx, id)
            .await?
            .ok_or_else(|| MovementError::NotFound(format!("movement {}", id)))?;

        let step = movement
            .state
            .map(|state| state.resume_step())
            .unwrap_or(WizardStep::Request);

        let employees = repo.get_employee_assignments(&ctx, id).await?;
        let equipment = repo.get_equipment_assignments(&ctx, id).await?;
        let tasks = repo.get_tasks(&ctx, id).await?;

        let mut ledger = TaskLedger::from_tasks(tasks);
        ledger.index_equipment(&equipment);

        let mut ratings = RatingCollector::new();
        if step == WizardStep::Closeout {
            let operators = repo.get_operator_assignments(&ctx, id).await?;
            let persisted = repo.get_ratings(&ctx, id).await?;
            ratings.sync(operators, persisted);
        }

        let state = movement.state;
        let working = WorkingCopy {
            movement,
            assignments: AssignmentSet::from_persisted(&employees, &equipment),
            ledger,
            ratings,
        };

        match state {
            Some(state) => log::info!("Resumed movement {} at {} (estado {})", id, step, state),
            None => log::warn!("Movement {} has no estado; resuming at {}", id, step),
        }

        Ok(Self {
            repo,
            catalog,
            ctx,
            step,
            baseline: working.clone(),
            working,
            closed: false,
        })
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn state(&self) -> Option<MovementState> {
        self.working.movement.state
    }

    pub fn movement_id(&self) -> Option<&MovementId> {
        self.working.movement.id.as_ref()
    }

    pub fn movement(&self) -> &Movement {
        &self.working.movement
    }

    pub fn working_copy(&self) -> &WorkingCopy {
        &self.working
    }

    pub fn baseline(&self) -> &WorkingCopy {
        &self.baseline
    }

    pub fn assignments(&self) -> &AssignmentSet {
        &self.working.assignments
    }

    pub fn ledger(&self) -> &TaskLedger {
        &self.working.ledger
    }

    pub fn ratings(&self) -> &RatingCollector {
        &self.working.ratings
    }

    pub fn session(&self) -> &SessionContext {
        &self.ctx
    }

    /// Option lists for the forms
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_read_only(&self) -> bool {
        self.closed || self.working.movement.is_read_only()
    }

    pub fn dirty_steps(&self) -> Vec<WizardStep> {
        self.working.dirty_steps(&self.baseline)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty_steps().is_empty()
    }

    /// Merge a field patch into the working copy. Nothing is persisted.
    pub fn update(&mut self, patch: MovementPatch) -> Result<()> {
        self.ensure_editable()?;
        patch.apply_to(&mut self.working.movement);
        Ok(())
    }

    pub fn assignments_mut(&mut self) -> Result<&mut AssignmentSet> {
        self.ensure_editable()?;
        Ok(&mut self.working.assignments)
    }

    pub fn ledger_mut(&mut self) -> Result<&mut TaskLedger> {
        self.ensure_editable()?;
        Ok(&mut self.working.ledger)
    }

    pub fn ratings_mut(&mut self) -> Result<&mut RatingCollector> {
        self.ensure_editable()?;
        Ok(&mut self.working.ratings)
    }

    /// Validate and commit the current step, then move to the next one.
    ///
    /// On any failure the step pointer, `estado` and the working copy are
    /// left exactly as they were; calling `advance` again retries the commit.
    pub async fn advance(&mut self) -> Result<WizardStep> {
        self.ensure_editable()?;
        let step = self.step;
        self.check_step(step)?;

        let (result, next) = match step {
            WizardStep::Request => (self.commit_request().await, WizardStep::Classification),
            WizardStep::Classification => (self.commit_classification().await, WizardStep::Planning),
            WizardStep::Planning => (self.commit_planning().await, WizardStep::Execution),
            WizardStep::Execution => (self.commit_execution().await, WizardStep::Closeout),
            WizardStep::Closeout => {
                return Err(self.precondition(format!("{} is the last step; use complete()", step)))
            }
        };
        let staged = result.map_err(|e| {
            if !e.is_validation() {
                log::error!("Advance from {} failed: {}", step, e);
            }
            e
        })?;

        self.working = staged;
        self.baseline = self.working.clone();
        self.step = next;
        log::info!(
            "Movement {} advanced to {} (estado {})",
            self.display_id(),
            next,
            self.display_state()
        );
        Ok(next)
    }

    /// Go back one step. Never touches the repository.
    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            log::debug!("Back from {} to {}", self.step, previous);
            self.step = previous;
        }
        self.step
    }

    /// Commit the closeout step, mark the movement `completado` and submit ratings.
    pub async fn complete(&mut self) -> Result<Completion> {
        self.ensure_editable()?;
        let step = WizardStep::Closeout;
        if self.step != step {
            return Err(self.precondition(format!("complete() called at {}", self.step)));
        }
        self.check_step(step)?;

        let (staged, completion) = self.commit_closeout().await.map_err(|e| {
            log::error!("Completing movement {} failed: {}", self.display_id(), e);
            e
        })?;

        self.working = staged;
        self.baseline = self.working.clone();
        self.closed = true;
        log::info!(
            "Movement {} completed with {} ratings",
            completion.movement_id,
            completion.ratings_submitted
        );
        Ok(completion)
    }

    /// Move a persisted, non-terminal movement to `cancelado` and close the wizard
    pub async fn cancel(&mut self) -> Result<()> {
        self.ensure_editable()?;
        let id = match self.working.movement.id.clone() {
            Some(id) => id,
            None => return Err(self.precondition("cannot cancel a movement that was never saved".to_string())),
        };
        self.check_transition(MovementState::Cancelled)?;

        self.repo
            .update_movement(&self.ctx, &id, &MovementUpdate::state(MovementState::Cancelled))
            .await
            .map_err(|e| {
                log::error!("Cancelling movement {} failed: {}", id, e);
                MovementError::commit(self.step, "cancelling the movement", e)
            })?;

        self.working.movement.state = Some(MovementState::Cancelled);
        self.baseline.movement.state = Some(MovementState::Cancelled);
        self.closed = true;
        log::info!("Movement {} cancelled", id);
        Ok(())
    }

    /// Close if nothing is uncommitted, otherwise report what would be lost
    pub fn request_close(&mut self) -> CloseRequest {
        if self.closed {
            return CloseRequest::Closed;
        }
        let dirty_steps = self.dirty_steps();
        if dirty_steps.is_empty() {
            self.closed = true;
            log::info!("Closed wizard for movement {}", self.display_id());
            CloseRequest::Closed
        } else {
            log::warn!(
                "Close deferred for movement {}: unsaved changes in {:?}",
                self.display_id(),
                dirty_steps
            );
            CloseRequest::UnsavedChanges { dirty_steps }
        }
    }

    /// Drop uncommitted edits and close. Committed steps are kept.
    pub fn discard_and_close(&mut self) {
        if self.is_dirty() {
            log::warn!("Discarding unsaved changes for movement {}", self.display_id());
        }
        self.working = self.baseline.clone();
        self.closed = true;
    }

    async fn commit_request(&self) -> Result<WorkingCopy> {
        let step = WizardStep::Request;
        let target = self.target_state(step)?;
        let mut staged = self.working.clone();

        match staged.movement.id.clone() {
            None => {
                let mut draft = staged.movement.clone();
                draft.state = Some(target);
                let created = self
                    .repo
                    .create_movement(&self.ctx, &draft)
                    .await
                    .map_err(|e| MovementError::commit(step, "creating the movement", e))?;
                let id = created.id.ok_or_else(|| {
                    MovementError::commit(
                        step,
                        "creating the movement",
                        MovementError::Repository("store returned no movement id".to_string()),
                    )
                })?;
                log::info!("Created movement {}", id);
                staged.movement.id = Some(id);
            }
            Some(id) => {
                let update = MovementUpdate {
                    request: Some(staged.movement.request.clone()),
                    ..MovementUpdate::state(target)
                };
                self.repo
                    .update_movement(&self.ctx, &id, &update)
                    .await
                    .map_err(|e| MovementError::commit(step, "updating request fields", e))?;
            }
        }

        staged.movement.state = Some(target);
        Ok(staged)
    }

    async fn commit_classification(&self) -> Result<WorkingCopy> {
        let step = WizardStep::Classification;
        let id = self.require_id(step)?;
        let target = self.target_state(step)?;
        let mut staged = self.working.clone();

        if let Some(declared) = self.subtype_fields(&staged.movement.classification).await? {
            match dynamic_fields::normalize(&declared, &staged.movement.classification.dynamic_fields) {
                Ok(normalized) => staged.movement.classification.dynamic_fields = normalized,
                Err(violations) => {
                    log::warn!("Dynamic fields rejected at {}: {:?}", step, violations);
                    return Err(MovementError::Validation { step, violations });
                }
            }
        }

        let update = MovementUpdate {
            classification: Some(staged.movement.classification.clone()),
            ..MovementUpdate::state(target)
        };
        self.repo
            .update_movement(&self.ctx, &id, &update)
            .await
            .map_err(|e| MovementError::commit(step, "updating classification", e))?;

        staged.movement.state = Some(target);
        Ok(staged)
    }

    async fn commit_planning(&self) -> Result<WorkingCopy> {
        let step = WizardStep::Planning;
        let id = self.require_id(step)?;
        let target = self.target_state(step)?;
        let mut staged = self.working.clone();

        staged
            .assignments
            .reconcile(self.repo.as_ref(), &self.ctx, &id, step)
            .await?;

        // Step 4 works against assignment ids, not equipment ids
        let equipment = self
            .repo
            .get_equipment_assignments(&self.ctx, &id)
            .await
            .map_err(|e| MovementError::commit(step, "loading equipment assignments", e))?;
        staged.ledger.index_equipment(&equipment);

        let update = MovementUpdate {
            planning: Some(staged.movement.planning.clone()),
            ..MovementUpdate::state(target)
        };
        self.repo
            .update_movement(&self.ctx, &id, &update)
            .await
            .map_err(|e| MovementError::commit(step, "updating schedule", e))?;

        staged.movement.state = Some(target);
        Ok(staged)
    }

    async fn commit_execution(&self) -> Result<WorkingCopy> {
        let step = WizardStep::Execution;
        let id = self.require_id(step)?;
        let target = self.target_state(step)?;
        let mut staged = self.working.clone();

        staged.ledger.persist(self.repo.as_ref(), &self.ctx, &id, step).await?;

        let operators = self
            .repo
            .get_operator_assignments(&self.ctx, &id)
            .await
            .map_err(|e| MovementError::commit(step, "loading operator assignments", e))?;
        let persisted = self
            .repo
            .get_ratings(&self.ctx, &id)
            .await
            .map_err(|e| MovementError::commit(step, "loading ratings", e))?;
        staged.ratings.sync(operators, persisted);

        staged.movement.execution.submitted_at = Some(Utc::now());
        let update = MovementUpdate {
            execution: Some(staged.movement.execution.clone()),
            ..MovementUpdate::state(target)
        };
        self.repo
            .update_movement(&self.ctx, &id, &update)
            .await
            .map_err(|e| MovementError::commit(step, "updating execution log", e))?;

        staged.movement.state = Some(target);
        Ok(staged)
    }

    async fn commit_closeout(&self) -> Result<(WorkingCopy, Completion)> {
        let step = WizardStep::Closeout;
        let id = self.require_id(step)?;
        let target = MovementState::Completed;
        self.check_transition(target)?;

        let mut staged = self.working.clone();

        let live = self
            .repo
            .get_operator_assignments(&self.ctx, &id)
            .await
            .map_err(|e| MovementError::commit(step, "loading operator assignments", e))?;
        let submission = staged.ratings.submission(&live);
        let skipped = staged.ratings.ratings().len() - submission.len();
        if skipped > 0 {
            log::info!("Skipping {} unset or orphaned ratings for movement {}", skipped, id);
        }

        self.repo
            .save_ratings(&self.ctx, &id, &submission, self.ctx.user_id.as_ref())
            .await
            .map_err(|e| MovementError::commit(step, "saving ratings", e))?;

        staged.movement.closeout.validated_at = Some(Utc::now());
        staged.movement.closeout.validated_by = self.ctx.user_id.clone();
        let update = MovementUpdate {
            closeout: Some(staged.movement.closeout.clone()),
            ..MovementUpdate::state(target)
        };
        self.repo
            .update_movement(&self.ctx, &id, &update)
            .await
            .map_err(|e| MovementError::commit(step, "updating closeout fields", e))?;
        staged.movement.state = Some(target);
        staged.ratings.sync(live, submission.clone());

        let completion = Completion {
            movement_id: id,
            ratings_submitted: submission.len(),
        };
        Ok((staged, completion))
    }

    /// Field declarations of the selected subtype, `None` when no subtype is set
    async fn subtype_fields(&self, classification: &Classification) -> Result<Option<Vec<FieldDescriptor>>> {
        let step = WizardStep::Classification;
        let (movement_type, subtype) = match (
            &classification.movement_type_id,
            &classification.movement_subtype_id,
        ) {
            (Some(movement_type), Some(subtype)) => (movement_type, subtype),
            _ => return Ok(None),
        };

        let subtypes = self
            .catalog
            .movement_subtypes(&self.ctx, movement_type)
            .await
            .map_err(|e| MovementError::commit(step, "loading subtype field declarations", e))?;

        match subtypes.into_iter().find(|s| &s.id == subtype) {
            Some(found) => Ok(Some(found.fields)),
            None => Err(MovementError::Validation {
                step,
                violations: vec![format!("movement subtype {} does not belong to type {}", subtype, movement_type)],
            }),
        }
    }

    fn check_step(&self, step: WizardStep) -> Result<()> {
        let violations = validators::validate(step, &self.working);
        if violations.is_empty() {
            return Ok(());
        }
        log::warn!("Validation failed at {}: {:?}", step, violations);
        Err(MovementError::Validation { step, violations })
    }

    fn target_state(&self, step: WizardStep) -> Result<MovementState> {
        let target = MovementState::after_commit(self.working.movement.state, step.commit_target());
        self.check_transition(target)?;
        Ok(target)
    }

    fn check_transition(&self, target: MovementState) -> Result<()> {
        let legal = match self.working.movement.state {
            None => target == MovementState::Generated,
            Some(current) => current.can_transition_to(target),
        };
        if legal {
            Ok(())
        } else {
            Err(self.precondition(format!(
                "illegal transition {} -> {}",
                self.display_state(),
                target
            )))
        }
    }

    fn ensure_editable(&self) -> Result<()> {
        if let Some(state) = self.working.movement.state.filter(|s| s.is_terminal()) {
            return Err(MovementError::Immutable(state));
        }
        if self.closed {
            return Err(self.precondition("the wizard is closed".to_string()));
        }
        Ok(())
    }

    fn require_id(&self, step: WizardStep) -> Result<MovementId> {
        self.working
            .movement
            .id
            .clone()
            .ok_or_else(|| self.precondition(format!("{} requires a saved movement", step)))
    }

    fn precondition(&self, message: String) -> MovementError {
        log::error!("Precondition violated for movement {}: {}", self.display_id(), message);
        MovementError::Precondition(message)
    }

    fn display_id(&self) -> String {
        self.movement_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "<draft>".to_string())
    }

    fn display_state(&self) -> String {
        self.state()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "<none>".to_string())
    }
}
