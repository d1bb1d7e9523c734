//! Execution task ledger
//!
//! Ordered task rows plus the odometer readings for each equipment assignment.
//! The ledger always holds at least one row so the execution form has
//! something to type into.

use super::traits::MovementRepository;
use crate::error::{MovementError, Result};
use crate::types::SessionContext;
use movement_types::*;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct TaskLedger {
    rows: Vec<TaskEntry>,
    odometers: BTreeMap<AssignmentId, OdometerReading>,
    equipment_index: HashMap<EquipmentId, AssignmentId>,
}

impl Default for TaskLedger {
    fn default() -> Self {
        Self {
            rows: vec![TaskEntry::default()],
            odometers: BTreeMap::new(),
            equipment_index: HashMap::new(),
        }
    }
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger seeded from stored rows; an empty list yields one blank row
    pub fn from_tasks(tasks: Vec<TaskEntry>) -> Self {
        let mut ledger = Self::new();
        if !tasks.is_empty() {
            ledger.rows = tasks;
        }
        ledger
    }

    pub fn rows(&self) -> &[TaskEntry] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(TaskEntry::is_blank)
    }

    /// Append a blank row and return its index
    pub fn add_row(&mut self) -> usize {
        self.rows.push(TaskEntry::default());
        self.rows.len() - 1
    }

    /// Replace a row. A row keyed to an equipment assignment must name one
    /// that is currently indexed.
    pub fn set_row(&mut self, index: usize, entry: TaskEntry) -> Result<()> {
        if let Some(assignment_id) = &entry.equipment_assignment_id {
            if !self.odometers.contains_key(assignment_id) {
                return Err(MovementError::NotFound(format!(
                    "equipment assignment {} is not part of this movement",
                    assignment_id
                )));
            }
        }
        let row = self
            .rows
            .get_mut(index)
            .ok_or_else(|| MovementError::NotFound(format!("task row {}", index)))?;
        *row = entry;
        Ok(())
    }

    /// Remove a row. Removing the last remaining row leaves a fresh blank one.
    pub fn remove_row(&mut self, index: usize) -> Result<TaskEntry> {
        if index >= self.rows.len() {
            return Err(MovementError::NotFound(format!("task row {}", index)));
        }
        let removed = self.rows.remove(index);
        if self.rows.is_empty() {
            self.rows.push(TaskEntry::default());
        }
        Ok(removed)
    }

    pub fn move_row(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.rows.len();
        if from >= len || to >= len {
            return Err(MovementError::NotFound(format!("task row {}", from.max(to))));
        }
        let row = self.rows.remove(from);
        self.rows.insert(to, row);
        Ok(())
    }

    /// Rows worth persisting; fully blank rows are dropped
    pub fn entries_for_commit(&self) -> Vec<TaskEntry> {
        self.rows.iter().filter(|row| !row.is_blank()).cloned().collect()
    }

    /// Rebuild the equipment -> assignment index from stored assignments.
    ///
    /// Readings edited in memory survive for assignments that still exist;
    /// new assignments start from their stored reading. Rows keyed to an
    /// assignment that no longer exists lose the key.
    pub fn index_equipment(&mut self, assignments: &[EquipmentAssignment]) {
        let mut odometers = BTreeMap::new();
        let mut index = HashMap::new();
        for assignment in assignments {
            let reading = self
                .odometers
                .get(&assignment.id)
                .copied()
                .unwrap_or(assignment.odometer);
            odometers.insert(assignment.id.clone(), reading);
            index.insert(assignment.equipment_id.clone(), assignment.id.clone());
        }
        self.odometers = odometers;
        self.equipment_index = index;

        let mut unlinked = 0;
        for row in &mut self.rows {
            let stale = row
                .equipment_assignment_id
                .as_ref()
                .is_some_and(|id| !self.odometers.contains_key(id));
            if stale {
                row.equipment_assignment_id = None;
                unlinked += 1;
            }
        }
        if unlinked > 0 {
            log::warn!("Unlinked {} task rows from removed equipment assignments", unlinked);
        }
    }

    pub fn assignment_for(&self, equipment_id: &EquipmentId) -> Option<&AssignmentId> {
        self.equipment_index.get(equipment_id)
    }

    pub fn odometer(&self, equipment_id: &EquipmentId) -> Option<OdometerReading> {
        self.assignment_for(equipment_id)
            .and_then(|id| self.odometers.get(id))
            .copied()
    }

    pub fn set_odometer(&mut self, equipment_id: &EquipmentId, reading: OdometerReading) -> Result<()> {
        let assignment_id = self
            .equipment_index
            .get(equipment_id)
            .ok_or_else(|| MovementError::NotFound(format!("equipment {} is not assigned", equipment_id)))?;
        self.odometers.insert(assignment_id.clone(), reading);
        Ok(())
    }

    pub fn odometers(&self) -> impl Iterator<Item = (&AssignmentId, &OdometerReading)> {
        self.odometers.iter()
    }

    /// Write the task rows and every odometer reading
    pub async fn persist<R>(
        &self,
        repo: &R,
        ctx: &SessionContext,
        movement_id: &MovementId,
        step: WizardStep,
    ) -> Result<()>
    where
        R: MovementRepository + ?Sized,
    {
        let entries = self.entries_for_commit();
        repo.save_tasks(ctx, movement_id, &entries)
            .await
            .map_err(|e| MovementError::commit(step, "saving tasks", e))?;

        for (assignment_id, reading) in &self.odometers {
            repo.update_equipment_assignment(ctx, assignment_id, *reading)
                .await
                .map_err(|e| {
                    MovementError::commit(step, format!("recording odometer for {}", assignment_id), e)
                })?;
        }

        log::info!(
            "Saved {} tasks and {} odometer readings for movement {}",
            entries.len(),
            self.odometers.len(),
            movement_id
        );
        Ok(())
    }
}
