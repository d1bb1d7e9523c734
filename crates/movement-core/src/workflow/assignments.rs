//! Resource assignment manager
//!
//! Working sets of employees (with role) and equipment for one movement.
//! Membership changes are idempotent; the whole set is written back as a full
//! replace when the planning step commits.

use super::traits::MovementRepository;
use crate::error::{MovementError, Result};
use crate::types::SessionContext;
use movement_types::*;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentSet {
    employees: Vec<NewEmployeeAssignment>,
    equipment: Vec<EquipmentId>,
}

impl AssignmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Working set mirroring what the store currently holds
    pub fn from_persisted(employees: &[EmployeeAssignment], equipment: &[EquipmentAssignment]) -> Self {
        let mut set = Self::new();
        for assignment in employees {
            set.add_employee(assignment.employee_id.clone(), assignment.role);
        }
        for assignment in equipment {
            set.add_equipment(assignment.equipment_id.clone());
        }
        set
    }

    pub fn employees(&self) -> &[NewEmployeeAssignment] {
        &self.employees
    }

    pub fn equipment(&self) -> &[EquipmentId] {
        &self.equipment
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty() && self.equipment.is_empty()
    }

    pub fn contains_employee(&self, employee_id: &EmployeeId) -> bool {
        self.employees.iter().any(|e| &e.employee_id == employee_id)
    }

    pub fn role_of(&self, employee_id: &EmployeeId) -> Option<EmployeeRole> {
        self.employees
            .iter()
            .find(|e| &e.employee_id == employee_id)
            .map(|e| e.role)
    }

    /// Employees currently assigned as operators
    pub fn operators(&self) -> impl Iterator<Item = &EmployeeId> {
        self.employees
            .iter()
            .filter(|e| e.role == EmployeeRole::Operator)
            .map(|e| &e.employee_id)
    }

    /// Add an employee. Returns false (and keeps the existing role) if already present.
    pub fn add_employee(&mut self, employee_id: EmployeeId, role: EmployeeRole) -> bool {
        if self.contains_employee(&employee_id) {
            return false;
        }
        self.employees.push(NewEmployeeAssignment { employee_id, role });
        true
    }

    /// Remove an employee. Returns false if it was not assigned.
    pub fn remove_employee(&mut self, employee_id: &EmployeeId) -> bool {
        let before = self.employees.len();
        self.employees.retain(|e| &e.employee_id != employee_id);
        self.employees.len() != before
    }

    /// Flip membership; returns whether the employee is assigned afterwards
    pub fn toggle_employee(&mut self, employee_id: EmployeeId, role: EmployeeRole) -> bool {
        if self.remove_employee(&employee_id) {
            false
        } else {
            self.add_employee(employee_id, role)
        }
    }

    /// Change the role of an assigned employee. Returns false if not assigned.
    pub fn set_role(&mut self, employee_id: &EmployeeId, role: EmployeeRole) -> bool {
        match self.employees.iter_mut().find(|e| &e.employee_id == employee_id) {
            Some(assignment) => {
                assignment.role = role;
                true
            }
            None => false,
        }
    }

    pub fn contains_equipment(&self, equipment_id: &EquipmentId) -> bool {
        self.equipment.contains(equipment_id)
    }

    pub fn add_equipment(&mut self, equipment_id: EquipmentId) -> bool {
        if self.contains_equipment(&equipment_id) {
            return false;
        }
        self.equipment.push(equipment_id);
        true
    }

    pub fn remove_equipment(&mut self, equipment_id: &EquipmentId) -> bool {
        let before = self.equipment.len();
        self.equipment.retain(|e| e != equipment_id);
        self.equipment.len() != before
    }

    pub fn toggle_equipment(&mut self, equipment_id: EquipmentId) -> bool {
        if self.remove_equipment(&equipment_id) {
            false
        } else {
            self.add_equipment(equipment_id)
        }
    }

    /// Replace the stored assignment sets of `movement_id` with this working set
    pub async fn reconcile<R>(
        &self,
        repo: &R,
        ctx: &SessionContext,
        movement_id: &MovementId,
        step: WizardStep,
    ) -> Result<()>
    where
        R: MovementRepository + ?Sized,
    {
        repo.assign_employees(ctx, movement_id, &self.employees)
            .await
            .map_err(|e| MovementError::commit(step, "assigning employees", e))?;

        repo.assign_equipment(ctx, movement_id, &self.equipment)
            .await
            .map_err(|e| MovementError::commit(step, "assigning equipment", e))?;

        log::info!(
            "Reconciled movement {}: {} employees, {} equipment",
            movement_id,
            self.employees.len(),
            self.equipment.len()
        );
        Ok(())
    }
}
