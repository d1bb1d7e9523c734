//! In-memory data service
//!
//! Implements both the repository and the catalog over process-local maps.
//! Every call is journaled, and a call kind can be armed to fail once, which
//! is what the wizard's failure-path tests drive it with.

use crate::error::{MovementError, Result};
use crate::types::SessionContext;
use crate::workflow::traits::{MovementRepository, ResourceCatalog};
use async_trait::async_trait;
use movement_types::*;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Kind of call made against the in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryCall {
    CreateMovement,
    GetMovement,
    UpdateMovement,
    DeleteMovement,
    AssignEmployees,
    AssignEquipment,
    SaveTasks,
    UpdateEquipmentAssignment,
    SaveRatings,
    GetEmployeeAssignments,
    GetEquipmentAssignments,
    GetTasks,
    GetOperatorAssignments,
    GetRatings,
    Clients,
    ApprovedQuotes,
    BusinessUnits,
    MovementTypes,
    MovementSubtypes,
    ActiveEmployees,
    ActiveEquipment,
}

impl RepositoryCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::CreateMovement
                | Self::UpdateMovement
                | Self::DeleteMovement
                | Self::AssignEmployees
                | Self::AssignEquipment
                | Self::SaveTasks
                | Self::UpdateEquipmentAssignment
                | Self::SaveRatings
        )
    }
}

#[derive(Debug, Clone)]
struct StoredMovement {
    company_id: CompanyId,
    movement: Movement,
    employees: Vec<EmployeeAssignment>,
    equipment: Vec<EquipmentAssignment>,
    tasks: Vec<TaskEntry>,
    ratings: Vec<OperatorRating>,
    rated_by: Option<UserId>,
}

#[derive(Debug, Default)]
struct Catalog {
    clients: Vec<Client>,
    quotes: Vec<Quote>,
    business_units: Vec<BusinessUnit>,
    movement_types: Vec<MovementType>,
    movement_subtypes: Vec<MovementSubtype>,
    employees: Vec<Employee>,
    equipment: Vec<Equipment>,
}

#[derive(Default)]
pub struct InMemoryMovementRepository {
    movements: Mutex<HashMap<MovementId, StoredMovement>>,
    catalog: Mutex<Catalog>,
    calls: Mutex<Vec<RepositoryCall>>,
    failures: Mutex<HashMap<RepositoryCall, String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| MovementError::Repository("in-memory store lock poisoned".to_string()))
}

impl InMemoryMovementRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `kind` fail with `message`
    pub fn fail_next(&self, kind: RepositoryCall, message: impl Into<String>) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(kind, message.into());
        }
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<RepositoryCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<RepositoryCall> {
        self.calls().into_iter().filter(RepositoryCall::is_write).collect()
    }

    pub fn count(&self, kind: RepositoryCall) -> usize {
        self.calls().iter().filter(|call| **call == kind).count()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    /// Store a movement directly (bypassing the journal) and return its id
    pub fn insert_movement(&self, ctx: &SessionContext, mut movement: Movement) -> MovementId {
        let id = movement.id.clone().unwrap_or_else(MovementId::generate);
        movement.id = Some(id.clone());
        if let Ok(mut movements) = self.movements.lock() {
            movements.insert(id.clone(), StoredMovement::new(ctx.company_id.clone(), movement));
        }
        id
    }

    /// Store a movement with a subject and the given state
    pub fn seed_movement(&self, ctx: &SessionContext, state: MovementState) -> MovementId {
        let mut movement = Movement::draft(chrono::Local::now().date_naive());
        movement.request.subject = "Seeded movement".to_string();
        movement.state = Some(state);
        self.insert_movement(ctx, movement)
    }

    /// Attach employee assignments to a stored movement (bypassing the journal)
    pub fn seed_employees(&self, id: &MovementId, employees: &[NewEmployeeAssignment]) -> Vec<EmployeeAssignment> {
        let mut movements = match self.movements.lock() {
            Ok(movements) => movements,
            Err(_) => return Vec::new(),
        };
        match movements.get_mut(id) {
            Some(stored) => {
                stored.replace_employees(employees);
                stored.employees.clone()
            }
            None => Vec::new(),
        }
    }

    pub fn seed_equipment(&self, id: &MovementId, equipment: &[EquipmentId]) -> Vec<EquipmentAssignment> {
        let mut movements = match self.movements.lock() {
            Ok(movements) => movements,
            Err(_) => return Vec::new(),
        };
        match movements.get_mut(id) {
            Some(stored) => {
                stored.replace_equipment(equipment);
                stored.equipment.clone()
            }
            None => Vec::new(),
        }
    }

    pub fn seed_tasks(&self, id: &MovementId, tasks: Vec<TaskEntry>) {
        if let Ok(mut movements) = self.movements.lock() {
            if let Some(stored) = movements.get_mut(id) {
                stored.tasks = tasks;
            }
        }
    }

    pub fn seed_ratings(&self, id: &MovementId, ratings: Vec<OperatorRating>) {
        if let Ok(mut movements) = self.movements.lock() {
            if let Some(stored) = movements.get_mut(id) {
                stored.ratings = ratings;
            }
        }
    }

    /// Current stored movement regardless of tenant (bypassing the journal)
    pub fn stored_movement(&self, id: &MovementId) -> Option<Movement> {
        self.movements
            .lock()
            .ok()
            .and_then(|movements| movements.get(id).map(|stored| stored.movement.clone()))
    }

    /// Ratings currently stored for a movement (bypassing the journal)
    pub fn stored_ratings(&self, id: &MovementId) -> Vec<OperatorRating> {
        self.movements
            .lock()
            .ok()
            .and_then(|movements| movements.get(id).map(|stored| stored.ratings.clone()))
            .unwrap_or_default()
    }

    /// User recorded as validator on the last rating submission
    pub fn stored_validator(&self, id: &MovementId) -> Option<UserId> {
        self.movements
            .lock()
            .ok()
            .and_then(|movements| movements.get(id).and_then(|stored| stored.rated_by.clone()))
    }

    pub fn add_client(&self, client: Client) {
        self.with_catalog(|catalog| catalog.clients.push(client));
    }

    /// Only approved quotes are ever offered, so only those are stored
    pub fn add_approved_quote(&self, quote: Quote) {
        self.with_catalog(|catalog| catalog.quotes.push(quote));
    }

    pub fn add_business_unit(&self, unit: BusinessUnit) {
        self.with_catalog(|catalog| catalog.business_units.push(unit));
    }

    pub fn add_movement_type(&self, movement_type: MovementType) {
        self.with_catalog(|catalog| catalog.movement_types.push(movement_type));
    }

    pub fn add_movement_subtype(&self, subtype: MovementSubtype) {
        self.with_catalog(|catalog| catalog.movement_subtypes.push(subtype));
    }

    pub fn add_employee(&self, employee: Employee) {
        self.with_catalog(|catalog| catalog.employees.push(employee));
    }

    pub fn add_equipment(&self, equipment: Equipment) {
        self.with_catalog(|catalog| catalog.equipment.push(equipment));
    }

    fn with_catalog(&self, f: impl FnOnce(&mut Catalog)) {
        if let Ok(mut catalog) = self.catalog.lock() {
            f(&mut catalog);
        }
    }

    /// Journal the call and fire an armed failure, if any
    fn record(&self, kind: RepositoryCall) -> Result<()> {
        lock(&self.calls)?.push(kind);
        match lock(&self.failures)?.remove(&kind) {
            Some(message) => {
                log::debug!("Injected failure for {:?}: {}", kind, message);
                Err(MovementError::Repository(message))
            }
            None => Ok(()),
        }
    }

    /// Run `f` against a movement owned by the session's company
    fn with_movement<T>(
        &self,
        ctx: &SessionContext,
        id: &MovementId,
        f: impl FnOnce(&mut StoredMovement) -> T,
    ) -> Result<T> {
        let mut movements = lock(&self.movements)?;
        match movements.get_mut(id) {
            Some(stored) if stored.company_id == ctx.company_id => Ok(f(stored)),
            _ => Err(MovementError::NotFound(format!("movement {}", id))),
        }
    }
}

impl StoredMovement {
    fn new(company_id: CompanyId, movement: Movement) -> Self {
        Self {
            company_id,
            movement,
            employees: Vec::new(),
            equipment: Vec::new(),
            tasks: Vec::new(),
            ratings: Vec::new(),
            rated_by: None,
        }
    }

    /// Replace by diff: surviving employees keep their assignment id
    fn replace_employees(&mut self, employees: &[NewEmployeeAssignment]) {
        let previous = std::mem::take(&mut self.employees);
        self.employees = employees
            .iter()
            .map(|wanted| EmployeeAssignment {
                id: previous
                    .iter()
                    .find(|p| p.employee_id == wanted.employee_id)
                    .map(|p| p.id.clone())
                    .unwrap_or_else(AssignmentId::generate),
                employee_id: wanted.employee_id.clone(),
                role: wanted.role,
            })
            .collect();
    }

    /// Replace by diff: surviving equipment keeps its assignment and odometer
    fn replace_equipment(&mut self, equipment: &[EquipmentId]) {
        let previous = std::mem::take(&mut self.equipment);
        self.equipment = equipment
            .iter()
            .map(|wanted| {
                previous
                    .iter()
                    .find(|p| &p.equipment_id == wanted)
                    .cloned()
                    .unwrap_or_else(|| EquipmentAssignment {
                        id: AssignmentId::generate(),
                        equipment_id: wanted.clone(),
                        odometer: OdometerReading::default(),
                    })
            })
            .collect();
    }
}

#[async_trait]
impl MovementRepository for InMemoryMovementRepository {
    async fn create_movement(&self, ctx: &SessionContext, movement: &Movement) -> Result<Movement> {
        self.record(RepositoryCall::CreateMovement)?;
        let mut created = movement.clone();
        let id = MovementId::generate();
        created.id = Some(id.clone());
        lock(&self.movements)?.insert(id, StoredMovement::new(ctx.company_id.clone(), created.clone()));
        Ok(created)
    }

    async fn get_movement(&self, ctx: &SessionContext, id: &MovementId) -> Result<Option<Movement>> {
        self.record(RepositoryCall::GetMovement)?;
        let movements = lock(&self.movements)?;
        Ok(movements
            .get(id)
            .filter(|stored| stored.company_id == ctx.company_id)
            .map(|stored| stored.movement.clone()))
    }

    async fn update_movement(&self, ctx: &SessionContext, id: &MovementId, update: &MovementUpdate) -> Result<Movement> {
        self.record(RepositoryCall::UpdateMovement)?;
        self.with_movement(ctx, id, |stored| {
            update.apply_to(&mut stored.movement);
            stored.movement.clone()
        })
    }

    async fn delete_movement(&self, ctx: &SessionContext, id: &MovementId) -> Result<()> {
        self.record(RepositoryCall::DeleteMovement)?;
        self.with_movement(ctx, id, |_| ())?;
        lock(&self.movements)?.remove(id);
        Ok(())
    }

    async fn assign_employees(&self, ctx: &SessionContext, id: &MovementId, employees: &[NewEmployeeAssignment]) -> Result<()> {
        self.record(RepositoryCall::AssignEmployees)?;
        self.with_movement(ctx, id, |stored| stored.replace_employees(employees))
    }

    async fn assign_equipment(&self, ctx: &SessionContext, id: &MovementId, equipment: &[EquipmentId]) -> Result<()> {
        self.record(RepositoryCall::AssignEquipment)?;
        self.with_movement(ctx, id, |stored| stored.replace_equipment(equipment))
    }

    async fn save_tasks(&self, ctx: &SessionContext, id: &MovementId, tasks: &[TaskEntry]) -> Result<()> {
        self.record(RepositoryCall::SaveTasks)?;
        self.with_movement(ctx, id, |stored| stored.tasks = tasks.to_vec())
    }

    async fn update_equipment_assignment(&self, ctx: &SessionContext, assignment_id: &AssignmentId, odometer: OdometerReading) -> Result<()> {
        self.record(RepositoryCall::UpdateEquipmentAssignment)?;
        let mut movements = lock(&self.movements)?;
        let assignment = movements
            .values_mut()
            .filter(|stored| stored.company_id == ctx.company_id)
            .flat_map(|stored| stored.equipment.iter_mut())
            .find(|assignment| &assignment.id == assignment_id)
            .ok_or_else(|| MovementError::NotFound(format!("equipment assignment {}", assignment_id)))?;
        assignment.odometer = odometer;
        Ok(())
    }

    async fn save_ratings(&self, ctx: &SessionContext, id: &MovementId, ratings: &[OperatorRating], validator: Option<&UserId>) -> Result<()> {
        self.record(RepositoryCall::SaveRatings)?;
        self.with_movement(ctx, id, |stored| {
            for rating in ratings {
                match stored
                    .ratings
                    .iter_mut()
                    .find(|r| r.operator_assignment_id == rating.operator_assignment_id)
                {
                    Some(existing) => *existing = rating.clone(),
                    None => stored.ratings.push(rating.clone()),
                }
            }
            stored.rated_by = validator.cloned();
        })
    }

    async fn get_employee_assignments(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<EmployeeAssignment>> {
        self.record(RepositoryCall::GetEmployeeAssignments)?;
        self.with_movement(ctx, id, |stored| stored.employees.clone())
    }

    async fn get_equipment_assignments(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<EquipmentAssignment>> {
        self.record(RepositoryCall::GetEquipmentAssignments)?;
        self.with_movement(ctx, id, |stored| stored.equipment.clone())
    }

    async fn get_tasks(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<TaskEntry>> {
        self.record(RepositoryCall::GetTasks)?;
        self.with_movement(ctx, id, |stored| stored.tasks.clone())
    }

    async fn get_operator_assignments(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<EmployeeAssignment>> {
        self.record(RepositoryCall::GetOperatorAssignments)?;
        self.with_movement(ctx, id, |stored| {
            stored
                .employees
                .iter()
                .filter(|e| e.role == EmployeeRole::Operator)
                .cloned()
                .collect()
        })
    }

    async fn get_ratings(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<OperatorRating>> {
        self.record(RepositoryCall::GetRatings)?;
        self.with_movement(ctx, id, |stored| stored.ratings.clone())
    }
}

#[async_trait]
impl ResourceCatalog for InMemoryMovementRepository {
    async fn clients(&self, _ctx: &SessionContext) -> Result<Vec<Client>> {
        self.record(RepositoryCall::Clients)?;
        Ok(lock(&self.catalog)?.clients.clone())
    }

    async fn approved_quotes(&self, _ctx: &SessionContext, client: Option<&ClientId>) -> Result<Vec<Quote>> {
        self.record(RepositoryCall::ApprovedQuotes)?;
        Ok(lock(&self.catalog)?
            .quotes
            .iter()
            .filter(|q| client.is_none() || q.client_id.as_ref() == client)
            .cloned()
            .collect())
    }

    async fn business_units(&self, _ctx: &SessionContext) -> Result<Vec<BusinessUnit>> {
        self.record(RepositoryCall::BusinessUnits)?;
        Ok(lock(&self.catalog)?.business_units.clone())
    }

    async fn movement_types(&self, _ctx: &SessionContext, business_unit: &BusinessUnitId) -> Result<Vec<MovementType>> {
        self.record(RepositoryCall::MovementTypes)?;
        Ok(lock(&self.catalog)?
            .movement_types
            .iter()
            .filter(|t| &t.business_unit_id == business_unit)
            .cloned()
            .collect())
    }

    async fn movement_subtypes(&self, _ctx: &SessionContext, movement_type: &MovementTypeId) -> Result<Vec<MovementSubtype>> {
        self.record(RepositoryCall::MovementSubtypes)?;
        Ok(lock(&self.catalog)?
            .movement_subtypes
            .iter()
            .filter(|s| &s.movement_type_id == movement_type)
            .cloned()
            .collect())
    }

    async fn active_employees(&self, _ctx: &SessionContext) -> Result<Vec<Employee>> {
        self.record(RepositoryCall::ActiveEmployees)?;
        Ok(lock(&self.catalog)?.employees.clone())
    }

    async fn active_equipment(&self, _ctx: &SessionContext) -> Result<Vec<Equipment>> {
        self.record(RepositoryCall::ActiveEquipment)?;
        Ok(lock(&self.catalog)?.equipment.clone())
    }
}
