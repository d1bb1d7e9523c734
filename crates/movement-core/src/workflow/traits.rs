//! Data-service boundaries consumed by the movement wizard
//!
//! Both traits are narrow request/response interfaces with no business logic.
//! Every call takes the session context explicitly, so a controller can be
//! driven against a stub store in tests.

use async_trait::async_trait;
use crate::error::Result;
use crate::types::SessionContext;
use movement_types::*;

/// Persistence of movements and their sub-records
#[async_trait]
pub trait MovementRepository: Send + Sync {
    /// Insert a new movement; the store assigns the id
    async fn create_movement(&self, ctx: &SessionContext, movement: &Movement) -> Result<Movement>;

    /// Load a movement, `None` if it does not exist for this tenant
    async fn get_movement(&self, ctx: &SessionContext, id: &MovementId) -> Result<Option<Movement>>;

    /// Merge the present slices of `update` and return the stored movement
    async fn update_movement(&self, ctx: &SessionContext, id: &MovementId, update: &MovementUpdate) -> Result<Movement>;

    async fn delete_movement(&self, ctx: &SessionContext, id: &MovementId) -> Result<()>;

    /// Replace the movement's employee assignments with `employees`
    async fn assign_employees(&self, ctx: &SessionContext, id: &MovementId, employees: &[NewEmployeeAssignment]) -> Result<()>;

    /// Replace the movement's equipment assignments with `equipment`
    async fn assign_equipment(&self, ctx: &SessionContext, id: &MovementId, equipment: &[EquipmentId]) -> Result<()>;

    /// Replace the movement's task ledger with `tasks`
    async fn save_tasks(&self, ctx: &SessionContext, id: &MovementId, tasks: &[TaskEntry]) -> Result<()>;

    /// Record odometer readings on one equipment assignment
    async fn update_equipment_assignment(&self, ctx: &SessionContext, assignment_id: &AssignmentId, odometer: OdometerReading) -> Result<()>;

    /// Upsert closeout ratings, keyed by operator assignment
    async fn save_ratings(&self, ctx: &SessionContext, id: &MovementId, ratings: &[OperatorRating], validator: Option<&UserId>) -> Result<()>;

    async fn get_employee_assignments(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<EmployeeAssignment>>;

    async fn get_equipment_assignments(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<EquipmentAssignment>>;

    async fn get_tasks(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<TaskEntry>>;

    /// Employee assignments with the operator role
    async fn get_operator_assignments(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<EmployeeAssignment>>;

    async fn get_ratings(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<OperatorRating>>;
}

/// Read-only lookups that feed the wizard's option lists
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    async fn clients(&self, ctx: &SessionContext) -> Result<Vec<Client>>;

    /// Approved quotes, optionally narrowed to one client
    async fn approved_quotes(&self, ctx: &SessionContext, client: Option<&ClientId>) -> Result<Vec<Quote>>;

    async fn business_units(&self, ctx: &SessionContext) -> Result<Vec<BusinessUnit>>;

    async fn movement_types(&self, ctx: &SessionContext, business_unit: &BusinessUnitId) -> Result<Vec<MovementType>>;

    /// Subtypes of a type, with their dynamic field declarations
    async fn movement_subtypes(&self, ctx: &SessionContext, movement_type: &MovementTypeId) -> Result<Vec<MovementSubtype>>;

    async fn active_employees(&self, ctx: &SessionContext) -> Result<Vec<Employee>>;

    async fn active_equipment(&self, ctx: &SessionContext) -> Result<Vec<Equipment>>;
}
