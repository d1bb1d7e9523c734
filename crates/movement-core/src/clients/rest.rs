//! REST adapters for the hosted data service
//!
//! The data service exposes each table at `/rest/v1/<table>` with
//! PostgREST conventions: `col=eq.value` filters, `select=alias:column`
//! projections and `Prefer` headers for write behaviour. Every row carries the
//! tenant's `empresa_id`, and every query is filtered by it.

use crate::config::DataServiceConfig;
use crate::constants::*;
use crate::error::{MovementError, Result};
use crate::types::SessionContext;
use crate::workflow::traits::{MovementRepository, ResourceCatalog};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use movement_types::*;
use reqwest::{Client as HttpClient, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

/// Thin PostgREST client shared by the repository and the catalog
pub struct RestClient {
    config: DataServiceConfig,
    http_client: HttpClient,
}

/// `col=eq.value` filter operand
pub fn eq(value: impl Display) -> String {
    format!("eq.{}", value)
}

/// `col=in.(...)` filter operand with quoted members
pub fn in_list<T: Display>(values: &[T]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| format!("\"{}\"", v)).collect();
    format!("in.({})", quoted.join(","))
}

impl RestClient {
    pub fn new(config: DataServiceConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, http_client })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url.trim_end_matches('/'), table)
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let profile_header = if method == Method::GET {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };
        self.http_client
            .request(method, self.table_url(table))
            .header("apikey", &self.config.api_key)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header(profile_header, &self.config.schema)
    }

    async fn send(&self, builder: RequestBuilder, table: &str) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        log::error!("Data service call on {} failed with {}: {}", table, status, body);
        Err(MovementError::Repository(format!("{} on {}: {}", status, table, body)))
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>> {
        log::debug!("GET {} select={} {:?}", table, columns, filters);
        let builder = self
            .request(Method::GET, table)
            .query(&[("select", columns)])
            .query(filters);
        let response = self.send(builder, table).await?;
        Ok(response.json().await?)
    }

    /// Insert rows and return them as stored
    pub async fn insert<B, T>(&self, table: &str, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        log::debug!("POST {}", table);
        let builder = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.send(builder, table).await?;
        Ok(response.json().await?)
    }

    /// Insert or merge rows on the `on_conflict` column
    pub async fn upsert<B: Serialize + ?Sized>(&self, table: &str, on_conflict: &str, body: &B) -> Result<()> {
        log::debug!("UPSERT {} on {}", table, on_conflict);
        let builder = self
            .request(Method::POST, table)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(body);
        self.send(builder, table).await?;
        Ok(())
    }

    /// Patch matching rows and return them as stored
    pub async fn patch<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &Value,
    ) -> Result<Vec<T>> {
        log::debug!("PATCH {} {:?}", table, filters);
        let builder = self
            .request(Method::PATCH, table)
            .query(filters)
            .header("Prefer", "return=representation")
            .json(body);
        let response = self.send(builder, table).await?;
        Ok(response.json().await?)
    }

    pub async fn delete(&self, table: &str, filters: &[(&str, String)]) -> Result<()> {
        log::debug!("DELETE {} {:?}", table, filters);
        let builder = self.request(Method::DELETE, table).query(filters);
        self.send(builder, table).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct MovementRow {
    id: MovementId,
    estado: Option<MovementState>,
    fecha: NaiveDate,
    cliente_id: Option<ClientId>,
    cotizacion_id: Option<QuoteId>,
    solicitante: Option<String>,
    asunto: Option<String>,
    ubicacion: Option<String>,
    alcance: Option<String>,
    unidad_negocio_id: Option<BusinessUnitId>,
    tipo_movimiento_id: Option<MovementTypeId>,
    subtipo_movimiento_id: Option<MovementSubtypeId>,
    campos_dinamicos: Option<DynamicFields>,
    inicio_programado: Option<DateTime<Utc>>,
    fin_programado: Option<DateTime<Utc>>,
    supervisor_id: Option<EmployeeId>,
    recibo_url: Option<String>,
    observaciones_operador: Option<String>,
    enviado_at: Option<DateTime<Utc>>,
    observaciones_supervisor: Option<String>,
    validado_at: Option<DateTime<Utc>>,
    validado_por: Option<UserId>,
}

impl From<MovementRow> for Movement {
    fn from(row: MovementRow) -> Self {
        Movement {
            id: Some(row.id),
            state: row.estado,
            request: RequestDetails {
                date: row.fecha,
                client_id: row.cliente_id,
                quote_id: row.cotizacion_id,
                requester: row.solicitante.unwrap_or_default(),
                subject: row.asunto.unwrap_or_default(),
                location: row.ubicacion.unwrap_or_default(),
                scope: row.alcance.unwrap_or_default(),
            },
            classification: Classification {
                business_unit_id: row.unidad_negocio_id,
                movement_type_id: row.tipo_movimiento_id,
                movement_subtype_id: row.subtipo_movimiento_id,
                dynamic_fields: row.campos_dinamicos.unwrap_or_default(),
            },
            planning: Planning {
                scheduled_start: row.inicio_programado,
                scheduled_end: row.fin_programado,
                supervisor_id: row.supervisor_id,
            },
            execution: ExecutionLog {
                receipt_image: row.recibo_url,
                operator_observations: row.observaciones_operador.unwrap_or_default(),
                submitted_at: row.enviado_at,
            },
            closeout: Closeout {
                supervisor_observations: row.observaciones_supervisor.unwrap_or_default(),
                validated_at: row.validado_at,
                validated_by: row.validado_por,
            },
        }
    }
}

fn request_columns(request: &RequestDetails, columns: &mut Map<String, Value>) {
    columns.insert("fecha".into(), json!(request.date));
    columns.insert("cliente_id".into(), json!(request.client_id));
    columns.insert("cotizacion_id".into(), json!(request.quote_id));
    columns.insert("solicitante".into(), json!(request.requester));
    columns.insert("asunto".into(), json!(request.subject));
    columns.insert("ubicacion".into(), json!(request.location));
    columns.insert("alcance".into(), json!(request.scope));
}

fn classification_columns(classification: &Classification, columns: &mut Map<String, Value>) {
    columns.insert("unidad_negocio_id".into(), json!(classification.business_unit_id));
    columns.insert("tipo_movimiento_id".into(), json!(classification.movement_type_id));
    columns.insert("subtipo_movimiento_id".into(), json!(classification.movement_subtype_id));
    columns.insert("campos_dinamicos".into(), json!(classification.dynamic_fields));
}

fn planning_columns(planning: &Planning, columns: &mut Map<String, Value>) {
    columns.insert("inicio_programado".into(), json!(planning.scheduled_start));
    columns.insert("fin_programado".into(), json!(planning.scheduled_end));
    columns.insert("supervisor_id".into(), json!(planning.supervisor_id));
}

fn execution_columns(execution: &ExecutionLog, columns: &mut Map<String, Value>) {
    columns.insert("recibo_url".into(), json!(execution.receipt_image));
    columns.insert("observaciones_operador".into(), json!(execution.operator_observations));
    columns.insert("enviado_at".into(), json!(execution.submitted_at));
}

fn closeout_columns(closeout: &Closeout, columns: &mut Map<String, Value>) {
    columns.insert("observaciones_supervisor".into(), json!(closeout.supervisor_observations));
    columns.insert("validado_at".into(), json!(closeout.validated_at));
    columns.insert("validado_por".into(), json!(closeout.validated_by));
}

/// Columns written by a partial update; absent slices are omitted
fn update_columns(update: &MovementUpdate) -> Map<String, Value> {
    let mut columns = Map::new();
    if let Some(state) = update.state {
        columns.insert("estado".into(), json!(state));
    }
    if let Some(request) = &update.request {
        request_columns(request, &mut columns);
    }
    if let Some(classification) = &update.classification {
        classification_columns(classification, &mut columns);
    }
    if let Some(planning) = &update.planning {
        planning_columns(planning, &mut columns);
    }
    if let Some(execution) = &update.execution {
        execution_columns(execution, &mut columns);
    }
    if let Some(closeout) = &update.closeout {
        closeout_columns(closeout, &mut columns);
    }
    columns
}

fn insert_columns(ctx: &SessionContext, movement: &Movement) -> Map<String, Value> {
    let mut columns = Map::new();
    columns.insert("empresa_id".into(), json!(ctx.company_id));
    columns.insert("estado".into(), json!(movement.state));
    request_columns(&movement.request, &mut columns);
    classification_columns(&movement.classification, &mut columns);
    planning_columns(&movement.planning, &mut columns);
    execution_columns(&movement.execution, &mut columns);
    closeout_columns(&movement.closeout, &mut columns);
    columns
}

#[derive(Debug, Deserialize)]
struct EquipmentAssignmentRow {
    id: AssignmentId,
    equipo_id: EquipmentId,
    odometro_inicio: Option<i64>,
    odometro_fin: Option<i64>,
}

impl From<EquipmentAssignmentRow> for EquipmentAssignment {
    fn from(row: EquipmentAssignmentRow) -> Self {
        EquipmentAssignment {
            id: row.id,
            equipment_id: row.equipo_id,
            odometer: OdometerReading::new(
                row.odometro_inicio.unwrap_or_default(),
                row.odometro_fin.unwrap_or_default(),
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TaskRow {
    descripcion: Option<String>,
    hora_inicio: Option<NaiveTime>,
    hora_fin: Option<NaiveTime>,
    movimiento_equipo_id: Option<AssignmentId>,
}

impl From<TaskRow> for TaskEntry {
    fn from(row: TaskRow) -> Self {
        TaskEntry {
            description: row.descripcion.unwrap_or_default(),
            start: row.hora_inicio,
            end: row.hora_fin,
            equipment_assignment_id: row.movimiento_equipo_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatingRow {
    movimiento_empleado_id: AssignmentId,
    calificacion: Option<u8>,
    comentario: Option<String>,
}

impl From<RatingRow> for OperatorRating {
    fn from(row: RatingRow) -> Self {
        OperatorRating {
            operator_assignment_id: row.movimiento_empleado_id,
            rating: row.calificacion.unwrap_or(OperatorRating::UNSET),
            comment: row.comentario.unwrap_or_default(),
        }
    }
}

const EMPLOYEE_ASSIGNMENT_COLUMNS: &str = "id,employee_id:empleado_id,role:rol";
const EQUIPMENT_ASSIGNMENT_COLUMNS: &str = "id,equipo_id,odometro_inicio,odometro_fin";

/// Movement repository backed by the hosted data service
pub struct RestMovementRepository {
    client: Arc<RestClient>,
}

impl RestMovementRepository {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    fn scope<'a>(ctx: &SessionContext, column: &'a str, value: impl Display) -> [(&'a str, String); 2] {
        [("empresa_id", eq(&ctx.company_id)), (column, eq(value))]
    }
}

#[async_trait]
impl MovementRepository for RestMovementRepository {
    async fn create_movement(&self, ctx: &SessionContext, movement: &Movement) -> Result<Movement> {
        let rows: Vec<MovementRow> = self
            .client
            .insert(MOVEMENTS_TABLE, &Value::Object(insert_columns(ctx, movement)))
            .await?;
        rows.into_iter()
            .next()
            .map(Movement::from)
            .ok_or_else(|| MovementError::Repository("insert returned no movement".to_string()))
    }

    async fn get_movement(&self, ctx: &SessionContext, id: &MovementId) -> Result<Option<Movement>> {
        let rows: Vec<MovementRow> = self
            .client
            .select(MOVEMENTS_TABLE, "*", &Self::scope(ctx, "id", id))
            .await?;
        Ok(rows.into_iter().next().map(Movement::from))
    }

    async fn update_movement(&self, ctx: &SessionContext, id: &MovementId, update: &MovementUpdate) -> Result<Movement> {
        let rows: Vec<MovementRow> = self
            .client
            .patch(MOVEMENTS_TABLE, &Self::scope(ctx, "id", id), &Value::Object(update_columns(update)))
            .await?;
        rows.into_iter()
            .next()
            .map(Movement::from)
            .ok_or_else(|| MovementError::NotFound(format!("movement {}", id)))
    }

    async fn delete_movement(&self, ctx: &SessionContext, id: &MovementId) -> Result<()> {
        self.client.delete(MOVEMENTS_TABLE, &Self::scope(ctx, "id", id)).await
    }

    async fn assign_employees(&self, ctx: &SessionContext, id: &MovementId, employees: &[NewEmployeeAssignment]) -> Result<()> {
        let existing = self.get_employee_assignments(ctx, id).await?;

        let removed: Vec<&AssignmentId> = existing
            .iter()
            .filter(|e| !employees.iter().any(|w| w.employee_id == e.employee_id))
            .map(|e| &e.id)
            .collect();
        if !removed.is_empty() {
            self.client
                .delete(EMPLOYEE_ASSIGNMENTS_TABLE, &[("empresa_id", eq(&ctx.company_id)), ("id", in_list(&removed))])
                .await?;
        }

        for wanted in employees {
            if let Some(current) = existing.iter().find(|e| e.employee_id == wanted.employee_id && e.role != wanted.role) {
                let _: Vec<Value> = self
                    .client
                    .patch(EMPLOYEE_ASSIGNMENTS_TABLE, &Self::scope(ctx, "id", &current.id), &json!({"rol": wanted.role}))
                    .await?;
            }
        }

        let added: Vec<Value> = employees
            .iter()
            .filter(|w| !existing.iter().any(|e| e.employee_id == w.employee_id))
            .map(|w| {
                json!({
                    "empresa_id": ctx.company_id,
                    "movimiento_id": id,
                    "empleado_id": w.employee_id,
                    "rol": w.role,
                })
            })
            .collect();
        if !added.is_empty() {
            let _: Vec<Value> = self.client.insert(EMPLOYEE_ASSIGNMENTS_TABLE, &added).await?;
        }
        Ok(())
    }

    async fn assign_equipment(&self, ctx: &SessionContext, id: &MovementId, equipment: &[EquipmentId]) -> Result<()> {
        let existing = self.get_equipment_assignments(ctx, id).await?;

        let removed: Vec<&AssignmentId> = existing
            .iter()
            .filter(|e| !equipment.contains(&e.equipment_id))
            .map(|e| &e.id)
            .collect();
        if !removed.is_empty() {
            self.client
                .delete(EQUIPMENT_ASSIGNMENTS_TABLE, &[("empresa_id", eq(&ctx.company_id)), ("id", in_list(&removed))])
                .await?;
        }

        let added: Vec<Value> = equipment
            .iter()
            .filter(|w| !existing.iter().any(|e| &e.equipment_id == *w))
            .map(|w| {
                json!({
                    "empresa_id": ctx.company_id,
                    "movimiento_id": id,
                    "equipo_id": w,
                    "odometro_inicio": 0,
                    "odometro_fin": 0,
                })
            })
            .collect();
        if !added.is_empty() {
            let _: Vec<Value> = self.client.insert(EQUIPMENT_ASSIGNMENTS_TABLE, &added).await?;
        }
        Ok(())
    }

    async fn save_tasks(&self, ctx: &SessionContext, id: &MovementId, tasks: &[TaskEntry]) -> Result<()> {
        self.client
            .delete(TASKS_TABLE, &Self::scope(ctx, "movimiento_id", id))
            .await?;
        if tasks.is_empty() {
            return Ok(());
        }

        let rows: Vec<Value> = tasks
            .iter()
            .enumerate()
            .map(|(position, task)| {
                json!({
                    "empresa_id": ctx.company_id,
                    "movimiento_id": id,
                    "orden": position,
                    "descripcion": task.description,
                    "hora_inicio": task.start,
                    "hora_fin": task.end,
                    "movimiento_equipo_id": task.equipment_assignment_id,
                })
            })
            .collect();
        let _: Vec<Value> = self.client.insert(TASKS_TABLE, &rows).await?;
        Ok(())
    }

    async fn update_equipment_assignment(&self, ctx: &SessionContext, assignment_id: &AssignmentId, odometer: OdometerReading) -> Result<()> {
        let body = json!({"odometro_inicio": odometer.start, "odometro_fin": odometer.end});
        let rows: Vec<Value> = self
            .client
            .patch(EQUIPMENT_ASSIGNMENTS_TABLE, &Self::scope(ctx, "id", assignment_id), &body)
            .await?;
        if rows.is_empty() {
            return Err(MovementError::NotFound(format!("equipment assignment {}", assignment_id)));
        }
        Ok(())
    }

    async fn save_ratings(&self, ctx: &SessionContext, id: &MovementId, ratings: &[OperatorRating], validator: Option<&UserId>) -> Result<()> {
        if ratings.is_empty() {
            return Ok(());
        }
        let rows: Vec<Value> = ratings
            .iter()
            .map(|rating| {
                json!({
                    "empresa_id": ctx.company_id,
                    "movimiento_id": id,
                    "movimiento_empleado_id": rating.operator_assignment_id,
                    "calificacion": rating.rating,
                    "comentario": rating.comment,
                    "validado_por": validator,
                })
            })
            .collect();
        self.client
            .upsert(RATINGS_TABLE, "movimiento_empleado_id", &rows)
            .await
    }

    async fn get_employee_assignments(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<EmployeeAssignment>> {
        self.client
            .select(EMPLOYEE_ASSIGNMENTS_TABLE, EMPLOYEE_ASSIGNMENT_COLUMNS, &Self::scope(ctx, "movimiento_id", id))
            .await
    }

    async fn get_equipment_assignments(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<EquipmentAssignment>> {
        let rows: Vec<EquipmentAssignmentRow> = self
            .client
            .select(EQUIPMENT_ASSIGNMENTS_TABLE, EQUIPMENT_ASSIGNMENT_COLUMNS, &Self::scope(ctx, "movimiento_id", id))
            .await?;
        Ok(rows.into_iter().map(EquipmentAssignment::from).collect())
    }

    async fn get_tasks(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<TaskEntry>> {
        let [company, movement] = Self::scope(ctx, "movimiento_id", id);
        let rows: Vec<TaskRow> = self
            .client
            .select(
                TASKS_TABLE,
                "descripcion,hora_inicio,hora_fin,movimiento_equipo_id",
                &[company, movement, ("order", "orden.asc".to_string())],
            )
            .await?;
        Ok(rows.into_iter().map(TaskEntry::from).collect())
    }

    async fn get_operator_assignments(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<EmployeeAssignment>> {
        let [company, movement] = Self::scope(ctx, "movimiento_id", id);
        self.client
            .select(
                EMPLOYEE_ASSIGNMENTS_TABLE,
                EMPLOYEE_ASSIGNMENT_COLUMNS,
                &[company, movement, ("rol", eq(EmployeeRole::Operator))],
            )
            .await
    }

    async fn get_ratings(&self, ctx: &SessionContext, id: &MovementId) -> Result<Vec<OperatorRating>> {
        let rows: Vec<RatingRow> = self
            .client
            .select(
                RATINGS_TABLE,
                "movimiento_empleado_id,calificacion,comentario",
                &Self::scope(ctx, "movimiento_id", id),
            )
            .await?;
        Ok(rows.into_iter().map(OperatorRating::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct QuoteRow {
    id: QuoteId,
    cliente_id: Option<ClientId>,
    numero: Option<String>,
    descripcion: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubtypeRow {
    id: MovementSubtypeId,
    tipo_movimiento_id: MovementTypeId,
    nombre: String,
    campos: Option<Vec<FieldDescriptor>>,
}

/// Catalog lookups backed by the hosted data service
pub struct RestCatalog {
    client: Arc<RestClient>,
}

impl RestCatalog {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }

    fn company(ctx: &SessionContext) -> (&'static str, String) {
        ("empresa_id", eq(&ctx.company_id))
    }
}

#[async_trait]
impl ResourceCatalog for RestCatalog {
    async fn clients(&self, ctx: &SessionContext) -> Result<Vec<Client>> {
        self.client
            .select(CLIENTS_TABLE, "id,name:nombre", &[Self::company(ctx), ("order", "nombre.asc".to_string())])
            .await
    }

    async fn approved_quotes(&self, ctx: &SessionContext, client: Option<&ClientId>) -> Result<Vec<Quote>> {
        let mut filters = vec![Self::company(ctx), ("estado", eq(APPROVED_QUOTE_STATUS))];
        if let Some(client) = client {
            filters.push(("cliente_id", eq(client)));
        }
        let rows: Vec<QuoteRow> = self
            .client
            .select(QUOTES_TABLE, "id,cliente_id,numero,descripcion", &filters)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| Quote {
                id: row.id,
                client_id: row.cliente_id,
                number: row.numero.unwrap_or_default(),
                description: row.descripcion.unwrap_or_default(),
            })
            .collect())
    }

    async fn business_units(&self, ctx: &SessionContext) -> Result<Vec<BusinessUnit>> {
        self.client
            .select(BUSINESS_UNITS_TABLE, "id,name:nombre", &[Self::company(ctx)])
            .await
    }

    async fn movement_types(&self, ctx: &SessionContext, business_unit: &BusinessUnitId) -> Result<Vec<MovementType>> {
        self.client
            .select(
                MOVEMENT_TYPES_TABLE,
                "id,business_unit_id:unidad_negocio_id,name:nombre",
                &[Self::company(ctx), ("unidad_negocio_id", eq(business_unit))],
            )
            .await
    }

    async fn movement_subtypes(&self, ctx: &SessionContext, movement_type: &MovementTypeId) -> Result<Vec<MovementSubtype>> {
        let rows: Vec<SubtypeRow> = self
            .client
            .select(
                MOVEMENT_SUBTYPES_TABLE,
                "id,tipo_movimiento_id,nombre,campos",
                &[Self::company(ctx), ("tipo_movimiento_id", eq(movement_type))],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| MovementSubtype {
                id: row.id,
                movement_type_id: row.tipo_movimiento_id,
                name: row.nombre,
                fields: row.campos.unwrap_or_default(),
            })
            .collect())
    }

    async fn active_employees(&self, ctx: &SessionContext) -> Result<Vec<Employee>> {
        self.client
            .select(
                EMPLOYEES_TABLE,
                "id,full_name:nombre_completo,position:cargo",
                &[Self::company(ctx), ("activo", eq(true))],
            )
            .await
    }

    async fn active_equipment(&self, ctx: &SessionContext) -> Result<Vec<Equipment>> {
        self.client
            .select(
                EQUIPMENT_TABLE,
                "id,name:nombre,plate:placa",
                &[Self::company(ctx), ("activo", eq(true))],
            )
            .await
    }
}
