/// Data service and configuration constants

/// Environment prefix for configuration overrides
pub const CONFIG_ENV_PREFIX: &str = "MOVEMENTS";

/// Default database schema exposed by the data service
pub const DEFAULT_SCHEMA: &str = "public";

/// Default HTTP timeout for data service calls
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Table names on the hosted data service
pub const MOVEMENTS_TABLE: &str = "movimientos";
pub const EMPLOYEE_ASSIGNMENTS_TABLE: &str = "movimiento_empleados";
pub const EQUIPMENT_ASSIGNMENTS_TABLE: &str = "movimiento_equipos";
pub const TASKS_TABLE: &str = "movimiento_tareas";
pub const RATINGS_TABLE: &str = "movimiento_calificaciones";
pub const CLIENTS_TABLE: &str = "clientes";
pub const QUOTES_TABLE: &str = "cotizaciones";
pub const BUSINESS_UNITS_TABLE: &str = "unidades_negocio";
pub const MOVEMENT_TYPES_TABLE: &str = "tipos_movimiento";
pub const MOVEMENT_SUBTYPES_TABLE: &str = "subtipos_movimiento";
pub const EMPLOYEES_TABLE: &str = "empleados";
pub const EQUIPMENT_TABLE: &str = "equipos";

/// Quote status that can be linked to a movement
pub const APPROVED_QUOTE_STATUS: &str = "aprobada";
