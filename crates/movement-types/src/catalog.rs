//! Read-only catalog entries offered to the wizard's forms

use crate::fields::FieldDescriptor;
use crate::ids::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
}

/// Approved quote that a request can be linked to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub client_id: Option<ClientId>,
    pub number: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessUnit {
    pub id: BusinessUnitId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementType {
    pub id: MovementTypeId,
    pub business_unit_id: BusinessUnitId,
    pub name: String,
}

/// Subtype with the dynamic fields it declares for step 2
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementSubtype {
    pub id: MovementSubtypeId,
    pub movement_type_id: MovementTypeId,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub full_name: String,
    #[serde(default)]
    pub position: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: EquipmentId,
    pub name: String,
    #[serde(default)]
    pub plate: Option<String>,
}
