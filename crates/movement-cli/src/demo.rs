//! Full wizard run against the in-memory store

use chrono::{Duration, NaiveTime, Utc};
use movement_core::{
    CachedCatalog, InMemoryMovementRepository, MovementPatch, MovementWizard, ResourceCatalog,
    SessionContext,
};
use movement_types::*;
use std::sync::Arc;

fn seed_catalog(store: &InMemoryMovementRepository) {
    store.add_client(Client {
        id: ClientId::new("cli-1"),
        name: "Minera Los Andes".to_string(),
    });
    store.add_business_unit(BusinessUnit {
        id: BusinessUnitId::new("bu-izaje"),
        name: "Izaje".to_string(),
    });
    store.add_movement_type(MovementType {
        id: MovementTypeId::new("t-grua"),
        business_unit_id: BusinessUnitId::new("bu-izaje"),
        name: "Servicio de grua".to_string(),
    });
    store.add_movement_subtype(MovementSubtype {
        id: MovementSubtypeId::new("s-grua-50"),
        movement_type_id: MovementTypeId::new("t-grua"),
        name: "Grua 50t".to_string(),
        fields: vec![
            FieldDescriptor {
                key: "load_kg".to_string(),
                label: "Carga (kg)".to_string(),
                kind: FieldKind::Number,
                options: Vec::new(),
                required: true,
            },
            FieldDescriptor {
                key: "rigging".to_string(),
                label: "Aparejo".to_string(),
                kind: FieldKind::Select,
                options: vec!["eslinga".to_string(), "cadena".to_string()],
                required: false,
            },
        ],
    });
    for (id, name) in [("E1", "Ana Rojas"), ("E2", "Luis Pardo")] {
        store.add_employee(Employee {
            id: EmployeeId::new(id),
            full_name: name.to_string(),
            position: None,
        });
    }
    store.add_equipment(Equipment {
        id: EquipmentId::new("Q1"),
        name: "Grua Liebherr 50t".to_string(),
        plate: Some("GRU-050".to_string()),
    });
}

fn report(step: WizardStep, state: Option<MovementState>) {
    let state = state.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
    println!("  now at {:<22} estado {}", step.to_string(), state);
}

pub async fn run() -> anyhow::Result<()> {
    let store = Arc::new(InMemoryMovementRepository::new());
    seed_catalog(&store);
    let catalog = Arc::new(CachedCatalog::new(store.clone()));
    let ctx = SessionContext::new(CompanyId::new("demo"), Some(UserId::new("supervisor")));

    let mut wizard = MovementWizard::open(store.clone(), catalog.clone(), ctx.clone(), None).await?;
    println!("Opened new movement draft");
    report(wizard.step(), wizard.state());

    let client = catalog.clients(&ctx).await?.into_iter().next().map(|c| c.id);
    wizard.update(MovementPatch {
        client_id: Some(client),
        requester: Some("Jefe de planta".to_string()),
        subject: Some("Montaje de transformador".to_string()),
        location: Some("Subestacion Norte".to_string()),
        scope: Some("Izaje y posicionamiento".to_string()),
        ..MovementPatch::default()
    })?;
    wizard.advance().await?;
    report(wizard.step(), wizard.state());

    let mut answers = DynamicFields::new();
    answers.insert("load_kg".to_string(), FieldValue::from("18500"));
    answers.insert("rigging".to_string(), FieldValue::from("eslinga"));
    wizard.update(MovementPatch {
        business_unit_id: Some(Some(BusinessUnitId::new("bu-izaje"))),
        movement_type_id: Some(Some(MovementTypeId::new("t-grua"))),
        movement_subtype_id: Some(Some(MovementSubtypeId::new("s-grua-50"))),
        dynamic_fields: Some(answers),
        ..MovementPatch::default()
    })?;
    wizard.advance().await?;
    report(wizard.step(), wizard.state());

    let start = Utc::now() + Duration::days(1);
    wizard.update(MovementPatch {
        scheduled_start: Some(Some(start)),
        scheduled_end: Some(Some(start + Duration::hours(6))),
        supervisor_id: Some(Some(EmployeeId::new("E2"))),
        ..MovementPatch::default()
    })?;
    let assignments = wizard.assignments_mut()?;
    for employee in catalog.active_employees(&ctx).await? {
        assignments.add_employee(employee.id, EmployeeRole::Operator);
    }
    assignments.set_role(&EmployeeId::new("E2"), EmployeeRole::Lead);
    assignments.add_equipment(EquipmentId::new("Q1"));
    wizard.advance().await?;
    report(wizard.step(), wizard.state());

    let ledger = wizard.ledger_mut()?;
    ledger.set_row(
        0,
        TaskEntry::new("Traslado a sitio", NaiveTime::from_hms_opt(7, 0, 0), NaiveTime::from_hms_opt(8, 15, 0)),
    )?;
    let row = ledger.add_row();
    ledger.set_row(
        row,
        TaskEntry::new("Izaje", NaiveTime::from_hms_opt(8, 30, 0), NaiveTime::from_hms_opt(11, 0, 0)),
    )?;
    ledger.set_odometer(&EquipmentId::new("Q1"), OdometerReading::new(48210, 48262))?;
    wizard.update(MovementPatch {
        operator_observations: Some("Viento moderado, sin incidentes".to_string()),
        ..MovementPatch::default()
    })?;
    wizard.advance().await?;
    report(wizard.step(), wizard.state());

    let operators: Vec<AssignmentId> = wizard.ratings().operators().iter().map(|o| o.id.clone()).collect();
    let ratings = wizard.ratings_mut()?;
    for operator in &operators {
        ratings.rate(operator, 5)?;
    }
    wizard.update(MovementPatch {
        supervisor_observations: Some("Trabajo conforme".to_string()),
        ..MovementPatch::default()
    })?;
    let completion = wizard.complete().await?;
    report(wizard.step(), wizard.state());

    println!(
        "Movement {} completed with {} ratings ({} data service calls)",
        completion.movement_id,
        completion.ratings_submitted,
        store.calls().len()
    );
    Ok(())
}
