use chrono::{NaiveTime, TimeZone, Utc};
use movement_core::clients::{InMemoryMovementRepository, RepositoryCall};
use movement_core::workflow::{MovementPatch, MovementWizard};
use movement_core::{CloseRequest, MovementError, MovementRepository, SessionContext};
use movement_types::*;
use std::sync::Arc;

type Wizard = MovementWizard<InMemoryMovementRepository, InMemoryMovementRepository>;

fn ctx() -> SessionContext {
    SessionContext::new(CompanyId::new("acme"), Some(UserId::new("sup-user")))
}

fn store() -> Arc<InMemoryMovementRepository> {
    Arc::new(InMemoryMovementRepository::new())
}

async fn open(repo: &Arc<InMemoryMovementRepository>, id: Option<&MovementId>) -> Wizard {
    MovementWizard::open(repo.clone(), repo.clone(), ctx(), id)
        .await
        .expect("Failed to open wizard")
}

fn subject(text: &str) -> MovementPatch {
    MovementPatch {
        subject: Some(text.to_string()),
        ..MovementPatch::default()
    }
}

fn operator(employee: &str) -> NewEmployeeAssignment {
    NewEmployeeAssignment {
        employee_id: EmployeeId::new(employee),
        role: EmployeeRole::Operator,
    }
}

fn assignment_of(wizard: &Wizard, employee: &str) -> AssignmentId {
    wizard
        .ratings()
        .operators()
        .iter()
        .find(|o| o.employee_id.as_str() == employee)
        .map(|o| o.id.clone())
        .expect("operator slot missing")
}

#[tokio::test]
async fn test_new_movement_is_created_on_first_advance() {
    let repo = store();
    let mut wizard = open(&repo, None).await;

    assert!(wizard.movement_id().is_none());
    assert_eq!(wizard.step(), WizardStep::Request);
    assert!(wizard.state().is_none());
    assert_eq!(wizard.movement().request.date, chrono::Local::now().date_naive());

    wizard.update(subject("Service X")).unwrap();
    let next = wizard.advance().await.unwrap();

    assert_eq!(next, WizardStep::Classification);
    assert_eq!(wizard.step(), WizardStep::Classification);
    assert_eq!(wizard.state(), Some(MovementState::Generated));
    assert_eq!(repo.writes(), vec![RepositoryCall::CreateMovement]);

    let id = wizard.movement_id().cloned().unwrap();
    let stored = repo.stored_movement(&id).unwrap();
    assert_eq!(stored.request.subject, "Service X");
    assert_eq!(stored.state, Some(MovementState::Generated));
    assert!(!wizard.is_dirty());
}

#[tokio::test]
async fn test_empty_subject_never_reaches_repository() {
    let repo = store();
    let mut wizard = open(&repo, None).await;

    let err = wizard.advance().await.unwrap_err();
    assert!(err.is_validation());

    wizard.update(subject("   ")).unwrap();
    assert!(wizard.advance().await.unwrap_err().is_validation());

    assert!(repo.calls().is_empty());
    assert_eq!(wizard.step(), WizardStep::Request);
    assert!(wizard.movement_id().is_none());
}

#[tokio::test]
async fn test_open_resumes_at_step_implied_by_estado() {
    let expected = [
        (MovementState::Generated, WizardStep::Request),
        (MovementState::ResourceAssignment, WizardStep::Classification),
        (MovementState::Planned, WizardStep::Planning),
        (MovementState::InExecution, WizardStep::Execution),
        (MovementState::OperationalClose, WizardStep::Closeout),
        (MovementState::Completed, WizardStep::Closeout),
        (MovementState::Cancelled, WizardStep::Request),
    ];

    let repo = store();
    for (state, step) in expected {
        let id = repo.seed_movement(&ctx(), state);
        let wizard = open(&repo, Some(&id)).await;
        assert_eq!(wizard.step(), step, "estado {} should resume at {}", state, step);
        assert_eq!(wizard.state(), Some(state));
        assert!(!wizard.is_dirty());
    }
}

#[tokio::test]
async fn test_open_unknown_or_foreign_movement_is_not_found() {
    let repo = store();
    let other = SessionContext::new(CompanyId::new("other"), None);
    let foreign = repo.seed_movement(&other, MovementState::Planned);

    let result = MovementWizard::open(repo.clone(), repo.clone(), ctx(), Some(&foreign)).await;
    assert!(matches!(result, Err(MovementError::NotFound(_))));

    let missing = MovementId::new("missing");
    let result = MovementWizard::open(repo.clone(), repo.clone(), ctx(), Some(&missing)).await;
    assert!(matches!(result, Err(MovementError::NotFound(_))));
}

#[tokio::test]
async fn test_resume_in_execution_loads_earlier_steps() {
    let repo = store();
    let mut movement = Movement::draft(chrono::NaiveDate::from_ymd_opt(2026, 4, 20).unwrap());
    movement.state = Some(MovementState::InExecution);
    movement.request.subject = "Traslado de grua".to_string();
    movement.classification.business_unit_id = Some(BusinessUnitId::new("bu-1"));
    movement.planning.supervisor_id = Some(EmployeeId::new("sup-1"));
    let id = repo.insert_movement(&ctx(), movement);

    repo.seed_employees(&id, &[operator("E1")]);
    let equipment = repo.seed_equipment(&id, &[EquipmentId::new("Q1")]);
    repo.seed_tasks(&id, vec![TaskEntry::new("Carga", NaiveTime::from_hms_opt(8, 0, 0), None)]);

    let wizard = open(&repo, Some(&id)).await;

    assert_eq!(wizard.step(), WizardStep::Execution);
    assert_eq!(wizard.movement().request.subject, "Traslado de grua");
    assert_eq!(wizard.movement().classification.business_unit_id, Some(BusinessUnitId::new("bu-1")));
    assert_eq!(wizard.movement().planning.supervisor_id, Some(EmployeeId::new("sup-1")));
    assert!(wizard.assignments().contains_employee(&EmployeeId::new("E1")));
    assert!(wizard.assignments().contains_equipment(&EquipmentId::new("Q1")));
    assert_eq!(wizard.ledger().rows()[0].description, "Carga");
    assert_eq!(wizard.ledger().assignment_for(&EquipmentId::new("Q1")), Some(&equipment[0].id));
    assert!(repo.writes().is_empty());
}

#[tokio::test]
async fn test_back_has_floor_and_never_calls_repository() {
    let repo = store();
    let mut wizard = open(&repo, None).await;
    assert_eq!(wizard.back(), WizardStep::Request);
    assert!(repo.calls().is_empty());

    let id = repo.seed_movement(&ctx(), MovementState::Planned);
    let mut wizard = open(&repo, Some(&id)).await;
    repo.clear_calls();

    assert_eq!(wizard.back(), WizardStep::Classification);
    assert_eq!(wizard.back(), WizardStep::Request);
    assert_eq!(wizard.back(), WizardStep::Request);
    assert!(repo.calls().is_empty());
    assert_eq!(wizard.state(), Some(MovementState::Planned));
}

#[tokio::test]
async fn test_toggled_off_employee_reconciles_to_empty_set() {
    let repo = store();
    let id = repo.seed_movement(&ctx(), MovementState::Planned);
    let mut wizard = open(&repo, Some(&id)).await;
    assert_eq!(wizard.step(), WizardStep::Planning);

    let assignments = wizard.assignments_mut().unwrap();
    assert!(assignments.toggle_employee(EmployeeId::new("E1"), EmployeeRole::Operator));
    assert!(!assignments.toggle_employee(EmployeeId::new("E1"), EmployeeRole::Operator));

    wizard.advance().await.unwrap();

    assert_eq!(repo.count(RepositoryCall::AssignEmployees), 1);
    assert!(repo.get_employee_assignments(&ctx(), &id).await.unwrap().is_empty());
    assert_eq!(wizard.step(), WizardStep::Execution);
}

#[tokio::test]
async fn test_failed_planning_commit_keeps_step_and_estado_then_retries() {
    let repo = store();
    let id = repo.seed_movement(&ctx(), MovementState::ResourceAssignment);
    let mut wizard = open(&repo, Some(&id)).await;
    wizard.advance().await.unwrap();
    assert_eq!(wizard.step(), WizardStep::Planning);
    assert_eq!(wizard.state(), Some(MovementState::ResourceAssignment));

    wizard
        .assignments_mut()
        .unwrap()
        .add_employee(EmployeeId::new("E1"), EmployeeRole::Operator);
    repo.fail_next(RepositoryCall::AssignEmployees, "connection reset");

    let err = wizard.advance().await.unwrap_err();
    match &err {
        MovementError::Commit { step, operation, .. } => {
            assert_eq!(*step, WizardStep::Planning);
            assert_eq!(operation, "assigning employees");
        }
        other => panic!("expected commit error, got {:?}", other),
    }
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(wizard.step(), WizardStep::Planning);
    assert_eq!(wizard.state(), Some(MovementState::ResourceAssignment));
    assert_eq!(repo.stored_movement(&id).unwrap().state, Some(MovementState::ResourceAssignment));
    assert!(wizard.assignments().contains_employee(&EmployeeId::new("E1")));
    assert!(wizard.is_dirty());

    assert_eq!(wizard.advance().await.unwrap(), WizardStep::Execution);
    assert_eq!(wizard.state(), Some(MovementState::Planned));
    assert_eq!(repo.stored_movement(&id).unwrap().state, Some(MovementState::Planned));
    assert_eq!(repo.get_employee_assignments(&ctx(), &id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failure_on_final_state_write_leaves_estado_unchanged() {
    let repo = store();
    let id = repo.seed_movement(&ctx(), MovementState::Planned);
    let mut wizard = open(&repo, Some(&id)).await;
    wizard.advance().await.unwrap();
    assert_eq!(wizard.step(), WizardStep::Execution);

    repo.fail_next(RepositoryCall::UpdateMovement, "timeout");
    let err = wizard.advance().await.unwrap_err();

    assert!(err.to_string().contains("updating execution log"));
    assert_eq!(wizard.step(), WizardStep::Execution);
    assert_eq!(wizard.state(), Some(MovementState::Planned));
    assert_eq!(repo.stored_movement(&id).unwrap().state, Some(MovementState::Planned));
    assert!(wizard.movement().execution.submitted_at.is_none());
}

#[tokio::test]
async fn test_failed_odometer_write_keeps_execution_step_then_retries() {
    let repo = store();
    let id = repo.seed_movement(&ctx(), MovementState::Planned);
    let equipment = repo.seed_equipment(&id, &[EquipmentId::new("Q1")]);
    let mut wizard = open(&repo, Some(&id)).await;
    wizard.advance().await.unwrap();
    assert_eq!(wizard.step(), WizardStep::Execution);

    let ledger = wizard.ledger_mut().unwrap();
    ledger
        .set_row(0, TaskEntry::new("Izaje", NaiveTime::from_hms_opt(8, 0, 0), None))
        .unwrap();
    ledger
        .set_odometer(&EquipmentId::new("Q1"), OdometerReading::new(500, 560))
        .unwrap();
    repo.fail_next(RepositoryCall::UpdateEquipmentAssignment, "gateway timeout");

    let err = wizard.advance().await.unwrap_err();
    match &err {
        MovementError::Commit { step, operation, .. } => {
            assert_eq!(*step, WizardStep::Execution);
            assert_eq!(operation, &format!("recording odometer for {}", equipment[0].id));
        }
        other => panic!("expected commit error, got {:?}", other),
    }
    assert_eq!(wizard.step(), WizardStep::Execution);
    assert_eq!(wizard.state(), Some(MovementState::Planned));
    assert_eq!(repo.stored_movement(&id).unwrap().state, Some(MovementState::Planned));
    assert_eq!(wizard.ledger().odometer(&EquipmentId::new("Q1")), Some(OdometerReading::new(500, 560)));
    assert!(wizard.movement().execution.submitted_at.is_none());
    assert!(wizard.is_dirty());

    assert_eq!(wizard.advance().await.unwrap(), WizardStep::Closeout);
    assert_eq!(wizard.state(), Some(MovementState::InExecution));
    let stored = repo.get_equipment_assignments(&ctx(), &id).await.unwrap();
    assert_eq!(stored[0].odometer.distance(), 60);
    assert_eq!(repo.get_tasks(&ctx(), &id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_removed_equipment_unlinks_task_rows() {
    let repo = store();
    let id = repo.seed_movement(&ctx(), MovementState::InExecution);
    let equipment = repo.seed_equipment(&id, &[EquipmentId::new("Q1")]);
    let mut keyed = TaskEntry::new("Izaje", NaiveTime::from_hms_opt(8, 0, 0), None);
    keyed.equipment_assignment_id = Some(equipment[0].id.clone());
    repo.seed_tasks(&id, vec![keyed]);

    let mut wizard = open(&repo, Some(&id)).await;
    assert_eq!(wizard.ledger().rows()[0].equipment_assignment_id, Some(equipment[0].id.clone()));

    wizard.back();
    assert_eq!(wizard.step(), WizardStep::Planning);
    assert!(wizard.assignments_mut().unwrap().remove_equipment(&EquipmentId::new("Q1")));
    wizard.advance().await.unwrap();

    assert_eq!(wizard.ledger().rows()[0].description, "Izaje");
    assert_eq!(wizard.ledger().rows()[0].equipment_assignment_id, None);

    wizard.advance().await.unwrap();
    let tasks = repo.get_tasks(&ctx(), &id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].equipment_assignment_id, None);
}

#[tokio::test]
async fn test_failed_create_keeps_draft_unsaved() {
    let repo = store();
    let mut wizard = open(&repo, None).await;
    wizard.update(subject("Montaje")).unwrap();
    repo.fail_next(RepositoryCall::CreateMovement, "service unavailable");

    let err = wizard.advance().await.unwrap_err();
    assert!(err.to_string().contains("creating the movement"));
    assert!(wizard.movement_id().is_none());
    assert_eq!(wizard.step(), WizardStep::Request);

    wizard.advance().await.unwrap();
    assert!(wizard.movement_id().is_some());
    assert_eq!(repo.count(RepositoryCall::CreateMovement), 2);
}

#[tokio::test]
async fn test_complete_submits_only_live_operator_ratings() {
    let repo = store();
    let id = repo.seed_movement(&ctx(), MovementState::OperationalClose);
    repo.seed_employees(
        &id,
        &[
            operator("E1"),
            operator("E2"),
            NewEmployeeAssignment {
                employee_id: EmployeeId::new("E3"),
                role: EmployeeRole::Driver,
            },
        ],
    );

    let mut wizard = open(&repo, Some(&id)).await;
    assert_eq!(wizard.step(), WizardStep::Closeout);
    assert_eq!(wizard.ratings().ratings().len(), 2);

    let e1 = assignment_of(&wizard, "E1");
    let e2 = assignment_of(&wizard, "E2");
    let ratings = wizard.ratings_mut().unwrap();
    ratings.rate(&e1, 5).unwrap();
    ratings.comment(&e1, "Excelente").unwrap();
    ratings.rate(&e2, 4).unwrap();

    // E2 is unassigned elsewhere while the closeout form is open
    repo.seed_employees(&id, &[operator("E1")]);

    let completion = wizard.complete().await.unwrap();

    assert_eq!(completion.movement_id, id);
    assert_eq!(completion.ratings_submitted, 1);
    let stored = repo.stored_ratings(&id);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].operator_assignment_id, e1);
    assert_eq!(stored[0].comment, "Excelente");
    assert_eq!(repo.stored_validator(&id), Some(UserId::new("sup-user")));

    let movement = repo.stored_movement(&id).unwrap();
    assert_eq!(movement.state, Some(MovementState::Completed));
    assert_eq!(movement.closeout.validated_by, Some(UserId::new("sup-user")));
    assert!(movement.closeout.validated_at.is_some());
    assert!(wizard.is_closed());
    assert_eq!(repo.writes().last(), Some(&RepositoryCall::UpdateMovement));
}

#[tokio::test]
async fn test_unset_ratings_are_not_submitted() {
    let repo = store();
    let id = repo.seed_movement(&ctx(), MovementState::OperationalClose);
    repo.seed_employees(&id, &[operator("E1"), operator("E2")]);

    let mut wizard = open(&repo, Some(&id)).await;
    let e2 = assignment_of(&wizard, "E2");
    wizard.ratings_mut().unwrap().rate(&e2, 3).unwrap();

    let completion = wizard.complete().await.unwrap();
    assert_eq!(completion.ratings_submitted, 1);
    assert_eq!(repo.stored_ratings(&id)[0].operator_assignment_id, e2);
}

#[tokio::test]
async fn test_complete_outside_closeout_is_precondition() {
    let repo = store();
    let mut wizard = open(&repo, None).await;
    wizard.update(subject("Montaje")).unwrap();

    let err = wizard.complete().await.unwrap_err();
    assert!(matches!(err, MovementError::Precondition(_)));
    assert!(repo.calls().is_empty());

    let id = repo.seed_movement(&ctx(), MovementState::OperationalClose);
    let mut wizard = open(&repo, Some(&id)).await;
    let err = wizard.advance().await.unwrap_err();
    assert!(matches!(err, MovementError::Precondition(_)));
}

#[tokio::test]
async fn test_completed_movement_is_immutable() {
    let repo = store();
    let id = repo.seed_movement(&ctx(), MovementState::Completed);
    let mut wizard = open(&repo, Some(&id)).await;

    assert!(wizard.is_read_only());
    assert!(matches!(
        wizard.update(subject("Edit")),
        Err(MovementError::Immutable(MovementState::Completed))
    ));
    assert!(wizard.assignments_mut().is_err());
    assert!(matches!(wizard.complete().await, Err(MovementError::Immutable(_))));
    assert!(matches!(wizard.cancel().await, Err(MovementError::Immutable(_))));
    assert!(repo.writes().is_empty());
}

#[tokio::test]
async fn test_cancel_writes_cancelado_and_closes() {
    let repo = store();
    let id = repo.seed_movement(&ctx(), MovementState::Planned);
    let mut wizard = open(&repo, Some(&id)).await;

    wizard.cancel().await.unwrap();

    assert_eq!(repo.writes(), vec![RepositoryCall::UpdateMovement]);
    assert_eq!(repo.stored_movement(&id).unwrap().state, Some(MovementState::Cancelled));
    assert!(wizard.is_closed());
    assert!(matches!(
        wizard.advance().await,
        Err(MovementError::Immutable(MovementState::Cancelled))
    ));

    let reopened = open(&repo, Some(&id)).await;
    assert_eq!(reopened.step(), WizardStep::Request);
    assert!(reopened.is_read_only());
}

#[tokio::test]
async fn test_cancel_unsaved_draft_is_precondition() {
    let repo = store();
    let mut wizard = open(&repo, None).await;

    assert!(matches!(wizard.cancel().await, Err(MovementError::Precondition(_))));
    assert!(repo.calls().is_empty());
    assert!(!wizard.is_closed());
}

#[tokio::test]
async fn test_close_with_unsaved_changes_needs_confirmation() {
    let repo = store();
    let mut wizard = open(&repo, None).await;
    wizard.update(subject("Montaje")).unwrap();

    assert_eq!(
        wizard.request_close(),
        CloseRequest::UnsavedChanges {
            dirty_steps: vec![WizardStep::Request]
        }
    );
    assert!(!wizard.is_closed());

    wizard.discard_and_close();
    assert!(wizard.is_closed());
    assert_eq!(wizard.movement().request.subject, "");
    assert!(repo.calls().is_empty());
}

#[tokio::test]
async fn test_close_after_commit_is_immediate() {
    let repo = store();
    let mut wizard = open(&repo, None).await;
    wizard.update(subject("Montaje")).unwrap();
    wizard.advance().await.unwrap();

    assert_eq!(wizard.request_close(), CloseRequest::Closed);
    assert!(wizard.is_closed());
    assert!(matches!(wizard.update(subject("Late")), Err(MovementError::Precondition(_))));
}

#[tokio::test]
async fn test_dynamic_field_mismatch_blocks_classification_commit() {
    let repo = store();
    repo.add_movement_subtype(MovementSubtype {
        id: MovementSubtypeId::new("s-1"),
        movement_type_id: MovementTypeId::new("t-1"),
        name: "Grua 50t".to_string(),
        fields: vec![FieldDescriptor {
            key: "load_kg".to_string(),
            label: "Carga (kg)".to_string(),
            kind: FieldKind::Number,
            options: Vec::new(),
            required: true,
        }],
    });

    let mut wizard = open(&repo, None).await;
    wizard.update(subject("Izaje")).unwrap();
    wizard.advance().await.unwrap();

    let mut answers = DynamicFields::new();
    answers.insert("load_kg".to_string(), FieldValue::from("heavy"));
    answers.insert("stale_key".to_string(), FieldValue::from("x"));
    wizard
        .update(MovementPatch {
            business_unit_id: Some(Some(BusinessUnitId::new("bu-1"))),
            movement_type_id: Some(Some(MovementTypeId::new("t-1"))),
            movement_subtype_id: Some(Some(MovementSubtypeId::new("s-1"))),
            dynamic_fields: Some(answers),
            ..MovementPatch::default()
        })
        .unwrap();
    repo.clear_calls();

    let err = wizard.advance().await.unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("Carga (kg) must be a number"));
    assert!(repo.writes().is_empty());
    assert_eq!(wizard.step(), WizardStep::Classification);

    let mut fixed = DynamicFields::new();
    fixed.insert("load_kg".to_string(), FieldValue::from("1200"));
    wizard
        .update(MovementPatch {
            dynamic_fields: Some(fixed),
            ..MovementPatch::default()
        })
        .unwrap();
    wizard.advance().await.unwrap();

    let id = wizard.movement_id().cloned().unwrap();
    let stored = repo.stored_movement(&id).unwrap();
    assert_eq!(stored.state, Some(MovementState::ResourceAssignment));
    assert_eq!(stored.classification.dynamic_fields.len(), 1);
    assert_eq!(stored.classification.dynamic_fields["load_kg"], FieldValue::Number(1200.0));
}

#[tokio::test]
async fn test_recommitting_earlier_step_keeps_later_estado() {
    let repo = store();
    let id = repo.seed_movement(&ctx(), MovementState::InExecution);
    let mut wizard = open(&repo, Some(&id)).await;

    wizard.back();
    wizard.back();
    assert_eq!(wizard.step(), WizardStep::Classification);
    wizard.advance().await.unwrap();

    assert_eq!(wizard.step(), WizardStep::Planning);
    assert_eq!(wizard.state(), Some(MovementState::InExecution));
    assert_eq!(repo.stored_movement(&id).unwrap().state, Some(MovementState::InExecution));
}

#[tokio::test]
async fn test_full_run_through_all_steps() {
    let repo = store();
    let mut wizard = open(&repo, None).await;

    wizard
        .update(MovementPatch {
            subject: Some("Traslado de transformador".to_string()),
            requester: Some("Planta Norte".to_string()),
            location: Some("Km 12".to_string()),
            ..MovementPatch::default()
        })
        .unwrap();
    wizard.advance().await.unwrap();
    let id = wizard.movement_id().cloned().unwrap();

    wizard
        .update(MovementPatch {
            business_unit_id: Some(Some(BusinessUnitId::new("bu-1"))),
            ..MovementPatch::default()
        })
        .unwrap();
    wizard.advance().await.unwrap();
    assert_eq!(wizard.state(), Some(MovementState::ResourceAssignment));

    let start = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();
    wizard
        .update(MovementPatch {
            scheduled_start: Some(Some(start)),
            supervisor_id: Some(Some(EmployeeId::new("sup-1"))),
            ..MovementPatch::default()
        })
        .unwrap();
    let assignments = wizard.assignments_mut().unwrap();
    assignments.add_employee(EmployeeId::new("E1"), EmployeeRole::Operator);
    assignments.add_employee(EmployeeId::new("E2"), EmployeeRole::Helper);
    assignments.add_equipment(EquipmentId::new("Q1"));
    repo.clear_calls();
    wizard.advance().await.unwrap();
    assert_eq!(wizard.state(), Some(MovementState::Planned));
    assert_eq!(repo.writes().last(), Some(&RepositoryCall::UpdateMovement));

    let ledger = wizard.ledger_mut().unwrap();
    ledger
        .set_row(0, TaskEntry::new("Carga", NaiveTime::from_hms_opt(8, 0, 0), NaiveTime::from_hms_opt(9, 30, 0)))
        .unwrap();
    ledger.add_row();
    ledger
        .set_odometer(&EquipmentId::new("Q1"), OdometerReading::new(1000, 1085))
        .unwrap();
    wizard
        .update(MovementPatch {
            operator_observations: Some("Sin novedad".to_string()),
            ..MovementPatch::default()
        })
        .unwrap();
    wizard.advance().await.unwrap();
    assert_eq!(wizard.step(), WizardStep::Closeout);
    assert_eq!(wizard.state(), Some(MovementState::InExecution));
    assert!(wizard.movement().execution.submitted_at.is_some());

    let tasks = repo.get_tasks(&ctx(), &id).await.unwrap();
    assert_eq!(tasks.len(), 1, "blank rows are not persisted");
    let equipment = repo.get_equipment_assignments(&ctx(), &id).await.unwrap();
    assert_eq!(equipment[0].odometer.distance(), 85);

    assert_eq!(wizard.ratings().ratings().len(), 1);
    let e1 = assignment_of(&wizard, "E1");
    wizard.ratings_mut().unwrap().rate(&e1, 4).unwrap();
    wizard
        .update(MovementPatch {
            supervisor_observations: Some("Conforme".to_string()),
            ..MovementPatch::default()
        })
        .unwrap();
    let completion = wizard.complete().await.unwrap();

    assert_eq!(completion.ratings_submitted, 1);
    let stored = repo.stored_movement(&id).unwrap();
    assert_eq!(stored.state, Some(MovementState::Completed));
    assert_eq!(stored.request.location, "Km 12");
    assert_eq!(stored.planning.scheduled_start, Some(start));
    assert_eq!(stored.execution.operator_observations, "Sin novedad");
    assert_eq!(stored.closeout.supervisor_observations, "Conforme");
}
