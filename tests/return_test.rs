use chrono::{NaiveDate, NaiveDateTime};
use robert2::config::BillingSettings;
use robert2::db;
use robert2::domain::reconciliation::{ReturnNotice, ReturnedLine};
use robert2::domain::{
    CreateMaterialInput, CreateUnitInput, DomainError, MaterialRepository, RequestedLine,
    UnitState,
};
use robert2::infrastructure::SeaOrmMaterialRepository;
use robert2::models::material_unit;
use robert2::services::event_service::{self, EventDetails, EventInput};
use robert2::services::return_service;
use sea_orm::{DatabaseConnection, EntityTrait};

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

fn day(d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, d)
        .unwrap()
        .and_hms_opt(8, 30, 0)
        .unwrap()
}

fn returned(material_id: i32, actual: i32, broken: i32) -> ReturnedLine {
    ReturnedLine {
        material_id,
        actual,
        broken,
        broken_units: Vec::new(),
        lost_units: Vec::new(),
    }
}

async fn create_material(db: &DatabaseConnection, reference: &str, is_unitary: bool) -> i32 {
    SeaOrmMaterialRepository::new(db.clone())
        .create(CreateMaterialInput {
            name: format!("Material {}", reference),
            reference: reference.to_string(),
            description: None,
            category_id: None,
            sub_category_id: None,
            park_id: None,
            is_unitary,
            stock_quantity: (!is_unitary).then_some(20),
            out_of_order_quantity: 0,
            rental_price: 12.0,
            replacement_price: None,
        })
        .await
        .expect("Failed to create material")
        .id
}

fn event_input(lines: Vec<(i32, i32)>) -> EventInput {
    EventInput {
        title: "Concert".to_string(),
        reference: None,
        description: None,
        location: Some("Town hall".to_string()),
        start_date: day(1),
        end_date: day(2),
        is_confirmed: true,
        is_billable: true,
        user_id: None,
        beneficiaries: None,
        assignees: None,
        materials: Some(
            lines
                .into_iter()
                .map(|(material_id, quantity)| RequestedLine {
                    material_id,
                    quantity,
                    units: Vec::new(),
                })
                .collect(),
        ),
    }
}

async fn create_event(db: &DatabaseConnection, lines: Vec<(i32, i32)>) -> EventDetails {
    event_service::create_event(db, event_input(lines), &BillingSettings::default())
        .await
        .expect("Failed to create event")
}

async fn update_lines(db: &DatabaseConnection, id: i32, lines: Vec<(i32, i32)>) -> EventDetails {
    event_service::update_event(db, id, event_input(lines), &BillingSettings::default())
        .await
        .expect("Failed to update event")
}

async fn material_counters(db: &DatabaseConnection, id: i32) -> (i32, i32) {
    let material = SeaOrmMaterialRepository::new(db.clone())
        .find_by_id(id)
        .await
        .unwrap()
        .expect("Material should exist");
    (material.out_of_order_quantity, material.lost_quantity)
}

async fn event_details(db: &DatabaseConnection, id: i32) -> EventDetails {
    event_service::get_event(db, id, &BillingSettings::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_complete_return_with_one_broken_item() {
    let db = setup_test_db().await;
    let x = create_material(&db, "X", false).await;
    let event = create_event(&db, vec![(x, 5)]).await;

    let outcome = return_service::reconcile_return(&db, event.event.id, vec![returned(x, 5, 1)])
        .await
        .expect("Return should be accepted");

    assert!(outcome.done);
    assert!(outcome.has_broken);
    assert!(outcome.discrepancies.is_empty());
    assert!(outcome.notices.contains(&ReturnNotice::AllMaterialReturned));
    assert!(outcome.notices.contains(&ReturnNotice::SomeMaterialCameBackBroken));

    assert_eq!(material_counters(&db, x).await, (1, 0));

    let details = event_details(&db, event.event.id).await;
    assert!(details.event.is_return_inventory_done);
    assert_eq!(details.materials[0].quantity_returned, Some(5));
    assert_eq!(details.materials[0].quantity_broken, 1);
}

#[tokio::test]
async fn test_partial_return_reports_missing_items() {
    let db = setup_test_db().await;
    let x = create_material(&db, "X", false).await;
    let event = create_event(&db, vec![(x, 5)]).await;

    let outcome = return_service::reconcile_return(&db, event.event.id, vec![returned(x, 3, 0)])
        .await
        .unwrap();

    assert!(!outcome.done);
    assert_eq!(outcome.discrepancies.len(), 1);
    assert_eq!(outcome.discrepancies[0].missing, 2);
    assert_eq!(outcome.discrepancies[0].surplus, 0);
    assert!(outcome.notices.contains(&ReturnNotice::SomeMaterialIsMissing));

    assert_eq!(material_counters(&db, x).await, (0, 2));
    assert!(!event_details(&db, event.event.id).await.event.is_return_inventory_done);
}

#[tokio::test]
async fn test_resubmitting_is_idempotent_and_overwrites() {
    let db = setup_test_db().await;
    let x = create_material(&db, "X", false).await;
    let event = create_event(&db, vec![(x, 5)]).await;
    let id = event.event.id;

    let first = return_service::reconcile_return(&db, id, vec![returned(x, 4, 2)])
        .await
        .unwrap();
    let second = return_service::reconcile_return(&db, id, vec![returned(x, 4, 2)])
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(material_counters(&db, x).await, (2, 1));

    // Corrected figures replace the previous ones
    return_service::reconcile_return(&db, id, vec![returned(x, 5, 1)])
        .await
        .unwrap();
    assert_eq!(material_counters(&db, x).await, (1, 0));
    assert!(event_details(&db, id).await.event.is_return_inventory_done);
}

#[tokio::test]
async fn test_invalid_return_leaves_store_untouched() {
    let db = setup_test_db().await;
    let x = create_material(&db, "X", false).await;
    let y = create_material(&db, "Y", false).await;
    let event = create_event(&db, vec![(x, 5), (y, 2)]).await;
    let id = event.event.id;

    // Broken more than returned on one line, valid figures on the other
    let result =
        return_service::reconcile_return(&db, id, vec![returned(x, 2, 3), returned(y, 1, 0)])
            .await;
    match result {
        Err(DomainError::Validation(errors)) => {
            assert!(errors.contains(&x.to_string()));
            assert!(!errors.contains(&y.to_string()));
        }
        other => panic!("Expected validation error, got {:?}", other),
    }

    // A line left out is refused too
    assert!(matches!(
        return_service::reconcile_return(&db, id, vec![returned(x, 5, 0)]).await,
        Err(DomainError::Validation(_))
    ));

    assert_eq!(material_counters(&db, x).await, (0, 0));
    assert_eq!(material_counters(&db, y).await, (0, 0));
    let details = event_details(&db, id).await;
    assert!(details.materials.iter().all(|l| l.quantity_returned.is_none()));
    assert!(!details.event.is_return_inventory_done);
}

#[tokio::test]
async fn test_surplus_is_reported_without_blocking() {
    let db = setup_test_db().await;
    let x = create_material(&db, "X", false).await;
    let event = create_event(&db, vec![(x, 2)]).await;

    let outcome = return_service::reconcile_return(&db, event.event.id, vec![returned(x, 3, 0)])
        .await
        .unwrap();

    assert!(!outcome.done);
    assert_eq!(outcome.discrepancies[0].surplus, 1);
    assert_eq!(outcome.discrepancies[0].missing, 0);
}

#[tokio::test]
async fn test_unit_flags_follow_the_return() {
    let db = setup_test_db().await;
    let repo = SeaOrmMaterialRepository::new(db.clone());
    let par = create_material(&db, "PAR", true).await;
    let mut units = Vec::new();
    for serial in ["P-1", "P-2", "P-3"] {
        let unit = repo
            .add_unit(
                par,
                CreateUnitInput {
                    serial_number: serial.to_string(),
                    state: UnitState::Excellent,
                    person_id: None,
                    is_broken: false,
                },
            )
            .await
            .unwrap();
        units.push(unit.id);
    }
    let event = create_event(&db, vec![(par, 3)]).await;
    let id = event.event.id;

    let outcome = return_service::reconcile_return(
        &db,
        id,
        vec![ReturnedLine {
            material_id: par,
            actual: 2,
            broken: 1,
            broken_units: vec![units[0]],
            lost_units: vec![units[2]],
        }],
    )
    .await
    .unwrap();
    assert!(!outcome.done);

    let p1 = material_unit::Entity::find_by_id(units[0]).one(&db).await.unwrap().unwrap();
    let p3 = material_unit::Entity::find_by_id(units[2]).one(&db).await.unwrap().unwrap();
    assert!(p1.is_broken);
    assert!(p3.is_lost);

    // Everything found again: flags set by this event are cleared
    return_service::reconcile_return(&db, id, vec![returned(par, 3, 0)])
        .await
        .unwrap();
    let p1 = material_unit::Entity::find_by_id(units[0]).one(&db).await.unwrap().unwrap();
    let p3 = material_unit::Entity::find_by_id(units[2]).one(&db).await.unwrap().unwrap();
    assert!(!p1.is_broken);
    assert!(!p3.is_lost);

    // Unit count must match the broken figure
    let result = return_service::reconcile_return(
        &db,
        id,
        vec![ReturnedLine {
            material_id: par,
            actual: 3,
            broken: 2,
            broken_units: vec![units[0]],
            lost_units: Vec::new(),
        }],
    )
    .await;
    assert!(matches!(result, Err(DomainError::Validation(_))));
}

#[tokio::test]
async fn test_return_on_unknown_or_trashed_event() {
    let db = setup_test_db().await;
    let x = create_material(&db, "X", false).await;

    assert!(matches!(
        return_service::reconcile_return(&db, 404, vec![returned(x, 1, 0)]).await,
        Err(DomainError::NotFound { .. })
    ));

    let event = create_event(&db, vec![(x, 1)]).await;
    event_service::delete_event(&db, event.event.id).await.unwrap();
    assert!(matches!(
        return_service::reconcile_return(&db, event.event.id, vec![returned(x, 1, 0)]).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_resizing_a_reconciled_line_takes_back_its_return() {
    let db = setup_test_db().await;
    let x = create_material(&db, "X", false).await;
    let event = create_event(&db, vec![(x, 5)]).await;
    let id = event.event.id;

    return_service::reconcile_return(&db, id, vec![returned(x, 4, 1)])
        .await
        .unwrap();
    assert_eq!(material_counters(&db, x).await, (1, 1));

    let updated = update_lines(&db, id, vec![(x, 6)]).await;
    assert_eq!(updated.materials[0].quantity_returned, None);
    assert_eq!(updated.materials[0].quantity_broken, 0);
    assert_eq!(material_counters(&db, x).await, (0, 0));

    // Only the new return counts
    return_service::reconcile_return(&db, id, vec![returned(x, 6, 1)])
        .await
        .unwrap();
    assert_eq!(material_counters(&db, x).await, (1, 0));
}

#[tokio::test]
async fn test_unchanged_line_keeps_its_return() {
    let db = setup_test_db().await;
    let x = create_material(&db, "X", false).await;
    let y = create_material(&db, "Y", false).await;
    let event = create_event(&db, vec![(x, 5), (y, 2)]).await;
    let id = event.event.id;

    return_service::reconcile_return(&db, id, vec![returned(x, 3, 1), returned(y, 2, 0)])
        .await
        .unwrap();

    // Dropping Y leaves X's figures and counters alone
    let updated = update_lines(&db, id, vec![(x, 5)]).await;
    assert_eq!(updated.materials.len(), 1);
    assert_eq!(updated.materials[0].quantity_returned, Some(3));
    assert_eq!(material_counters(&db, x).await, (1, 2));
    assert_eq!(material_counters(&db, y).await, (0, 0));
}

#[tokio::test]
async fn test_removing_a_reconciled_line_takes_back_its_return() {
    let db = setup_test_db().await;
    let x = create_material(&db, "X", false).await;
    let y = create_material(&db, "Y", false).await;
    let event = create_event(&db, vec![(x, 5), (y, 2)]).await;
    let id = event.event.id;

    return_service::reconcile_return(&db, id, vec![returned(x, 5, 0), returned(y, 1, 1)])
        .await
        .unwrap();
    assert_eq!(material_counters(&db, y).await, (1, 1));

    let updated = update_lines(&db, id, vec![(x, 5)]).await;
    assert!(!updated.event.is_return_inventory_done);
    assert_eq!(material_counters(&db, y).await, (0, 0));
}

#[tokio::test]
async fn test_resizing_a_reconciled_unit_line_clears_unit_flags() {
    let db = setup_test_db().await;
    let repo = SeaOrmMaterialRepository::new(db.clone());
    let par = create_material(&db, "PAR", true).await;
    let mut units = Vec::new();
    for serial in ["P-1", "P-2", "P-3"] {
        let unit = repo
            .add_unit(
                par,
                CreateUnitInput {
                    serial_number: serial.to_string(),
                    state: UnitState::default(),
                    person_id: None,
                    is_broken: false,
                },
            )
            .await
            .unwrap();
        units.push(unit.id);
    }
    let event = create_event(&db, vec![(par, 2)]).await;
    let id = event.event.id;

    return_service::reconcile_return(
        &db,
        id,
        vec![ReturnedLine {
            material_id: par,
            actual: 2,
            broken: 1,
            broken_units: vec![units[0]],
            lost_units: Vec::new(),
        }],
    )
    .await
    .unwrap();

    update_lines(&db, id, vec![(par, 3)]).await;
    let p1 = material_unit::Entity::find_by_id(units[0]).one(&db).await.unwrap().unwrap();
    assert!(!p1.is_broken);
}
