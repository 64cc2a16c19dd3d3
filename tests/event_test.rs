use chrono::{NaiveDate, NaiveDateTime};
use robert2::config::BillingSettings;
use robert2::db;
use robert2::domain::{CreateMaterialInput, DomainError, MaterialRepository, RequestedLine};
use robert2::infrastructure::SeaOrmMaterialRepository;
use robert2::services::directory_service::{self, CreatePersonInput};
use robert2::services::event_service::{
    self, AssigneeInput, DuplicateEventInput, EventDetails, EventInput,
};
use sea_orm::DatabaseConnection;

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

fn at(d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 7, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn event_input(title: &str) -> EventInput {
    EventInput {
        title: title.to_string(),
        reference: None,
        description: Some("Open air".to_string()),
        location: Some("Gap".to_string()),
        start_date: at(1, 8),
        end_date: at(5, 20),
        is_confirmed: true,
        is_billable: true,
        user_id: None,
        beneficiaries: None,
        assignees: None,
        materials: None,
    }
}

fn technician(person_id: i32, start: Option<NaiveDateTime>, end: Option<NaiveDateTime>) -> AssigneeInput {
    AssigneeInput {
        person_id,
        position: Some("Sound engineer".to_string()),
        start_time: start,
        end_time: end,
    }
}

async fn create_person(db: &DatabaseConnection, first: &str, last: &str) -> i32 {
    directory_service::create_person(
        db,
        CreatePersonInput {
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: None,
            phone: None,
            company_id: None,
        },
    )
    .await
    .expect("Failed to create person")
    .id
}

async fn create_bulk(db: &DatabaseConnection, reference: &str, stock: i32) -> i32 {
    SeaOrmMaterialRepository::new(db.clone())
        .create(CreateMaterialInput {
            name: format!("Material {}", reference),
            reference: reference.to_string(),
            description: None,
            category_id: None,
            sub_category_id: None,
            park_id: None,
            is_unitary: false,
            stock_quantity: Some(stock),
            out_of_order_quantity: 0,
            rental_price: 10.0,
            replacement_price: None,
        })
        .await
        .expect("Failed to create material")
        .id
}

async fn create(db: &DatabaseConnection, input: EventInput) -> Result<EventDetails, DomainError> {
    event_service::create_event(db, input, &BillingSettings::default()).await
}

fn assignee_errors(result: Result<EventDetails, DomainError>) -> Vec<String> {
    match result {
        Err(DomainError::Validation(errors)) => {
            errors.get("assignees").map(<[String]>::to_vec).unwrap_or_default()
        }
        other => panic!("Expected validation error, got {:?}", other.map(|e| e.event.id)),
    }
}

#[tokio::test]
async fn test_unknown_persons_are_rejected() {
    let db = setup_test_db().await;
    let known = create_person(&db, "Alex", "Dujardin").await;

    let mut input = event_input("Festival");
    input.beneficiaries = Some(vec![known, 404]);
    input.assignees = Some(vec![technician(405, None, None)]);

    match create(&db, input).await {
        Err(DomainError::Validation(errors)) => {
            assert!(errors.get("beneficiaries").unwrap()[0].contains("#404"));
            assert!(errors.get("assignees").unwrap()[0].contains("#405"));
        }
        other => panic!("Expected validation error, got {:?}", other.map(|e| e.event.id)),
    }
    assert!(event_service::list_events(&db, Default::default())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_technician_periods_are_checked() {
    let db = setup_test_db().await;
    let tech = create_person(&db, "Alex", "Dujardin").await;

    // Only one bound given
    let mut input = event_input("Partial");
    input.assignees = Some(vec![technician(tech, Some(at(2, 8)), None)]);
    let errors = assignee_errors(create(&db, input).await);
    assert!(errors[0].contains("both start and end times are required"));

    // Reversed
    let mut input = event_input("Reversed");
    input.assignees = Some(vec![technician(tech, Some(at(3, 18)), Some(at(3, 8)))]);
    let errors = assignee_errors(create(&db, input).await);
    assert!(errors[0].contains("end time must be later"));

    // Starts before the event
    let mut input = event_input("Too early");
    input.assignees = Some(vec![technician(tech, Some(at(1, 6)), Some(at(2, 18)))]);
    let errors = assignee_errors(create(&db, input).await);
    assert!(errors[0].contains("inside the event"));

    // Ends after the event
    let mut input = event_input("Too late");
    input.assignees = Some(vec![technician(tech, Some(at(4, 8)), Some(at(6, 8)))]);
    let errors = assignee_errors(create(&db, input).await);
    assert!(errors[0].contains("inside the event"));
}

#[tokio::test]
async fn test_people_round_trip_and_replacement() {
    let db = setup_test_db().await;
    let client = create_person(&db, "Jean", "Fountain").await;
    let other_client = create_person(&db, "Claire", "Aubert").await;
    let tech = create_person(&db, "Alex", "Dujardin").await;

    let mut input = event_input("Festival");
    input.beneficiaries = Some(vec![client, other_client]);
    input.assignees = Some(vec![
        technician(tech, Some(at(1, 8)), Some(at(5, 20))),
        technician(client, None, None),
    ]);
    let event = create(&db, input).await.expect("Event should be valid");

    let details = event_service::get_event(&db, event.event.id, &BillingSettings::default())
        .await
        .unwrap();
    let names: Vec<&str> = details
        .beneficiaries
        .iter()
        .map(|p| p.last_name.as_str())
        .collect();
    assert_eq!(names, vec!["Aubert", "Fountain"]);
    assert_eq!(details.assignees.len(), 2);
    assert_eq!(details.assignees[0].person.id, tech);
    assert_eq!(details.assignees[0].position.as_deref(), Some("Sound engineer"));
    assert_eq!(details.assignees[0].start_time, Some(at(1, 8)));
    assert_eq!(details.assignees[0].end_time, Some(at(5, 20)));
    assert_eq!(details.assignees[1].start_time, None);

    // Left out on update: kept as they are
    let kept = event_service::update_event(
        &db,
        event.event.id,
        event_input("Festival, day two"),
        &BillingSettings::default(),
    )
    .await
    .unwrap();
    assert_eq!(kept.beneficiaries.len(), 2);
    assert_eq!(kept.assignees.len(), 2);

    // Given on update: replaced
    let mut input = event_input("Festival, day two");
    input.beneficiaries = Some(vec![client]);
    input.assignees = Some(Vec::new());
    let replaced = event_service::update_event(&db, event.event.id, input, &BillingSettings::default())
        .await
        .unwrap();
    assert_eq!(replaced.beneficiaries.len(), 1);
    assert_eq!(replaced.beneficiaries[0].id, client);
    assert!(replaced.assignees.is_empty());
}

#[tokio::test]
async fn test_duplicate_copies_people_and_lines_to_a_new_period() {
    let db = setup_test_db().await;
    let client = create_person(&db, "Jean", "Fountain").await;
    let tech = create_person(&db, "Alex", "Dujardin").await;
    let m = create_bulk(&db, "M", 5).await;

    let mut input = event_input("Festival");
    input.beneficiaries = Some(vec![client]);
    input.assignees = Some(vec![technician(tech, Some(at(2, 8)), Some(at(3, 20)))]);
    input.materials = Some(vec![RequestedLine {
        material_id: m,
        quantity: 4,
        units: Vec::new(),
    }]);
    let source = create(&db, input).await.unwrap();

    // Overlapping the source: only one item left
    let result = event_service::duplicate_event(
        &db,
        source.event.id,
        DuplicateEventInput {
            start_date: at(4, 0),
            end_date: at(8, 23),
            user_id: None,
        },
        &BillingSettings::default(),
    )
    .await;
    assert!(matches!(
        result,
        Err(DomainError::InsufficientStock {
            requested: 4,
            available: 1,
            ..
        })
    ));

    let copy = event_service::duplicate_event(
        &db,
        source.event.id,
        DuplicateEventInput {
            start_date: at(10, 0),
            end_date: at(12, 23),
            user_id: Some(7),
        },
        &BillingSettings::default(),
    )
    .await
    .expect("A later period is free");

    assert_ne!(copy.event.id, source.event.id);
    assert_eq!(copy.event.title, "Festival");
    assert_eq!(copy.event.location.as_deref(), Some("Gap"));
    assert_eq!(copy.event.start_date, at(10, 0));
    assert_eq!(copy.event.user_id, Some(7));
    assert!(!copy.event.is_confirmed);
    assert!(!copy.event.is_return_inventory_done);
    assert_eq!(copy.beneficiaries[0].id, client);
    assert_eq!(copy.assignees[0].person.id, tech);
    assert_eq!(copy.assignees[0].start_time, None);
    assert_eq!(copy.materials.len(), 1);
    assert_eq!(copy.materials[0].quantity, 4);
    assert_eq!(copy.materials[0].quantity_returned, None);

    let events = event_service::list_events(&db, Default::default()).await.unwrap();
    assert_eq!(events.len(), 2);
}

#[tokio::test]
async fn test_duplicate_of_trashed_or_unknown_event() {
    let db = setup_test_db().await;
    let period = || DuplicateEventInput {
        start_date: at(10, 0),
        end_date: at(11, 0),
        user_id: None,
    };

    assert!(matches!(
        event_service::duplicate_event(&db, 404, period(), &BillingSettings::default()).await,
        Err(DomainError::NotFound { .. })
    ));

    let event = create(&db, event_input("Festival")).await.unwrap();
    event_service::delete_event(&db, event.event.id).await.unwrap();
    assert!(matches!(
        event_service::duplicate_event(&db, event.event.id, period(), &BillingSettings::default())
            .await,
        Err(DomainError::NotFound { .. })
    ));
}
