use chrono::{Duration, Utc};
use sea_orm::*;

use crate::config::BillingSettings;
use crate::domain::{
    CreateMaterialInput, CreateUnitInput, DomainError, MaterialRepository, RequestedLine,
    UnitState,
};
use crate::infrastructure::SeaOrmMaterialRepository;
use crate::models::material;
use crate::services::directory_service::{
    self, CreateCategoryInput, CreateCompanyInput, CreateParkInput, CreatePersonInput,
};
use crate::services::event_service::{self, AssigneeInput, EventInput};

/// Populates an empty store with a small rental catalog and one upcoming event
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DomainError> {
    if material::Entity::find().count(db).await? > 0 {
        tracing::info!("Store already has materials, skipping demo data");
        return Ok(());
    }

    // 1. Directory
    let warehouse = directory_service::create_park(
        db,
        CreateParkInput {
            name: "Main warehouse".to_owned(),
            address: Some("12 rue des Entrepôts".to_owned()),
            note: None,
        },
    )
    .await?;
    directory_service::create_park(
        db,
        CreateParkInput {
            name: "Stage truck".to_owned(),
            address: None,
            note: Some("Loaded for touring events".to_owned()),
        },
    )
    .await?;

    let sound = directory_service::create_category(
        db,
        CreateCategoryInput {
            name: "Sound".to_owned(),
        },
    )
    .await?;
    let mixers = directory_service::create_sub_category(
        db,
        sound.category.id,
        CreateCategoryInput {
            name: "Mixers".to_owned(),
        },
    )
    .await?;
    let light = directory_service::create_category(
        db,
        CreateCategoryInput {
            name: "Light".to_owned(),
        },
    )
    .await?;

    let company = directory_service::create_company(
        db,
        CreateCompanyInput {
            legal_name: "Testing, Inc".to_owned(),
            phone: Some("+33123456789".to_owned()),
            note: None,
        },
    )
    .await?;
    let client = directory_service::create_person(
        db,
        CreatePersonInput {
            first_name: "Jean".to_owned(),
            last_name: "Fountain".to_owned(),
            email: Some("jean.fountain@example.com".to_owned()),
            phone: None,
            company_id: Some(company.id),
        },
    )
    .await?;
    let technician = directory_service::create_person(
        db,
        CreatePersonInput {
            first_name: "Alex".to_owned(),
            last_name: "Dujardin".to_owned(),
            email: Some("alex.dujardin@example.com".to_owned()),
            phone: Some("+33987654321".to_owned()),
            company_id: None,
        },
    )
    .await?;

    // 2. Catalog
    let materials = SeaOrmMaterialRepository::new(db.clone());
    let console = materials
        .create(CreateMaterialInput {
            name: "Yamaha CL3 console".to_owned(),
            reference: "CL3".to_owned(),
            description: Some("64-channel digital mixing console".to_owned()),
            category_id: Some(sound.category.id),
            sub_category_id: Some(mixers.id),
            park_id: Some(warehouse.id),
            is_unitary: false,
            stock_quantity: Some(5),
            out_of_order_quantity: 1,
            rental_price: 300.0,
            replacement_price: Some(19400.0),
        })
        .await?;
    let cables = materials
        .create(CreateMaterialInput {
            name: "XLR cable 10m".to_owned(),
            reference: "XLR10".to_owned(),
            description: None,
            category_id: Some(sound.category.id),
            sub_category_id: None,
            park_id: Some(warehouse.id),
            is_unitary: false,
            stock_quantity: Some(40),
            out_of_order_quantity: 0,
            rental_price: 2.5,
            replacement_price: Some(15.0),
        })
        .await?;
    let projector = materials
        .create(CreateMaterialInput {
            name: "PAR64 projector".to_owned(),
            reference: "PAR64".to_owned(),
            description: None,
            category_id: Some(light.category.id),
            sub_category_id: None,
            park_id: Some(warehouse.id),
            is_unitary: true,
            stock_quantity: None,
            out_of_order_quantity: 0,
            rental_price: 3.5,
            replacement_price: Some(89.0),
        })
        .await?;
    for (serial, state) in [
        ("PAR64-001", UnitState::Excellent),
        ("PAR64-002", UnitState::StateOfUse),
        ("PAR64-003", UnitState::BrandNew),
        ("PAR64-004", UnitState::Bad),
    ] {
        materials
            .add_unit(
                projector.id,
                CreateUnitInput {
                    serial_number: serial.to_owned(),
                    state,
                    person_id: None,
                    is_broken: false,
                },
            )
            .await?;
    }

    // 3. An event next week
    let start = (Utc::now() + Duration::days(7)).naive_utc();
    event_service::create_event(
        db,
        EventInput {
            title: "Summer festival".to_owned(),
            reference: None,
            description: Some("Main stage".to_owned()),
            location: Some("Gap".to_owned()),
            start_date: start,
            end_date: start + Duration::days(2),
            is_confirmed: true,
            is_billable: true,
            user_id: None,
            beneficiaries: Some(vec![client.id]),
            assignees: Some(vec![AssigneeInput {
                person_id: technician.id,
                position: Some("Sound engineer".to_owned()),
                start_time: None,
                end_time: None,
            }]),
            materials: Some(vec![
                RequestedLine {
                    material_id: console.id,
                    quantity: 2,
                    units: Vec::new(),
                },
                RequestedLine {
                    material_id: cables.id,
                    quantity: 20,
                    units: Vec::new(),
                },
                RequestedLine {
                    material_id: projector.id,
                    quantity: 2,
                    units: Vec::new(),
                },
            ]),
        },
        &BillingSettings::default(),
    )
    .await?;

    Ok(())
}
