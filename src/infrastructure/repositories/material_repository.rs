//! SeaORM implementation of MaterialRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::availability::peak_commitment;
use crate::domain::{
    CreateMaterialInput, CreateUnitInput, DateRange, DeleteOutcome, DomainError, FieldErrors,
    Material, MaterialFilter, MaterialRepository, Unit, UpdateMaterialInput, UpdateUnitInput,
};
use crate::models::event::{self as event_model, Entity as EventEntity};
use crate::models::event_material::{self as event_material_model, Entity as EventMaterialEntity};
use crate::models::event_material_unit::{self, Entity as EventMaterialUnitEntity};
use crate::models::material::{self, ActiveModel, Column, Entity as MaterialEntity};
use crate::models::material_unit::{self, Entity as UnitEntity};

/// SeaORM-based implementation of MaterialRepository
pub struct SeaOrmMaterialRepository {
    db: DatabaseConnection,
}

impl SeaOrmMaterialRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn load(&self, id: i32) -> Result<material::Model, DomainError> {
        MaterialEntity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(DomainError::not_found("material", id))
    }

    async fn load_unit(
        &self,
        material_id: i32,
        unit_id: i32,
    ) -> Result<material_unit::Model, DomainError> {
        UnitEntity::find_by_id(unit_id)
            .filter(material_unit::Column::MaterialId.eq(material_id))
            .one(&self.db)
            .await?
            .ok_or(DomainError::not_found("unit", unit_id))
    }

    async fn with_units(&self, model: material::Model) -> Result<Material, DomainError> {
        let units = UnitEntity::find()
            .filter(material_unit::Column::MaterialId.eq(model.id))
            .order_by_asc(material_unit::Column::SerialNumber)
            .all(&self.db)
            .await?;
        Ok(to_material(model, units))
    }
    /// Warns when the bulk capacity left is under what upcoming events hold.
    /// The update goes through anyway; those events then report missing materials.
    async fn warn_if_overbooked(&self, model: &material::Model) -> Result<(), DomainError> {
        let Some(stock_quantity) = model.stock_quantity else {
            return Ok(());
        };
        if model.is_unitary {
            return Ok(());
        }

        let now = chrono::Utc::now().naive_utc();
        let bookings = EventMaterialEntity::find()
            .filter(event_material_model::Column::MaterialId.eq(model.id))
            .find_also_related(EventEntity)
            .filter(event_model::Column::DeletedAt.is_null())
            .filter(event_model::Column::EndDate.gte(now))
            .all(&self.db)
            .await?
            .into_iter()
            .filter_map(|(line, event)| {
                let event = event?;
                let period = DateRange::new(event.start_date, event.end_date).ok()?;
                Some((period, line.quantity))
            })
            .collect::<Vec<_>>();

        let capacity = stock_quantity - model.out_of_order_quantity;
        let peak = peak_commitment(&bookings);
        if capacity < peak {
            tracing::warn!(
                "Material #{} now has {} item(s) usable but upcoming events hold up to {}",
                model.id,
                capacity,
                peak
            );
        }
        Ok(())
    }
}

pub(crate) fn to_unit(model: material_unit::Model) -> Unit {
    Unit {
        id: model.id,
        material_id: model.material_id,
        serial_number: model.serial_number,
        is_broken: model.is_broken,
        is_lost: model.is_lost,
        person_id: model.person_id,
        state: model.state.parse().unwrap_or_default(),
    }
}

pub(crate) fn to_material(model: material::Model, mut units: Vec<material_unit::Model>) -> Material {
    units.sort_by(|a, b| a.serial_number.cmp(&b.serial_number));
    let stock_quantity = if model.is_unitary {
        units.len() as i32
    } else {
        model.stock_quantity.unwrap_or(0)
    };

    Material {
        id: model.id,
        name: model.name,
        reference: model.reference,
        description: model.description,
        category_id: model.category_id,
        sub_category_id: model.sub_category_id,
        park_id: model.park_id,
        is_unitary: model.is_unitary,
        stock_quantity,
        out_of_order_quantity: model.out_of_order_quantity,
        lost_quantity: model.lost_quantity,
        rental_price: model.rental_price,
        replacement_price: model.replacement_price,
        is_deleted: model.deleted_at.is_some(),
        units: units.into_iter().map(to_unit).collect(),
    }
}

fn check_quantities(
    is_unitary: bool,
    stock_quantity: Option<i32>,
    out_of_order_quantity: i32,
    errors: &mut FieldErrors,
) {
    if is_unitary {
        if stock_quantity.is_some() {
            errors.add(
                "stock_quantity",
                "Unit-tracked materials take their stock from their units",
            );
        }
    } else {
        match stock_quantity {
            None => errors.add("stock_quantity", "Stock quantity is required"),
            Some(q) if q < 0 => errors.add("stock_quantity", "Stock quantity cannot be negative"),
            Some(q) if out_of_order_quantity > q => errors.add(
                "out_of_order_quantity",
                "Out-of-order quantity cannot exceed stock quantity",
            ),
            Some(_) => {}
        }
    }
    if out_of_order_quantity < 0 {
        errors.add(
            "out_of_order_quantity",
            "Out-of-order quantity cannot be negative",
        );
    }
}

fn check_required(field: &str, value: &str, errors: &mut FieldErrors) {
    if value.trim().is_empty() {
        errors.add(field, "This field is required");
    }
}

#[async_trait]
impl MaterialRepository for SeaOrmMaterialRepository {
    async fn find_all(&self, filter: MaterialFilter) -> Result<Vec<Material>, DomainError> {
        let mut query = MaterialEntity::find();

        query = if filter.deleted {
            query.filter(Column::DeletedAt.is_not_null())
        } else {
            query.filter(Column::DeletedAt.is_null())
        };
        if let Some(park_id) = filter.park_id {
            query = query.filter(Column::ParkId.eq(park_id));
        }
        if let Some(category_id) = filter.category_id {
            query = query.filter(Column::CategoryId.eq(category_id));
        }

        let materials = query
            .order_by_asc(Column::Name)
            .order_by_asc(Column::Id)
            .find_with_related(UnitEntity)
            .all(&self.db)
            .await?;

        Ok(materials
            .into_iter()
            .map(|(material, units)| to_material(material, units))
            .collect())
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Material>, DomainError> {
        match MaterialEntity::find_by_id(id).one(&self.db).await? {
            Some(model) => Ok(Some(self.with_units(model).await?)),
            None => Ok(None),
        }
    }

    async fn create(&self, input: CreateMaterialInput) -> Result<Material, DomainError> {
        let mut errors = FieldErrors::new();
        check_required("name", &input.name, &mut errors);
        check_required("reference", &input.reference, &mut errors);
        check_quantities(
            input.is_unitary,
            input.stock_quantity,
            input.out_of_order_quantity,
            &mut errors,
        );
        if input.rental_price < 0.0 {
            errors.add("rental_price", "Rental price cannot be negative");
        }
        errors.into_result()?;

        let now = chrono::Utc::now().to_rfc3339();
        let new_material = ActiveModel {
            name: Set(input.name.trim().to_string()),
            reference: Set(input.reference.trim().to_string()),
            description: Set(input.description),
            category_id: Set(input.category_id),
            sub_category_id: Set(input.sub_category_id),
            park_id: Set(input.park_id),
            is_unitary: Set(input.is_unitary),
            stock_quantity: Set(input.stock_quantity),
            out_of_order_quantity: Set(input.out_of_order_quantity),
            lost_quantity: Set(0),
            rental_price: Set(input.rental_price),
            replacement_price: Set(input.replacement_price),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        };

        let result = new_material.insert(&self.db).await?;
        tracing::info!("Created material #{} '{}'", result.id, result.name);

        Ok(to_material(result, Vec::new()))
    }

    async fn update(&self, id: i32, input: UpdateMaterialInput) -> Result<Material, DomainError> {
        let existing = self.load(id).await?;

        let mut errors = FieldErrors::new();
        if let Some(name) = &input.name {
            check_required("name", name, &mut errors);
        }
        if let Some(reference) = &input.reference {
            check_required("reference", reference, &mut errors);
        }
        let stock_quantity = if existing.is_unitary {
            input.stock_quantity
        } else {
            input.stock_quantity.or(existing.stock_quantity)
        };
        check_quantities(
            existing.is_unitary,
            stock_quantity,
            input
                .out_of_order_quantity
                .unwrap_or(existing.out_of_order_quantity),
            &mut errors,
        );
        if input.rental_price.is_some_and(|p| p < 0.0) {
            errors.add("rental_price", "Rental price cannot be negative");
        }
        errors.into_result()?;

        let mut active: ActiveModel = existing.into();

        if let Some(name) = input.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(reference) = input.reference {
            active.reference = Set(reference.trim().to_string());
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(sub_category_id) = input.sub_category_id {
            active.sub_category_id = Set(sub_category_id);
        }
        if let Some(park_id) = input.park_id {
            active.park_id = Set(park_id);
        }
        if let Some(quantity) = input.stock_quantity {
            active.stock_quantity = Set(Some(quantity));
        }
        if let Some(quantity) = input.out_of_order_quantity {
            active.out_of_order_quantity = Set(quantity);
        }
        if let Some(price) = input.rental_price {
            active.rental_price = Set(price);
        }
        if let Some(price) = input.replacement_price {
            active.replacement_price = Set(price);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let result = active.update(&self.db).await?;
        self.warn_if_overbooked(&result).await?;
        self.with_units(result).await
    }

    async fn delete(&self, id: i32) -> Result<DeleteOutcome, DomainError> {
        let existing = self.load(id).await?;

        if existing.deleted_at.is_none() {
            let mut active: ActiveModel = existing.into();
            active.deleted_at = Set(Some(chrono::Utc::now().to_rfc3339()));
            active.update(&self.db).await?;
            tracing::info!("Material #{} moved to trash", id);
            return Ok(DeleteOutcome::Trashed);
        }

        let bookings = EventMaterialEntity::find()
            .filter(event_material_model::Column::MaterialId.eq(id))
            .count(&self.db)
            .await?;
        if bookings > 0 {
            return Err(DomainError::validation(
                "id",
                format!("Material is still booked by {} event line(s)", bookings),
            ));
        }

        MaterialEntity::delete_by_id(id).exec(&self.db).await?;
        tracing::info!("Material #{} permanently deleted", id);
        Ok(DeleteOutcome::Destroyed)
    }

    async fn restore(&self, id: i32) -> Result<Material, DomainError> {
        let existing = self.load(id).await?;
        let mut active: ActiveModel = existing.into();
        active.deleted_at = Set(None);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        let result = active.update(&self.db).await?;
        self.with_units(result).await
    }

    async fn add_unit(
        &self,
        material_id: i32,
        input: CreateUnitInput,
    ) -> Result<Unit, DomainError> {
        let material = self.load(material_id).await?;

        let mut errors = FieldErrors::new();
        if !material.is_unitary {
            errors.add("material_id", "Only unit-tracked materials have units");
        }
        check_required("serial_number", &input.serial_number, &mut errors);
        errors.into_result()?;

        let now = chrono::Utc::now().to_rfc3339();
        let new_unit = material_unit::ActiveModel {
            material_id: Set(material_id),
            serial_number: Set(input.serial_number.trim().to_string()),
            is_broken: Set(input.is_broken),
            is_lost: Set(false),
            person_id: Set(input.person_id),
            state: Set(input.state.as_str().to_string()),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = new_unit.insert(&self.db).await?;
        Ok(to_unit(result))
    }

    async fn update_unit(
        &self,
        material_id: i32,
        unit_id: i32,
        input: UpdateUnitInput,
    ) -> Result<Unit, DomainError> {
        let existing = self.load_unit(material_id, unit_id).await?;

        if let Some(serial) = &input.serial_number {
            let mut errors = FieldErrors::new();
            check_required("serial_number", serial, &mut errors);
            errors.into_result()?;
        }

        let mut active: material_unit::ActiveModel = existing.into();
        if let Some(serial) = input.serial_number {
            active.serial_number = Set(serial.trim().to_string());
        }
        if let Some(state) = input.state {
            active.state = Set(state.as_str().to_string());
        }
        if let Some(person_id) = input.person_id {
            active.person_id = Set(person_id);
        }
        if let Some(is_broken) = input.is_broken {
            active.is_broken = Set(is_broken);
        }
        if let Some(is_lost) = input.is_lost {
            active.is_lost = Set(is_lost);
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let result = active.update(&self.db).await?;
        Ok(to_unit(result))
    }

    async fn remove_unit(&self, material_id: i32, unit_id: i32) -> Result<(), DomainError> {
        self.load_unit(material_id, unit_id).await?;

        let assignments = EventMaterialUnitEntity::find()
            .filter(event_material_unit::Column::MaterialUnitId.eq(unit_id))
            .count(&self.db)
            .await?;
        if assignments > 0 {
            return Err(DomainError::validation(
                "unit_id",
                "Unit is assigned to at least one event",
            ));
        }

        UnitEntity::delete_by_id(unit_id).exec(&self.db).await?;
        Ok(())
    }
}
