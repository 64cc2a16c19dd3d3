//! Event Service - ledger writes, listings and totals
//!
//! Saving an event runs the availability gate and rewrites its lines inside
//! a single transaction, so the capacity check and the writes see the same
//! ledger.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_orm::*;
use serde::{Deserialize, Serialize};

use crate::config::BillingSettings;
use crate::domain::availability::{MaterialAvailability, MissingMaterial, StockKind};
use crate::domain::{
    DateRange, DeleteOutcome, DomainError, FieldErrors, LedgerRepository, RequestedLine,
};
use crate::infrastructure::SeaOrmLedgerRepository;
use crate::models::event::{self, Entity as Event};
use crate::models::event_assignee::{self, Entity as EventAssignee};
use crate::models::event_beneficiary::{self, Entity as EventBeneficiary};
use crate::models::event_material::{self, Entity as EventMaterial};
use crate::models::event_material_unit::{self, Entity as EventMaterialUnit};
use crate::models::material::{self, Entity as Material};
use crate::models::material_unit::Entity as MaterialUnit;
use crate::models::park::Entity as Park;
use crate::models::person::{self, Entity as Person};
use crate::services::{availability_service, return_service};

fn default_billable() -> bool {
    true
}

/// Technician assigned to an event, optionally for part of it
#[derive(Debug, Clone, Deserialize)]
pub struct AssigneeInput {
    pub person_id: i32,
    pub position: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

/// Event payload for create and update.
///
/// On update, `beneficiaries`, `assignees` and `materials` left out keep
/// their current values.
#[derive(Debug, Clone, Deserialize)]
pub struct EventInput {
    pub title: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    #[serde(default)]
    pub is_confirmed: bool,
    #[serde(default = "default_billable")]
    pub is_billable: bool,
    pub user_id: Option<i32>,
    pub beneficiaries: Option<Vec<i32>>,
    pub assignees: Option<Vec<AssigneeInput>>,
    pub materials: Option<Vec<RequestedLine>>,
}

/// New period for a copy of an event
#[derive(Debug, Clone, Deserialize)]
pub struct DuplicateEventInput {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub user_id: Option<i32>,
}

/// Filter parameters for listing events
#[derive(Debug, Default, Clone, Deserialize)]
pub struct EventFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventSummary {
    #[serde(flatten)]
    pub event: event::Model,
    pub has_missing_materials: bool,
    /// Parks the event's materials come from, only when there is more than one park
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parks: Option<Vec<i32>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventLineUnit {
    pub unit_id: i32,
    pub serial_number: String,
    pub is_broken: bool,
    pub is_lost: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventLine {
    pub id: i32,
    pub material_id: i32,
    pub name: String,
    pub reference: String,
    pub is_unitary: bool,
    pub park_id: Option<i32>,
    pub quantity: i32,
    pub quantity_returned: Option<i32>,
    pub quantity_broken: i32,
    pub rental_price: f64,
    pub replacement_price: Option<f64>,
    pub units: Vec<EventLineUnit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventAssigneeDetails {
    pub person: person::Model,
    pub position: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventTotals {
    pub duration_days: i64,
    pub daily_total: f64,
    pub total_replacement: f64,
    /// Rental total, absent when the event is not billed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<f64>,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventDetails {
    #[serde(flatten)]
    pub event: event::Model,
    pub beneficiaries: Vec<person::Model>,
    pub assignees: Vec<EventAssigneeDetails>,
    pub materials: Vec<EventLine>,
    pub totals: EventTotals,
    pub missing_materials: Vec<MissingMaterial>,
}

/// A stored line with the units it holds
struct CurrentLine {
    line: event_material::Model,
    units: Vec<i32>,
}

impl CurrentLine {
    fn as_request(&self) -> RequestedLine {
        RequestedLine {
            material_id: self.line.material_id,
            quantity: self.line.quantity,
            units: self.units.clone(),
        }
    }
}

/// Rental and replacement totals of an event.
pub fn event_totals(
    period: &DateRange,
    lines: &[EventLine],
    is_billable: bool,
    billing: &BillingSettings,
) -> EventTotals {
    let duration_days = period.duration_days();
    let daily_total: f64 = lines
        .iter()
        .map(|l| l.rental_price * l.quantity as f64)
        .sum();
    let total_replacement: f64 = lines
        .iter()
        .map(|l| l.replacement_price.unwrap_or(0.0) * l.quantity as f64)
        .sum();

    EventTotals {
        duration_days,
        daily_total,
        total_replacement,
        total: billing
            .applies_to(is_billable)
            .then(|| daily_total * duration_days as f64),
        currency: billing.currency.clone(),
    }
}

async fn find_live<C>(conn: &C, id: i32) -> Result<event::Model, DomainError>
where
    C: ConnectionTrait,
{
    Event::find_by_id(id)
        .filter(event::Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or(DomainError::not_found("event", id))
}

/// List events, optionally those overlapping a period of days
pub async fn list_events(
    db: &DatabaseConnection,
    filter: EventFilter,
) -> Result<Vec<EventSummary>, DomainError> {
    if let (Some(start), Some(end)) = (filter.start, filter.end)
        && start > end
    {
        return Err(DomainError::validation(
            "end",
            "End date must be later than or equal to start date",
        ));
    }

    let mut query = Event::find();
    query = if filter.deleted {
        query.filter(event::Column::DeletedAt.is_not_null())
    } else {
        query.filter(event::Column::DeletedAt.is_null())
    };
    if let Some(start) = filter.start {
        query = query.filter(event::Column::EndDate.gte(start.and_time(NaiveTime::MIN)));
    }
    if let Some(end) = filter.end {
        let next_day = end.and_time(NaiveTime::MIN) + Duration::days(1);
        query = query.filter(event::Column::StartDate.lt(next_day));
    }

    let events = query
        .order_by_asc(event::Column::StartDate)
        .order_by_asc(event::Column::Id)
        .all(db)
        .await?;

    let parks_by_event = if Park::find().count(db).await? > 1 {
        let ids: Vec<i32> = events.iter().map(|e| e.id).collect();
        Some(event_parks(db, &ids).await?)
    } else {
        None
    };

    let mut summaries = Vec::with_capacity(events.len());
    for event in events {
        let missing = availability_service::missing_materials(db, &event).await?;
        let parks = parks_by_event.as_ref().map(|parks| {
            parks
                .get(&event.id)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default()
        });
        summaries.push(EventSummary {
            has_missing_materials: !missing.is_empty(),
            parks,
            event,
        });
    }

    Ok(summaries)
}

async fn event_parks(
    db: &DatabaseConnection,
    event_ids: &[i32],
) -> Result<HashMap<i32, BTreeSet<i32>>, DomainError> {
    if event_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i32, Option<i32>)> = EventMaterial::find()
        .select_only()
        .column(event_material::Column::EventId)
        .column(material::Column::ParkId)
        .inner_join(Material)
        .filter(event_material::Column::EventId.is_in(event_ids.to_vec()))
        .into_tuple()
        .all(db)
        .await?;

    let mut parks: HashMap<i32, BTreeSet<i32>> = HashMap::new();
    for (event_id, park_id) in rows {
        if let Some(park_id) = park_id {
            parks.entry(event_id).or_default().insert(park_id);
        }
    }
    Ok(parks)
}

async fn load_lines<C>(conn: &C, event_id: i32) -> Result<Vec<EventLine>, DomainError>
where
    C: ConnectionTrait,
{
    let rows = EventMaterial::find()
        .filter(event_material::Column::EventId.eq(event_id))
        .order_by_asc(event_material::Column::Id)
        .find_also_related(Material)
        .all(conn)
        .await?;

    let line_ids: Vec<i32> = rows.iter().map(|(line, _)| line.id).collect();
    let assignments = if line_ids.is_empty() {
        Vec::new()
    } else {
        EventMaterialUnit::find()
            .filter(event_material_unit::Column::EventMaterialId.is_in(line_ids))
            .find_also_related(MaterialUnit)
            .all(conn)
            .await?
    };

    let mut units_by_line: HashMap<i32, Vec<EventLineUnit>> = HashMap::new();
    for (assignment, unit) in assignments {
        units_by_line
            .entry(assignment.event_material_id)
            .or_default()
            .push(EventLineUnit {
                unit_id: assignment.material_unit_id,
                serial_number: unit.map(|u| u.serial_number).unwrap_or_default(),
                is_broken: assignment.is_broken,
                is_lost: assignment.is_lost,
            });
    }

    Ok(rows
        .into_iter()
        .filter_map(|(line, material)| {
            let material = material?;
            let mut units = units_by_line.remove(&line.id).unwrap_or_default();
            units.sort_by(|a, b| a.serial_number.cmp(&b.serial_number));
            Some(EventLine {
                id: line.id,
                material_id: line.material_id,
                name: material.name,
                reference: material.reference,
                is_unitary: material.is_unitary,
                park_id: material.park_id,
                quantity: line.quantity,
                quantity_returned: line.quantity_returned,
                quantity_broken: line.quantity_broken,
                rental_price: material.rental_price,
                replacement_price: material.replacement_price,
                units,
            })
        })
        .collect())
}

async fn load_current<C>(conn: &C, event_id: i32) -> Result<Vec<CurrentLine>, DomainError>
where
    C: ConnectionTrait,
{
    let lines = EventMaterial::find()
        .filter(event_material::Column::EventId.eq(event_id))
        .order_by_asc(event_material::Column::Id)
        .all(conn)
        .await?;
    if lines.is_empty() {
        return Ok(Vec::new());
    }

    let assignments = EventMaterialUnit::find()
        .filter(
            event_material_unit::Column::EventMaterialId
                .is_in(lines.iter().map(|l| l.id).collect::<Vec<_>>()),
        )
        .all(conn)
        .await?;

    Ok(lines
        .into_iter()
        .map(|line| CurrentLine {
            units: assignments
                .iter()
                .filter(|a| a.event_material_id == line.id)
                .map(|a| a.material_unit_id)
                .collect(),
            line,
        })
        .collect())
}

/// Get an event with its lines, people, totals and shortages
pub async fn get_event(
    db: &DatabaseConnection,
    id: i32,
    billing: &BillingSettings,
) -> Result<EventDetails, DomainError> {
    let event = Event::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::not_found("event", id))?;

    let materials = load_lines(db, id).await?;

    let mut beneficiaries: Vec<person::Model> = EventBeneficiary::find()
        .filter(event_beneficiary::Column::EventId.eq(id))
        .find_also_related(Person)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(_, person)| person)
        .collect();
    beneficiaries.sort_by(|a, b| {
        (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name))
    });

    let assignees = EventAssignee::find()
        .filter(event_assignee::Column::EventId.eq(id))
        .order_by_asc(event_assignee::Column::Id)
        .find_also_related(Person)
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(assignee, person)| {
            Some(EventAssigneeDetails {
                person: person?,
                position: assignee.position,
                start_time: assignee.start_time,
                end_time: assignee.end_time,
            })
        })
        .collect();

    let period = DateRange {
        start: event.start_date,
        end: event.end_date,
    };
    let totals = event_totals(&period, &materials, event.is_billable, billing);

    let missing_materials = if event.is_return_inventory_done || event.deleted_at.is_some() {
        Vec::new()
    } else {
        availability_service::missing_materials(db, &event).await?
    };

    Ok(EventDetails {
        event,
        beneficiaries,
        assignees,
        materials,
        totals,
        missing_materials,
    })
}

async fn validate_event<C>(conn: &C, input: &EventInput) -> Result<DateRange, DomainError>
where
    C: ConnectionTrait,
{
    let mut errors = FieldErrors::new();

    if input.title.trim().is_empty() {
        errors.add("title", "This field is required");
    }
    if input.start_date > input.end_date {
        errors.add(
            "end_date",
            "End date must be later than or equal to start date",
        );
    }
    if let Some(lines) = &input.materials {
        availability_service::check_requested_lines(lines, &mut errors);
    }

    let mut person_ids: BTreeSet<i32> = BTreeSet::new();
    if let Some(ids) = &input.beneficiaries {
        person_ids.extend(ids);
    }
    if let Some(assignees) = &input.assignees {
        person_ids.extend(assignees.iter().map(|a| a.person_id));
    }
    let known: HashSet<i32> = if person_ids.is_empty() {
        HashSet::new()
    } else {
        Person::find()
            .select_only()
            .column(person::Column::Id)
            .filter(person::Column::Id.is_in(person_ids.into_iter().collect::<Vec<_>>()))
            .into_tuple::<i32>()
            .all(conn)
            .await?
            .into_iter()
            .collect()
    };

    for id in input.beneficiaries.iter().flatten() {
        if !known.contains(id) {
            errors.add("beneficiaries", format!("Person #{} not found", id));
        }
    }

    for assignee in input.assignees.iter().flatten() {
        let who = assignee.person_id;
        if !known.contains(&who) {
            errors.add("assignees", format!("Person #{} not found", who));
        }
        match (assignee.start_time, assignee.end_time) {
            (None, None) => {}
            (Some(start), Some(end)) if start > end => errors.add(
                "assignees",
                format!("Technician #{}: end time must be later than start time", who),
            ),
            (Some(start), Some(end)) => {
                if start < input.start_date || end > input.end_date {
                    errors.add(
                        "assignees",
                        format!("Technician #{}: period must lie inside the event", who),
                    );
                }
            }
            _ => errors.add(
                "assignees",
                format!("Technician #{}: both start and end times are required", who),
            ),
        }
    }

    errors.into_result()?;
    DateRange::new(input.start_date, input.end_date)
}

/// Lines without explicit unit picks keep the units they already hold while
/// those are still free over the period.
async fn keep_current_units<L>(
    ledger: &L,
    period: &DateRange,
    exclude_event_id: Option<i32>,
    mut lines: Vec<RequestedLine>,
    current: &[CurrentLine],
) -> Result<Vec<RequestedLine>, DomainError>
where
    L: LedgerRepository + ?Sized,
{
    if current.iter().all(|c| c.units.is_empty()) {
        return Ok(lines);
    }

    let ids: Vec<i32> = lines.iter().map(|l| l.material_id).collect();
    let held: HashSet<i32> = ledger
        .committed_units(period, exclude_event_id, &ids)
        .await?
        .into_iter()
        .map(|u| u.unit_id)
        .collect();
    let lost: HashSet<i32> = ledger
        .stock_snapshots(&ids)
        .await?
        .into_iter()
        .flat_map(|stock| match stock.kind {
            StockKind::Unitary { units } => units
                .into_iter()
                .filter(|u| u.is_lost)
                .map(|u| u.id)
                .collect::<Vec<_>>(),
            StockKind::Bulk { .. } => Vec::new(),
        })
        .collect();

    for line in lines.iter_mut().filter(|l| l.units.is_empty()) {
        if let Some(cur) = current
            .iter()
            .find(|c| c.line.material_id == line.material_id)
        {
            line.units = cur
                .units
                .iter()
                .copied()
                .filter(|u| !held.contains(u) && !lost.contains(u))
                .take(line.quantity.max(0) as usize)
                .collect();
        }
    }

    Ok(lines)
}

async fn assign_units<C>(conn: &C, event_material_id: i32, unit_ids: &[i32]) -> Result<(), DomainError>
where
    C: ConnectionTrait,
{
    if unit_ids.is_empty() {
        return Ok(());
    }

    let rows = unit_ids.iter().map(|unit_id| event_material_unit::ActiveModel {
        event_material_id: Set(event_material_id),
        material_unit_id: Set(*unit_id),
        is_broken: Set(false),
        is_lost: Set(false),
        ..Default::default()
    });
    EventMaterialUnit::insert_many(rows).exec(conn).await?;
    Ok(())
}

/// Rewrites the event's lines to match what was granted.
///
/// Returns whether anything changed. Lines whose quantity is unchanged keep
/// their return figures; a resized or removed line first has its recorded
/// return taken back from the catalog.
async fn sync_lines<C>(
    conn: &C,
    event_id: i32,
    current: &[CurrentLine],
    granted: &[MaterialAvailability],
) -> Result<bool, DomainError>
where
    C: ConnectionTrait,
{
    let mut changed = false;

    for cur in current {
        let Some(wanted) = granted
            .iter()
            .find(|g| g.material_id == cur.line.material_id)
        else {
            return_service::revert_line_return(conn, &cur.line).await?;
            EventMaterial::delete_by_id(cur.line.id).exec(conn).await?;
            changed = true;
            continue;
        };

        if wanted.requested != cur.line.quantity {
            return_service::revert_line_return(conn, &cur.line).await?;
            let mut active: event_material::ActiveModel = cur.line.clone().into();
            active.quantity = Set(wanted.requested);
            active.quantity_returned = Set(None);
            active.quantity_broken = Set(0);
            active.update(conn).await?;
            changed = true;
        }

        let dropped: Vec<i32> = cur
            .units
            .iter()
            .copied()
            .filter(|u| !wanted.units.contains(u))
            .collect();
        if !dropped.is_empty() {
            EventMaterialUnit::delete_many()
                .filter(event_material_unit::Column::EventMaterialId.eq(cur.line.id))
                .filter(event_material_unit::Column::MaterialUnitId.is_in(dropped))
                .exec(conn)
                .await?;
            changed = true;
        }

        let added: Vec<i32> = wanted
            .units
            .iter()
            .copied()
            .filter(|u| !cur.units.contains(u))
            .collect();
        if !added.is_empty() {
            assign_units(conn, cur.line.id, &added).await?;
            changed = true;
        }
    }

    for wanted in granted
        .iter()
        .filter(|g| !current.iter().any(|c| c.line.material_id == g.material_id))
    {
        let line = event_material::ActiveModel {
            event_id: Set(event_id),
            material_id: Set(wanted.material_id),
            quantity: Set(wanted.requested),
            quantity_returned: Set(None),
            quantity_broken: Set(0),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        assign_units(conn, line.id, &wanted.units).await?;
        changed = true;
    }

    Ok(changed)
}

async fn replace_people<C>(conn: &C, event_id: i32, input: &EventInput) -> Result<(), DomainError>
where
    C: ConnectionTrait,
{
    if let Some(ids) = &input.beneficiaries {
        EventBeneficiary::delete_many()
            .filter(event_beneficiary::Column::EventId.eq(event_id))
            .exec(conn)
            .await?;

        let unique: BTreeSet<i32> = ids.iter().copied().collect();
        if !unique.is_empty() {
            let rows = unique.into_iter().map(|person_id| event_beneficiary::ActiveModel {
                event_id: Set(event_id),
                person_id: Set(person_id),
            });
            EventBeneficiary::insert_many(rows)
                .exec_without_returning(conn)
                .await?;
        }
    }

    if let Some(assignees) = &input.assignees {
        EventAssignee::delete_many()
            .filter(event_assignee::Column::EventId.eq(event_id))
            .exec(conn)
            .await?;

        if !assignees.is_empty() {
            let rows = assignees.iter().map(|a| event_assignee::ActiveModel {
                event_id: Set(event_id),
                person_id: Set(a.person_id),
                position: Set(a.position.clone()),
                start_time: Set(a.start_time),
                end_time: Set(a.end_time),
                ..Default::default()
            });
            EventAssignee::insert_many(rows).exec(conn).await?;
        }
    }

    Ok(())
}

async fn save_event(
    db: &DatabaseConnection,
    id: Option<i32>,
    input: EventInput,
) -> Result<i32, DomainError> {
    let txn = db.begin().await?;

    let existing = match id {
        Some(id) => Some(find_live(&txn, id).await?),
        None => None,
    };
    let period = validate_event(&txn, &input).await?;
    let current = match &existing {
        Some(event) => load_current(&txn, event.id).await?,
        None => Vec::new(),
    };

    let period_changed = existing
        .as_ref()
        .is_some_and(|e| e.start_date != period.start || e.end_date != period.end);
    let wanted: Option<Vec<RequestedLine>> = match &input.materials {
        Some(lines) => Some(lines.iter().filter(|l| l.quantity > 0).cloned().collect()),
        None if period_changed => Some(
            current
                .iter()
                .map(|c| RequestedLine {
                    units: Vec::new(),
                    ..c.as_request()
                })
                .collect(),
        ),
        None => None,
    };

    let ledger = SeaOrmLedgerRepository::new(&txn);
    let granted = match wanted {
        Some(lines) => {
            let lines = keep_current_units(&ledger, &period, id, lines, &current).await?;
            Some(availability_service::allocate(&ledger, &period, id, &lines).await?)
        }
        None => None,
    };

    let now = Utc::now().to_rfc3339();
    let event = match existing {
        Some(existing) => {
            let mut active: event::ActiveModel = existing.into();
            active.title = Set(input.title.trim().to_string());
            active.reference = Set(input.reference.clone());
            active.description = Set(input.description.clone());
            active.location = Set(input.location.clone());
            active.start_date = Set(period.start);
            active.end_date = Set(period.end);
            active.is_confirmed = Set(input.is_confirmed);
            active.is_billable = Set(input.is_billable);
            active.updated_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            event::ActiveModel {
                title: Set(input.title.trim().to_string()),
                reference: Set(input.reference.clone()),
                description: Set(input.description.clone()),
                location: Set(input.location.clone()),
                start_date: Set(period.start),
                end_date: Set(period.end),
                is_confirmed: Set(input.is_confirmed),
                is_billable: Set(input.is_billable),
                is_return_inventory_done: Set(false),
                user_id: Set(input.user_id),
                created_at: Set(now.clone()),
                updated_at: Set(now),
                deleted_at: Set(None),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    if let Some(granted) = &granted {
        let changed = sync_lines(&txn, event.id, &current, granted).await?;
        if changed && event.is_return_inventory_done {
            let mut active: event::ActiveModel = event.clone().into();
            active.is_return_inventory_done = Set(false);
            active.update(&txn).await?;
            tracing::info!("Event #{} lines changed, return inventory reopened", event.id);
        }
    }
    replace_people(&txn, event.id, &input).await?;

    txn.commit().await?;
    Ok(event.id)
}

/// Create an event, refusing it when stock is short
pub async fn create_event(
    db: &DatabaseConnection,
    input: EventInput,
    billing: &BillingSettings,
) -> Result<EventDetails, DomainError> {
    let id = save_event(db, None, input).await?;
    tracing::info!("Created event #{}", id);
    get_event(db, id, billing).await
}

/// Update a live event; its own lines never count against it
pub async fn update_event(
    db: &DatabaseConnection,
    id: i32,
    input: EventInput,
    billing: &BillingSettings,
) -> Result<EventDetails, DomainError> {
    save_event(db, Some(id), input).await?;
    get_event(db, id, billing).await
}

/// Copy a live event to a new period.
///
/// Beneficiaries, technicians (without their sub-periods) and material lines
/// are carried over; units are allocated afresh and the copy starts
/// unconfirmed with no return recorded.
pub async fn duplicate_event(
    db: &DatabaseConnection,
    id: i32,
    input: DuplicateEventInput,
    billing: &BillingSettings,
) -> Result<EventDetails, DomainError> {
    let source = find_live(db, id).await?;

    let materials: Vec<RequestedLine> = load_current(db, id)
        .await?
        .iter()
        .map(|c| RequestedLine {
            units: Vec::new(),
            ..c.as_request()
        })
        .collect();
    let beneficiaries: Vec<i32> = EventBeneficiary::find()
        .filter(event_beneficiary::Column::EventId.eq(id))
        .all(db)
        .await?
        .into_iter()
        .map(|b| b.person_id)
        .collect();
    let assignees: Vec<AssigneeInput> = EventAssignee::find()
        .filter(event_assignee::Column::EventId.eq(id))
        .order_by_asc(event_assignee::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|a| AssigneeInput {
            person_id: a.person_id,
            position: a.position,
            start_time: None,
            end_time: None,
        })
        .collect();

    let copy = EventInput {
        title: source.title,
        reference: None,
        description: source.description,
        location: source.location,
        start_date: input.start_date,
        end_date: input.end_date,
        is_confirmed: false,
        is_billable: source.is_billable,
        user_id: input.user_id,
        beneficiaries: Some(beneficiaries),
        assignees: Some(assignees),
        materials: Some(materials),
    };
    let new_id = save_event(db, None, copy).await?;

    tracing::info!("Event #{} duplicated as #{}", id, new_id);
    get_event(db, new_id, billing).await
}

/// Trash a live event, destroy a trashed one
pub async fn delete_event(db: &DatabaseConnection, id: i32) -> Result<DeleteOutcome, DomainError> {
    let event = Event::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DomainError::not_found("event", id))?;

    if event.deleted_at.is_none() {
        let mut active: event::ActiveModel = event.into();
        active.deleted_at = Set(Some(Utc::now().to_rfc3339()));
        active.update(db).await?;
        tracing::info!("Event #{} moved to trash", id);
        return Ok(DeleteOutcome::Trashed);
    }

    Event::delete_by_id(id).exec(db).await?;
    tracing::info!("Event #{} permanently deleted", id);
    Ok(DeleteOutcome::Destroyed)
}

/// Bring a trashed event back, provided its lines still fit
pub async fn restore_event(
    db: &DatabaseConnection,
    id: i32,
    billing: &BillingSettings,
) -> Result<EventDetails, DomainError> {
    let txn = db.begin().await?;

    let event = Event::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(DomainError::not_found("event", id))?;

    if event.deleted_at.is_some() {
        let lines: Vec<RequestedLine> = load_current(&txn, id)
            .await?
            .iter()
            .map(CurrentLine::as_request)
            .collect();
        let period = DateRange {
            start: event.start_date,
            end: event.end_date,
        };
        let ledger = SeaOrmLedgerRepository::new(&txn);
        availability_service::allocate(&ledger, &period, Some(id), &lines).await?;

        let mut active: event::ActiveModel = event.into();
        active.deleted_at = Set(None);
        active.updated_at = Set(Utc::now().to_rfc3339());
        active.update(&txn).await?;
    }

    txn.commit().await?;
    get_event(db, id, billing).await
}

/// Permanently delete every trashed event
pub async fn purge_events(db: &DatabaseConnection) -> Result<u64, DomainError> {
    let result = Event::delete_many()
        .filter(event::Column::DeletedAt.is_not_null())
        .exec(db)
        .await?;

    tracing::info!("Purged {} trashed event(s)", result.rows_affected);
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BillingMode;

    fn line(quantity: i32, rental_price: f64, replacement_price: Option<f64>) -> EventLine {
        EventLine {
            id: 1,
            material_id: 1,
            name: "Console".to_string(),
            reference: "CONSOLE".to_string(),
            is_unitary: false,
            park_id: None,
            quantity,
            quantity_returned: None,
            quantity_broken: 0,
            rental_price,
            replacement_price,
            units: Vec::new(),
        }
    }

    fn three_days() -> DateRange {
        let start = NaiveDate::from_ymd_opt(2024, 5, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 5, 12)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        DateRange::new(start, end).unwrap()
    }

    #[test]
    fn test_totals_for_billable_event() {
        let lines = vec![line(2, 50.0, Some(400.0)), line(10, 1.5, None)];
        let totals = event_totals(&three_days(), &lines, true, &BillingSettings::default());

        assert_eq!(totals.duration_days, 3);
        assert_eq!(totals.daily_total, 115.0);
        assert_eq!(totals.total, Some(345.0));
        assert_eq!(totals.total_replacement, 800.0);
        assert_eq!(totals.currency, "EUR");
    }

    #[test]
    fn test_totals_without_billing() {
        let lines = vec![line(1, 20.0, None)];

        let partial = event_totals(&three_days(), &lines, false, &BillingSettings::default());
        assert_eq!(partial.total, None);
        assert_eq!(partial.daily_total, 20.0);

        let billing = BillingSettings {
            mode: BillingMode::None,
            currency: "CHF".to_string(),
        };
        let off = event_totals(&three_days(), &lines, true, &billing);
        assert_eq!(off.total, None);
        assert_eq!(off.currency, "CHF");
    }
}
