//! Availability Service - ledger snapshots fed to the calculator

use std::collections::HashSet;

use chrono::NaiveDateTime;
use sea_orm::*;
use serde::Deserialize;

use crate::domain::availability::{
    self, Commitments, MaterialAvailability, MaterialStock, MissingMaterial,
};
use crate::domain::{DateRange, DomainError, FieldErrors, LedgerRepository, RequestedLine};
use crate::infrastructure::SeaOrmLedgerRepository;
use crate::models::event::{self, Entity as Event};
use crate::models::event_material::{self, Entity as EventMaterial};

/// Body of an availability query
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    /// Event being edited, its own lines are not counted
    pub exclude_event_id: Option<i32>,
    pub materials: Vec<RequestedLine>,
}

/// Checks quantities and duplicate materials of requested lines.
pub(crate) fn check_requested_lines(lines: &[RequestedLine], errors: &mut FieldErrors) {
    let mut seen = HashSet::new();
    for line in lines {
        if !seen.insert(line.material_id) {
            errors.add(
                "materials",
                format!("Material #{} is listed more than once", line.material_id),
            );
        }
        if line.quantity < 0 {
            errors.add(line.material_id.to_string(), "Quantity cannot be negative");
        }
    }
}

async fn snapshot<L>(
    ledger: &L,
    period: &DateRange,
    exclude_event_id: Option<i32>,
    lines: &[RequestedLine],
) -> Result<(Vec<MaterialStock>, Commitments), DomainError>
where
    L: LedgerRepository + ?Sized,
{
    let ids: Vec<i32> = lines.iter().map(|l| l.material_id).collect();
    let stocks = ledger.stock_snapshots(&ids).await?;
    let committed_lines = ledger
        .committed_lines(period, exclude_event_id, &ids)
        .await?;
    let committed_units = ledger
        .committed_units(period, exclude_event_id, &ids)
        .await?;

    Ok((stocks, Commitments::new(&committed_lines, &committed_units)))
}

/// Availability of every line over `period`, shortages included.
pub async fn report<L>(
    ledger: &L,
    period: &DateRange,
    exclude_event_id: Option<i32>,
    lines: &[RequestedLine],
) -> Result<Vec<MaterialAvailability>, DomainError>
where
    L: LedgerRepository + ?Sized,
{
    let (stocks, commitments) = snapshot(ledger, period, exclude_event_id, lines).await?;
    availability::availability_report(&stocks, &commitments, lines)
}

/// Booking gate: fails with `InsufficientStock` on the first short line.
pub async fn allocate<L>(
    ledger: &L,
    period: &DateRange,
    exclude_event_id: Option<i32>,
    lines: &[RequestedLine],
) -> Result<Vec<MaterialAvailability>, DomainError>
where
    L: LedgerRepository + ?Sized,
{
    let (stocks, commitments) = snapshot(ledger, period, exclude_event_id, lines).await?;
    let granted = availability::allocate(&stocks, &commitments, lines)?;

    tracing::debug!(
        "Allocated {} line(s) from {} to {}",
        granted.len(),
        period.start,
        period.end
    );
    Ok(granted)
}

/// Answers an availability query without booking anything
pub async fn check_availability(
    db: &DatabaseConnection,
    query: AvailabilityQuery,
) -> Result<Vec<MaterialAvailability>, DomainError> {
    let mut errors = FieldErrors::new();
    if query.start_date > query.end_date {
        errors.add(
            "end_date",
            "End date must be later than or equal to start date",
        );
    }
    check_requested_lines(&query.materials, &mut errors);
    errors.into_result()?;

    let period = DateRange::new(query.start_date, query.end_date)?;
    let ledger = SeaOrmLedgerRepository::new(db);
    report(&ledger, &period, query.exclude_event_id, &query.materials).await
}

/// Shortages of an event's lines, computed on the fly.
pub async fn missing_materials<C>(
    conn: &C,
    event: &event::Model,
) -> Result<Vec<MissingMaterial>, DomainError>
where
    C: ConnectionTrait + Send + Sync,
{
    let lines: Vec<RequestedLine> = EventMaterial::find()
        .filter(event_material::Column::EventId.eq(event.id))
        .all(conn)
        .await?
        .into_iter()
        .map(|line| RequestedLine {
            material_id: line.material_id,
            quantity: line.quantity,
            units: Vec::new(),
        })
        .collect();
    if lines.is_empty() {
        return Ok(Vec::new());
    }

    let period = DateRange {
        start: event.start_date,
        end: event.end_date,
    };
    let ledger = SeaOrmLedgerRepository::new(conn);
    let (stocks, commitments) = snapshot(&ledger, &period, Some(event.id), &lines).await?;

    Ok(availability::missing_materials(
        &stocks,
        &commitments,
        &lines,
    ))
}

/// Missing-materials report of a live event
pub async fn event_missing_materials(
    db: &DatabaseConnection,
    event_id: i32,
) -> Result<Vec<MissingMaterial>, DomainError> {
    let event = Event::find_by_id(event_id)
        .filter(event::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or(DomainError::not_found("event", event_id))?;

    missing_materials(db, &event).await
}
