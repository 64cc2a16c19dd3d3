//! Return Service - records what came back from an event
//!
//! The submission is checked in full by the planner before the transaction
//! writes anything, so a rejected return leaves the store untouched.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;

use crate::domain::reconciliation::{
    self, AssignedUnit, AwaitedLine, LinePlan, PreviousReturn, ReturnNotice, ReturnOutcome,
    ReturnedLine,
};
use crate::domain::DomainError;
use crate::models::event::{self, Entity as Event};
use crate::models::event_material::{self, Entity as EventMaterial};
use crate::models::event_material_unit::{self, Entity as EventMaterialUnit};
use crate::models::material::{self, Entity as Material};
use crate::models::material_unit::{self, Entity as MaterialUnit};

/// Ledger lines of an event as they are awaited back
async fn awaited_lines<C>(conn: &C, event_id: i32) -> Result<Vec<AwaitedLine>, DomainError>
where
    C: ConnectionTrait,
{
    let rows = EventMaterial::find()
        .filter(event_material::Column::EventId.eq(event_id))
        .order_by_asc(event_material::Column::MaterialId)
        .find_also_related(Material)
        .all(conn)
        .await?;

    let line_ids: Vec<i32> = rows.iter().map(|(line, _)| line.id).collect();
    let assignments = if line_ids.is_empty() {
        Vec::new()
    } else {
        EventMaterialUnit::find()
            .filter(event_material_unit::Column::EventMaterialId.is_in(line_ids))
            .order_by_asc(event_material_unit::Column::Id)
            .all(conn)
            .await?
    };

    let mut units_by_line: HashMap<i32, Vec<AssignedUnit>> = HashMap::new();
    for assignment in assignments {
        units_by_line
            .entry(assignment.event_material_id)
            .or_default()
            .push(AssignedUnit {
                unit_id: assignment.material_unit_id,
                was_broken: assignment.is_broken,
                was_lost: assignment.is_lost,
            });
    }

    Ok(rows
        .into_iter()
        .map(|(line, material)| AwaitedLine {
            event_material_id: line.id,
            material_id: line.material_id,
            is_unitary: material.is_some_and(|m| m.is_unitary),
            awaited: line.quantity,
            previous: line.quantity_returned.map(|actual| PreviousReturn {
                actual,
                broken: line.quantity_broken,
            }),
            units: units_by_line.remove(&line.id).unwrap_or_default(),
        })
        .collect())
}

async fn adjust_counters<C>(
    conn: &C,
    material_id: i32,
    out_of_order_delta: i32,
    lost_delta: i32,
) -> Result<(), DomainError>
where
    C: ConnectionTrait,
{
    if out_of_order_delta == 0 && lost_delta == 0 {
        return Ok(());
    }

    let material = Material::find_by_id(material_id)
        .one(conn)
        .await?
        .ok_or(DomainError::not_found("material", material_id))?;

    let out_of_order = (material.out_of_order_quantity + out_of_order_delta).max(0);
    let lost = (material.lost_quantity + lost_delta).max(0);

    let mut active: material::ActiveModel = material.into();
    active.out_of_order_quantity = Set(out_of_order);
    active.lost_quantity = Set(lost);
    active.updated_at = Set(Utc::now().to_rfc3339());
    active.update(conn).await?;
    Ok(())
}

/// Takes back what the recorded return of `line` did to the catalog.
///
/// Bulk counters lose the broken and missing figures of that return; units
/// flagged through this line get their flags cleared. The line's own return
/// columns are left to the caller.
pub(crate) async fn revert_line_return<C>(
    conn: &C,
    line: &event_material::Model,
) -> Result<(), DomainError>
where
    C: ConnectionTrait,
{
    let Some(returned) = line.quantity_returned else {
        return Ok(());
    };
    let is_unitary = Material::find_by_id(line.material_id)
        .one(conn)
        .await?
        .is_some_and(|m| m.is_unitary);

    if !is_unitary {
        let missing = (line.quantity - returned).max(0);
        adjust_counters(conn, line.material_id, -line.quantity_broken, -missing).await?;
    } else {
        let flagged = EventMaterialUnit::find()
            .filter(event_material_unit::Column::EventMaterialId.eq(line.id))
            .filter(
                Condition::any()
                    .add(event_material_unit::Column::IsBroken.eq(true))
                    .add(event_material_unit::Column::IsLost.eq(true)),
            )
            .all(conn)
            .await?;

        for assignment in flagged {
            let mut update = MaterialUnit::update_many()
                .col_expr(
                    material_unit::Column::UpdatedAt,
                    Expr::value(Utc::now().to_rfc3339()),
                )
                .filter(material_unit::Column::Id.eq(assignment.material_unit_id));
            if assignment.is_broken {
                update = update.col_expr(material_unit::Column::IsBroken, Expr::value(false));
            }
            if assignment.is_lost {
                update = update.col_expr(material_unit::Column::IsLost, Expr::value(false));
            }
            update.exec(conn).await?;

            let mut active: event_material_unit::ActiveModel = assignment.into();
            active.is_broken = Set(false);
            active.is_lost = Set(false);
            active.update(conn).await?;
        }
    }

    tracing::info!("Return of event line #{} taken back", line.id);
    Ok(())
}

async fn apply_line<C>(conn: &C, plan: &LinePlan) -> Result<(), DomainError>
where
    C: ConnectionTrait,
{
    EventMaterial::update_many()
        .col_expr(
            event_material::Column::QuantityReturned,
            Expr::value(plan.actual),
        )
        .col_expr(
            event_material::Column::QuantityBroken,
            Expr::value(plan.broken),
        )
        .filter(event_material::Column::Id.eq(plan.event_material_id))
        .exec(conn)
        .await?;

    adjust_counters(
        conn,
        plan.material_id,
        plan.out_of_order_delta,
        plan.lost_delta,
    )
    .await?;

    for unit in &plan.units {
        EventMaterialUnit::update_many()
            .col_expr(
                event_material_unit::Column::IsBroken,
                Expr::value(unit.is_broken),
            )
            .col_expr(event_material_unit::Column::IsLost, Expr::value(unit.is_lost))
            .filter(event_material_unit::Column::EventMaterialId.eq(plan.event_material_id))
            .filter(event_material_unit::Column::MaterialUnitId.eq(unit.unit_id))
            .exec(conn)
            .await?;

        if unit.unit_broken.is_none() && unit.unit_lost.is_none() {
            continue;
        }
        let mut update = MaterialUnit::update_many()
            .col_expr(
                material_unit::Column::UpdatedAt,
                Expr::value(Utc::now().to_rfc3339()),
            )
            .filter(material_unit::Column::Id.eq(unit.unit_id));
        if let Some(is_broken) = unit.unit_broken {
            update = update.col_expr(material_unit::Column::IsBroken, Expr::value(is_broken));
        }
        if let Some(is_lost) = unit.unit_lost {
            update = update.col_expr(material_unit::Column::IsLost, Expr::value(is_lost));
        }
        update.exec(conn).await?;
    }

    Ok(())
}

/// Record the return inventory of an event.
///
/// Submitting the same figures again changes nothing; different figures
/// replace the previous ones.
pub async fn reconcile_return(
    db: &DatabaseConnection,
    event_id: i32,
    returned: Vec<ReturnedLine>,
) -> Result<ReturnOutcome, DomainError> {
    let txn = db.begin().await?;

    let event = Event::find_by_id(event_id)
        .filter(event::Column::DeletedAt.is_null())
        .one(&txn)
        .await?
        .ok_or(DomainError::not_found("event", event_id))?;

    let awaited = awaited_lines(&txn, event.id).await?;
    let plan = reconciliation::plan_return(&awaited, &returned)?;

    for line in &plan.lines {
        apply_line(&txn, line).await?;
    }

    let mut active: event::ActiveModel = event.into();
    active.is_return_inventory_done = Set(plan.outcome.done);
    active.updated_at = Set(Utc::now().to_rfc3339());
    active.update(&txn).await?;

    txn.commit().await?;

    if plan.outcome.notices.contains(&ReturnNotice::SomeMaterialCameBackBroken) {
        tracing::warn!("Event #{}: some material came back broken", event_id);
    }
    tracing::info!(
        "Event #{} return recorded, done: {}, {} discrepancy(ies)",
        event_id,
        plan.outcome.done,
        plan.outcome.discrepancies.len()
    );

    Ok(plan.outcome)
}
