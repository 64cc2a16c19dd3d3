//! Return inventory: awaited vs. actually returned material
//!
//! [`plan_return`] validates a submission against the event's ledger and
//! works out every write the store has to make. Counter changes are deltas
//! against the previous reconciliation of the same event, so submitting the
//! same figures twice changes nothing and a different submission replaces
//! the previous one.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::{DomainError, FieldErrors};

/// Figures stored by an earlier reconciliation of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviousReturn {
    pub actual: i32,
    pub broken: i32,
}

/// A unit assigned to the line, with the flags the last reconciliation left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignedUnit {
    pub unit_id: i32,
    pub was_broken: bool,
    pub was_lost: bool,
}

/// Ledger line as the event awaits it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwaitedLine {
    pub event_material_id: i32,
    pub material_id: i32,
    pub is_unitary: bool,
    pub awaited: i32,
    pub previous: Option<PreviousReturn>,
    pub units: Vec<AssignedUnit>,
}

/// Reported return figures for one material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnedLine {
    pub material_id: i32,
    pub actual: i32,
    #[serde(default)]
    pub broken: i32,
    #[serde(default)]
    pub broken_units: Vec<i32>,
    #[serde(default)]
    pub lost_units: Vec<i32>,
}

/// New flags for an assigned unit.
///
/// `unit_broken` / `unit_lost` are the values to write on the unit itself;
/// `None` leaves a flag some other event may have set untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitUpdate {
    pub unit_id: i32,
    pub is_broken: bool,
    pub is_lost: bool,
    pub unit_broken: Option<bool>,
    pub unit_lost: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePlan {
    pub event_material_id: i32,
    pub material_id: i32,
    pub actual: i32,
    pub broken: i32,
    pub out_of_order_delta: i32,
    pub lost_delta: i32,
    pub units: Vec<UnitUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub material_id: i32,
    pub awaited: i32,
    pub actual: i32,
    pub missing: i32,
    pub surplus: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnNotice {
    AllMaterialReturned,
    SomeMaterialIsMissing,
    SomeMaterialCameBackBroken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnOutcome {
    pub done: bool,
    pub discrepancies: Vec<Discrepancy>,
    pub has_broken: bool,
    pub notices: Vec<ReturnNotice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnPlan {
    pub lines: Vec<LinePlan>,
    pub outcome: ReturnOutcome,
}

fn missing_of(awaited: i32, actual: i32) -> i32 {
    (awaited - actual).max(0)
}

fn check_units(
    key: &str,
    awaited: &AwaitedLine,
    reported: &ReturnedLine,
    errors: &mut FieldErrors,
) {
    if !awaited.is_unitary {
        if !reported.broken_units.is_empty() || !reported.lost_units.is_empty() {
            errors.add(key, "Units can only be reported for unit-tracked materials");
        }
        return;
    }

    let assigned: HashSet<i32> = awaited.units.iter().map(|u| u.unit_id).collect();
    for unit_id in reported.broken_units.iter().chain(&reported.lost_units) {
        if !assigned.contains(unit_id) {
            errors.add(key, format!("Unit #{} is not assigned to this event", unit_id));
        }
    }

    let broken: HashSet<i32> = reported.broken_units.iter().copied().collect();
    let lost: HashSet<i32> = reported.lost_units.iter().copied().collect();
    if broken.len() != reported.broken_units.len() || lost.len() != reported.lost_units.len() {
        errors.add(key, "A unit is listed twice");
    }
    if broken.intersection(&lost).next().is_some() {
        errors.add(key, "A unit cannot be both broken and lost");
    }
    if reported.broken_units.len() as i32 != reported.broken {
        errors.add(
            key,
            format!(
                "{} broken unit(s) declared but {} selected",
                reported.broken,
                reported.broken_units.len()
            ),
        );
    }
    if reported.lost_units.len() as i32 > missing_of(awaited.awaited, reported.actual) {
        errors.add(key, "More units declared lost than are missing");
    }
}

/// Validates `submitted` against `awaited` and computes the writes.
///
/// Nothing is returned unless the whole submission is valid.
pub fn plan_return(
    awaited: &[AwaitedLine],
    submitted: &[ReturnedLine],
) -> Result<ReturnPlan, DomainError> {
    let mut errors = FieldErrors::new();
    let mut reported: BTreeMap<i32, &ReturnedLine> = BTreeMap::new();

    for line in submitted {
        let key = line.material_id.to_string();
        if reported.insert(line.material_id, line).is_some() {
            errors.add(&key, "Material is listed twice");
        }
        if !awaited.iter().any(|a| a.material_id == line.material_id) {
            errors.add(&key, "Material is not part of this event");
        }
    }

    let mut ordered: Vec<&AwaitedLine> = awaited.iter().collect();
    ordered.sort_by_key(|a| a.material_id);

    for line in &ordered {
        let key = line.material_id.to_string();
        let Some(returned) = reported.get(&line.material_id) else {
            errors.add(&key, "Returned quantity is missing");
            continue;
        };
        if returned.actual < 0 {
            errors.add(&key, "Returned quantity cannot be negative");
        }
        if returned.broken < 0 {
            errors.add(&key, "Broken quantity cannot be negative");
        }
        if returned.broken > returned.actual {
            errors.add(
                &key,
                "Broken quantity cannot be greater than returned quantity",
            );
        }
        check_units(&key, line, returned, &mut errors);
    }

    errors.into_result()?;

    let mut lines = Vec::with_capacity(ordered.len());
    let mut discrepancies = Vec::new();
    let mut has_broken = false;

    for line in ordered {
        let returned = reported[&line.material_id];
        let missing = missing_of(line.awaited, returned.actual);
        has_broken |= returned.broken > 0;

        if returned.actual != line.awaited {
            discrepancies.push(Discrepancy {
                material_id: line.material_id,
                awaited: line.awaited,
                actual: returned.actual,
                missing,
                surplus: (returned.actual - line.awaited).max(0),
            });
        }

        let (out_of_order_delta, lost_delta, units) = if line.is_unitary {
            let units = line
                .units
                .iter()
                .map(|unit| {
                    let is_broken = returned.broken_units.contains(&unit.unit_id);
                    let is_lost = returned.lost_units.contains(&unit.unit_id);
                    UnitUpdate {
                        unit_id: unit.unit_id,
                        is_broken,
                        is_lost,
                        unit_broken: (is_broken || unit.was_broken).then_some(is_broken),
                        unit_lost: (is_lost || unit.was_lost).then_some(is_lost),
                    }
                })
                .collect();
            (0, 0, units)
        } else {
            let previous_broken = line.previous.map(|p| p.broken).unwrap_or(0);
            let previous_missing = line
                .previous
                .map(|p| missing_of(line.awaited, p.actual))
                .unwrap_or(0);
            (
                returned.broken - previous_broken,
                missing - previous_missing,
                Vec::new(),
            )
        };

        lines.push(LinePlan {
            event_material_id: line.event_material_id,
            material_id: line.material_id,
            actual: returned.actual,
            broken: returned.broken,
            out_of_order_delta,
            lost_delta,
            units,
        });
    }

    let done = discrepancies.is_empty();
    let mut notices = vec![if done {
        ReturnNotice::AllMaterialReturned
    } else {
        ReturnNotice::SomeMaterialIsMissing
    }];
    if has_broken {
        notices.push(ReturnNotice::SomeMaterialCameBackBroken);
    }

    Ok(ReturnPlan {
        lines,
        outcome: ReturnOutcome {
            done,
            discrepancies,
            has_broken,
            notices,
        },
    })
}
