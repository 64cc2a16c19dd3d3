//! Material availability over a date range
//!
//! Pure computations over snapshots loaded by a [`LedgerRepository`]:
//! what other overlapping events already hold, what is left, and which
//! serialized units a booking gets.
//!
//! [`LedgerRepository`]: super::LedgerRepository

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{DomainError, FieldErrors};

/// Inclusive booking period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, DomainError> {
        if start > end {
            return Err(DomainError::validation(
                "end_date",
                "End date must be later than or equal to start date",
            ));
        }
        Ok(Self { start, end })
    }

    /// Two periods overlap when they share at least one instant, endpoints included.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        other.start <= self.end && other.end >= self.start
    }

    pub fn contains(&self, other: &DateRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Number of calendar days touched by the period (a same-day booking is one day).
    pub fn duration_days(&self) -> i64 {
        (self.end.date() - self.start.date()).num_days() + 1
    }
}

/// One requested (material, quantity) line, optionally pinning units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    pub material_id: i32,
    pub quantity: i32,
    #[serde(default)]
    pub units: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSlot {
    pub id: i32,
    pub serial_number: String,
    pub is_lost: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockKind {
    Bulk {
        stock_quantity: i32,
        out_of_order_quantity: i32,
    },
    Unitary {
        units: Vec<UnitSlot>,
    },
}

/// What the catalog holds for a material at query time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialStock {
    pub material_id: i32,
    pub name: String,
    pub kind: StockKind,
}

impl MaterialStock {
    pub fn is_unitary(&self) -> bool {
        matches!(self.kind, StockKind::Unitary { .. })
    }
}

/// A ledger line of another event overlapping the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedLine {
    pub event_id: i32,
    pub material_id: i32,
    pub quantity: i32,
}

/// A unit assigned to another event overlapping the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedUnit {
    pub event_id: i32,
    pub material_id: i32,
    pub unit_id: i32,
}

/// Everything other events hold over the period.
#[derive(Debug, Clone, Default)]
pub struct Commitments {
    quantities: HashMap<i32, i32>,
    units: HashSet<i32>,
}

impl Commitments {
    pub fn new(lines: &[CommittedLine], units: &[CommittedUnit]) -> Self {
        let mut quantities = HashMap::new();
        for line in lines {
            *quantities.entry(line.material_id).or_insert(0) += line.quantity;
        }
        Self {
            quantities,
            units: units.iter().map(|u| u.unit_id).collect(),
        }
    }

    pub fn quantity(&self, material_id: i32) -> i32 {
        self.quantities.get(&material_id).copied().unwrap_or(0)
    }

    pub fn holds_unit(&self, unit_id: i32) -> bool {
        self.units.contains(&unit_id)
    }
}

/// Outcome of the calculation for one material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaterialAvailability {
    pub material_id: i32,
    pub name: String,
    pub requested: i32,
    pub available: i32,
    pub sufficient: bool,
    /// Units that would be assigned, pinned ones first then by serial number.
    pub units: Vec<i32>,
}

/// A shortage on an event line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingMaterial {
    pub material_id: i32,
    pub name: String,
    pub requested: i32,
    pub available: i32,
    pub missing: i32,
}

/// Free units of a unitary material, ordered by serial number.
fn free_units<'a>(units: &'a [UnitSlot], commitments: &Commitments) -> Vec<&'a UnitSlot> {
    let mut free: Vec<&UnitSlot> = units
        .iter()
        .filter(|u| !u.is_lost && !commitments.holds_unit(u.id))
        .collect();
    free.sort_by(|a, b| a.serial_number.cmp(&b.serial_number).then(a.id.cmp(&b.id)));
    free
}

/// Quantity still bookable for `stock` once other events are served.
pub fn available_quantity(stock: &MaterialStock, commitments: &Commitments) -> i32 {
    match &stock.kind {
        StockKind::Bulk {
            stock_quantity,
            out_of_order_quantity,
        } => (stock_quantity - out_of_order_quantity - commitments.quantity(stock.material_id))
            .max(0),
        StockKind::Unitary { units } => free_units(units, commitments).len() as i32,
    }
}

fn evaluate(
    stock: &MaterialStock,
    commitments: &Commitments,
    line: &RequestedLine,
    errors: &mut FieldErrors,
) -> MaterialAvailability {
    let key = line.material_id.to_string();
    let available = available_quantity(stock, commitments);

    let units = match &stock.kind {
        StockKind::Bulk { .. } => {
            if !line.units.is_empty() {
                errors.add(&key, "Units can only be picked for unit-tracked materials");
            }
            Vec::new()
        }
        StockKind::Unitary { units } => {
            let free = free_units(units, commitments);
            let free_ids: HashSet<i32> = free.iter().map(|u| u.id).collect();

            let mut pinned: Vec<i32> = Vec::with_capacity(line.units.len());
            for unit_id in &line.units {
                if pinned.contains(unit_id) {
                    errors.add(&key, format!("Unit #{} is listed twice", unit_id));
                    continue;
                }
                match units.iter().find(|u| u.id == *unit_id) {
                    None => errors.add(
                        &key,
                        format!("Unit #{} does not belong to this material", unit_id),
                    ),
                    Some(u) if u.is_lost => {
                        errors.add(&key, format!("Unit '{}' is lost", u.serial_number))
                    }
                    Some(u) if !free_ids.contains(&u.id) => errors.add(
                        &key,
                        format!(
                            "Unit '{}' is already assigned to an overlapping event",
                            u.serial_number
                        ),
                    ),
                    Some(_) => pinned.push(*unit_id),
                }
            }
            if line.units.len() as i32 > line.quantity {
                errors.add(
                    &key,
                    format!(
                        "{} units picked but only {} requested",
                        line.units.len(),
                        line.quantity
                    ),
                );
            }

            let wanted = line.quantity.max(0) as usize;
            let mut chosen = pinned.clone();
            chosen.extend(
                free.iter()
                    .map(|u| u.id)
                    .filter(|id| !pinned.contains(id))
                    .take(wanted.saturating_sub(pinned.len())),
            );
            chosen.truncate(wanted);
            chosen
        }
    };

    MaterialAvailability {
        material_id: line.material_id,
        name: stock.name.clone(),
        requested: line.quantity,
        available,
        sufficient: line.quantity <= available,
        units,
    }
}

fn sorted_lines(lines: &[RequestedLine]) -> BTreeMap<i32, &RequestedLine> {
    lines.iter().map(|l| (l.material_id, l)).collect()
}

/// Availability of every requested line, without failing on shortages.
///
/// A material missing from `stocks` (unknown or trashed) is `NotFound`;
/// invalid unit picks are a validation error keyed by material id.
pub fn availability_report(
    stocks: &[MaterialStock],
    commitments: &Commitments,
    lines: &[RequestedLine],
) -> Result<Vec<MaterialAvailability>, DomainError> {
    let by_id: HashMap<i32, &MaterialStock> = stocks.iter().map(|s| (s.material_id, s)).collect();
    let lines = sorted_lines(lines);
    if let Some(unknown) = lines.keys().find(|id| !by_id.contains_key(id)) {
        return Err(DomainError::not_found("material", *unknown));
    }

    let mut errors = FieldErrors::new();
    let mut report = Vec::with_capacity(lines.len());
    for (material_id, line) in lines {
        report.push(evaluate(by_id[&material_id], commitments, line, &mut errors));
    }

    errors.into_result()?;
    Ok(report)
}

/// Booking gate: every line must fit, the first shortage (by material id) fails.
pub fn allocate(
    stocks: &[MaterialStock],
    commitments: &Commitments,
    lines: &[RequestedLine],
) -> Result<Vec<MaterialAvailability>, DomainError> {
    let report = availability_report(stocks, commitments, lines)?;

    if let Some(short) = report.iter().find(|a| !a.sufficient) {
        return Err(DomainError::InsufficientStock {
            material_id: short.material_id,
            requested: short.requested,
            available: short.available,
        });
    }

    Ok(report)
}

/// Lines of an event that other overlapping events leave short.
pub fn missing_materials(
    stocks: &[MaterialStock],
    commitments: &Commitments,
    lines: &[RequestedLine],
) -> Vec<MissingMaterial> {
    let by_id: HashMap<i32, &MaterialStock> = stocks.iter().map(|s| (s.material_id, s)).collect();

    sorted_lines(lines)
        .into_values()
        .filter_map(|line| {
            let stock = by_id.get(&line.material_id)?;
            let available = available_quantity(stock, commitments);
            let missing = line.quantity - available;
            (missing > 0).then(|| MissingMaterial {
                material_id: line.material_id,
                name: stock.name.clone(),
                requested: line.quantity,
                available,
                missing,
            })
        })
        .collect()
}

/// Largest quantity held during the period of any one of `bookings`,
/// counting every booking that overlaps it, that one included.
pub fn peak_commitment(bookings: &[(DateRange, i32)]) -> i32 {
    bookings
        .iter()
        .map(|(period, _)| {
            bookings
                .iter()
                .filter(|(other, _)| period.overlaps(other))
                .map(|(_, quantity)| quantity)
                .sum::<i32>()
        })
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn range(from: u32, to: u32) -> DateRange {
        DateRange::new(day(from), day(to).date().and_hms_opt(23, 59, 59).unwrap()).unwrap()
    }

    fn bulk(id: i32, stock: i32, out_of_order: i32) -> MaterialStock {
        MaterialStock {
            material_id: id,
            name: format!("Material {}", id),
            kind: StockKind::Bulk {
                stock_quantity: stock,
                out_of_order_quantity: out_of_order,
            },
        }
    }

    fn unitary(id: i32, serials: &[(i32, &str, bool)]) -> MaterialStock {
        MaterialStock {
            material_id: id,
            name: format!("Material {}", id),
            kind: StockKind::Unitary {
                units: serials
                    .iter()
                    .map(|(uid, serial, lost)| UnitSlot {
                        id: *uid,
                        serial_number: serial.to_string(),
                        is_lost: *lost,
                    })
                    .collect(),
            },
        }
    }

    fn line(material_id: i32, quantity: i32) -> RequestedLine {
        RequestedLine {
            material_id,
            quantity,
            units: Vec::new(),
        }
    }

    #[test]
    fn test_overlap_is_inclusive() {
        let a = range(1, 5);
        assert!(a.overlaps(&range(5, 7)));
        assert!(a.overlaps(&range(3, 3)));
        assert!(!a.overlaps(&range(6, 7)));

        let instant = DateRange::new(day(5), day(5)).unwrap();
        assert!(instant.overlaps(&DateRange::new(day(5), day(5)).unwrap()));
        assert_eq!(instant.duration_days(), 1);
        assert_eq!(range(1, 5).duration_days(), 5);
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        assert!(matches!(
            DateRange::new(day(5), day(1)),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_overlapping_booking_exceeds_bulk_stock() {
        let stocks = vec![bulk(1, 10, 0)];
        let commitments = Commitments::new(
            &[CommittedLine {
                event_id: 1,
                material_id: 1,
                quantity: 4,
            }],
            &[],
        );

        match allocate(&stocks, &commitments, &[line(1, 7)]) {
            Err(DomainError::InsufficientStock {
                material_id,
                requested,
                available,
            }) => {
                assert_eq!(material_id, 1);
                assert_eq!(requested, 7);
                assert_eq!(available, 6);
            }
            other => panic!("expected insufficient stock, got {:?}", other),
        }

        let granted = allocate(&stocks, &commitments, &[line(1, 6)]).unwrap();
        assert!(granted[0].sufficient);
    }

    #[test]
    fn test_out_of_order_reduces_availability() {
        let stocks = vec![bulk(1, 10, 3)];
        let report = availability_report(&stocks, &Commitments::default(), &[line(1, 8)]).unwrap();
        assert_eq!(report[0].available, 7);
        assert!(!report[0].sufficient);
    }

    #[test]
    fn test_units_allocated_by_serial_number() {
        let stocks = vec![unitary(
            2,
            &[(10, "SN-003", false), (11, "SN-001", false), (12, "SN-002", true), (13, "SN-004", false)],
        )];
        let commitments = Commitments::new(
            &[],
            &[CommittedUnit {
                event_id: 9,
                material_id: 2,
                unit_id: 11,
            }],
        );

        let granted = allocate(&stocks, &commitments, &[line(2, 2)]).unwrap();
        assert_eq!(granted[0].available, 2);
        assert_eq!(granted[0].units, vec![10, 13]);

        assert!(matches!(
            allocate(&stocks, &commitments, &[line(2, 3)]),
            Err(DomainError::InsufficientStock { available: 2, .. })
        ));
    }

    #[test]
    fn test_pinned_units_come_first() {
        let stocks = vec![unitary(2, &[(10, "A", false), (11, "B", false), (12, "C", false)])];
        let request = RequestedLine {
            material_id: 2,
            quantity: 2,
            units: vec![12],
        };
        let granted = allocate(&stocks, &Commitments::default(), &[request]).unwrap();
        assert_eq!(granted[0].units, vec![12, 10]);
    }

    #[test]
    fn test_invalid_pins_are_validation_errors() {
        let stocks = vec![unitary(2, &[(10, "A", false), (11, "B", true)]), bulk(3, 5, 0)];
        let commitments = Commitments::new(
            &[],
            &[CommittedUnit {
                event_id: 9,
                material_id: 2,
                unit_id: 10,
            }],
        );
        let lines = vec![
            RequestedLine {
                material_id: 2,
                quantity: 1,
                units: vec![10, 11, 99],
            },
            RequestedLine {
                material_id: 3,
                quantity: 1,
                units: vec![10],
            },
        ];

        match allocate(&stocks, &commitments, &lines) {
            Err(DomainError::Validation(errors)) => {
                assert_eq!(errors.get("2").map(|m| m.len()), Some(4));
                assert!(errors.contains("3"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_material_is_not_found() {
        let stocks = vec![bulk(1, 5, 0)];
        let result = availability_report(&stocks, &Commitments::default(), &[line(1, 1), line(42, 1)]);
        assert!(matches!(
            result,
            Err(DomainError::NotFound {
                entity: "material",
                id: 42
            })
        ));
    }

    #[test]
    fn test_missing_materials_lists_shortages_only() {
        let stocks = vec![bulk(1, 10, 0), bulk(2, 3, 1)];
        let commitments = Commitments::new(
            &[CommittedLine {
                event_id: 5,
                material_id: 1,
                quantity: 8,
            }],
            &[],
        );

        let missing = missing_materials(&stocks, &commitments, &[line(1, 4), line(2, 2)]);
        assert_eq!(
            missing,
            vec![MissingMaterial {
                material_id: 1,
                name: "Material 1".to_string(),
                requested: 4,
                available: 2,
                missing: 2,
            }]
        );
    }

    #[test]
    fn test_peak_commitment_counts_overlapping_bookings() {
        assert_eq!(peak_commitment(&[]), 0);

        let bookings = vec![(range(1, 3), 4), (range(3, 5), 2), (range(8, 9), 5)];
        assert_eq!(peak_commitment(&bookings), 6);

        let bookings = vec![(range(1, 2), 4), (range(4, 5), 3)];
        assert_eq!(peak_commitment(&bookings), 4);
    }
}
