//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::availability::{CommittedLine, CommittedUnit, DateRange, MaterialStock};
use super::DomainError;

/// Condition of a serialized unit, in display order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum UnitState {
    #[default]
    StateOfUse,
    Excellent,
    BrandNew,
    Bad,
    Outdated,
}

impl UnitState {
    pub const ALL: [UnitState; 5] = [
        UnitState::StateOfUse,
        UnitState::Excellent,
        UnitState::BrandNew,
        UnitState::Bad,
        UnitState::Outdated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UnitState::StateOfUse => "state-of-use",
            UnitState::Excellent => "excellent",
            UnitState::BrandNew => "brand-new",
            UnitState::Bad => "bad",
            UnitState::Outdated => "outdated",
        }
    }

    pub fn order(&self) -> u8 {
        match self {
            UnitState::StateOfUse => 1,
            UnitState::Excellent => 2,
            UnitState::BrandNew => 3,
            UnitState::Bad => 4,
            UnitState::Outdated => 5,
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| DomainError::validation("state", format!("Unknown unit state '{}'", s)))
    }
}

/// Serialized unit of a unit-tracked material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: i32,
    pub material_id: i32,
    pub serial_number: String,
    pub is_broken: bool,
    pub is_lost: bool,
    pub person_id: Option<i32>,
    pub state: UnitState,
}

/// Material data for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: i32,
    pub name: String,
    pub reference: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub sub_category_id: Option<i32>,
    pub park_id: Option<i32>,
    pub is_unitary: bool,
    /// Bulk materials only; for unit-tracked ones this is the number of units.
    pub stock_quantity: i32,
    pub out_of_order_quantity: i32,
    pub lost_quantity: i32,
    pub rental_price: f64,
    pub replacement_price: Option<f64>,
    pub is_deleted: bool,
    pub units: Vec<Unit>,
}

/// Filter criteria for material queries
#[derive(Debug, Default, Clone, Deserialize)]
pub struct MaterialFilter {
    pub park_id: Option<i32>,
    pub category_id: Option<i32>,
    #[serde(default)]
    pub deleted: bool,
}

/// Input for creating a material
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMaterialInput {
    pub name: String,
    pub reference: String,
    pub description: Option<String>,
    pub category_id: Option<i32>,
    pub sub_category_id: Option<i32>,
    pub park_id: Option<i32>,
    #[serde(default)]
    pub is_unitary: bool,
    pub stock_quantity: Option<i32>,
    #[serde(default)]
    pub out_of_order_quantity: i32,
    #[serde(default)]
    pub rental_price: f64,
    pub replacement_price: Option<f64>,
}

/// Input for updating a material
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMaterialInput {
    pub name: Option<String>,
    pub reference: Option<String>,
    pub description: Option<Option<String>>,
    pub category_id: Option<Option<i32>>,
    pub sub_category_id: Option<Option<i32>>,
    pub park_id: Option<Option<i32>>,
    pub stock_quantity: Option<i32>,
    pub out_of_order_quantity: Option<i32>,
    pub rental_price: Option<f64>,
    pub replacement_price: Option<Option<f64>>,
}

/// Input for adding a unit to a material
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUnitInput {
    pub serial_number: String,
    #[serde(default)]
    pub state: UnitState,
    pub person_id: Option<i32>,
    #[serde(default)]
    pub is_broken: bool,
}

/// Input for updating a unit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUnitInput {
    pub serial_number: Option<String>,
    pub state: Option<UnitState>,
    pub person_id: Option<Option<i32>>,
    pub is_broken: Option<bool>,
    pub is_lost: Option<bool>,
}

/// What a delete call did to a soft-deletable record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Trashed,
    Destroyed,
}

/// Repository trait for the material catalog
#[async_trait]
pub trait MaterialRepository: Send + Sync {
    /// Find all materials matching the filter, ordered by name
    async fn find_all(&self, filter: MaterialFilter) -> Result<Vec<Material>, DomainError>;

    /// Find a material by ID, trashed ones included, with its units
    async fn find_by_id(&self, id: i32) -> Result<Option<Material>, DomainError>;

    /// Create a new material
    async fn create(&self, input: CreateMaterialInput) -> Result<Material, DomainError>;

    /// Update a material
    async fn update(&self, id: i32, input: UpdateMaterialInput) -> Result<Material, DomainError>;

    /// Trash a live material, destroy a trashed one
    async fn delete(&self, id: i32) -> Result<DeleteOutcome, DomainError>;

    /// Bring a trashed material back
    async fn restore(&self, id: i32) -> Result<Material, DomainError>;

    /// Add a serialized unit to a unit-tracked material
    async fn add_unit(&self, material_id: i32, input: CreateUnitInput)
        -> Result<Unit, DomainError>;

    /// Update a unit of a material
    async fn update_unit(
        &self,
        material_id: i32,
        unit_id: i32,
        input: UpdateUnitInput,
    ) -> Result<Unit, DomainError>;

    /// Remove a unit that no event references
    async fn remove_unit(&self, material_id: i32, unit_id: i32) -> Result<(), DomainError>;
}

/// Read side of the event ledger used by the availability calculator.
///
/// Only the query shapes availability needs: what overlapping events hold
/// and what the catalog has. Trashed events never show up.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Lines of events overlapping `period` for the given materials
    async fn committed_lines(
        &self,
        period: &DateRange,
        exclude_event_id: Option<i32>,
        material_ids: &[i32],
    ) -> Result<Vec<CommittedLine>, DomainError>;

    /// Units assigned to events overlapping `period` for the given materials
    async fn committed_units(
        &self,
        period: &DateRange,
        exclude_event_id: Option<i32>,
        material_ids: &[i32],
    ) -> Result<Vec<CommittedUnit>, DomainError>;

    /// Stock of the given live materials; unknown or trashed ids are left out
    async fn stock_snapshots(&self, material_ids: &[i32])
        -> Result<Vec<MaterialStock>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_states_in_display_order() {
        let orders: Vec<u8> = UnitState::ALL.iter().map(UnitState::order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5]);
        assert_eq!("brand-new".parse::<UnitState>().unwrap(), UnitState::BrandNew);
        assert!("broken".parse::<UnitState>().is_err());
        assert_eq!(
            serde_json::to_string(&UnitState::StateOfUse).unwrap(),
            "\"state-of-use\""
        );
    }
}
