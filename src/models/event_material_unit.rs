use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Assignment of a serialized unit to a ledger line.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event_material_units")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub event_material_id: i32,
    pub material_unit_id: i32,
    /// Set by the return inventory of the event.
    pub is_broken: bool,
    pub is_lost: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event_material::Entity",
        from = "Column::EventMaterialId",
        to = "super::event_material::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    EventMaterial,
    #[sea_orm(
        belongs_to = "super::material_unit::Entity",
        from = "Column::MaterialUnitId",
        to = "super::material_unit::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    MaterialUnit,
}

impl Related<super::event_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventMaterial.def()
    }
}

impl Related<super::material_unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaterialUnit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
