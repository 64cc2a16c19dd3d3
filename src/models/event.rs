use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub reference: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub is_confirmed: bool,
    pub is_billable: bool,
    pub is_return_inventory_done: bool,
    /// User who created the event (audit only).
    pub user_id: Option<i32>,
    pub created_at: String,
    pub updated_at: String,
    pub deleted_at: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::event_material::Entity")]
    Materials,
    #[sea_orm(has_many = "super::event_beneficiary::Entity")]
    Beneficiaries,
    #[sea_orm(has_many = "super::event_assignee::Entity")]
    Assignees,
}

impl Related<super::event_material::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Materials.def()
    }
}

impl Related<super::event_beneficiary::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Beneficiaries.def()
    }
}

impl Related<super::event_assignee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignees.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
