//! SeaORM implementation of LedgerRepository
//!
//! Borrows any connection, so the same queries serve plain reads and the
//! capacity re-check inside an event save transaction.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait,
};

use crate::domain::availability::{
    CommittedLine, CommittedUnit, DateRange, MaterialStock, StockKind, UnitSlot,
};
use crate::domain::{DomainError, LedgerRepository};
use crate::models::event::{self, Entity as EventEntity};
use crate::models::event_material::{self, Entity as EventMaterialEntity};
use crate::models::event_material_unit::{self, Entity as EventMaterialUnitEntity};
use crate::models::material::{self, Entity as MaterialEntity};
use crate::models::material_unit::{self, Entity as UnitEntity};

pub struct SeaOrmLedgerRepository<'a, C> {
    conn: &'a C,
}

impl<'a, C> SeaOrmLedgerRepository<'a, C>
where
    C: ConnectionTrait,
{
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl<'a, C> LedgerRepository for SeaOrmLedgerRepository<'a, C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn committed_lines(
        &self,
        period: &DateRange,
        exclude_event_id: Option<i32>,
        material_ids: &[i32],
    ) -> Result<Vec<CommittedLine>, DomainError> {
        if material_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = EventMaterialEntity::find()
            .inner_join(EventEntity)
            .filter(event::Column::DeletedAt.is_null())
            .filter(event::Column::StartDate.lte(period.end))
            .filter(event::Column::EndDate.gte(period.start))
            .filter(event_material::Column::MaterialId.is_in(material_ids.to_vec()));
        if let Some(event_id) = exclude_event_id {
            query = query.filter(event_material::Column::EventId.ne(event_id));
        }

        let lines = query.all(self.conn).await?;
        Ok(lines
            .into_iter()
            .map(|line| CommittedLine {
                event_id: line.event_id,
                material_id: line.material_id,
                quantity: line.quantity,
            })
            .collect())
    }

    async fn committed_units(
        &self,
        period: &DateRange,
        exclude_event_id: Option<i32>,
        material_ids: &[i32],
    ) -> Result<Vec<CommittedUnit>, DomainError> {
        if material_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = EventMaterialUnitEntity::find()
            .select_only()
            .column(event_material::Column::EventId)
            .column(event_material::Column::MaterialId)
            .column(event_material_unit::Column::MaterialUnitId)
            .inner_join(EventMaterialEntity)
            .join(JoinType::InnerJoin, event_material::Relation::Event.def())
            .filter(event::Column::DeletedAt.is_null())
            .filter(event::Column::StartDate.lte(period.end))
            .filter(event::Column::EndDate.gte(period.start))
            .filter(event_material::Column::MaterialId.is_in(material_ids.to_vec()));
        if let Some(event_id) = exclude_event_id {
            query = query.filter(event_material::Column::EventId.ne(event_id));
        }

        let rows: Vec<(i32, i32, i32)> = query.into_tuple().all(self.conn).await?;
        Ok(rows
            .into_iter()
            .map(|(event_id, material_id, unit_id)| CommittedUnit {
                event_id,
                material_id,
                unit_id,
            })
            .collect())
    }

    async fn stock_snapshots(
        &self,
        material_ids: &[i32],
    ) -> Result<Vec<MaterialStock>, DomainError> {
        if material_ids.is_empty() {
            return Ok(Vec::new());
        }

        let materials = MaterialEntity::find()
            .filter(material::Column::Id.is_in(material_ids.to_vec()))
            .filter(material::Column::DeletedAt.is_null())
            .all(self.conn)
            .await?;

        let unitary_ids: Vec<i32> = materials
            .iter()
            .filter(|m| m.is_unitary)
            .map(|m| m.id)
            .collect();
        let units = if unitary_ids.is_empty() {
            Vec::new()
        } else {
            UnitEntity::find()
                .filter(material_unit::Column::MaterialId.is_in(unitary_ids))
                .all(self.conn)
                .await?
        };

        Ok(materials
            .into_iter()
            .map(|m| {
                let kind = if m.is_unitary {
                    StockKind::Unitary {
                        units: units
                            .iter()
                            .filter(|u| u.material_id == m.id)
                            .map(|u| UnitSlot {
                                id: u.id,
                                serial_number: u.serial_number.clone(),
                                is_lost: u.is_lost,
                            })
                            .collect(),
                    }
                } else {
                    StockKind::Bulk {
                        stock_quantity: m.stock_quantity.unwrap_or(0),
                        out_of_order_quantity: m.out_of_order_quantity,
                    }
                };
                MaterialStock {
                    material_id: m.id,
                    name: m.name,
                    kind,
                }
            })
            .collect())
    }
}
