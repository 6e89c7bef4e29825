//! Budget categories: named buckets with a target share of income.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Percentage;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCategory {
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub target_percentage: Percentage,
    pub color: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for BudgetCategory {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            family_id: model.family_id,
            name: model.name,
            target_percentage: Percentage::from_basis_points(model.target_bp),
            color: model.color,
            sort_order: model.sort_order,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budget_categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub name_norm: String,
    pub target_bp: i64,
    pub color: String,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::families::Entity",
        from = "Column::FamilyId",
        to = "super::families::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Family,
    #[sea_orm(has_many = "super::budget_allocations::Entity")]
    Allocations,
}

impl Related<super::families::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Family.def()
    }
}

impl Related<super::budget_allocations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Allocations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
