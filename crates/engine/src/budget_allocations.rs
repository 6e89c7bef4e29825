//! Planned split of one income event across budget categories.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Money, Percentage};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetAllocation {
    pub id: Uuid,
    pub income_event_id: Uuid,
    pub budget_category_id: Uuid,
    pub amount: Money,
    pub percentage: Percentage,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for BudgetAllocation {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            income_event_id: model.income_event_id,
            budget_category_id: model.budget_category_id,
            amount: Money::new(model.amount_minor),
            percentage: Percentage::from_basis_points(model.percentage_bp),
            created_at: model.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budget_allocations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub income_event_id: Uuid,
    pub budget_category_id: Uuid,
    pub amount_minor: i64,
    pub percentage_bp: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::income_events::Entity",
        from = "Column::IncomeEventId",
        to = "super::income_events::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    IncomeEvent,
    #[sea_orm(
        belongs_to = "super::budget_categories::Entity",
        from = "Column::BudgetCategoryId",
        to = "super::budget_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    BudgetCategory,
}

impl Related<super::income_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IncomeEvent.def()
    }
}

impl Related<super::budget_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetCategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
