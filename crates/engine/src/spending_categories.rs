//! Spending categories classify payments and optionally point at the budget
//! category they are planned under.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendingCategory {
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub budget_category_id: Option<Uuid>,
    pub is_active: bool,
}

impl From<Model> for SpendingCategory {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            family_id: model.family_id,
            name: model.name,
            budget_category_id: model.budget_category_id,
            is_active: model.is_active,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "spending_categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub name_norm: String,
    pub budget_category_id: Option<Uuid>,
    pub is_active: bool,
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
    #[sea_orm(
        belongs_to = "super::budget_categories::Entity",
        from = "Column::BudgetCategoryId",
        to = "super::budget_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    BudgetCategory,
}

impl Related<super::families::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Family.def()
    }
}

impl Related<super::budget_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetCategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
