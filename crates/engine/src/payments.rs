//! Payments (outflows) owed by a family.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Once,
    Recurring,
}

impl PaymentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Recurring => "recurring",
        }
    }
}

impl TryFrom<&str> for PaymentType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "once" => Ok(Self::Once),
            "recurring" => Ok(Self::Recurring),
            other => Err(EngineError::InvalidRequest(format!(
                "invalid payment type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Scheduled,
    Paid,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for PaymentStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "scheduled" => Ok(Self::Scheduled),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidRequest(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub family_id: Uuid,
    pub payee: String,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub spending_category_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Model> for Payment {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            family_id: model.family_id,
            payee: model.payee,
            amount: Money::new(model.amount_minor),
            due_date: model.due_date,
            paid_date: model.paid_date,
            payment_type: PaymentType::try_from(model.payment_type.as_str())?,
            status: PaymentStatus::try_from(model.status.as_str())?,
            spending_category_id: model.spending_category_id,
            notes: model.notes,
            created_at: model.created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub family_id: Uuid,
    pub payee: String,
    pub amount_minor: i64,
    pub due_date: Date,
    pub paid_date: Option<Date>,
    pub payment_type: String,
    pub status: String,
    pub spending_category_id: Option<Uuid>,
    pub notes: Option<String>,
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
    #[sea_orm(
        belongs_to = "super::spending_categories::Entity",
        from = "Column::SpendingCategoryId",
        to = "super::spending_categories::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    SpendingCategory,
    #[sea_orm(has_many = "super::payment_attributions::Entity")]
    Attributions,
}

impl Related<super::families::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Family.def()
    }
}

impl Related<super::spending_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SpendingCategory.def()
    }
}

impl Related<super::payment_attributions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
