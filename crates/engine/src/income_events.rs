//! Income events: scheduled or received inflows of money.
//!
//! An income event carries its own attribution bookkeeping:
//! `allocated_amount + remaining_amount == amount` at all times. The two
//! counters are only ever written through the attribution ledger path.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Once,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Annual,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Once => "once",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Annual => "annual",
        }
    }
}

impl TryFrom<&str> for Frequency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "once" => Ok(Self::Once),
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "annual" => Ok(Self::Annual),
            other => Err(EngineError::InvalidRequest(format!(
                "invalid frequency: {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeStatus {
    Scheduled,
    Received,
    Cancelled,
}

impl IncomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Received => "received",
            Self::Cancelled => "cancelled",
        }
    }
}

impl TryFrom<&str> for IncomeStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "scheduled" => Ok(Self::Scheduled),
            "received" => Ok(Self::Received),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidRequest(format!(
                "invalid income status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeEvent {
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub amount: Money,
    pub scheduled_date: NaiveDate,
    pub actual_date: Option<NaiveDate>,
    pub frequency: Frequency,
    pub status: IncomeStatus,
    pub allocated_amount: Money,
    pub remaining_amount: Money,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Model> for IncomeEvent {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            family_id: model.family_id,
            name: model.name,
            amount: Money::new(model.amount_minor),
            scheduled_date: model.scheduled_date,
            actual_date: model.actual_date,
            frequency: Frequency::try_from(model.frequency.as_str())?,
            status: IncomeStatus::try_from(model.status.as_str())?,
            allocated_amount: Money::new(model.allocated_minor),
            remaining_amount: Money::new(model.remaining_minor),
            notes: model.notes,
            created_at: model.created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "income_events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub family_id: Uuid,
    pub name: String,
    pub amount_minor: i64,
    pub scheduled_date: Date,
    pub actual_date: Option<Date>,
    pub frequency: String,
    pub status: String,
    pub allocated_minor: i64,
    pub remaining_minor: i64,
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
    #[sea_orm(has_many = "super::budget_allocations::Entity")]
    Allocations,
    #[sea_orm(has_many = "super::payment_attributions::Entity")]
    Attributions,
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

impl Related<super::payment_attributions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attributions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
