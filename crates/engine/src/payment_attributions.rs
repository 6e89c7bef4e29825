//! Links between a payment and the income events that fund it.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

/// `created_by` value for attributions produced by auto-attribute.
pub const SYSTEM_CREATOR: &str = "system";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionType {
    Manual,
    Automatic,
}

impl AttributionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

impl TryFrom<&str> for AttributionType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "manual" => Ok(Self::Manual),
            "automatic" => Ok(Self::Automatic),
            other => Err(EngineError::InvalidRequest(format!(
                "invalid attribution type: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAttribution {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub income_event_id: Uuid,
    pub amount: Money,
    pub attribution_type: AttributionType,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Model> for PaymentAttribution {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: model.id,
            payment_id: model.payment_id,
            income_event_id: model.income_event_id,
            amount: Money::new(model.amount_minor),
            attribution_type: AttributionType::try_from(model.attribution_type.as_str())?,
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_attributions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub payment_id: Uuid,
    pub income_event_id: Uuid,
    pub amount_minor: i64,
    pub attribution_type: String,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::payments::Entity",
        from = "Column::PaymentId",
        to = "super::payments::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Payment,
    #[sea_orm(
        belongs_to = "super::income_events::Entity",
        from = "Column::IncomeEventId",
        to = "super::income_events::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    IncomeEvent,
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl Related<super::income_events::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::IncomeEvent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
