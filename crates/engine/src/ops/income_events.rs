use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveValue, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Frequency, IncomeEvent, IncomeStatus, Money, ResultEngine, budget_allocations,
    income_events, payment_attributions,
    util::{normalize_display_name, normalize_optional_text, require_positive_amount},
};

use super::{Caller, Engine, ledger::reset_income_amount, with_tx};

#[derive(Clone, Debug)]
pub struct IncomeEventNew {
    pub name: String,
    pub amount: Money,
    pub scheduled_date: NaiveDate,
    pub frequency: Frequency,
    pub notes: Option<String>,
}

/// Partial update. `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct IncomeEventUpdate {
    pub name: Option<String>,
    pub amount: Option<Money>,
    pub scheduled_date: Option<NaiveDate>,
    pub frequency: Option<Frequency>,
    pub notes: Option<String>,
}

/// Filters for listing income events. Both dates are inclusive.
#[derive(Clone, Debug, Default)]
pub struct IncomeEventFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<IncomeStatus>,
}

impl Engine {
    pub async fn create_income_event(
        &self,
        caller: &Caller,
        new: IncomeEventNew,
    ) -> ResultEngine<IncomeEvent> {
        caller.require_write()?;
        let name = normalize_display_name(&new.name, "income event")?;
        require_positive_amount(new.amount, "income amount")?;

        let model = income_events::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            family_id: ActiveValue::Set(caller.family_id),
            name: ActiveValue::Set(name),
            amount_minor: ActiveValue::Set(new.amount.cents()),
            scheduled_date: ActiveValue::Set(new.scheduled_date),
            actual_date: ActiveValue::Set(None),
            frequency: ActiveValue::Set(new.frequency.as_str().to_string()),
            status: ActiveValue::Set(IncomeStatus::Scheduled.as_str().to_string()),
            allocated_minor: ActiveValue::Set(0),
            remaining_minor: ActiveValue::Set(new.amount.cents()),
            notes: ActiveValue::Set(normalize_optional_text(new.notes.as_deref())),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.database)
        .await?;

        tracing::debug!(income_event_id = %model.id, amount = %new.amount, "income event created");
        IncomeEvent::try_from(model)
    }

    pub async fn income_event(&self, caller: &Caller, id: Uuid) -> ResultEngine<IncomeEvent> {
        let model = self
            .require_income_event_in_family(&self.database, caller.family_id, id)
            .await?;
        IncomeEvent::try_from(model)
    }

    pub async fn list_income_events(
        &self,
        caller: &Caller,
        filter: &IncomeEventFilter,
    ) -> ResultEngine<Vec<IncomeEvent>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to)
            && from > to
        {
            return Err(EngineError::InvalidRequest(
                "invalid range: from must be <= to".to_string(),
            ));
        }

        let mut query = income_events::Entity::find()
            .filter(income_events::Column::FamilyId.eq(caller.family_id))
            .order_by_asc(income_events::Column::ScheduledDate)
            .order_by_asc(income_events::Column::CreatedAt);
        if let Some(from) = filter.from {
            query = query.filter(income_events::Column::ScheduledDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(income_events::Column::ScheduledDate.lte(to));
        }
        if let Some(status) = filter.status {
            query = query.filter(income_events::Column::Status.eq(status.as_str()));
        }

        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(IncomeEvent::try_from)
            .collect()
    }

    /// Updates descriptive fields of an income event.
    ///
    /// The amount can only change while nothing is attributed against the
    /// event and no allocations were generated from it.
    pub async fn update_income_event(
        &self,
        caller: &Caller,
        id: Uuid,
        update: IncomeEventUpdate,
    ) -> ResultEngine<IncomeEvent> {
        caller.require_write()?;
        let name = update
            .name
            .as_deref()
            .map(|n| normalize_display_name(n, "income event"))
            .transpose()?;

        with_tx!(self, |db_tx| {
            let model = self
                .require_income_event_in_family(&db_tx, caller.family_id, id)
                .await?;
            let status = IncomeStatus::try_from(model.status.as_str())?;
            if status == IncomeStatus::Cancelled {
                return Err(EngineError::InvalidRequest(
                    "cannot update a cancelled income event".to_string(),
                ));
            }

            if status == IncomeStatus::Received {
                let amount_changed = update
                    .amount
                    .is_some_and(|amount| amount.cents() != model.amount_minor);
                let date_changed = update
                    .scheduled_date
                    .is_some_and(|date| date != model.scheduled_date);
                if amount_changed || date_changed {
                    return Err(EngineError::InvalidRequest(
                        "amount and scheduled date of a received income event are fixed"
                            .to_string(),
                    ));
                }
            }

            let mut active: income_events::ActiveModel = model.clone().into();
            if let Some(name) = name {
                active.name = ActiveValue::Set(name);
            }
            if let Some(date) = update.scheduled_date {
                active.scheduled_date = ActiveValue::Set(date);
            }
            if let Some(frequency) = update.frequency {
                active.frequency = ActiveValue::Set(frequency.as_str().to_string());
            }
            if update.notes.is_some() {
                active.notes = ActiveValue::Set(normalize_optional_text(update.notes.as_deref()));
            }
            let mut current = model.clone();
            if let Some(amount) = update.amount
                && amount.cents() != model.amount_minor
            {
                require_positive_amount(amount, "income amount")?;
                let allocations = budget_allocations::Entity::find()
                    .filter(budget_allocations::Column::IncomeEventId.eq(id))
                    .count(&db_tx)
                    .await?;
                if allocations > 0 {
                    return Err(EngineError::InvalidRequest(
                        "cannot change the amount of an income event with allocations; delete them first"
                            .to_string(),
                    ));
                }
                current = reset_income_amount(&db_tx, &model, amount).await?;
            }

            let updated = if active.is_changed() {
                active.update(&db_tx).await?
            } else {
                current
            };
            IncomeEvent::try_from(updated)
        })
    }

    /// Marks an income event as received on `actual_date` (today if absent).
    pub async fn receive_income_event(
        &self,
        caller: &Caller,
        id: Uuid,
        actual_date: Option<NaiveDate>,
    ) -> ResultEngine<IncomeEvent> {
        caller.require_write()?;
        with_tx!(self, |db_tx| {
            let model = self
                .require_income_event_in_family(&db_tx, caller.family_id, id)
                .await?;
            match IncomeStatus::try_from(model.status.as_str())? {
                IncomeStatus::Scheduled => {}
                IncomeStatus::Received => {
                    return Err(EngineError::InvalidRequest(
                        "income event already received".to_string(),
                    ));
                }
                IncomeStatus::Cancelled => {
                    return Err(EngineError::InvalidRequest(
                        "cannot receive a cancelled income event".to_string(),
                    ));
                }
            }
            let active = income_events::ActiveModel {
                id: ActiveValue::Set(id),
                status: ActiveValue::Set(IncomeStatus::Received.as_str().to_string()),
                actual_date: ActiveValue::Set(Some(
                    actual_date.unwrap_or_else(|| Utc::now().date_naive()),
                )),
                ..Default::default()
            };
            let updated = active.update(&db_tx).await?;
            IncomeEvent::try_from(updated)
        })
    }

    /// Cancels an income event. Events that fund payments cannot be cancelled.
    pub async fn cancel_income_event(&self, caller: &Caller, id: Uuid) -> ResultEngine<IncomeEvent> {
        caller.require_write()?;
        with_tx!(self, |db_tx| {
            let model = self
                .require_income_event_in_family(&db_tx, caller.family_id, id)
                .await?;
            if IncomeStatus::try_from(model.status.as_str())? == IncomeStatus::Cancelled {
                return Err(EngineError::InvalidRequest(
                    "income event already cancelled".to_string(),
                ));
            }
            ensure_unattributed(&db_tx, &model).await?;

            let active = income_events::ActiveModel {
                id: ActiveValue::Set(id),
                status: ActiveValue::Set(IncomeStatus::Cancelled.as_str().to_string()),
                ..Default::default()
            };
            let updated = active.update(&db_tx).await?;
            IncomeEvent::try_from(updated)
        })
    }

    /// Deletes an income event and its allocations.
    pub async fn delete_income_event(&self, caller: &Caller, id: Uuid) -> ResultEngine<()> {
        caller.require_write()?;
        with_tx!(self, |db_tx| {
            let model = self
                .require_income_event_in_family(&db_tx, caller.family_id, id)
                .await?;
            ensure_unattributed(&db_tx, &model).await?;

            budget_allocations::Entity::delete_many()
                .filter(budget_allocations::Column::IncomeEventId.eq(id))
                .exec(&db_tx)
                .await?;
            income_events::Entity::delete_by_id(id).exec(&db_tx).await?;
            tracing::debug!(income_event_id = %id, "income event deleted");
            Ok(())
        })
    }
}

async fn ensure_unattributed(
    db_tx: &sea_orm::DatabaseTransaction,
    model: &income_events::Model,
) -> ResultEngine<()> {
    let attributions = payment_attributions::Entity::find()
        .filter(payment_attributions::Column::IncomeEventId.eq(model.id))
        .count(db_tx)
        .await?;
    if attributions > 0 || model.allocated_minor != 0 {
        return Err(EngineError::InvalidRequest(
            "income event funds payments; remove its attributions first".to_string(),
        ));
    }
    Ok(())
}
