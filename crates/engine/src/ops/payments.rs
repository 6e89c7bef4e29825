use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveValue, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Money, Payment, PaymentStatus, PaymentType, ResultEngine, payment_attributions,
    payments,
    util::{normalize_display_name, normalize_optional_text, require_positive_amount},
};

use super::{Caller, Engine, attributions::release_attribution, with_tx};

#[derive(Clone, Debug)]
pub struct PaymentNew {
    pub payee: String,
    pub amount: Money,
    pub due_date: NaiveDate,
    pub payment_type: PaymentType,
    pub spending_category_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Filters for listing payments. Both dates are inclusive and apply to the
/// due date.
#[derive(Clone, Debug, Default)]
pub struct PaymentFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<PaymentStatus>,
}

impl Engine {
    pub async fn create_payment(&self, caller: &Caller, new: PaymentNew) -> ResultEngine<Payment> {
        caller.require_write()?;
        let payee = normalize_display_name(&new.payee, "payee")?;
        require_positive_amount(new.amount, "payment amount")?;

        with_tx!(self, |db_tx| {
            if let Some(category_id) = new.spending_category_id {
                self.require_spending_category_in_family(&db_tx, caller.family_id, category_id)
                    .await?;
            }
            let model = payments::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                family_id: ActiveValue::Set(caller.family_id),
                payee: ActiveValue::Set(payee),
                amount_minor: ActiveValue::Set(new.amount.cents()),
                due_date: ActiveValue::Set(new.due_date),
                paid_date: ActiveValue::Set(None),
                payment_type: ActiveValue::Set(new.payment_type.as_str().to_string()),
                status: ActiveValue::Set(PaymentStatus::Scheduled.as_str().to_string()),
                spending_category_id: ActiveValue::Set(new.spending_category_id),
                notes: ActiveValue::Set(normalize_optional_text(new.notes.as_deref())),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;
            tracing::debug!(payment_id = %model.id, amount = %new.amount, "payment created");
            Payment::try_from(model)
        })
    }

    pub async fn payment(&self, caller: &Caller, id: Uuid) -> ResultEngine<Payment> {
        let model = self
            .require_payment_in_family(&self.database, caller.family_id, id)
            .await?;
        Payment::try_from(model)
    }

    pub async fn list_payments(
        &self,
        caller: &Caller,
        filter: &PaymentFilter,
    ) -> ResultEngine<Vec<Payment>> {
        if let (Some(from), Some(to)) = (filter.from, filter.to)
            && from > to
        {
            return Err(EngineError::InvalidRequest(
                "invalid range: from must be <= to".to_string(),
            ));
        }

        let mut query = payments::Entity::find()
            .filter(payments::Column::FamilyId.eq(caller.family_id))
            .order_by_asc(payments::Column::DueDate)
            .order_by_asc(payments::Column::CreatedAt);
        if let Some(from) = filter.from {
            query = query.filter(payments::Column::DueDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(payments::Column::DueDate.lte(to));
        }
        if let Some(status) = filter.status {
            query = query.filter(payments::Column::Status.eq(status.as_str()));
        }

        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(Payment::try_from)
            .collect()
    }

    /// Moves a scheduled payment to `paid` or `cancelled`.
    ///
    /// `paid_date` defaults to today when marking as paid. A payment that is
    /// funded by income events cannot be cancelled.
    pub async fn update_payment_status(
        &self,
        caller: &Caller,
        id: Uuid,
        status: PaymentStatus,
        paid_date: Option<NaiveDate>,
    ) -> ResultEngine<Payment> {
        caller.require_write()?;
        with_tx!(self, |db_tx| {
            let model = self
                .require_payment_in_family(&db_tx, caller.family_id, id)
                .await?;
            let current = PaymentStatus::try_from(model.status.as_str())?;
            if current != PaymentStatus::Scheduled {
                return Err(EngineError::InvalidRequest(format!(
                    "payment is already {}",
                    current.as_str()
                )));
            }

            let mut active = payments::ActiveModel {
                id: ActiveValue::Set(id),
                status: ActiveValue::Set(status.as_str().to_string()),
                ..Default::default()
            };
            match status {
                PaymentStatus::Scheduled => {
                    return Err(EngineError::InvalidRequest(
                        "payment is already scheduled".to_string(),
                    ));
                }
                PaymentStatus::Paid => {
                    active.paid_date = ActiveValue::Set(Some(
                        paid_date.unwrap_or_else(|| Utc::now().date_naive()),
                    ));
                }
                PaymentStatus::Cancelled => {
                    let attributions = payment_attributions::Entity::find()
                        .filter(payment_attributions::Column::PaymentId.eq(id))
                        .count(&db_tx)
                        .await?;
                    if attributions > 0 {
                        return Err(EngineError::InvalidRequest(
                            "payment is funded by income events; remove its attributions first"
                                .to_string(),
                        ));
                    }
                }
            }

            let updated = active.update(&db_tx).await?;
            tracing::debug!(payment_id = %id, status = status.as_str(), "payment status updated");
            Payment::try_from(updated)
        })
    }

    /// Deletes a payment. Its attributions go with it and their amounts are
    /// returned to the income events they were drawn from.
    pub async fn delete_payment(&self, caller: &Caller, id: Uuid) -> ResultEngine<()> {
        caller.require_write()?;
        with_tx!(self, |db_tx| {
            self.require_payment_in_family(&db_tx, caller.family_id, id)
                .await?;
            let attributions = payment_attributions::Entity::find()
                .filter(payment_attributions::Column::PaymentId.eq(id))
                .all(&db_tx)
                .await?;
            for attribution in attributions {
                release_attribution(&db_tx, attribution).await?;
            }
            payments::Entity::delete_by_id(id).exec(&db_tx).await?;
            tracing::debug!(payment_id = %id, "payment deleted");
            Ok(())
        })
    }
}
