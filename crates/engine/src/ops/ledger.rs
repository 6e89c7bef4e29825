//! The only code paths that write an income event's
//! `allocated_minor`/`remaining_minor` counters.
//!
//! Callers must hold a transaction and must pass a model they re-read inside
//! that same transaction.

use sea_orm::{ActiveValue, DatabaseTransaction, prelude::*};

use crate::{EngineError, Money, ResultEngine, income_events};

/// Moves `delta` from the remaining side of an income event to its allocated
/// side (a negative `delta` moves it back).
///
/// Keeps `allocated + remaining == amount` and refuses to push either
/// counter below zero.
pub(super) async fn apply_income_ledger_delta(
    db_tx: &DatabaseTransaction,
    income: &income_events::Model,
    delta: Money,
) -> ResultEngine<income_events::Model> {
    let amount = Money::new(income.amount_minor);
    let remaining = Money::new(income.remaining_minor);
    let allocated = Money::new(income.allocated_minor);

    let new_allocated = allocated
        .checked_add(delta)
        .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;
    let new_remaining = remaining
        .checked_sub(delta)
        .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;

    if new_remaining.is_negative() {
        return Err(EngineError::InsufficientIncomeRemaining {
            available: remaining,
            requested: delta,
        });
    }
    if new_allocated.is_negative() {
        return Err(EngineError::InvalidAmount(format!(
            "cannot release {} from income event {}: only {allocated} allocated",
            -delta, income.id
        )));
    }
    if new_allocated + new_remaining != amount {
        return Err(EngineError::InvalidAmount(format!(
            "income event {} bookkeeping out of balance",
            income.id
        )));
    }

    let active = income_events::ActiveModel {
        id: ActiveValue::Set(income.id),
        allocated_minor: ActiveValue::Set(new_allocated.cents()),
        remaining_minor: ActiveValue::Set(new_remaining.cents()),
        ..Default::default()
    };
    let updated = active.update(db_tx).await?;
    tracing::debug!(
        income_event_id = %income.id,
        delta = %delta,
        allocated = %new_allocated,
        remaining = %new_remaining,
        "income ledger updated"
    );
    Ok(updated)
}

/// Replaces the amount of an income event that funds nothing yet, resetting
/// `remaining` to the new amount.
pub(super) async fn reset_income_amount(
    db_tx: &DatabaseTransaction,
    income: &income_events::Model,
    amount: Money,
) -> ResultEngine<income_events::Model> {
    if income.allocated_minor != 0 {
        return Err(EngineError::InvalidRequest(
            "cannot change the amount of an income event with attributions".to_string(),
        ));
    }

    let active = income_events::ActiveModel {
        id: ActiveValue::Set(income.id),
        amount_minor: ActiveValue::Set(amount.cents()),
        allocated_minor: ActiveValue::Set(0),
        remaining_minor: ActiveValue::Set(amount.cents()),
        ..Default::default()
    };
    let updated = active.update(db_tx).await?;
    tracing::debug!(
        income_event_id = %income.id,
        amount = %amount,
        "income amount reset"
    );
    Ok(updated)
}
