//! Attribution engine: links payments to the income events that fund them.
//!
//! Every write here moves money between an income event's remaining and
//! allocated counters through [`apply_income_ledger_delta`], inside the same
//! transaction that writes the attribution row.

use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    AttributionType, EngineError, IncomeEvent, IncomeStatus, Money, PaymentAttribution,
    PaymentStatus, ResultEngine, distribute_with_remainder, income_events, payment_attributions,
    payment_attributions::SYSTEM_CREATOR,
};

use super::{Caller, Engine, is_unique_violation, ledger::apply_income_ledger_delta, with_tx};

/// Order in which auto-attribute consumes candidate income events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoAttributeStrategy {
    /// Same as [`AutoAttributeStrategy::EarliestIncome`].
    #[default]
    Default,
    EarliestIncome,
    LatestIncome,
    /// Split by each candidate's share of the total remaining income.
    Proportional,
}

impl AutoAttributeStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::EarliestIncome => "earliest_income",
            Self::LatestIncome => "latest_income",
            Self::Proportional => "proportional",
        }
    }
}

impl TryFrom<&str> for AutoAttributeStrategy {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim() {
            "default" => Ok(Self::Default),
            "earliest_income" => Ok(Self::EarliestIncome),
            "latest_income" => Ok(Self::LatestIncome),
            "proportional" => Ok(Self::Proportional),
            other => Err(EngineError::InvalidRequest(format!(
                "unknown attribution strategy: {other}"
            ))),
        }
    }
}

/// How much of a payment is covered by attributions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionState {
    Unattributed,
    PartiallyAttributed,
    FullyAttributed,
}

impl AttributionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unattributed => "unattributed",
            Self::PartiallyAttributed => "partially_attributed",
            Self::FullyAttributed => "fully_attributed",
        }
    }

    pub fn from_totals(payment_amount: Money, attributed: Money) -> Self {
        if !attributed.is_positive() {
            Self::Unattributed
        } else if attributed < payment_amount {
            Self::PartiallyAttributed
        } else {
            Self::FullyAttributed
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSummary {
    pub payment_id: Uuid,
    pub payment_amount: Money,
    pub total_attributed: Money,
    pub remaining_amount: Money,
    pub fully_attributed: bool,
    pub state: AttributionState,
}

impl PaymentSummary {
    fn new(payment_id: Uuid, payment_amount: Money, total_attributed: Money) -> Self {
        let state = AttributionState::from_totals(payment_amount, total_attributed);
        Self {
            payment_id,
            payment_amount,
            total_attributed,
            remaining_amount: payment_amount - total_attributed,
            fully_attributed: state == AttributionState::FullyAttributed,
            state,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributionCreated {
    pub attribution: PaymentAttribution,
    pub income_event: IncomeEvent,
    pub summary: PaymentSummary,
}

/// Outcome of one auto-attribute run.
///
/// `total_attributed` covers this run only; `remaining_amount` is what is
/// still unattributed on the payment afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoAttribution {
    pub attributions: Vec<PaymentAttribution>,
    pub total_attributed: Money,
    pub remaining_amount: Money,
    pub summary: PaymentSummary,
}

impl Engine {
    /// Attributes `amount` of a payment to one income event.
    ///
    /// Checks run in a fixed order so the first violated rule is the one
    /// reported: payment, income event, amount, duplicate pair, income
    /// remaining, payment total.
    pub async fn create_attribution(
        &self,
        caller: &Caller,
        payment_id: Uuid,
        income_event_id: Uuid,
        amount: Money,
        attribution_type: AttributionType,
    ) -> ResultEngine<AttributionCreated> {
        caller.require_write()?;
        with_tx!(self, |db_tx| {
            let payment = self
                .require_payment_in_family(&db_tx, caller.family_id, payment_id)
                .await?;
            let income = income_events::Entity::find_by_id(income_event_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("income event not exists".to_string()))?;
            if income.family_id != payment.family_id {
                tracing::warn!(%payment_id, %income_event_id, "cross-family attribution rejected");
                return Err(EngineError::Forbidden(
                    "cross-family attribution".to_string(),
                ));
            }
            if !amount.is_positive() {
                return Err(EngineError::InvalidAmount(
                    "attribution amount must be > 0".to_string(),
                ));
            }
            if PaymentStatus::try_from(payment.status.as_str())? == PaymentStatus::Cancelled {
                return Err(EngineError::InvalidRequest(
                    "cannot attribute a cancelled payment".to_string(),
                ));
            }
            if IncomeStatus::try_from(income.status.as_str())? == IncomeStatus::Cancelled {
                return Err(EngineError::InvalidRequest(
                    "cannot attribute to a cancelled income event".to_string(),
                ));
            }

            let duplicate = payment_attributions::Entity::find()
                .filter(payment_attributions::Column::PaymentId.eq(payment_id))
                .filter(payment_attributions::Column::IncomeEventId.eq(income_event_id))
                .one(&db_tx)
                .await?;
            if duplicate.is_some() {
                return Err(attribution_exists(payment_id, income_event_id));
            }

            let available_income = Money::new(income.remaining_minor);
            if amount > available_income {
                tracing::warn!(%income_event_id, %amount, available = %available_income, "income remaining exceeded");
                return Err(EngineError::InsufficientIncomeRemaining {
                    available: available_income,
                    requested: amount,
                });
            }

            let payment_amount = Money::new(payment.amount_minor);
            let currently_attributed = attributed_total(&db_tx, payment_id).await?;
            if currently_attributed + amount > payment_amount {
                tracing::warn!(%payment_id, %amount, attributed = %currently_attributed, "payment amount exceeded");
                return Err(EngineError::AttributionExceedsPayment {
                    payment_amount,
                    currently_attributed,
                    available: payment_amount - currently_attributed,
                    requested: amount,
                });
            }

            let attribution = insert_attribution(
                &db_tx,
                payment_id,
                income_event_id,
                amount,
                attribution_type,
                &caller.username,
            )
            .await?;
            let updated_income = apply_income_ledger_delta(&db_tx, &income, amount).await?;

            tracing::debug!(%payment_id, %income_event_id, %amount, "attribution created");
            Ok(AttributionCreated {
                attribution,
                income_event: IncomeEvent::try_from(updated_income)?,
                summary: PaymentSummary::new(
                    payment_id,
                    payment_amount,
                    currently_attributed + amount,
                ),
            })
        })
    }

    /// Attributes the unattributed part of a payment across the family's
    /// open income events.
    ///
    /// When the available income does not cover the payment, what is
    /// available is attributed and the rest is reported as remaining.
    pub async fn auto_attribute(
        &self,
        caller: &Caller,
        payment_id: Uuid,
        strategy: AutoAttributeStrategy,
        preferred_income_event_ids: Option<Vec<Uuid>>,
    ) -> ResultEngine<AutoAttribution> {
        caller.require_write()?;
        with_tx!(self, |db_tx| {
            let payment = self
                .require_payment_in_family(&db_tx, caller.family_id, payment_id)
                .await?;
            if PaymentStatus::try_from(payment.status.as_str())? == PaymentStatus::Cancelled {
                return Err(EngineError::InvalidRequest(
                    "cannot attribute a cancelled payment".to_string(),
                ));
            }

            let payment_amount = Money::new(payment.amount_minor);
            let already_attributed = attributed_total(&db_tx, payment_id).await?;
            let outstanding = payment_amount - already_attributed;
            if !outstanding.is_positive() {
                return Err(EngineError::InvalidRequest(
                    "payment is already fully attributed".to_string(),
                ));
            }

            let candidates = self
                .auto_attribute_candidates(
                    &db_tx,
                    caller.family_id,
                    payment_id,
                    strategy,
                    preferred_income_event_ids.as_deref(),
                )
                .await?;
            let remaining: Vec<Money> = candidates
                .iter()
                .map(|c| Money::new(c.remaining_minor))
                .collect();
            let total_available: Money = remaining.iter().copied().sum();
            if !total_available.is_positive() {
                tracing::warn!(%payment_id, "no income available for auto-attribute");
                return Err(EngineError::InsufficientAvailableIncome(
                    "no income event has remaining income".to_string(),
                ));
            }

            let plan = match strategy {
                AutoAttributeStrategy::Proportional => plan_proportional(outstanding, &remaining),
                _ => plan_greedy(outstanding, &remaining),
            };

            let mut attributions = Vec::new();
            let mut total_attributed = Money::ZERO;
            for (income, amount) in candidates.iter().zip(plan) {
                if !amount.is_positive() {
                    continue;
                }
                let attribution = insert_attribution(
                    &db_tx,
                    payment_id,
                    income.id,
                    amount,
                    AttributionType::Automatic,
                    SYSTEM_CREATOR,
                )
                .await?;
                apply_income_ledger_delta(&db_tx, income, amount).await?;
                total_attributed += amount;
                attributions.push(attribution);
            }

            let summary =
                PaymentSummary::new(payment_id, payment_amount, already_attributed + total_attributed);
            tracing::debug!(
                %payment_id,
                strategy = strategy.as_str(),
                count = attributions.len(),
                total = %total_attributed,
                remaining = %summary.remaining_amount,
                "auto-attribute finished"
            );
            Ok(AutoAttribution {
                attributions,
                total_attributed,
                remaining_amount: summary.remaining_amount,
                summary,
            })
        })
    }

    /// Removes an attribution and gives its amount back to the income event.
    pub async fn delete_attribution(
        &self,
        caller: &Caller,
        payment_id: Uuid,
        attribution_id: Uuid,
    ) -> ResultEngine<PaymentSummary> {
        caller.require_write()?;
        with_tx!(self, |db_tx| {
            let payment = self
                .require_payment_in_family(&db_tx, caller.family_id, payment_id)
                .await?;
            let attribution = self
                .require_attribution_of_payment(&db_tx, payment_id, attribution_id)
                .await?;
            release_attribution(&db_tx, attribution).await?;

            let total = attributed_total(&db_tx, payment_id).await?;
            tracing::debug!(%payment_id, %attribution_id, "attribution deleted");
            Ok(PaymentSummary::new(
                payment_id,
                Money::new(payment.amount_minor),
                total,
            ))
        })
    }

    pub async fn list_attributions(
        &self,
        caller: &Caller,
        payment_id: Uuid,
    ) -> ResultEngine<Vec<PaymentAttribution>> {
        self.require_payment_in_family(&self.database, caller.family_id, payment_id)
            .await?;
        payment_attributions::Entity::find()
            .filter(payment_attributions::Column::PaymentId.eq(payment_id))
            .order_by_asc(payment_attributions::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(PaymentAttribution::try_from)
            .collect()
    }

    pub async fn payment_summary(
        &self,
        caller: &Caller,
        payment_id: Uuid,
    ) -> ResultEngine<PaymentSummary> {
        let payment = self
            .require_payment_in_family(&self.database, caller.family_id, payment_id)
            .await?;
        let total = attributed_total(&self.database, payment_id).await?;
        Ok(PaymentSummary::new(
            payment_id,
            Money::new(payment.amount_minor),
            total,
        ))
    }

    /// Open income events of the family in consumption order.
    ///
    /// Events already attributed to the payment are skipped because a
    /// `(payment, income event)` pair can only exist once.
    async fn auto_attribute_candidates(
        &self,
        db_tx: &DatabaseTransaction,
        family_id: Uuid,
        payment_id: Uuid,
        strategy: AutoAttributeStrategy,
        preferred: Option<&[Uuid]>,
    ) -> ResultEngine<Vec<income_events::Model>> {
        let linked: HashSet<Uuid> = payment_attributions::Entity::find()
            .filter(payment_attributions::Column::PaymentId.eq(payment_id))
            .all(db_tx)
            .await?
            .into_iter()
            .map(|a| a.income_event_id)
            .collect();

        let mut query = income_events::Entity::find()
            .filter(income_events::Column::FamilyId.eq(family_id))
            .filter(income_events::Column::Status.ne(IncomeStatus::Cancelled.as_str()))
            .filter(income_events::Column::RemainingMinor.gt(0));
        if let Some(ids) = preferred.filter(|ids| !ids.is_empty()) {
            query = query.filter(income_events::Column::Id.is_in(ids.iter().copied()));
        }
        query = match strategy {
            AutoAttributeStrategy::LatestIncome => query
                .order_by_desc(income_events::Column::ScheduledDate)
                .order_by_desc(income_events::Column::CreatedAt),
            _ => query
                .order_by_asc(income_events::Column::ScheduledDate)
                .order_by_asc(income_events::Column::CreatedAt),
        };

        Ok(query
            .all(db_tx)
            .await?
            .into_iter()
            .filter(|m| !linked.contains(&m.id))
            .collect())
    }
}

/// Deletes an attribution row and reverses its ledger effect.
pub(super) async fn release_attribution(
    db_tx: &DatabaseTransaction,
    attribution: payment_attributions::Model,
) -> ResultEngine<()> {
    let income = income_events::Entity::find_by_id(attribution.income_event_id)
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::KeyNotFound("income event not exists".to_string()))?;
    let amount = Money::new(attribution.amount_minor);
    payment_attributions::Entity::delete_by_id(attribution.id)
        .exec(db_tx)
        .await?;
    apply_income_ledger_delta(db_tx, &income, -amount).await?;
    Ok(())
}

async fn attributed_total<C: ConnectionTrait>(db: &C, payment_id: Uuid) -> ResultEngine<Money> {
    Ok(payment_attributions::Entity::find()
        .filter(payment_attributions::Column::PaymentId.eq(payment_id))
        .all(db)
        .await?
        .into_iter()
        .map(|a| Money::new(a.amount_minor))
        .sum())
}

async fn insert_attribution(
    db_tx: &DatabaseTransaction,
    payment_id: Uuid,
    income_event_id: Uuid,
    amount: Money,
    attribution_type: AttributionType,
    created_by: &str,
) -> ResultEngine<PaymentAttribution> {
    let model = payment_attributions::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        payment_id: ActiveValue::Set(payment_id),
        income_event_id: ActiveValue::Set(income_event_id),
        amount_minor: ActiveValue::Set(amount.cents()),
        attribution_type: ActiveValue::Set(attribution_type.as_str().to_string()),
        created_by: ActiveValue::Set(created_by.to_string()),
        created_at: ActiveValue::Set(Utc::now()),
    }
    .insert(db_tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            attribution_exists(payment_id, income_event_id)
        } else {
            EngineError::Database(err)
        }
    })?;
    PaymentAttribution::try_from(model)
}

fn attribution_exists(payment_id: Uuid, income_event_id: Uuid) -> EngineError {
    EngineError::AttributionAlreadyExists {
        payment_id: payment_id.to_string(),
        income_event_id: income_event_id.to_string(),
    }
}

/// Consumes candidates in order until `outstanding` is covered.
fn plan_greedy(outstanding: Money, remaining: &[Money]) -> Vec<Money> {
    let mut left = outstanding;
    remaining
        .iter()
        .map(|available| {
            let take = (*available).min(left).max(Money::ZERO);
            left -= take;
            take
        })
        .collect()
}

/// Splits `min(outstanding, Σ remaining)` by each candidate's share of the
/// total remaining, residue on the last candidate.
///
/// The residue can push the last share below zero or a share a cent above
/// what its candidate has left; both are evened out against the other
/// candidates so the plan still sums to the target.
fn plan_proportional(outstanding: Money, remaining: &[Money]) -> Vec<Money> {
    let total_available: Money = remaining.iter().copied().sum();
    let target = outstanding.min(total_available);
    let weights: Vec<i64> = remaining.iter().map(|m| m.cents()).collect();
    let mut shares = distribute_with_remainder(target, &weights, total_available.cents());

    let mut deficit = Money::ZERO;
    for share in shares.iter_mut() {
        if share.is_negative() {
            deficit -= *share;
            *share = Money::ZERO;
        }
    }
    for share in shares.iter_mut().rev() {
        if !deficit.is_positive() {
            break;
        }
        let take = (*share).min(deficit);
        *share -= take;
        deficit -= take;
    }

    let mut excess = Money::ZERO;
    for (share, available) in shares.iter_mut().zip(remaining) {
        if *share > *available {
            excess += *share - *available;
            *share = *available;
        }
    }
    for (share, available) in shares.iter_mut().zip(remaining) {
        if !excess.is_positive() {
            break;
        }
        let room = *available - *share;
        let take = room.min(excess);
        *share += take;
        excess -= take;
    }
    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(cents: i64) -> Money {
        Money::new(cents)
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!(
            AutoAttributeStrategy::try_from("proportional").unwrap(),
            AutoAttributeStrategy::Proportional
        );
        assert_eq!(
            AutoAttributeStrategy::try_from("default").unwrap(),
            AutoAttributeStrategy::Default
        );
        assert!(matches!(
            AutoAttributeStrategy::try_from("random"),
            Err(EngineError::InvalidRequest(_))
        ));
    }

    #[test]
    fn state_follows_totals() {
        assert_eq!(
            AttributionState::from_totals(m(1000), Money::ZERO),
            AttributionState::Unattributed
        );
        assert_eq!(
            AttributionState::from_totals(m(1000), m(10)),
            AttributionState::PartiallyAttributed
        );
        assert_eq!(
            AttributionState::from_totals(m(1000), m(1000)),
            AttributionState::FullyAttributed
        );
    }

    #[test]
    fn greedy_stops_when_covered() {
        assert_eq!(
            plan_greedy(m(500), &[m(300), m(400), m(100)]),
            vec![m(300), m(200), Money::ZERO]
        );
        // Not enough income: everything is taken.
        assert_eq!(plan_greedy(m(900), &[m(300), m(400)]), vec![m(300), m(400)]);
    }

    #[test]
    fn proportional_splits_by_remaining() {
        let plan = plan_proportional(m(12_550), &[m(300_000), m(200_000)]);
        assert_eq!(plan, vec![m(7_530), m(5_020)]);
        assert_eq!(plan.iter().copied().sum::<Money>(), m(12_550));
    }

    #[test]
    fn proportional_is_capped_by_available() {
        let plan = plan_proportional(m(10_000), &[m(100), m(200)]);
        assert_eq!(plan, vec![m(100), m(200)]);
    }

    #[test]
    fn proportional_moves_residue_within_caps() {
        // Three equal candidates of 1 cent each and a 2 cent payment.
        let plan = plan_proportional(m(2), &[m(1), m(1), m(1)]);
        assert_eq!(plan.iter().copied().sum::<Money>(), m(2));
        assert!(plan.iter().all(|share| *share <= m(1)));

        // Half-up rounding of every share overshoots the target here.
        let plan = plan_proportional(m(2), &[m(1), m(1), m(1), m(1)]);
        assert_eq!(plan.iter().copied().sum::<Money>(), m(2));
        assert!(plan.iter().all(|share| !share.is_negative()));
    }
}
