//! Allocation engine: splits one income event across budget categories.
//!
//! Allocations are a planning layer. They never touch the income event's
//! attribution counters, and they are generated and deleted as a whole set.

use chrono::Utc;
use sea_orm::{
    ActiveValue, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
    prelude::*,
};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    BudgetAllocation, EngineError, IncomeStatus, Money, Percentage, ResultEngine,
    budget_allocations, budget_categories, distribute_with_remainder,
    templates::{TemplateShares, find_template},
    util::normalize_name_key,
};

use super::{Caller, Engine, is_unique_violation, with_tx};

/// Where the percentages of a generated allocation set come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocationSource {
    /// A built-in template id (see [`crate::ALLOCATION_TEMPLATES`]).
    Template(String),
    /// Explicit `(budget category, percentage)` pairs, in iteration order.
    Custom(Vec<(Uuid, Percentage)>),
}

/// Edit of a single allocation: one side is given, the other is derived
/// from the income event's amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationUpdate {
    Amount(Money),
    Percentage(Percentage),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedAllocations {
    pub allocations: Vec<BudgetAllocation>,
    pub total_amount: Money,
    pub total_percentage: Percentage,
}

impl Engine {
    /// Generates the allocation set of an income event.
    ///
    /// Fails with `AllocationsAlreadyExist` when the event already has one;
    /// the caller has to delete the set before regenerating it. The last
    /// category in iteration order absorbs rounding residue so the amounts
    /// add up to the income amount exactly.
    pub async fn generate_allocations(
        &self,
        caller: &Caller,
        income_event_id: Uuid,
        source: AllocationSource,
    ) -> ResultEngine<GeneratedAllocations> {
        caller.require_write()?;
        validate_source_shape(&source)?;

        with_tx!(self, |db_tx| {
            let income = self
                .require_income_event_in_family(&db_tx, caller.family_id, income_event_id)
                .await?;
            if IncomeStatus::try_from(income.status.as_str())? == IncomeStatus::Cancelled {
                return Err(EngineError::InvalidRequest(
                    "cannot allocate a cancelled income event".to_string(),
                ));
            }

            let existing = budget_allocations::Entity::find()
                .filter(budget_allocations::Column::IncomeEventId.eq(income_event_id))
                .count(&db_tx)
                .await?;
            if existing > 0 {
                tracing::warn!(%income_event_id, "allocations already exist");
                return Err(EngineError::AllocationsAlreadyExist(
                    income_event_id.to_string(),
                ));
            }

            let plan = self.resolve_source(&db_tx, caller.family_id, &source).await?;

            let total_percentage: Percentage = plan.iter().map(|(_, p)| *p).sum();
            if !total_percentage.is_whole() {
                return Err(EngineError::InvalidRequest(format!(
                    "allocation percentages must sum to 100%, got {total_percentage}"
                )));
            }

            let income_amount = Money::new(income.amount_minor);
            let weights: Vec<i64> = plan.iter().map(|(_, p)| p.basis_points()).collect();
            let amounts =
                distribute_with_remainder(income_amount, &weights, Percentage::HUNDRED.basis_points());
            if amounts.iter().any(|a| a.is_negative()) {
                return Err(EngineError::InvalidRequest(
                    "allocation percentages do not distribute the income amount".to_string(),
                ));
            }

            let created_at = Utc::now();
            let mut allocations = Vec::with_capacity(plan.len());
            for ((category_id, percentage), amount) in plan.iter().zip(amounts) {
                let model = budget_allocations::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    income_event_id: ActiveValue::Set(income_event_id),
                    budget_category_id: ActiveValue::Set(*category_id),
                    amount_minor: ActiveValue::Set(amount.cents()),
                    percentage_bp: ActiveValue::Set(percentage.basis_points()),
                    created_at: ActiveValue::Set(created_at),
                }
                .insert(&db_tx)
                .await
                .map_err(|err| {
                    if is_unique_violation(&err) {
                        EngineError::AllocationsAlreadyExist(income_event_id.to_string())
                    } else {
                        EngineError::Database(err)
                    }
                })?;
                allocations.push(BudgetAllocation::from(model));
            }

            let total_amount: Money = allocations.iter().map(|a| a.amount).sum();
            tracing::debug!(
                %income_event_id,
                count = allocations.len(),
                total = %total_amount,
                "allocations generated"
            );
            Ok(GeneratedAllocations {
                allocations,
                total_amount,
                total_percentage,
            })
        })
    }

    /// Changes one allocation by amount or by percentage.
    pub async fn update_allocation(
        &self,
        caller: &Caller,
        allocation_id: Uuid,
        update: AllocationUpdate,
    ) -> ResultEngine<BudgetAllocation> {
        caller.require_write()?;
        with_tx!(self, |db_tx| {
            let (allocation, income) = self
                .require_allocation_in_family(&db_tx, caller.family_id, allocation_id)
                .await?;
            let income_amount = Money::new(income.amount_minor);

            let (amount, percentage) = match update {
                AllocationUpdate::Amount(amount) => {
                    if amount.is_negative() {
                        return Err(EngineError::InvalidAmount(
                            "allocation amount must be >= 0".to_string(),
                        ));
                    }
                    if amount > income_amount {
                        return Err(EngineError::InvalidRequest(format!(
                            "allocation amount {amount} exceeds income amount {income_amount}"
                        )));
                    }
                    (amount, Percentage::of_total(amount, income_amount))
                }
                AllocationUpdate::Percentage(percentage) => {
                    if !percentage.is_within_range() {
                        return Err(EngineError::InvalidPercentage(format!(
                            "allocation percentage must be between 0 and 100, got {percentage}"
                        )));
                    }
                    (income_amount.percent_of(percentage.basis_points()), percentage)
                }
            };

            let siblings: Money = budget_allocations::Entity::find()
                .filter(budget_allocations::Column::IncomeEventId.eq(allocation.income_event_id))
                .filter(budget_allocations::Column::Id.ne(allocation_id))
                .all(&db_tx)
                .await?
                .iter()
                .map(|a| Money::new(a.amount_minor))
                .sum();
            let total = siblings
                .checked_add(amount)
                .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;
            if total > income_amount {
                return Err(EngineError::InvalidRequest(format!(
                    "allocations total {total} exceeds income amount {income_amount}"
                )));
            }

            let mut active: budget_allocations::ActiveModel = allocation.into();
            active.amount_minor = ActiveValue::Set(amount.cents());
            active.percentage_bp = ActiveValue::Set(percentage.basis_points());
            let updated = active.update(&db_tx).await?;
            Ok(BudgetAllocation::from(updated))
        })
    }

    /// Allocations of one income event, in budget category order.
    pub async fn list_allocations(
        &self,
        caller: &Caller,
        income_event_id: Uuid,
    ) -> ResultEngine<Vec<BudgetAllocation>> {
        self.require_income_event_in_family(&self.database, caller.family_id, income_event_id)
            .await?;
        Ok(budget_allocations::Entity::find()
            .filter(budget_allocations::Column::IncomeEventId.eq(income_event_id))
            .find_also_related(budget_categories::Entity)
            .order_by_asc(budget_categories::Column::SortOrder)
            .order_by_asc(budget_categories::Column::NameNorm)
            .all(&self.database)
            .await?
            .into_iter()
            .map(|(allocation, _)| BudgetAllocation::from(allocation))
            .collect())
    }

    /// Deletes the whole allocation set of an income event.
    ///
    /// Returns the number of removed allocations.
    pub async fn delete_allocations(
        &self,
        caller: &Caller,
        income_event_id: Uuid,
    ) -> ResultEngine<u64> {
        caller.require_write()?;
        with_tx!(self, |db_tx| {
            self.require_income_event_in_family(&db_tx, caller.family_id, income_event_id)
                .await?;
            let res = budget_allocations::Entity::delete_many()
                .filter(budget_allocations::Column::IncomeEventId.eq(income_event_id))
                .exec(&db_tx)
                .await?;
            Ok(res.rows_affected)
        })
    }

    /// Turns an allocation source into `(category id, percentage)` pairs,
    /// checking every category is active and belongs to the family.
    async fn resolve_source<C: ConnectionTrait>(
        &self,
        db: &C,
        family_id: Uuid,
        source: &AllocationSource,
    ) -> ResultEngine<Vec<(Uuid, Percentage)>> {
        match source {
            AllocationSource::Custom(pairs) => {
                let mut plan = Vec::with_capacity(pairs.len());
                for (category_id, percentage) in pairs {
                    let category = self
                        .require_budget_category_in_family(db, family_id, *category_id)
                        .await?;
                    if !category.is_active {
                        return Err(EngineError::KeyNotFound(
                            "budget category not exists".to_string(),
                        ));
                    }
                    plan.push((category.id, *percentage));
                }
                Ok(plan)
            }
            AllocationSource::Template(template_id) => {
                let template = find_template(template_id).ok_or_else(|| {
                    EngineError::KeyNotFound(format!("allocation template '{template_id}'"))
                })?;
                let categories = budget_categories::Entity::find()
                    .filter(budget_categories::Column::FamilyId.eq(family_id))
                    .filter(budget_categories::Column::IsActive.eq(true))
                    .order_by_asc(budget_categories::Column::SortOrder)
                    .order_by_asc(budget_categories::Column::NameNorm)
                    .all(db)
                    .await?;

                match template.shares {
                    TemplateShares::Fixed(pairs) => pairs
                        .iter()
                        .map(|(name, bp)| {
                            let key = normalize_name_key(name);
                            categories
                                .iter()
                                .find(|c| c.name_norm == key)
                                .map(|c| (c.id, Percentage::from_basis_points(*bp)))
                                .ok_or_else(|| {
                                    EngineError::KeyNotFound(format!("budget category '{name}'"))
                                })
                        })
                        .collect(),
                    TemplateShares::EvenSplit => {
                        if categories.is_empty() {
                            return Err(EngineError::InvalidRequest(
                                "even split needs at least one active budget category".to_string(),
                            ));
                        }
                        let count = categories.len() as i64;
                        let base = Percentage::HUNDRED.basis_points() / count;
                        let last = Percentage::HUNDRED.basis_points() - base * (count - 1);
                        Ok(categories
                            .iter()
                            .enumerate()
                            .map(|(idx, c)| {
                                let bp = if idx as i64 == count - 1 { last } else { base };
                                (c.id, Percentage::from_basis_points(bp))
                            })
                            .collect())
                    }
                }
            }
        }
    }
}

/// Checks that do not need the database.
fn validate_source_shape(source: &AllocationSource) -> ResultEngine<()> {
    match source {
        AllocationSource::Template(id) => {
            if id.trim().is_empty() {
                return Err(EngineError::InvalidRequest(
                    "templateId must not be empty".to_string(),
                ));
            }
        }
        AllocationSource::Custom(pairs) => {
            if pairs.is_empty() {
                return Err(EngineError::InvalidRequest(
                    "customAllocations must not be empty".to_string(),
                ));
            }
            let mut seen = HashSet::with_capacity(pairs.len());
            for (category_id, percentage) in pairs {
                if !seen.insert(*category_id) {
                    return Err(EngineError::InvalidRequest(format!(
                        "budget category {category_id} listed more than once"
                    )));
                }
                if percentage.basis_points() <= 0 || !percentage.is_within_range() {
                    return Err(EngineError::InvalidPercentage(format!(
                        "allocation percentage must be > 0 and <= 100, got {percentage}"
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_source_rejects_duplicates_and_bad_percentages() {
        let id = Uuid::new_v4();
        let dup = AllocationSource::Custom(vec![
            (id, Percentage::from_basis_points(5_000)),
            (id, Percentage::from_basis_points(5_000)),
        ]);
        assert!(matches!(
            validate_source_shape(&dup),
            Err(EngineError::InvalidRequest(_))
        ));

        let zero = AllocationSource::Custom(vec![(id, Percentage::ZERO)]);
        assert!(matches!(
            validate_source_shape(&zero),
            Err(EngineError::InvalidPercentage(_))
        ));

        assert!(validate_source_shape(&AllocationSource::Custom(vec![])).is_err());
        assert!(validate_source_shape(&AllocationSource::Template(" ".to_string())).is_err());
    }
}
