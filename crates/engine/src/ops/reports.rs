//! Read-only aggregates over a family's income events, payments and
//! allocations. Cancelled rows never count.

use chrono::{Datelike, NaiveDate};
use sea_orm::{QueryFilter, QueryOrder, prelude::*};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::{
    EngineError, IncomeStatus, Money, PaymentStatus, Percentage, ResultEngine, budget_allocations,
    budget_categories, income_events, payments, spending_categories,
};

use super::{Caller, Engine};

const UNCATEGORIZED: &str = "Uncategorized";

/// Inclusive date range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Longest span a report covers, in calendar months.
const MAX_RANGE_MONTHS: i32 = 120;

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> ResultEngine<Self> {
        if from > to {
            return Err(EngineError::InvalidRequest(
                "invalid range: from must be <= to".to_string(),
            ));
        }
        let span_months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
        if span_months >= MAX_RANGE_MONTHS {
            return Err(EngineError::InvalidRequest(format!(
                "invalid range: at most {} years per report",
                MAX_RANGE_MONTHS / 12
            )));
        }
        Ok(Self { from, to })
    }

    /// `(year, month)` of every calendar month touched by the range.
    fn months(&self) -> Vec<(i32, u32)> {
        let mut months = Vec::new();
        let (mut year, mut month) = (self.from.year(), self.from.month());
        while (year, month) <= (self.to.year(), self.to.month()) {
            months.push((year, month));
            if month == 12 {
                year += 1;
                month = 1;
            } else {
                month += 1;
            }
        }
        months
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CashFlowMonth {
    /// `YYYY-MM`
    pub month: String,
    pub income: Money,
    pub expenses: Money,
    pub net: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CashFlowReport {
    pub range: DateRange,
    pub months: Vec<CashFlowMonth>,
    pub total_income: Money,
    pub total_expenses: Money,
    pub net: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpendingLine {
    /// `None` for payments without a spending category.
    pub spending_category_id: Option<Uuid>,
    pub name: String,
    pub total: Money,
    pub percentage: Percentage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SpendingReport {
    pub range: DateRange,
    pub total: Money,
    pub lines: Vec<SpendingLine>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SavingsRate {
    pub range: DateRange,
    pub income: Money,
    pub expenses: Money,
    pub savings: Money,
    /// Savings as a share of income; zero when there is no income.
    pub rate: Percentage,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BudgetPerformanceLine {
    pub budget_category_id: Uuid,
    pub name: String,
    pub target_percentage: Percentage,
    pub allocated: Money,
    pub spent: Money,
    /// `allocated - spent`; negative when over budget.
    pub variance: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BudgetPerformanceReport {
    pub range: DateRange,
    pub lines: Vec<BudgetPerformanceLine>,
    pub total_allocated: Money,
    pub total_spent: Money,
}

impl Engine {
    pub async fn cash_flow_report(
        &self,
        caller: &Caller,
        range: DateRange,
    ) -> ResultEngine<CashFlowReport> {
        let mut buckets: BTreeMap<(i32, u32), (Money, Money)> = range
            .months()
            .into_iter()
            .map(|key| (key, (Money::ZERO, Money::ZERO)))
            .collect();

        for income in self.income_in_range(caller.family_id, range).await? {
            let date = income.scheduled_date;
            if let Some(bucket) = buckets.get_mut(&(date.year(), date.month())) {
                bucket.0 += Money::new(income.amount_minor);
            }
        }
        for payment in self.payments_in_range(caller.family_id, range).await? {
            let date = payment.due_date;
            if let Some(bucket) = buckets.get_mut(&(date.year(), date.month())) {
                bucket.1 += Money::new(payment.amount_minor);
            }
        }

        let months: Vec<CashFlowMonth> = buckets
            .into_iter()
            .map(|((year, month), (income, expenses))| CashFlowMonth {
                month: format!("{year:04}-{month:02}"),
                income,
                expenses,
                net: income - expenses,
            })
            .collect();
        let total_income: Money = months.iter().map(|m| m.income).sum();
        let total_expenses: Money = months.iter().map(|m| m.expenses).sum();
        Ok(CashFlowReport {
            range,
            months,
            total_income,
            total_expenses,
            net: total_income - total_expenses,
        })
    }

    /// Payments in range grouped by spending category, largest first.
    pub async fn spending_report(
        &self,
        caller: &Caller,
        range: DateRange,
    ) -> ResultEngine<SpendingReport> {
        let categories = self.spending_categories_by_id(caller.family_id).await?;

        let mut totals: HashMap<Option<Uuid>, Money> = HashMap::new();
        for payment in self.payments_in_range(caller.family_id, range).await? {
            *totals.entry(payment.spending_category_id).or_default() +=
                Money::new(payment.amount_minor);
        }
        let total: Money = totals.values().copied().sum();

        let mut lines: Vec<SpendingLine> = totals
            .into_iter()
            .map(|(category_id, amount)| SpendingLine {
                spending_category_id: category_id,
                name: category_id
                    .and_then(|id| categories.get(&id))
                    .map_or_else(|| UNCATEGORIZED.to_string(), |c| c.name.clone()),
                total: amount,
                percentage: Percentage::of_total(amount, total),
            })
            .collect();
        lines.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));

        Ok(SpendingReport {
            range,
            total,
            lines,
        })
    }

    pub async fn savings_rate(&self, caller: &Caller, range: DateRange) -> ResultEngine<SavingsRate> {
        let income: Money = self
            .income_in_range(caller.family_id, range)
            .await?
            .into_iter()
            .map(|m| Money::new(m.amount_minor))
            .sum();
        let expenses: Money = self
            .payments_in_range(caller.family_id, range)
            .await?
            .into_iter()
            .map(|m| Money::new(m.amount_minor))
            .sum();
        let savings = income - expenses;
        Ok(SavingsRate {
            range,
            income,
            expenses,
            savings,
            rate: Percentage::of_total(savings, income),
        })
    }

    /// Planned (allocated) against actual (spent) per active budget category.
    ///
    /// Spending reaches a budget category through the spending category of
    /// each payment.
    pub async fn budget_performance(
        &self,
        caller: &Caller,
        range: DateRange,
    ) -> ResultEngine<BudgetPerformanceReport> {
        let budget = budget_categories::Entity::find()
            .filter(budget_categories::Column::FamilyId.eq(caller.family_id))
            .filter(budget_categories::Column::IsActive.eq(true))
            .order_by_asc(budget_categories::Column::SortOrder)
            .order_by_asc(budget_categories::Column::NameNorm)
            .all(&self.database)
            .await?;

        let mut allocated: HashMap<Uuid, Money> = HashMap::new();
        let allocations = budget_allocations::Entity::find()
            .find_also_related(income_events::Entity)
            .filter(income_events::Column::FamilyId.eq(caller.family_id))
            .filter(income_events::Column::Status.ne(IncomeStatus::Cancelled.as_str()))
            .filter(income_events::Column::ScheduledDate.gte(range.from))
            .filter(income_events::Column::ScheduledDate.lte(range.to))
            .all(&self.database)
            .await?;
        for (allocation, _) in allocations {
            *allocated.entry(allocation.budget_category_id).or_default() +=
                Money::new(allocation.amount_minor);
        }

        let spending = self.spending_categories_by_id(caller.family_id).await?;
        let mut spent: HashMap<Uuid, Money> = HashMap::new();
        for payment in self.payments_in_range(caller.family_id, range).await? {
            let budget_id = payment
                .spending_category_id
                .and_then(|id| spending.get(&id))
                .and_then(|c| c.budget_category_id);
            if let Some(budget_id) = budget_id {
                *spent.entry(budget_id).or_default() += Money::new(payment.amount_minor);
            }
        }

        let lines: Vec<BudgetPerformanceLine> = budget
            .into_iter()
            .map(|category| {
                let allocated = allocated.get(&category.id).copied().unwrap_or_default();
                let spent = spent.get(&category.id).copied().unwrap_or_default();
                BudgetPerformanceLine {
                    budget_category_id: category.id,
                    name: category.name,
                    target_percentage: Percentage::from_basis_points(category.target_bp),
                    allocated,
                    spent,
                    variance: allocated - spent,
                }
            })
            .collect();
        let total_allocated = lines.iter().map(|l| l.allocated).sum();
        let total_spent = lines.iter().map(|l| l.spent).sum();
        Ok(BudgetPerformanceReport {
            range,
            lines,
            total_allocated,
            total_spent,
        })
    }

    async fn income_in_range(
        &self,
        family_id: Uuid,
        range: DateRange,
    ) -> ResultEngine<Vec<income_events::Model>> {
        Ok(income_events::Entity::find()
            .filter(income_events::Column::FamilyId.eq(family_id))
            .filter(income_events::Column::Status.ne(IncomeStatus::Cancelled.as_str()))
            .filter(income_events::Column::ScheduledDate.gte(range.from))
            .filter(income_events::Column::ScheduledDate.lte(range.to))
            .all(&self.database)
            .await?)
    }

    async fn payments_in_range(
        &self,
        family_id: Uuid,
        range: DateRange,
    ) -> ResultEngine<Vec<payments::Model>> {
        Ok(payments::Entity::find()
            .filter(payments::Column::FamilyId.eq(family_id))
            .filter(payments::Column::Status.ne(PaymentStatus::Cancelled.as_str()))
            .filter(payments::Column::DueDate.gte(range.from))
            .filter(payments::Column::DueDate.lte(range.to))
            .all(&self.database)
            .await?)
    }

    async fn spending_categories_by_id(
        &self,
        family_id: Uuid,
    ) -> ResultEngine<HashMap<Uuid, spending_categories::Model>> {
        Ok(spending_categories::Entity::find()
            .filter(spending_categories::Column::FamilyId.eq(family_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn range_rejects_reversed_and_oversized_spans() {
        assert!(DateRange::new(date(2025, 2, 1), date(2025, 1, 1)).is_err());
        assert!(DateRange::new(date(2025, 1, 1), date(2025, 1, 1)).is_ok());
        assert!(DateRange::new(date(2015, 1, 1), date(2024, 12, 31)).is_ok());
        assert!(DateRange::new(date(2015, 1, 1), date(2025, 1, 1)).is_err());
        assert!(DateRange::new(date(1, 1, 1), date(9999, 12, 31)).is_err());
    }

    #[test]
    fn months_cross_year_boundary() {
        let range = DateRange::new(date(2024, 11, 15), date(2025, 2, 1)).unwrap();
        assert_eq!(
            range.months(),
            vec![(2024, 11), (2024, 12), (2025, 1), (2025, 2)]
        );
    }
}
