//! Report API endpoints. All of them take an inclusive `from`/`to` range.

use api_types::report::{
    BudgetPerformance, BudgetPerformanceLine, CashFlowMonth, CashFlowReport, ReportQuery,
    SavingsRate, SpendingLine, SpendingReport,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use engine::{Caller, DateRange};

use crate::{ServerError, server::ServerState};

type RangeQuery = WithRejection<Query<ReportQuery>, ServerError>;

fn range(query: &ReportQuery) -> Result<DateRange, ServerError> {
    Ok(DateRange::new(query.from, query.to)?)
}

pub async fn cash_flow(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): RangeQuery,
) -> Result<Json<CashFlowReport>, ServerError> {
    let report = state
        .engine
        .cash_flow_report(&caller, range(&query)?)
        .await?;

    Ok(Json(CashFlowReport {
        from: report.range.from,
        to: report.range.to,
        months: report
            .months
            .into_iter()
            .map(|month| CashFlowMonth {
                month: month.month,
                income: month.income.to_major(),
                expenses: month.expenses.to_major(),
                net: month.net.to_major(),
            })
            .collect(),
        total_income: report.total_income.to_major(),
        total_expenses: report.total_expenses.to_major(),
        net: report.net.to_major(),
    }))
}

pub async fn spending(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): RangeQuery,
) -> Result<Json<SpendingReport>, ServerError> {
    let report = state
        .engine
        .spending_report(&caller, range(&query)?)
        .await?;

    Ok(Json(SpendingReport {
        from: report.range.from,
        to: report.range.to,
        total: report.total.to_major(),
        categories: report
            .lines
            .into_iter()
            .map(|line| SpendingLine {
                spending_category_id: line.spending_category_id,
                name: line.name,
                total: line.total.to_major(),
                percentage: line.percentage.to_percent(),
            })
            .collect(),
    }))
}

pub async fn savings_rate(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): RangeQuery,
) -> Result<Json<SavingsRate>, ServerError> {
    let rate = state.engine.savings_rate(&caller, range(&query)?).await?;

    Ok(Json(SavingsRate {
        from: rate.range.from,
        to: rate.range.to,
        income: rate.income.to_major(),
        expenses: rate.expenses.to_major(),
        savings: rate.savings.to_major(),
        savings_rate: rate.rate.to_percent(),
    }))
}

pub async fn budget_performance(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): RangeQuery,
) -> Result<Json<BudgetPerformance>, ServerError> {
    let report = state
        .engine
        .budget_performance(&caller, range(&query)?)
        .await?;

    Ok(Json(BudgetPerformance {
        from: report.range.from,
        to: report.range.to,
        categories: report
            .lines
            .into_iter()
            .map(|line| BudgetPerformanceLine {
                budget_category_id: line.budget_category_id,
                name: line.name,
                target_percentage: line.target_percentage.to_percent(),
                allocated: line.allocated.to_major(),
                spent: line.spent.to_major(),
                variance: line.variance.to_major(),
            })
            .collect(),
        total_allocated: report.total_allocated.to_major(),
        total_spent: report.total_spent.to_major(),
    }))
}
