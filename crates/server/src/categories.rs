//! Budget and spending category API endpoints.

use api_types::category::{
    BudgetCategoriesResponse, BudgetCategoryNew, BudgetCategoryQuery, BudgetCategoryUpdate,
    BudgetCategoryView, SpendingCategoriesResponse, SpendingCategoryNew, SpendingCategoryView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use axum_extra::extract::WithRejection;
use engine::{Caller, Percentage};

use crate::{ServerError, parse_id, server::ServerState};

fn map_budget_category(category: engine::BudgetCategory) -> BudgetCategoryView {
    BudgetCategoryView {
        id: category.id,
        name: category.name,
        target_percentage: category.target_percentage.to_percent(),
        color: category.color,
        sort_order: category.sort_order,
        is_active: category.is_active,
    }
}

fn map_spending_category(category: engine::SpendingCategory) -> SpendingCategoryView {
    SpendingCategoryView {
        id: category.id,
        name: category.name,
        budget_category_id: category.budget_category_id,
        is_active: category.is_active,
    }
}

pub async fn list_budget(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Query(query), _): WithRejection<Query<BudgetCategoryQuery>, ServerError>,
) -> Result<Json<BudgetCategoriesResponse>, ServerError> {
    let categories = state
        .engine
        .list_budget_categories(&caller, query.include_inactive.unwrap_or(false))
        .await?;
    let total: Percentage = categories
        .iter()
        .filter(|c| c.is_active)
        .map(|c| c.target_percentage)
        .sum();

    Ok(Json(BudgetCategoriesResponse {
        categories: categories.into_iter().map(map_budget_category).collect(),
        total_target_percentage: total.to_percent(),
    }))
}

pub async fn create_budget(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<BudgetCategoryNew>, ServerError>,
) -> Result<(StatusCode, Json<BudgetCategoryView>), ServerError> {
    let new = engine::BudgetCategoryNew {
        name: payload.name,
        target_percentage: Percentage::from_percent(payload.target_percentage)?,
        color: payload.color,
        sort_order: payload.sort_order,
    };
    let category = state.engine.create_budget_category(&caller, new).await?;

    Ok((StatusCode::CREATED, Json(map_budget_category(category))))
}

pub async fn update_budget(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    WithRejection(Json(payload), _): WithRejection<Json<BudgetCategoryUpdate>, ServerError>,
) -> Result<Json<BudgetCategoryView>, ServerError> {
    let id = parse_id(&id, "budget category")?;
    let update = engine::BudgetCategoryUpdate {
        name: payload.name,
        target_percentage: payload
            .target_percentage
            .map(Percentage::from_percent)
            .transpose()?,
        color: payload.color,
        sort_order: payload.sort_order,
        is_active: payload.is_active,
    };
    let category = state
        .engine
        .update_budget_category(&caller, id, update)
        .await?;

    Ok(Json(map_budget_category(category)))
}

/// Budget categories are never removed, `DELETE` deactivates them.
pub async fn deactivate_budget(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<BudgetCategoryView>, ServerError> {
    let id = parse_id(&id, "budget category")?;
    let category = state.engine.deactivate_budget_category(&caller, id).await?;
    Ok(Json(map_budget_category(category)))
}

pub async fn list_spending(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<SpendingCategoriesResponse>, ServerError> {
    let categories = state
        .engine
        .list_spending_categories(&caller)
        .await?
        .into_iter()
        .map(map_spending_category)
        .collect();

    Ok(Json(SpendingCategoriesResponse { categories }))
}

pub async fn create_spending(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    WithRejection(Json(payload), _): WithRejection<Json<SpendingCategoryNew>, ServerError>,
) -> Result<(StatusCode, Json<SpendingCategoryView>), ServerError> {
    let budget_category_id = payload
        .budget_category_id
        .as_deref()
        .map(|id| parse_id(id, "budget category"))
        .transpose()?;
    let category = state
        .engine
        .create_spending_category(&caller, &payload.name, budget_category_id)
        .await?;

    Ok((StatusCode::CREATED, Json(map_spending_category(category))))
}
