use chrono::Utc;
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    BudgetCategory, EngineError, Percentage, ResultEngine, SpendingCategory, budget_categories,
    spending_categories,
    util::{normalize_color, normalize_display_name, normalize_name_key, validate_target_percentage},
};

use super::{Caller, Engine, is_unique_violation, with_tx};

const DEFAULT_COLOR: &str = "#6B7280";

#[derive(Clone, Debug)]
pub struct BudgetCategoryNew {
    pub name: String,
    pub target_percentage: Percentage,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
}

/// Partial update. `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct BudgetCategoryUpdate {
    pub name: Option<String>,
    pub target_percentage: Option<Percentage>,
    pub color: Option<String>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

impl Engine {
    pub async fn create_budget_category(
        &self,
        caller: &Caller,
        new: BudgetCategoryNew,
    ) -> ResultEngine<BudgetCategory> {
        caller.require_write()?;
        let name = normalize_display_name(&new.name, "budget category")?;
        let name_norm = normalize_name_key(&name);
        validate_target_percentage(new.target_percentage)?;
        let color = normalize_color(new.color.as_deref().unwrap_or(DEFAULT_COLOR))?;

        with_tx!(self, |db_tx| {
            ensure_budget_name_free(&db_tx, caller.family_id, &name_norm, None).await?;
            ensure_target_budget(&db_tx, caller.family_id, None, new.target_percentage).await?;

            let sort_order = match new.sort_order {
                Some(order) => order,
                None => next_sort_order(&db_tx, caller.family_id).await?,
            };

            let model = budget_categories::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                family_id: ActiveValue::Set(caller.family_id),
                name: ActiveValue::Set(name.clone()),
                name_norm: ActiveValue::Set(name_norm.clone()),
                target_bp: ActiveValue::Set(new.target_percentage.basis_points()),
                color: ActiveValue::Set(color),
                sort_order: ActiveValue::Set(sort_order),
                is_active: ActiveValue::Set(true),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await
            .map_err(|err| duplicate_name_or(err, &name))?;

            Ok(BudgetCategory::from(model))
        })
    }

    /// Lists budget categories ordered by `sort_order`, then name.
    pub async fn list_budget_categories(
        &self,
        caller: &Caller,
        include_inactive: bool,
    ) -> ResultEngine<Vec<BudgetCategory>> {
        let mut query = budget_categories::Entity::find()
            .filter(budget_categories::Column::FamilyId.eq(caller.family_id))
            .order_by_asc(budget_categories::Column::SortOrder)
            .order_by_asc(budget_categories::Column::NameNorm);
        if !include_inactive {
            query = query.filter(budget_categories::Column::IsActive.eq(true));
        }
        Ok(query
            .all(&self.database)
            .await?
            .into_iter()
            .map(BudgetCategory::from)
            .collect())
    }

    pub async fn update_budget_category(
        &self,
        caller: &Caller,
        id: Uuid,
        update: BudgetCategoryUpdate,
    ) -> ResultEngine<BudgetCategory> {
        caller.require_write()?;
        let name = update
            .name
            .as_deref()
            .map(|n| normalize_display_name(n, "budget category"))
            .transpose()?;
        if let Some(target) = update.target_percentage {
            validate_target_percentage(target)?;
        }
        let color = update.color.as_deref().map(normalize_color).transpose()?;

        with_tx!(self, |db_tx| {
            let model = self
                .require_budget_category_in_family(&db_tx, caller.family_id, id)
                .await?;

            let target = update
                .target_percentage
                .unwrap_or(Percentage::from_basis_points(model.target_bp));
            let active_after = update.is_active.unwrap_or(model.is_active);
            if active_after {
                ensure_target_budget(&db_tx, caller.family_id, Some(id), target).await?;
            }

            let mut active: budget_categories::ActiveModel = model.into();
            let mut display = None;
            if let Some(name) = name {
                let name_norm = normalize_name_key(&name);
                ensure_budget_name_free(&db_tx, caller.family_id, &name_norm, Some(id)).await?;
                active.name = ActiveValue::Set(name.clone());
                active.name_norm = ActiveValue::Set(name_norm);
                display = Some(name);
            }
            active.target_bp = ActiveValue::Set(target.basis_points());
            if let Some(color) = color {
                active.color = ActiveValue::Set(color);
            }
            if let Some(order) = update.sort_order {
                active.sort_order = ActiveValue::Set(order);
            }
            active.is_active = ActiveValue::Set(active_after);

            let updated = active.update(&db_tx).await.map_err(|err| {
                duplicate_name_or(err, display.as_deref().unwrap_or_default())
            })?;
            Ok(BudgetCategory::from(updated))
        })
    }

    /// Soft-deletes a budget category. Existing allocations keep pointing at it.
    pub async fn deactivate_budget_category(
        &self,
        caller: &Caller,
        id: Uuid,
    ) -> ResultEngine<BudgetCategory> {
        self.update_budget_category(
            caller,
            id,
            BudgetCategoryUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn create_spending_category(
        &self,
        caller: &Caller,
        name: &str,
        budget_category_id: Option<Uuid>,
    ) -> ResultEngine<SpendingCategory> {
        caller.require_write()?;
        let name = normalize_display_name(name, "spending category")?;
        let name_norm = normalize_name_key(&name);

        with_tx!(self, |db_tx| {
            if let Some(budget_id) = budget_category_id {
                self.require_budget_category_in_family(&db_tx, caller.family_id, budget_id)
                    .await?;
            }
            let existing = spending_categories::Entity::find()
                .filter(spending_categories::Column::FamilyId.eq(caller.family_id))
                .filter(spending_categories::Column::NameNorm.eq(name_norm.clone()))
                .one(&db_tx)
                .await?;
            if existing.is_some() {
                return Err(EngineError::ExistingKey(name));
            }

            let model = spending_categories::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                family_id: ActiveValue::Set(caller.family_id),
                name: ActiveValue::Set(name.clone()),
                name_norm: ActiveValue::Set(name_norm),
                budget_category_id: ActiveValue::Set(budget_category_id),
                is_active: ActiveValue::Set(true),
            }
            .insert(&db_tx)
            .await
            .map_err(|err| duplicate_name_or(err, &name))?;
            Ok(SpendingCategory::from(model))
        })
    }

    pub async fn list_spending_categories(
        &self,
        caller: &Caller,
    ) -> ResultEngine<Vec<SpendingCategory>> {
        Ok(spending_categories::Entity::find()
            .filter(spending_categories::Column::FamilyId.eq(caller.family_id))
            .order_by_asc(spending_categories::Column::NameNorm)
            .all(&self.database)
            .await?
            .into_iter()
            .map(SpendingCategory::from)
            .collect())
    }
}

fn duplicate_name_or(err: DbErr, name: &str) -> EngineError {
    if is_unique_violation(&err) {
        EngineError::ExistingKey(name.to_string())
    } else {
        EngineError::Database(err)
    }
}

async fn ensure_budget_name_free<C: ConnectionTrait>(
    db: &C,
    family_id: Uuid,
    name_norm: &str,
    except: Option<Uuid>,
) -> ResultEngine<()> {
    let mut query = budget_categories::Entity::find()
        .filter(budget_categories::Column::FamilyId.eq(family_id))
        .filter(budget_categories::Column::NameNorm.eq(name_norm));
    if let Some(id) = except {
        query = query.filter(budget_categories::Column::Id.ne(id));
    }
    if let Some(existing) = query.one(db).await? {
        return Err(EngineError::ExistingKey(existing.name));
    }
    Ok(())
}

/// Active targets of a family, with `candidate` in place of `except`, must
/// not exceed 100%.
async fn ensure_target_budget<C: ConnectionTrait>(
    db: &C,
    family_id: Uuid,
    except: Option<Uuid>,
    candidate: Percentage,
) -> ResultEngine<()> {
    let mut query = budget_categories::Entity::find()
        .filter(budget_categories::Column::FamilyId.eq(family_id))
        .filter(budget_categories::Column::IsActive.eq(true));
    if let Some(id) = except {
        query = query.filter(budget_categories::Column::Id.ne(id));
    }
    let others: Percentage = query
        .all(db)
        .await?
        .into_iter()
        .map(|m| Percentage::from_basis_points(m.target_bp))
        .sum();
    let total = others + candidate;
    if total > Percentage::HUNDRED {
        return Err(EngineError::InvalidPercentage(format!(
            "active budget category targets would total {total}, above 100%"
        )));
    }
    Ok(())
}

async fn next_sort_order<C: ConnectionTrait>(db: &C, family_id: Uuid) -> ResultEngine<i32> {
    let last = budget_categories::Entity::find()
        .filter(budget_categories::Column::FamilyId.eq(family_id))
        .order_by_desc(budget_categories::Column::SortOrder)
        .one(db)
        .await?;
    Ok(last.map_or(0, |m| m.sort_order + 1))
}
