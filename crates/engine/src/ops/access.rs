use chrono::Utc;
use sea_orm::{ConnectionTrait, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, MemberRole, ResultEngine, api_tokens, budget_allocations, budget_categories,
    income_events, members, payment_attributions, payments, spending_categories,
};

use super::{Caller, Engine};

/// Generates a `require_*_in_family` lookup for an entity with a
/// `family_id` column.
///
/// Rows of another family are reported exactly like missing rows.
macro_rules! impl_require_in_family {
    ($require_fn:ident, $entity:path, $model:path, $family_col:expr, $err_msg:literal) => {
        pub(super) async fn $require_fn<C: ConnectionTrait>(
            &self,
            db: &C,
            family_id: Uuid,
            target_id: Uuid,
        ) -> ResultEngine<$model> {
            <$entity>::find_by_id(target_id)
                .filter($family_col.eq(family_id))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))
        }
    };
}

impl Engine {
    impl_require_in_family!(
        require_income_event_in_family,
        income_events::Entity,
        income_events::Model,
        income_events::Column::FamilyId,
        "income event not exists"
    );

    impl_require_in_family!(
        require_payment_in_family,
        payments::Entity,
        payments::Model,
        payments::Column::FamilyId,
        "payment not exists"
    );

    impl_require_in_family!(
        require_budget_category_in_family,
        budget_categories::Entity,
        budget_categories::Model,
        budget_categories::Column::FamilyId,
        "budget category not exists"
    );

    impl_require_in_family!(
        require_spending_category_in_family,
        spending_categories::Entity,
        spending_categories::Model,
        spending_categories::Column::FamilyId,
        "spending category not exists"
    );

    /// Resolves a bearer token into the member it was issued to.
    ///
    /// Unknown, revoked and expired tokens are all `Unauthorized`.
    pub async fn authenticate(&self, token: &str) -> ResultEngine<Caller> {
        let token = token.trim();
        if token.is_empty() {
            return Err(EngineError::Unauthorized("missing token".to_string()));
        }

        let (token_model, member) = api_tokens::Entity::find_by_id(token.to_string())
            .find_also_related(members::Entity)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::Unauthorized("invalid token".to_string()))?;

        if token_model.revoked {
            return Err(EngineError::Unauthorized("token revoked".to_string()));
        }
        if token_model
            .expires_at
            .is_some_and(|expires_at| expires_at <= Utc::now())
        {
            return Err(EngineError::Unauthorized("token expired".to_string()));
        }

        let member =
            member.ok_or_else(|| EngineError::Unauthorized("invalid token".to_string()))?;
        Ok(Caller {
            member_id: member.id,
            family_id: member.family_id,
            role: MemberRole::try_from(member.role.as_str())?,
            username: member.username,
        })
    }

    /// Looks an allocation up through its income event, so that allocations
    /// of other families read as missing.
    pub(super) async fn require_allocation_in_family<C: ConnectionTrait>(
        &self,
        db: &C,
        family_id: Uuid,
        allocation_id: Uuid,
    ) -> ResultEngine<(budget_allocations::Model, income_events::Model)> {
        let not_found = || EngineError::KeyNotFound("allocation not exists".to_string());
        let (allocation, income) = budget_allocations::Entity::find_by_id(allocation_id)
            .find_also_related(income_events::Entity)
            .one(db)
            .await?
            .ok_or_else(not_found)?;
        let income = income.ok_or_else(not_found)?;
        if income.family_id != family_id {
            return Err(not_found());
        }
        Ok((allocation, income))
    }

    pub(super) async fn require_attribution_of_payment<C: ConnectionTrait>(
        &self,
        db: &C,
        payment_id: Uuid,
        attribution_id: Uuid,
    ) -> ResultEngine<payment_attributions::Model> {
        payment_attributions::Entity::find_by_id(attribution_id)
            .filter(payment_attributions::Column::PaymentId.eq(payment_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("attribution not exists".to_string()))
    }
}
