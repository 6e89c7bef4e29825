use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Family, Member, MemberRole, ResultEngine, api_tokens, families, members,
    util::normalize_display_name,
};

use super::{Caller, Engine, is_unique_violation, with_tx};

impl Engine {
    /// Creates a family together with its first (admin) member.
    pub async fn new_family(&self, name: &str, admin_username: &str) -> ResultEngine<(Family, Member)> {
        let name = normalize_display_name(name, "family")?;
        let username = normalize_username(admin_username)?;

        with_tx!(self, |db_tx| {
            let family = families::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                name: ActiveValue::Set(name.clone()),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            let member = insert_member(&db_tx, family.id, &username, MemberRole::Admin).await?;
            tracing::info!(family_id = %family.id, "family created");
            Ok((Family::from(family), member))
        })
    }

    /// Adds a member to an existing family.
    pub async fn add_member(
        &self,
        family_id: Uuid,
        username: &str,
        role: MemberRole,
    ) -> ResultEngine<Member> {
        let username = normalize_username(username)?;
        with_tx!(self, |db_tx| {
            families::Entity::find_by_id(family_id)
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("family not exists".to_string()))?;
            insert_member(&db_tx, family_id, &username, role).await
        })
    }

    /// Adds a member to the caller's family (admin-only).
    pub async fn invite_member(
        &self,
        caller: &Caller,
        username: &str,
        role: MemberRole,
    ) -> ResultEngine<Member> {
        caller.require_admin()?;
        self.add_member(caller.family_id, username, role).await
    }

    pub async fn list_members(&self, caller: &Caller) -> ResultEngine<Vec<Member>> {
        members::Entity::find()
            .filter(members::Column::FamilyId.eq(caller.family_id))
            .order_by_asc(members::Column::Username)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Member::try_from)
            .collect()
    }

    /// Issues a new opaque bearer token for `username`.
    pub async fn issue_token(
        &self,
        username: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<String> {
        let member = members::Entity::find()
            .filter(members::Column::Username.eq(username.trim()))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("member not exists".to_string()))?;

        let token = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        api_tokens::ActiveModel {
            token: ActiveValue::Set(token.clone()),
            member_id: ActiveValue::Set(member.id),
            expires_at: ActiveValue::Set(expires_at),
            revoked: ActiveValue::Set(false),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(&self.database)
        .await?;
        tracing::info!(member_id = %member.id, "api token issued");
        Ok(token)
    }

    pub async fn revoke_token(&self, token: &str) -> ResultEngine<()> {
        let model = api_tokens::Entity::find_by_id(token.trim().to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("token not exists".to_string()))?;
        let mut active: api_tokens::ActiveModel = model.into();
        active.revoked = ActiveValue::Set(true);
        active.update(&self.database).await?;
        Ok(())
    }
}

fn normalize_username(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
        return Err(EngineError::InvalidName(
            "username must be non-empty and contain no whitespace".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

async fn insert_member(
    db_tx: &sea_orm::DatabaseTransaction,
    family_id: Uuid,
    username: &str,
    role: MemberRole,
) -> ResultEngine<Member> {
    let model = members::ActiveModel {
        id: ActiveValue::Set(Uuid::new_v4()),
        family_id: ActiveValue::Set(family_id),
        username: ActiveValue::Set(username.to_string()),
        role: ActiveValue::Set(role.as_str().to_string()),
        created_at: ActiveValue::Set(Utc::now()),
    }
    .insert(db_tx)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            EngineError::ExistingKey(username.to_string())
        } else {
            EngineError::Database(err)
        }
    })?;
    Member::try_from(model)
}
