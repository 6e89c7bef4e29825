//! Initial schema migration.
//!
//! - `families`, `members`, `api_tokens`: tenancy and bearer auth
//! - `budget_categories`: planning buckets with a target percentage
//! - `spending_categories`: payment classification, optionally linked to a budget category
//! - `income_events`: inflows with their attribution counters
//! - `budget_allocations`: planned split of one income event
//! - `payments`: outflows
//! - `payment_attributions`: which income events fund which payments
//!
//! Money columns hold minor units (cents), percentage columns basis points.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Families {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(Iden)]
enum Members {
    Table,
    Id,
    FamilyId,
    Username,
    Role,
    CreatedAt,
}

#[derive(Iden)]
enum ApiTokens {
    Table,
    Token,
    MemberId,
    ExpiresAt,
    Revoked,
    CreatedAt,
}

#[derive(Iden)]
enum BudgetCategories {
    Table,
    Id,
    FamilyId,
    Name,
    NameNorm,
    TargetBp,
    Color,
    SortOrder,
    IsActive,
    CreatedAt,
}

#[derive(Iden)]
enum SpendingCategories {
    Table,
    Id,
    FamilyId,
    Name,
    NameNorm,
    BudgetCategoryId,
    IsActive,
}

#[derive(Iden)]
enum IncomeEvents {
    Table,
    Id,
    FamilyId,
    Name,
    AmountMinor,
    ScheduledDate,
    ActualDate,
    Frequency,
    Status,
    AllocatedMinor,
    RemainingMinor,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
enum BudgetAllocations {
    Table,
    Id,
    IncomeEventId,
    BudgetCategoryId,
    AmountMinor,
    PercentageBp,
    CreatedAt,
}

#[derive(Iden)]
enum Payments {
    Table,
    Id,
    FamilyId,
    Payee,
    AmountMinor,
    DueDate,
    PaidDate,
    PaymentType,
    Status,
    SpendingCategoryId,
    Notes,
    CreatedAt,
}

#[derive(Iden)]
enum PaymentAttributions {
    Table,
    Id,
    PaymentId,
    IncomeEventId,
    AmountMinor,
    AttributionType,
    CreatedBy,
    CreatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Families, members, tokens
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Families::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Families::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Families::Name).string().not_null())
                    .col(
                        ColumnDef::new(Families::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Members::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Members::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Members::FamilyId).uuid().not_null())
                    .col(
                        ColumnDef::new(Members::Username)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Members::Role).string().not_null())
                    .col(
                        ColumnDef::new(Members::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-members-family_id")
                            .from(Members::Table, Members::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ApiTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ApiTokens::Token)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ApiTokens::MemberId).uuid().not_null())
                    .col(ColumnDef::new(ApiTokens::ExpiresAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ApiTokens::Revoked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(ApiTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-api_tokens-member_id")
                            .from(ApiTokens::Table, ApiTokens::MemberId)
                            .to(Members::Table, Members::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(BudgetCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BudgetCategories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BudgetCategories::FamilyId).uuid().not_null())
                    .col(ColumnDef::new(BudgetCategories::Name).string().not_null())
                    .col(ColumnDef::new(BudgetCategories::NameNorm).string().not_null())
                    .col(
                        ColumnDef::new(BudgetCategories::TargetBp)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BudgetCategories::Color).string().not_null())
                    .col(
                        ColumnDef::new(BudgetCategories::SortOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BudgetCategories::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(BudgetCategories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_categories-family_id")
                            .from(BudgetCategories::Table, BudgetCategories::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budget_categories-family_id-name_norm-unique")
                    .table(BudgetCategories::Table)
                    .col(BudgetCategories::FamilyId)
                    .col(BudgetCategories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SpendingCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SpendingCategories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SpendingCategories::FamilyId).uuid().not_null())
                    .col(ColumnDef::new(SpendingCategories::Name).string().not_null())
                    .col(ColumnDef::new(SpendingCategories::NameNorm).string().not_null())
                    .col(ColumnDef::new(SpendingCategories::BudgetCategoryId).uuid())
                    .col(
                        ColumnDef::new(SpendingCategories::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-spending_categories-family_id")
                            .from(SpendingCategories::Table, SpendingCategories::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-spending_categories-budget_category_id")
                            .from(
                                SpendingCategories::Table,
                                SpendingCategories::BudgetCategoryId,
                            )
                            .to(BudgetCategories::Table, BudgetCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-spending_categories-family_id-name_norm-unique")
                    .table(SpendingCategories::Table)
                    .col(SpendingCategories::FamilyId)
                    .col(SpendingCategories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Income events and allocations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(IncomeEvents::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(IncomeEvents::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(IncomeEvents::FamilyId).uuid().not_null())
                    .col(ColumnDef::new(IncomeEvents::Name).string().not_null())
                    .col(ColumnDef::new(IncomeEvents::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(IncomeEvents::ScheduledDate).date().not_null())
                    .col(ColumnDef::new(IncomeEvents::ActualDate).date())
                    .col(ColumnDef::new(IncomeEvents::Frequency).string().not_null())
                    .col(ColumnDef::new(IncomeEvents::Status).string().not_null())
                    .col(
                        ColumnDef::new(IncomeEvents::AllocatedMinor)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(IncomeEvents::RemainingMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(IncomeEvents::Notes).string())
                    .col(
                        ColumnDef::new(IncomeEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-income_events-family_id")
                            .from(IncomeEvents::Table, IncomeEvents::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-income_events-family_id-scheduled_date")
                    .table(IncomeEvents::Table)
                    .col(IncomeEvents::FamilyId)
                    .col(IncomeEvents::ScheduledDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BudgetAllocations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BudgetAllocations::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BudgetAllocations::IncomeEventId).uuid().not_null())
                    .col(
                        ColumnDef::new(BudgetAllocations::BudgetCategoryId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetAllocations::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetAllocations::PercentageBp)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BudgetAllocations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_allocations-income_event_id")
                            .from(BudgetAllocations::Table, BudgetAllocations::IncomeEventId)
                            .to(IncomeEvents::Table, IncomeEvents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_allocations-budget_category_id")
                            .from(BudgetAllocations::Table, BudgetAllocations::BudgetCategoryId)
                            .to(BudgetCategories::Table, BudgetCategories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budget_allocations-income_event_id-budget_category_id-unique")
                    .table(BudgetAllocations::Table)
                    .col(BudgetAllocations::IncomeEventId)
                    .col(BudgetAllocations::BudgetCategoryId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Payments and attributions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Payments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payments::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Payments::FamilyId).uuid().not_null())
                    .col(ColumnDef::new(Payments::Payee).string().not_null())
                    .col(ColumnDef::new(Payments::AmountMinor).big_integer().not_null())
                    .col(ColumnDef::new(Payments::DueDate).date().not_null())
                    .col(ColumnDef::new(Payments::PaidDate).date())
                    .col(ColumnDef::new(Payments::PaymentType).string().not_null())
                    .col(ColumnDef::new(Payments::Status).string().not_null())
                    .col(ColumnDef::new(Payments::SpendingCategoryId).uuid())
                    .col(ColumnDef::new(Payments::Notes).string())
                    .col(
                        ColumnDef::new(Payments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-family_id")
                            .from(Payments::Table, Payments::FamilyId)
                            .to(Families::Table, Families::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payments-spending_category_id")
                            .from(Payments::Table, Payments::SpendingCategoryId)
                            .to(SpendingCategories::Table, SpendingCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payments-family_id-due_date")
                    .table(Payments::Table)
                    .col(Payments::FamilyId)
                    .col(Payments::DueDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PaymentAttributions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentAttributions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentAttributions::PaymentId).uuid().not_null())
                    .col(
                        ColumnDef::new(PaymentAttributions::IncomeEventId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentAttributions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentAttributions::AttributionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentAttributions::CreatedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentAttributions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payment_attributions-payment_id")
                            .from(PaymentAttributions::Table, PaymentAttributions::PaymentId)
                            .to(Payments::Table, Payments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payment_attributions-income_event_id")
                            .from(
                                PaymentAttributions::Table,
                                PaymentAttributions::IncomeEventId,
                            )
                            .to(IncomeEvents::Table, IncomeEvents::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payment_attributions-payment_id-income_event_id-unique")
                    .table(PaymentAttributions::Table)
                    .col(PaymentAttributions::PaymentId)
                    .col(PaymentAttributions::IncomeEventId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payment_attributions-income_event_id")
                    .table(PaymentAttributions::Table)
                    .col(PaymentAttributions::IncomeEventId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(PaymentAttributions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Payments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetAllocations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IncomeEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SpendingCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetCategories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApiTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Members::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Families::Table).to_owned())
            .await?;
        Ok(())
    }
}
