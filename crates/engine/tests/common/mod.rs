#![allow(dead_code)]

use chrono::NaiveDate;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    BudgetCategory, BudgetCategoryNew, Caller, Engine, Frequency, IncomeEvent, IncomeEventNew,
    MemberRole, Money, Payment, PaymentNew, PaymentType, Percentage,
};
use migration::MigratorTrait;
use tempfile::TempDir;

pub async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// Engine over a SQLite file, so concurrent transactions really overlap.
/// Keep the returned directory alive for the duration of the test.
pub async fn file_engine_with_family() -> (Engine, Caller, TempDir) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("ledger.db").display());
    let db = Database::connect(url.as_str()).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    let (_, admin) = engine.new_family("Rossi", "alice").await.unwrap();
    let caller = login(&engine, &admin.username).await;
    (engine, caller, dir)
}

/// Engine with one family whose admin is `alice`.
pub async fn engine_with_family() -> (Engine, Caller) {
    let (engine, _db) = engine_with_db().await;
    let (_, admin) = engine.new_family("Rossi", "alice").await.unwrap();
    let caller = login(&engine, &admin.username).await;
    (engine, caller)
}

pub async fn login(engine: &Engine, username: &str) -> Caller {
    let token = engine.issue_token(username, None).await.unwrap();
    engine.authenticate(&token).await.unwrap()
}

/// Adds a member to the caller's family and logs them in.
pub async fn member(engine: &Engine, family_of: &Caller, username: &str, role: MemberRole) -> Caller {
    engine
        .add_member(family_of.family_id, username, role)
        .await
        .unwrap();
    login(engine, username).await
}

/// A second, unrelated family.
pub async fn other_family(engine: &Engine, admin: &str) -> Caller {
    engine.new_family("Bianchi", admin).await.unwrap();
    login(engine, admin).await
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub async fn income(engine: &Engine, caller: &Caller, cents: i64, scheduled: NaiveDate) -> IncomeEvent {
    engine
        .create_income_event(
            caller,
            IncomeEventNew {
                name: "Salary".to_string(),
                amount: Money::new(cents),
                scheduled_date: scheduled,
                frequency: Frequency::Monthly,
                notes: None,
            },
        )
        .await
        .unwrap()
}

pub async fn payment(engine: &Engine, caller: &Caller, cents: i64, due: NaiveDate) -> Payment {
    engine
        .create_payment(
            caller,
            PaymentNew {
                payee: "Landlord".to_string(),
                amount: Money::new(cents),
                due_date: due,
                payment_type: PaymentType::Once,
                spending_category_id: None,
                notes: None,
            },
        )
        .await
        .unwrap()
}

pub async fn budget_category(engine: &Engine, caller: &Caller, name: &str, bp: i64) -> BudgetCategory {
    engine
        .create_budget_category(
            caller,
            BudgetCategoryNew {
                name: name.to_string(),
                target_percentage: Percentage::from_basis_points(bp),
                color: None,
                sort_order: None,
            },
        )
        .await
        .unwrap()
}
