mod common;

use common::{budget_category, date, engine_with_family, income, other_family};
use engine::{
    AllocationSource, Caller, DateRange, Engine, Money, PaymentNew, PaymentStatus, PaymentType,
    Percentage,
};
use uuid::Uuid;

async fn spend(engine: &Engine, caller: &Caller, cents: i64, due: chrono::NaiveDate, category: Option<Uuid>) -> Uuid {
    engine
        .create_payment(
            caller,
            PaymentNew {
                payee: "Shop".to_string(),
                amount: Money::new(cents),
                due_date: due,
                payment_type: PaymentType::Once,
                spending_category_id: category,
                notes: None,
            },
        )
        .await
        .unwrap()
        .id
}

/// January: 1000 in, 300 rent. February: 2000 in, 200 uncategorised plus a
/// cancelled 50. March: nothing.
async fn seeded() -> (Engine, Caller, Uuid) {
    let (engine, caller) = engine_with_family().await;
    let housing = budget_category(&engine, &caller, "Housing", 5_000).await;
    let rent = engine
        .create_spending_category(&caller, "Rent", Some(housing.id))
        .await
        .unwrap();

    let january = income(&engine, &caller, 100_000, date(2025, 1, 1)).await;
    income(&engine, &caller, 200_000, date(2025, 2, 1)).await;
    engine
        .generate_allocations(
            &caller,
            january.id,
            AllocationSource::Custom(vec![(housing.id, Percentage::HUNDRED)]),
        )
        .await
        .unwrap();

    spend(&engine, &caller, 30_000, date(2025, 1, 5), Some(rent.id)).await;
    spend(&engine, &caller, 20_000, date(2025, 2, 5), None).await;
    let cancelled = spend(&engine, &caller, 5_000, date(2025, 2, 6), None).await;
    engine
        .update_payment_status(&caller, cancelled, PaymentStatus::Cancelled, None)
        .await
        .unwrap();

    // Noise from another family.
    let stranger = other_family(&engine, "bob").await;
    income(&engine, &stranger, 999_999, date(2025, 1, 1)).await;

    (engine, caller, housing.id)
}

fn q1() -> DateRange {
    DateRange::new(date(2025, 1, 1), date(2025, 3, 31)).unwrap()
}

#[tokio::test]
async fn cash_flow_by_month() {
    let (engine, caller, _) = seeded().await;
    let report = engine.cash_flow_report(&caller, q1()).await.unwrap();

    let months: Vec<(&str, i64, i64, i64)> = report
        .months
        .iter()
        .map(|m| (m.month.as_str(), m.income.cents(), m.expenses.cents(), m.net.cents()))
        .collect();
    assert_eq!(
        months,
        vec![
            ("2025-01", 100_000, 30_000, 70_000),
            ("2025-02", 200_000, 20_000, 180_000),
            ("2025-03", 0, 0, 0),
        ]
    );
    assert_eq!(report.total_income, Money::new(300_000));
    assert_eq!(report.total_expenses, Money::new(50_000));
    assert_eq!(report.net, Money::new(250_000));
}

#[tokio::test]
async fn spending_by_category() {
    let (engine, caller, _) = seeded().await;
    let report = engine.spending_report(&caller, q1()).await.unwrap();

    assert_eq!(report.total, Money::new(50_000));
    let lines: Vec<(&str, i64, i64)> = report
        .lines
        .iter()
        .map(|l| (l.name.as_str(), l.total.cents(), l.percentage.basis_points()))
        .collect();
    assert_eq!(
        lines,
        vec![("Rent", 30_000, 6_000), ("Uncategorized", 20_000, 4_000)]
    );
}

#[tokio::test]
async fn savings_rate_over_range() {
    let (engine, caller, _) = seeded().await;
    let rate = engine.savings_rate(&caller, q1()).await.unwrap();
    assert_eq!(rate.savings, Money::new(250_000));
    assert_eq!(rate.rate, Percentage::from_basis_points(8_333));

    let empty = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
    let rate = engine.savings_rate(&caller, empty).await.unwrap();
    assert_eq!(rate.income, Money::ZERO);
    assert_eq!(rate.rate, Percentage::ZERO);
}

#[tokio::test]
async fn budget_performance_links_spending_to_budget() {
    let (engine, caller, housing) = seeded().await;
    let report = engine.budget_performance(&caller, q1()).await.unwrap();

    assert_eq!(report.lines.len(), 1);
    let line = &report.lines[0];
    assert_eq!(line.budget_category_id, housing);
    assert_eq!(line.allocated, Money::new(100_000));
    assert_eq!(line.spent, Money::new(30_000));
    assert_eq!(line.variance, Money::new(70_000));
    assert_eq!(line.target_percentage, Percentage::from_basis_points(5_000));
}
