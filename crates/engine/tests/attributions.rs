mod common;

use std::sync::Arc;

use common::{date, engine_with_family, file_engine_with_family, income, other_family, payment};
use engine::{
    AttributionState, AttributionType, AutoAttributeStrategy, EngineError, Money, SYSTEM_CREATOR,
};
use uuid::Uuid;

#[tokio::test]
async fn attribution_moves_income_to_allocated() {
    let (engine, caller) = engine_with_family().await;
    let salary = income(&engine, &caller, 400_000, date(2025, 3, 1)).await;
    let rent = payment(&engine, &caller, 120_000, date(2025, 3, 5)).await;

    let created = engine
        .create_attribution(&caller, rent.id, salary.id, Money::new(80_000), AttributionType::Manual)
        .await
        .unwrap();

    assert_eq!(created.income_event.allocated_amount, Money::new(80_000));
    assert_eq!(created.income_event.remaining_amount, Money::new(320_000));
    assert_eq!(created.attribution.created_by, "alice");
    assert_eq!(created.summary.total_attributed, Money::new(80_000));
    assert_eq!(created.summary.remaining_amount, Money::new(40_000));
    assert!(!created.summary.fully_attributed);
    assert_eq!(created.summary.state, AttributionState::PartiallyAttributed);
}

#[tokio::test]
async fn payment_amount_cannot_be_exceeded() {
    let (engine, caller) = engine_with_family().await;
    let first = income(&engine, &caller, 500_000, date(2025, 3, 1)).await;
    let second = income(&engine, &caller, 500_000, date(2025, 3, 15)).await;
    let rent = payment(&engine, &caller, 120_000, date(2025, 3, 5)).await;

    engine
        .create_attribution(&caller, rent.id, first.id, Money::new(100_000), AttributionType::Manual)
        .await
        .unwrap();
    let err = engine
        .create_attribution(&caller, rent.id, second.id, Money::new(50_000), AttributionType::Manual)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::AttributionExceedsPayment {
            payment_amount: Money::new(120_000),
            currently_attributed: Money::new(100_000),
            available: Money::new(20_000),
            requested: Money::new(50_000),
        }
    );
}

#[tokio::test]
async fn income_remaining_cannot_be_exceeded() {
    let (engine, caller) = engine_with_family().await;
    let bonus = income(&engine, &caller, 30_000, date(2025, 3, 1)).await;
    let car = payment(&engine, &caller, 90_000, date(2025, 3, 5)).await;

    let err = engine
        .create_attribution(&caller, car.id, bonus.id, Money::new(30_001), AttributionType::Manual)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientIncomeRemaining {
            available: Money::new(30_000),
            requested: Money::new(30_001),
        }
    );

    let unchanged = engine.income_event(&caller, bonus.id).await.unwrap();
    assert_eq!(unchanged.remaining_amount, Money::new(30_000));
    assert_eq!(unchanged.allocated_amount, Money::ZERO);
}

#[tokio::test]
async fn duplicate_pair_is_a_conflict() {
    let (engine, caller) = engine_with_family().await;
    let salary = income(&engine, &caller, 400_000, date(2025, 3, 1)).await;
    let rent = payment(&engine, &caller, 120_000, date(2025, 3, 5)).await;

    engine
        .create_attribution(&caller, rent.id, salary.id, Money::new(10_000), AttributionType::Manual)
        .await
        .unwrap();
    let err = engine
        .create_attribution(&caller, rent.id, salary.id, Money::new(10_000), AttributionType::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AttributionAlreadyExists { .. }));
}

#[tokio::test]
async fn preconditions_are_checked_in_order() {
    let (engine, caller) = engine_with_family().await;
    let salary = income(&engine, &caller, 400_000, date(2025, 3, 1)).await;
    let rent = payment(&engine, &caller, 120_000, date(2025, 3, 5)).await;
    let stranger = other_family(&engine, "bob").await;
    let foreign_income = income(&engine, &stranger, 400_000, date(2025, 3, 1)).await;

    let err = engine
        .create_attribution(&caller, Uuid::new_v4(), salary.id, Money::ZERO, AttributionType::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .create_attribution(&caller, rent.id, Uuid::new_v4(), Money::ZERO, AttributionType::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .create_attribution(&caller, rent.id, foreign_income.id, Money::ZERO, AttributionType::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .create_attribution(&caller, rent.id, salary.id, Money::ZERO, AttributionType::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    // Another family's payment reads as missing.
    let err = engine
        .create_attribution(&stranger, rent.id, foreign_income.id, Money::new(1), AttributionType::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn delete_restores_bookkeeping() {
    let (engine, caller) = engine_with_family().await;
    let salary = income(&engine, &caller, 400_000, date(2025, 3, 1)).await;
    let rent = payment(&engine, &caller, 120_000, date(2025, 3, 5)).await;

    let created = engine
        .create_attribution(&caller, rent.id, salary.id, Money::new(120_000), AttributionType::Manual)
        .await
        .unwrap();
    assert_eq!(created.summary.state, AttributionState::FullyAttributed);

    let summary = engine
        .delete_attribution(&caller, rent.id, created.attribution.id)
        .await
        .unwrap();
    assert_eq!(summary.state, AttributionState::Unattributed);
    assert_eq!(summary.remaining_amount, Money::new(120_000));

    let restored = engine.income_event(&caller, salary.id).await.unwrap();
    assert_eq!(restored.allocated_amount, Money::ZERO);
    assert_eq!(restored.remaining_amount, Money::new(400_000));

    let err = engine
        .delete_attribution(&caller, rent.id, created.attribution.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn proportional_auto_attribute_sums_exactly() {
    let (engine, caller) = engine_with_family().await;
    let big = income(&engine, &caller, 300_000, date(2025, 3, 1)).await;
    let small = income(&engine, &caller, 200_000, date(2025, 3, 15)).await;
    let bill = payment(&engine, &caller, 12_550, date(2025, 3, 20)).await;

    let result = engine
        .auto_attribute(&caller, bill.id, AutoAttributeStrategy::Proportional, None)
        .await
        .unwrap();

    let split: Vec<(Uuid, Money)> = result
        .attributions
        .iter()
        .map(|a| (a.income_event_id, a.amount))
        .collect();
    assert_eq!(
        split,
        vec![(big.id, Money::new(7_530)), (small.id, Money::new(5_020))]
    );
    assert_eq!(result.total_attributed, Money::new(12_550));
    assert_eq!(result.remaining_amount, Money::ZERO);
    assert!(result.summary.fully_attributed);
    assert!(result.attributions.iter().all(|a| {
        a.attribution_type == AttributionType::Automatic && a.created_by == SYSTEM_CREATOR
    }));
}

#[tokio::test]
async fn greedy_strategies_follow_schedule_order() {
    let (engine, caller) = engine_with_family().await;
    let january = income(&engine, &caller, 10_000, date(2025, 1, 1)).await;
    let february = income(&engine, &caller, 10_000, date(2025, 2, 1)).await;

    let first = payment(&engine, &caller, 15_000, date(2025, 2, 10)).await;
    let earliest = engine
        .auto_attribute(&caller, first.id, AutoAttributeStrategy::Default, None)
        .await
        .unwrap();
    let split: Vec<(Uuid, i64)> = earliest
        .attributions
        .iter()
        .map(|a| (a.income_event_id, a.amount.cents()))
        .collect();
    assert_eq!(split, vec![(january.id, 10_000), (february.id, 5_000)]);

    let second = payment(&engine, &caller, 3_000, date(2025, 2, 10)).await;
    let latest = engine
        .auto_attribute(&caller, second.id, AutoAttributeStrategy::LatestIncome, None)
        .await
        .unwrap();
    assert_eq!(latest.attributions.len(), 1);
    assert_eq!(latest.attributions[0].income_event_id, february.id);
    assert_eq!(latest.attributions[0].amount, Money::new(3_000));
}

#[tokio::test]
async fn auto_attribute_allows_partial_fulfilment() {
    let (engine, caller) = engine_with_family().await;
    income(&engine, &caller, 5_000, date(2025, 1, 1)).await;
    let bill = payment(&engine, &caller, 8_000, date(2025, 1, 10)).await;

    let result = engine
        .auto_attribute(&caller, bill.id, AutoAttributeStrategy::EarliestIncome, None)
        .await
        .unwrap();
    assert_eq!(result.total_attributed, Money::new(5_000));
    assert_eq!(result.remaining_amount, Money::new(3_000));
    assert_eq!(result.summary.state, AttributionState::PartiallyAttributed);

    // Nothing left to draw from.
    let err = engine
        .auto_attribute(&caller, bill.id, AutoAttributeStrategy::EarliestIncome, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientAvailableIncome(_)));
}

#[tokio::test]
async fn auto_attribute_respects_preferred_events() {
    let (engine, caller) = engine_with_family().await;
    income(&engine, &caller, 10_000, date(2025, 1, 1)).await;
    let preferred = income(&engine, &caller, 10_000, date(2025, 2, 1)).await;
    let bill = payment(&engine, &caller, 4_000, date(2025, 2, 10)).await;

    let result = engine
        .auto_attribute(
            &caller,
            bill.id,
            AutoAttributeStrategy::EarliestIncome,
            Some(vec![preferred.id]),
        )
        .await
        .unwrap();
    assert_eq!(result.attributions.len(), 1);
    assert_eq!(result.attributions[0].income_event_id, preferred.id);

    let err = engine
        .auto_attribute(&caller, bill.id, AutoAttributeStrategy::Default, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
}

#[tokio::test]
async fn cancelled_income_is_never_a_candidate() {
    let (engine, caller) = engine_with_family().await;
    let salary = income(&engine, &caller, 10_000, date(2025, 1, 1)).await;
    engine.cancel_income_event(&caller, salary.id).await.unwrap();
    let bill = payment(&engine, &caller, 4_000, date(2025, 1, 10)).await;

    let err = engine
        .auto_attribute(&caller, bill.id, AutoAttributeStrategy::Proportional, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientAvailableIncome(_)));

    let err = engine
        .create_attribution(&caller, bill.id, salary.id, Money::new(100), AttributionType::Manual)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));
}

#[tokio::test]
async fn bookkeeping_balances_after_mixed_operations() {
    let (engine, caller) = engine_with_family().await;
    let first = income(&engine, &caller, 250_000, date(2025, 1, 1)).await;
    let second = income(&engine, &caller, 175_033, date(2025, 1, 15)).await;

    let mut bills = Vec::new();
    for cents in [33_333, 125_099, 7_001] {
        bills.push(payment(&engine, &caller, cents, date(2025, 1, 20)).await);
    }
    engine
        .create_attribution(&caller, bills[0].id, second.id, Money::new(20_000), AttributionType::Manual)
        .await
        .unwrap();
    engine
        .auto_attribute(&caller, bills[1].id, AutoAttributeStrategy::Proportional, None)
        .await
        .unwrap();
    engine
        .auto_attribute(&caller, bills[2].id, AutoAttributeStrategy::LatestIncome, None)
        .await
        .unwrap();
    let attributions = engine.list_attributions(&caller, bills[1].id).await.unwrap();
    engine
        .delete_attribution(&caller, bills[1].id, attributions[0].id)
        .await
        .unwrap();
    engine.delete_payment(&caller, bills[2].id).await.unwrap();

    for id in [first.id, second.id] {
        let event = engine.income_event(&caller, id).await.unwrap();
        assert_eq!(event.allocated_amount + event.remaining_amount, event.amount);
        assert!(!event.remaining_amount.is_negative());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_attributions_have_one_winner() {
    let (engine, caller, _dir) = file_engine_with_family().await;
    let salary = income(&engine, &caller, 400_000, date(2025, 3, 1)).await;
    let rent = payment(&engine, &caller, 120_000, date(2025, 3, 5)).await;
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let caller = caller.clone();
        handles.push(tokio::spawn(async move {
            engine
                .create_attribution(
                    &caller,
                    rent.id,
                    salary.id,
                    Money::new(50_000),
                    AttributionType::Manual,
                )
                .await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            // A writer that loses the SQLite lock surfaces as a database error.
            Err(err) => assert!(
                matches!(
                    err,
                    EngineError::AttributionAlreadyExists { .. } | EngineError::Database(_)
                ),
                "unexpected error: {err:?}"
            ),
        }
    }
    assert_eq!(wins, 1);
    let event = engine.income_event(&caller, salary.id).await.unwrap();
    assert_eq!(event.allocated_amount, Money::new(50_000));
    assert_eq!(event.remaining_amount, Money::new(350_000));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_attributions_never_overfund_a_payment() {
    let (engine, caller, _dir) = file_engine_with_family().await;
    let rent = payment(&engine, &caller, 120_000, date(2025, 3, 5)).await;
    let mut incomes = Vec::new();
    for day in 1..=8 {
        incomes.push(income(&engine, &caller, 100_000, date(2025, 3, day)).await);
    }
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for event in &incomes {
        let engine = Arc::clone(&engine);
        let caller = caller.clone();
        let income_id = event.id;
        handles.push(tokio::spawn(async move {
            engine
                .create_attribution(
                    &caller,
                    rent.id,
                    income_id,
                    Money::new(90_000),
                    AttributionType::Manual,
                )
                .await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => wins += 1,
            Err(err) => assert!(
                matches!(
                    err,
                    EngineError::AttributionExceedsPayment { .. } | EngineError::Database(_)
                ),
                "unexpected error: {err:?}"
            ),
        }
    }
    assert_eq!(wins, 1);

    let summary = engine.payment_summary(&caller, rent.id).await.unwrap();
    assert_eq!(summary.total_attributed, Money::new(90_000));
    assert_eq!(summary.state, AttributionState::PartiallyAttributed);
    let mut funded = Money::ZERO;
    for event in &incomes {
        funded += engine.income_event(&caller, event.id).await.unwrap().allocated_amount;
    }
    assert_eq!(funded, summary.total_attributed);
}
