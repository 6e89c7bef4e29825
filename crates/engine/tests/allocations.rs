mod common;

use std::sync::Arc;

use common::{
    budget_category, date, engine_with_family, file_engine_with_family, income, member,
    other_family,
};
use engine::{
    AllocationSource, AllocationUpdate, EngineError, MemberRole, Money, Percentage,
};

fn pct(bp: i64) -> Percentage {
    Percentage::from_basis_points(bp)
}

#[tokio::test]
async fn template_splits_income_exactly() {
    let (engine, caller) = engine_with_family().await;
    let needs = budget_category(&engine, &caller, "Needs", 5_000).await;
    let wants = budget_category(&engine, &caller, "wants", 3_000).await;
    let savings = budget_category(&engine, &caller, "Savings", 2_000).await;
    let salary = income(&engine, &caller, 400_000, date(2025, 3, 1)).await;

    let generated = engine
        .generate_allocations(
            &caller,
            salary.id,
            AllocationSource::Template("fifty_thirty_twenty".to_string()),
        )
        .await
        .unwrap();

    let by_category: Vec<_> = generated
        .allocations
        .iter()
        .map(|a| (a.budget_category_id, a.amount))
        .collect();
    assert_eq!(
        by_category,
        vec![
            (needs.id, Money::new(200_000)),
            (wants.id, Money::new(120_000)),
            (savings.id, Money::new(80_000)),
        ]
    );
    assert_eq!(generated.total_amount, salary.amount);
    assert_eq!(generated.total_percentage, Percentage::HUNDRED);

    // Allocation is a planning layer only.
    let after = engine.income_event(&caller, salary.id).await.unwrap();
    assert_eq!(after.allocated_amount, Money::ZERO);
    assert_eq!(after.remaining_amount, salary.amount);
}

#[tokio::test]
async fn rounding_residue_goes_to_last_category() {
    let (engine, caller) = engine_with_family().await;
    let a = budget_category(&engine, &caller, "A", 3_000).await;
    let b = budget_category(&engine, &caller, "B", 3_000).await;
    let c = budget_category(&engine, &caller, "C", 3_000).await;
    let salary = income(&engine, &caller, 10_001, date(2025, 3, 1)).await;

    let generated = engine
        .generate_allocations(
            &caller,
            salary.id,
            AllocationSource::Custom(vec![(a.id, pct(3_333)), (b.id, pct(3_333)), (c.id, pct(3_334))]),
        )
        .await
        .unwrap();

    let amounts: Vec<i64> = generated.allocations.iter().map(|a| a.amount.cents()).collect();
    assert_eq!(amounts, vec![3_333, 3_333, 3_335]);
    assert_eq!(generated.total_amount, Money::new(10_001));
}

#[tokio::test]
async fn even_split_uses_every_active_category() {
    let (engine, caller) = engine_with_family().await;
    for name in ["Rent", "Food", "Fun"] {
        budget_category(&engine, &caller, name, 1_000).await;
    }
    let salary = income(&engine, &caller, 100_000, date(2025, 3, 1)).await;

    let generated = engine
        .generate_allocations(&caller, salary.id, AllocationSource::Template("even_split".to_string()))
        .await
        .unwrap();

    let percentages: Vec<i64> = generated
        .allocations
        .iter()
        .map(|a| a.percentage.basis_points())
        .collect();
    assert_eq!(percentages, vec![3_333, 3_333, 3_334]);
    assert_eq!(generated.total_amount, Money::new(100_000));
}

#[tokio::test]
async fn existing_allocations_block_regeneration_until_deleted() {
    let (engine, caller) = engine_with_family().await;
    let cat = budget_category(&engine, &caller, "Everything", 10_000).await;
    let salary = income(&engine, &caller, 50_000, date(2025, 3, 1)).await;
    let source = AllocationSource::Custom(vec![(cat.id, Percentage::HUNDRED)]);

    engine
        .generate_allocations(&caller, salary.id, source.clone())
        .await
        .unwrap();
    let err = engine
        .generate_allocations(&caller, salary.id, source.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AllocationsAlreadyExist(_)));

    assert_eq!(engine.delete_allocations(&caller, salary.id).await.unwrap(), 1);
    let again = engine
        .generate_allocations(&caller, salary.id, source)
        .await
        .unwrap();
    assert_eq!(again.allocations.len(), 1);
}

#[tokio::test]
async fn percentages_must_sum_to_hundred() {
    let (engine, caller) = engine_with_family().await;
    let a = budget_category(&engine, &caller, "A", 5_000).await;
    let b = budget_category(&engine, &caller, "B", 4_000).await;
    let salary = income(&engine, &caller, 50_000, date(2025, 3, 1)).await;

    let err = engine
        .generate_allocations(
            &caller,
            salary.id,
            AllocationSource::Custom(vec![(a.id, pct(5_000)), (b.id, pct(4_000))]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));

    // One basis point off is tolerated.
    engine
        .generate_allocations(
            &caller,
            salary.id,
            AllocationSource::Custom(vec![(a.id, pct(5_000)), (b.id, pct(4_999))]),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn categories_must_be_active_and_in_family() {
    let (engine, caller) = engine_with_family().await;
    let inactive = budget_category(&engine, &caller, "Old", 5_000).await;
    engine
        .deactivate_budget_category(&caller, inactive.id)
        .await
        .unwrap();
    let salary = income(&engine, &caller, 50_000, date(2025, 3, 1)).await;

    let err = engine
        .generate_allocations(
            &caller,
            salary.id,
            AllocationSource::Custom(vec![(inactive.id, Percentage::HUNDRED)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let stranger = other_family(&engine, "bob").await;
    let foreign = budget_category(&engine, &stranger, "Theirs", 5_000).await;
    let err = engine
        .generate_allocations(
            &caller,
            salary.id,
            AllocationSource::Custom(vec![(foreign.id, Percentage::HUNDRED)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    // The income event itself is invisible to the other family.
    let err = engine
        .generate_allocations(
            &stranger,
            salary.id,
            AllocationSource::Custom(vec![(foreign.id, Percentage::HUNDRED)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn template_needs_matching_categories() {
    let (engine, caller) = engine_with_family().await;
    budget_category(&engine, &caller, "Needs", 5_000).await;
    let salary = income(&engine, &caller, 50_000, date(2025, 3, 1)).await;

    let err = engine
        .generate_allocations(
            &caller,
            salary.id,
            AllocationSource::Template("fifty_thirty_twenty".to_string()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .generate_allocations(&caller, salary.id, AllocationSource::Template("sixty_forty".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn update_derives_the_other_side() {
    let (engine, caller) = engine_with_family().await;
    let a = budget_category(&engine, &caller, "A", 5_000).await;
    let b = budget_category(&engine, &caller, "B", 5_000).await;
    let salary = income(&engine, &caller, 400_000, date(2025, 3, 1)).await;
    let generated = engine
        .generate_allocations(
            &caller,
            salary.id,
            AllocationSource::Custom(vec![(a.id, pct(5_000)), (b.id, pct(5_000))]),
        )
        .await
        .unwrap();
    let first = generated.allocations[0].id;

    let by_amount = engine
        .update_allocation(&caller, first, AllocationUpdate::Amount(Money::new(100_000)))
        .await
        .unwrap();
    assert_eq!(by_amount.percentage, pct(2_500));

    let by_percentage = engine
        .update_allocation(&caller, first, AllocationUpdate::Percentage(pct(1_250)))
        .await
        .unwrap();
    assert_eq!(by_percentage.amount, Money::new(50_000));

    let err = engine
        .update_allocation(&caller, first, AllocationUpdate::Amount(Money::new(400_001)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));

    let err = engine
        .update_allocation(&caller, first, AllocationUpdate::Percentage(pct(10_001)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidPercentage(_)));

    let err = engine
        .update_allocation(&caller, uuid::Uuid::new_v4(), AllocationUpdate::Amount(Money::ZERO))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn viewer_cannot_generate() {
    let (engine, caller) = engine_with_family().await;
    let cat = budget_category(&engine, &caller, "All", 10_000).await;
    let salary = income(&engine, &caller, 50_000, date(2025, 3, 1)).await;
    let viewer = member(&engine, &caller, "carla", MemberRole::Viewer).await;

    let err = engine
        .generate_allocations(
            &viewer,
            salary.id,
            AllocationSource::Custom(vec![(cat.id, Percentage::HUNDRED)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    // Reads are fine.
    assert!(engine.list_allocations(&viewer, salary.id).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_generation_has_one_winner() {
    let (engine, caller, _dir) = file_engine_with_family().await;
    let cat = budget_category(&engine, &caller, "All", 10_000).await;
    let salary = income(&engine, &caller, 50_000, date(2025, 3, 1)).await;
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let caller = caller.clone();
        handles.push(tokio::spawn(async move {
            engine
                .generate_allocations(
                    &caller,
                    salary.id,
                    AllocationSource::Custom(vec![(cat.id, Percentage::HUNDRED)]),
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
                    EngineError::AllocationsAlreadyExist(_) | EngineError::Database(_)
                ),
                "unexpected error: {err:?}"
            ),
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(engine.list_allocations(&caller, salary.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn update_keeps_allocation_total_within_income() {
    let (engine, caller) = engine_with_family().await;
    let a = budget_category(&engine, &caller, "A", 5_000).await;
    let b = budget_category(&engine, &caller, "B", 5_000).await;
    let salary = income(&engine, &caller, 100_000, date(2025, 3, 1)).await;
    let generated = engine
        .generate_allocations(
            &caller,
            salary.id,
            AllocationSource::Custom(vec![(a.id, pct(5_000)), (b.id, pct(5_000))]),
        )
        .await
        .unwrap();
    let first = generated.allocations[0].id;

    let err = engine
        .update_allocation(&caller, first, AllocationUpdate::Amount(Money::new(100_000)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));

    let err = engine
        .update_allocation(&caller, first, AllocationUpdate::Percentage(pct(6_000)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRequest(_)));

    // Shrinking is fine, and so is growing back into the freed room.
    engine
        .update_allocation(&caller, first, AllocationUpdate::Amount(Money::new(20_000)))
        .await
        .unwrap();
    let updated = engine
        .update_allocation(&caller, first, AllocationUpdate::Percentage(pct(5_000)))
        .await
        .unwrap();
    assert_eq!(updated.amount, Money::new(50_000));

    let total: Money = engine
        .list_allocations(&caller, salary.id)
        .await
        .unwrap()
        .iter()
        .map(|a| a.amount)
        .sum();
    assert_eq!(total, salary.amount);
}
