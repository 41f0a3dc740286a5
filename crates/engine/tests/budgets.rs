use chrono::{DateTime, TimeZone, Utc};
use sea_orm::Database;

use engine::{
    AppendCmd, BudgetScope, Currency, Engine, EngineError, EntryMeta, Period,
};
use migration::MigratorTrait;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

async fn family_with_members(engine: &Engine) -> String {
    let family_id = engine
        .create_family("Rossi", "alice", Some(Currency::Eur))
        .await
        .unwrap();
    engine.invite(&family_id, "alice", "bob").await.unwrap();
    engine.join(&family_id, "bob").await.unwrap();
    family_id
}

fn june(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
}

async fn add(
    engine: &Engine,
    family_id: &str,
    user: &str,
    amount_minor: i64,
    category: &str,
    at: DateTime<Utc>,
) {
    engine
        .append(AppendCmd::new(
            family_id,
            user,
            amount_minor,
            category,
            EntryMeta::new(at),
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn overall_limit_scenario() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;
    let period = Period::month(2024, 6).unwrap();

    engine
        .set_limit(&family_id, "alice", BudgetScope::Overall, period, 50_000)
        .await
        .unwrap();

    add(&engine, &family_id, "alice", 200_000, "salary", june(1, 9)).await;
    add(&engine, &family_id, "alice", -30_000, "groceries", june(5, 9)).await;
    add(&engine, &family_id, "bob", -25_000, "groceries", june(6, 9)).await;

    let util = engine
        .utilization(&family_id, "alice", BudgetScope::Overall, period)
        .await
        .unwrap();

    // Spent counts expenses only; income is reported separately and never
    // offsets the limit.
    assert_eq!(util.spent_minor, 55_000);
    assert_eq!(util.income_minor, 200_000);
    assert_eq!(util.limit_minor, Some(50_000));
    assert_eq!(util.remaining_minor, Some(-5_000));
    assert_eq!(util.over_limit_by_minor, 5_000);
}

#[tokio::test]
async fn category_and_overall_limits_are_independent() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;
    let period = Period::month(2024, 6).unwrap();
    let groceries = BudgetScope::category("groceries").unwrap();

    engine
        .set_limit(&family_id, "alice", BudgetScope::Overall, period, 100_000)
        .await
        .unwrap();
    engine
        .set_limit(&family_id, "alice", groceries.clone(), period, 20_000)
        .await
        .unwrap();

    add(&engine, &family_id, "alice", -30_000, "groceries", june(5, 9)).await;
    add(&engine, &family_id, "bob", -25_000, "dining", june(6, 9)).await;

    let by_category = engine
        .utilization(&family_id, "bob", groceries, period)
        .await
        .unwrap();
    assert_eq!(by_category.spent_minor, 30_000);
    assert_eq!(by_category.remaining_minor, Some(-10_000));
    assert_eq!(by_category.over_limit_by_minor, 10_000);

    let overall = engine
        .utilization(&family_id, "bob", BudgetScope::Overall, period)
        .await
        .unwrap();
    assert_eq!(overall.spent_minor, 55_000);
    assert_eq!(overall.remaining_minor, Some(45_000));
    assert_eq!(overall.over_limit_by_minor, 0);
}

#[tokio::test]
async fn utilization_without_limit_reports_spend_only() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;
    let period = Period::month(2024, 6).unwrap();

    add(&engine, &family_id, "bob", -7_500, "transport", june(3, 9)).await;

    let util = engine
        .utilization(&family_id, "bob", BudgetScope::Overall, period)
        .await
        .unwrap();
    assert_eq!(util.spent_minor, 7_500);
    assert_eq!(util.limit_minor, None);
    assert_eq!(util.remaining_minor, None);
    assert_eq!(util.over_limit_by_minor, 0);
}

#[tokio::test]
async fn entries_outside_the_period_are_excluded() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;
    let period = Period::month(2024, 6).unwrap();

    add(&engine, &family_id, "alice", -10_000, "groceries", june(30, 23)).await;
    add(
        &engine,
        &family_id,
        "alice",
        -99_000,
        "groceries",
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap(),
    )
    .await;

    let util = engine
        .utilization(&family_id, "alice", BudgetScope::Overall, period)
        .await
        .unwrap();
    assert_eq!(util.spent_minor, 10_000);
}

#[tokio::test]
async fn set_limit_is_last_writer_wins() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;
    let period = Period::month(2024, 6).unwrap();

    engine
        .set_limit(&family_id, "alice", BudgetScope::Overall, period, 50_000)
        .await
        .unwrap();
    engine
        .set_limit(&family_id, "alice", BudgetScope::Overall, period, 80_000)
        .await
        .unwrap();

    let limits = engine.list_limits(&family_id, "bob").await.unwrap();
    assert_eq!(limits.len(), 1);
    assert_eq!(limits[0].amount_minor, 80_000);
}

#[tokio::test]
async fn set_limit_requires_owner_role() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;
    let period = Period::month(2024, 6).unwrap();

    let err = engine
        .set_limit(&family_id, "bob", BudgetScope::Overall, period, 50_000)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAuthorized(_)));

    let limits = engine.list_limits(&family_id, "alice").await.unwrap();
    assert!(limits.is_empty());
}

#[tokio::test]
async fn set_limit_rejects_non_positive_amount() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;
    let period = Period::month(2024, 6).unwrap();

    let err = engine
        .set_limit(&family_id, "alice", BudgetScope::Overall, period, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn remove_limit_then_missing() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;
    let period = Period::month(2024, 6).unwrap();

    engine
        .set_limit(&family_id, "alice", BudgetScope::Overall, period, 50_000)
        .await
        .unwrap();
    engine
        .remove_limit(&family_id, "alice", BudgetScope::Overall, period)
        .await
        .unwrap();

    let err = engine
        .remove_limit(&family_id, "alice", BudgetScope::Overall, period)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn family_statistics_totals() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;

    add(&engine, &family_id, "alice", 200_000, "salary", june(1, 9)).await;
    add(&engine, &family_id, "alice", -30_000, "groceries", june(5, 9)).await;
    add(&engine, &family_id, "bob", -25_000, "groceries", june(6, 9)).await;
    add(
        &engine,
        &family_id,
        "bob",
        -10_000,
        "transport",
        Utc.with_ymd_and_hms(2024, 7, 2, 9, 0, 0).unwrap(),
    )
    .await;

    let all_time = engine
        .family_statistics(&family_id, "bob", None)
        .await
        .unwrap();
    assert_eq!(all_time.currency, Currency::Eur);
    assert_eq!(all_time.income_minor, 200_000);
    assert_eq!(all_time.expenses_minor, 65_000);
    assert_eq!(all_time.net_minor, 135_000);

    let june_only = engine
        .family_statistics(&family_id, "bob", Some(Period::month(2024, 6).unwrap()))
        .await
        .unwrap();
    assert_eq!(june_only.expenses_minor, 55_000);
    assert_eq!(june_only.net_minor, 145_000);
}
