use chrono::{TimeZone, Utc};
use sea_orm::Database;

use engine::{
    AppendCmd, BudgetScope, Currency, Engine, EngineError, EntryMeta, LedgerFilter, MemberRole,
    MemberState, Period,
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

#[tokio::test]
async fn create_family_sets_owner_active() {
    let engine = engine_with_db().await;
    let family_id = engine
        .create_family("Rossi", "alice", Some(Currency::Usd))
        .await
        .unwrap();

    let membership = engine.membership_of("alice").await.unwrap().unwrap();
    assert_eq!(membership.family_id, family_id);
    assert_eq!(membership.role, MemberRole::Owner);
    assert_eq!(membership.state, MemberState::Active);

    let family = engine.family(&family_id, "alice").await.unwrap();
    assert_eq!(family.currency, Currency::Usd);
    assert_eq!(family.created_by, "alice");
}

#[tokio::test]
async fn one_family_at_a_time() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;

    // A live member cannot found a second family...
    let err = engine
        .create_family("Bianchi", "bob", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyMember(_)));

    // ...nor be invited into one.
    let other = engine.create_family("Bianchi", "dora", None).await.unwrap();
    let err = engine.invite(&other, "dora", "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyMember(_)));

    // Leaving frees the user up again.
    engine.leave(&family_id, "bob").await.unwrap();
    engine.invite(&other, "dora", "bob").await.unwrap();
    engine.join(&other, "bob").await.unwrap();
}

#[tokio::test]
async fn invite_requires_owner_role() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;

    let err = engine.invite(&family_id, "bob", "carol").await.unwrap_err();
    assert!(matches!(err, EngineError::NotAuthorized(_)));
}

#[tokio::test]
async fn invite_then_join_walks_the_state_machine() {
    let engine = engine_with_db().await;
    let family_id = engine
        .create_family("Rossi", "alice", None)
        .await
        .unwrap();

    engine.invite(&family_id, "alice", "bob").await.unwrap();
    let roster = engine.list_members(&family_id, "alice").await.unwrap();
    let bob = roster.iter().find(|m| m.user_id == "bob").unwrap();
    assert_eq!(bob.state, MemberState::Invited);
    assert_eq!(bob.invited_by.as_deref(), Some("alice"));

    engine.join(&family_id, "bob").await.unwrap();
    let roster = engine.list_members(&family_id, "alice").await.unwrap();
    let bob = roster.iter().find(|m| m.user_id == "bob").unwrap();
    assert_eq!(bob.state, MemberState::Active);
    assert_eq!(bob.role, MemberRole::Member);
}

#[tokio::test]
async fn join_without_invite_fails() {
    let engine = engine_with_db().await;
    let family_id = engine
        .create_family("Rossi", "alice", None)
        .await
        .unwrap();

    let err = engine.join(&family_id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = engine.join(&family_id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::AlreadyMember(_)));
}

#[tokio::test]
async fn owner_must_promote_before_leaving() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;
    let period = Period::month(2024, 6).unwrap();

    let err = engine.leave(&family_id, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::OwnerRequired(_)));

    engine.promote(&family_id, "alice", "bob").await.unwrap();
    engine.leave(&family_id, "alice").await.unwrap();

    // The promoted member now holds owner powers.
    engine
        .set_limit(&family_id, "bob", BudgetScope::Overall, period, 50_000)
        .await
        .unwrap();

    // The departed owner lost access entirely.
    let err = engine
        .list_transactions(&family_id, "alice", 10, &LedgerFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAMember(_)));
}

#[tokio::test]
async fn sole_owner_of_empty_family_can_leave() {
    let engine = engine_with_db().await;
    let family_id = engine
        .create_family("Rossi", "alice", None)
        .await
        .unwrap();

    engine.leave(&family_id, "alice").await.unwrap();
    assert!(engine.membership_of("alice").await.unwrap().is_none());
}

#[tokio::test]
async fn removed_member_needs_a_fresh_invite() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;

    // Kicking is owner-only and never targets owners.
    let err = engine
        .remove_member(&family_id, "bob", "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAuthorized(_)));

    engine.remove_member(&family_id, "alice", "bob").await.unwrap();
    let err = engine
        .append(AppendCmd::new(
            &family_id,
            "bob",
            -1000,
            "groceries",
            EntryMeta::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAMember(_)));

    // Terminal state is final until a fresh invite resets it.
    let err = engine.join(&family_id, "bob").await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    engine.invite(&family_id, "alice", "bob").await.unwrap();
    engine.join(&family_id, "bob").await.unwrap();
}

#[tokio::test]
async fn departed_members_entries_remain() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;

    engine
        .append(AppendCmd::new(
            &family_id,
            "bob",
            -2500,
            "groceries",
            EntryMeta::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()),
        ))
        .await
        .unwrap();
    engine.leave(&family_id, "bob").await.unwrap();

    let entries = engine
        .list_transactions(&family_id, "alice", 10, &LedgerFilter::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].created_by, "bob");
}

#[tokio::test]
async fn delete_family_cascades() {
    let engine = engine_with_db().await;
    let family_id = family_with_members(&engine).await;
    let period = Period::month(2024, 6).unwrap();

    engine
        .append(AppendCmd::new(
            &family_id,
            "bob",
            -2500,
            "groceries",
            EntryMeta::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()),
        ))
        .await
        .unwrap();
    engine
        .set_limit(&family_id, "alice", BudgetScope::Overall, period, 50_000)
        .await
        .unwrap();

    let err = engine
        .delete_family(&family_id, "bob")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotAuthorized(_)));

    engine.delete_family(&family_id, "alice").await.unwrap();

    assert!(engine.membership_of("alice").await.unwrap().is_none());
    let err = engine
        .list_transactions(&family_id, "alice", 10, &LedgerFilter::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // Both users are free to start over.
    engine.create_family("Rossi", "alice", None).await.unwrap();
}
