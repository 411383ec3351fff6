//! Repository tests against a real PostgreSQL. They need Docker (or
//! `TEST_DATABASE_URL`) and run with `cargo test -- --ignored`.

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uxtracking_backend::{
    models::telemetry::{IngestBatch, IngestOutcome, Interaction, InteractionKind},
    models::user::{User, UserRole},
    repositories::{
        BlobStore, PgBlobStore, PgSessionRepository, PgTokenStore, PgUserRepository,
        SessionRepository, TokenStore, UserRepository,
    },
    types::{BlobId, SessionId},
};

#[path = "support/mod.rs"]
mod support;

fn interaction(kind: InteractionKind, time: f64, image: BlobId, value: Value) -> Interaction {
    Interaction {
        kind,
        time,
        x: Some(1.0),
        y: Some(2.0),
        scroll: Some(0.0),
        height: Some(900.0),
        class_name: Some("btn".into()),
        element_id: None,
        image,
        value,
    }
}

async fn batch(
    blobs: &PgBlobStore,
    captured_at: &str,
    site: &str,
    kinds: &[InteractionKind],
) -> IngestBatch {
    let image = blobs.put("image/png", vec![0x89, b'P', b'N', b'G']).await.unwrap();
    IngestBatch {
        captured_at: captured_at.into(),
        site: site.into(),
        image,
        interactions: kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| interaction(*kind, i as f64, image, json!({"n": i})))
            .collect(),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn users_are_unique_by_name_and_email() {
    let pool = support::test_pool().await;
    let repo = PgUserRepository::new(pool.clone());
    let user = support::seed_user(&pool).await;

    let by_email = repo
        .find_by_email(&user.email.to_uppercase())
        .await
        .unwrap()
        .expect("case-insensitive email lookup");
    assert_eq!(by_email.id, user.id);

    let clash = User::new(
        user.username.clone(),
        "fresh@example.com".into(),
        "h".into(),
        UserRole::User,
    );
    let err = repo.create(&clash).await.unwrap_err();
    assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);

    repo.update_password(user.id, "new-hash").await.unwrap();
    let stored = repo.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, "new-hash");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn tokens_expire_and_revoke() {
    let pool = support::test_pool().await;
    let user = support::seed_user(&pool).await;
    let tokens = PgTokenStore::new(pool.clone());

    tokens
        .insert("live", user.id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    tokens
        .insert("stale", user.id, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    assert!(tokens.is_active("live").await.unwrap());
    assert!(!tokens.is_active("stale").await.unwrap());

    assert!(tokens.delete_expired().await.unwrap() >= 1);
    assert_eq!(tokens.revoke_all_for_user(user.id).await.unwrap(), 1);
    assert!(!tokens.is_active("live").await.unwrap());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn append_batch_follows_the_three_ingestion_branches() {
    let pool = support::test_pool().await;
    let user = support::seed_user(&pool).await;
    let sessions = PgSessionRepository::new(pool.clone());
    let blobs = PgBlobStore::new(pool.clone());
    let ts = "2024-05-01T12:00:00.000Z";

    let first = batch(&blobs, ts, "a.com", &[InteractionKind::Click, InteractionKind::Wheel]).await;
    let (id, outcome) = sessions.append_batch(user.id, first).await.unwrap();
    assert_eq!(outcome, IngestOutcome::CreatedSession);

    let second = batch(&blobs, ts, "b.com", &[InteractionKind::Voice]).await;
    let (same, outcome) = sessions.append_batch(user.id, second).await.unwrap();
    assert_eq!((same, outcome), (id, IngestOutcome::AddedSite));

    let third = batch(&blobs, ts, "a.com", &[InteractionKind::Eye]).await;
    let (_, outcome) = sessions.append_batch(user.id, third).await.unwrap();
    assert_eq!(outcome, IngestOutcome::ExtendedSite);

    let doc = sessions.find(user.id, id).await.unwrap().unwrap();
    assert_eq!(doc.sites, vec!["a.com", "b.com"]);
    let a = doc.site("a.com").unwrap();
    assert_eq!(a.images.len(), 2);
    let kinds: Vec<InteractionKind> = a.interactions.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![InteractionKind::Click, InteractionKind::Wheel, InteractionKind::Eye]
    );
    assert_eq!(a.interactions[1].value, json!({"n": 1}));

    let other = support::seed_user(&pool).await;
    assert!(sessions.find(other.id, id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn concurrent_first_batches_share_one_session() {
    let pool = support::test_pool().await;
    let user = support::seed_user(&pool).await;
    let sessions = PgSessionRepository::new(pool.clone());
    let blobs = PgBlobStore::new(pool.clone());
    let ts = "2024-06-01T08:00:00.000Z";

    let left = batch(&blobs, ts, "a.com", &[InteractionKind::Click]).await;
    let right = batch(&blobs, ts, "b.com", &[InteractionKind::Click]).await;
    let (l, r) = tokio::join!(
        sessions.append_batch(user.id, left),
        sessions.append_batch(user.id, right)
    );
    let (l_id, _) = l.unwrap();
    let (r_id, _) = r.unwrap();
    assert_eq!(l_id, r_id);

    let (items, total) = sessions.list(user.id, 10, 0).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(items[0].sites.len(), 2);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn find_many_keeps_request_order_and_blobs_round_trip() {
    let pool = support::test_pool().await;
    let user = support::seed_user(&pool).await;
    let sessions = PgSessionRepository::new(pool.clone());
    let blobs = PgBlobStore::new(pool.clone());

    let early = batch(&blobs, "2024-01-01T00:00:00Z", "a.com", &[InteractionKind::Click]).await;
    let late = batch(&blobs, "2024-02-01T00:00:00Z", "b.com", &[InteractionKind::Click]).await;
    let image = late.image;
    let (early_id, _) = sessions.append_batch(user.id, early).await.unwrap();
    let (late_id, _) = sessions.append_batch(user.id, late).await.unwrap();

    let docs = sessions
        .find_many(user.id, &[late_id, SessionId::new(), early_id])
        .await
        .unwrap();
    let ids: Vec<SessionId> = docs.iter().map(|d| d.id).collect();
    assert_eq!(ids, vec![late_id, early_id]);

    let blob = blobs.get(image).await.unwrap().unwrap();
    assert_eq!(blob.content_type, "image/png");
    assert_eq!(blob.data, vec![0x89, b'P', b'N', b'G']);
    assert!(blobs.get(BlobId::new()).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn nul_characters_are_dropped_before_storage() {
    let pool = support::test_pool().await;
    let user = support::seed_user(&pool).await;
    let sessions = PgSessionRepository::new(pool.clone());
    let blobs = PgBlobStore::new(pool.clone());

    let mut upload = batch(
        &blobs,
        "2024-07-01T00:00:00Z\0",
        "a\0.com",
        &[InteractionKind::Keyboard],
    )
    .await;
    upload.interactions[0].class_name = Some("btn\0primary".into());
    upload.interactions[0].element_id = Some("\0go".into());
    upload.interactions[0].value = json!({"key\u{0}": "En\0ter"});
    let (id, _) = sessions.append_batch(user.id, upload).await.unwrap();

    let doc = sessions.find(user.id, id).await.unwrap().unwrap();
    assert_eq!(doc.datetime, "2024-07-01T00:00:00Z");
    let record = doc.site("a.com").unwrap();
    let stored = &record.interactions[0];
    assert_eq!(stored.class_name.as_deref(), Some("btnprimary"));
    assert_eq!(stored.element_id.as_deref(), Some("go"));
    assert_eq!(stored.value, json!({"key": "Enter"}));

    // Screenshots referenced by a session stay put.
    assert!(blobs.delete(record.images[0]).await.is_err());
    let unreferenced = blobs.put("image/png", vec![1, 2, 3]).await.unwrap();
    assert!(blobs.delete(unreferenced).await.unwrap());
    assert!(!blobs.delete(unreferenced).await.unwrap());
}
