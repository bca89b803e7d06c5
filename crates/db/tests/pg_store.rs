//! PostgreSQL backend tests.
//!
//! Ignored by default; run with a reachable database:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/forum_test cargo test -p forum-db -- --ignored
//! ```

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use forum_core::filters::{Filters, ListQuery, TextFilter};
use forum_core::permissions::{FORUMS_READ, FORUMS_WRITE};
use forum_core::tokens::{self, TokenScope};
use forum_db::models::comment::NewComment;
use forum_db::models::forum::NewForum;
use forum_db::models::user::{NewUser, USERS_EMAIL_KEY};
use forum_db::pg::DEFAULT_QUERY_TIMEOUT;
use forum_db::store::{PermissionStore, ResourceStore, TokenStore, UserStore};
use forum_db::{StoreError, Stores};
use sqlx::PgPool;

fn stores(pool: PgPool) -> Stores {
    Stores::postgres(pool, DEFAULT_QUERY_TIMEOUT)
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        name: "Pg User".to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$v=19$placeholder".to_string(),
        activated: false,
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn forum_round_trip_and_conflict(pool: PgPool) {
    let stores = stores(pool);
    let forum = stores
        .forums
        .insert(&NewForum {
            title: "hello".into(),
            content: "world".into(),
        })
        .await
        .unwrap();
    assert_eq!(forum.version, 1);

    let mut edited = forum.clone();
    edited.content = "there".into();
    let saved = stores.forums.update(&edited).await.unwrap();
    assert_eq!(saved.version, 2);

    assert_matches!(
        stores.forums.update(&edited).await,
        Err(StoreError::EditConflict { entity: "forum", .. })
    );

    stores.forums.delete(forum.id).await.unwrap();
    assert_matches!(
        stores.forums.update(&saved).await,
        Err(StoreError::NotFound { .. })
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn comment_listing_filters_by_content(pool: PgPool) {
    let stores = stores(pool);
    for content in ["first post", "second thought", "first again"] {
        stores
            .comments
            .insert(&NewComment {
                content: content.into(),
            })
            .await
            .unwrap();
    }

    let filters = Filters {
        sort: "-id".into(),
        ..Filters::default()
    };
    let query = ListQuery::build(
        vec![TextFilter::new("content", "first")],
        &filters,
        &["id", "-id"],
        Default::default(),
    )
    .unwrap();
    let (rows, total) = stores.comments.list(&query).await.unwrap();
    assert_eq!(total, 2);
    assert_eq!(rows[0].content, "first again");
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn email_uniqueness_is_case_insensitive(pool: PgPool) {
    let stores = stores(pool);
    stores.users.insert(&new_user("case@example.com")).await.unwrap();
    let err = stores
        .users
        .insert(&new_user("CASE@example.com"))
        .await
        .unwrap_err();
    assert!(err.is_duplicate_of(USERS_EMAIL_KEY));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn tokens_and_permissions(pool: PgPool) {
    let stores = stores(pool);
    let user = stores.users.insert(&new_user("tok@example.com")).await.unwrap();
    let now = Utc::now();

    let token = tokens::generate(user.id, Duration::hours(1), TokenScope::Authentication, now);
    stores.tokens.insert(&token).await.unwrap();

    let owner = stores
        .users
        .get_for_token(TokenScope::Authentication, &token.hash, now)
        .await
        .unwrap();
    assert_eq!(owner.map(|u| u.email), Some("tok@example.com".to_string()));

    assert_eq!(
        stores
            .tokens
            .delete_all_for_user(TokenScope::Authentication, user.id)
            .await
            .unwrap(),
        1
    );

    stores
        .permissions
        .add_for_user(user.id, &[FORUMS_READ, FORUMS_WRITE])
        .await
        .unwrap();
    let perms = stores.permissions.get_all_for_user(user.id).await.unwrap();
    assert!(perms.includes(FORUMS_WRITE));
    assert!(perms.includes(FORUMS_READ));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_updates_with_same_version_have_one_winner(pool: PgPool) {
    let stores = stores(pool);
    let forum = stores
        .forums
        .insert(&NewForum {
            title: "race".into(),
            content: "start".into(),
        })
        .await
        .unwrap();

    let tasks: Vec<_> = (0..16)
        .map(|n| {
            let forums = Arc::clone(&stores.forums);
            let mut copy = forum.clone();
            copy.content = format!("writer {n}");
            tokio::spawn(async move { forums.update(&copy).await })
        })
        .collect();

    let mut winners = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(updated) => {
                winners += 1;
                assert_eq!(updated.version, 2);
            }
            Err(StoreError::EditConflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 15);
    assert_eq!(stores.forums.get(forum.id).await.unwrap().version, 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn list_past_last_page_keeps_total(pool: PgPool) {
    let stores = stores(pool);
    stores
        .forums
        .insert(&NewForum {
            title: "only".into(),
            content: "one".into(),
        })
        .await
        .unwrap();

    let filters = Filters {
        page: 5,
        page_size: 20,
        sort: "id".into(),
    };
    let query = ListQuery::build(Vec::new(), &filters, &["id"], Default::default()).unwrap();
    let (rows, total) = stores.forums.list(&query).await.unwrap();
    assert!(rows.is_empty());
    assert_eq!(total, 1);

    let filtered = ListQuery::build(
        vec![TextFilter::new("title", "only")],
        &filters,
        &["id"],
        Default::default(),
    )
    .unwrap();
    let (rows, total) = stores.forums.list(&filtered).await.unwrap();
    assert!(rows.is_empty());
    assert_eq!(total, 1);
}
