//! `PgStore` against a live database.
//!
//! These need `DATABASE_URL` (a `.env` file works) and are skipped by default:
//! `cargo test --test postgres_store -- --ignored`.

use dotenv::dotenv;
use pretty_assertions::assert_eq;
use taskforge::{
    models::{NewUser, Task, TaskInput, UserChanges},
    query::{Sort, SortDirection, SortField, TaskFilter},
    store::{PgStore, StoreError, TaskStore, UserStore},
};
use uuid::Uuid;

async fn connect() -> PgStore {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let store = PgStore::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    store.migrate().await.expect("Failed to run migrations");
    store
}

/// E-mails are unique per run so the tests can share one database.
fn new_user() -> NewUser {
    let id = Uuid::new_v4();
    NewUser {
        id,
        name: "Pg Test".into(),
        email: format!("{}@example.com", id.simple()),
        password_hash: "hash".into(),
        age: 0,
    }
}

fn task(owner: Uuid, description: &str, completed: bool) -> Task {
    Task::new(
        TaskInput {
            description: description.into(),
            completed: Some(completed),
        },
        owner,
    )
}

async fn descriptions(store: &PgStore, owner: Uuid, filter: &TaskFilter) -> Vec<String> {
    store
        .list_tasks(owner, filter)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.description)
        .collect()
}

#[actix_rt::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_email_maps_to_duplicate_key() {
    let store = connect().await;
    let first = new_user();
    let email = first.email.clone();
    store.create_user(first, "token-a").await.unwrap();

    let mut second = new_user();
    second.email = email.clone();
    let err = store.create_user(second.clone(), "token-b").await.unwrap_err();
    assert_eq!(err, StoreError::DuplicateKey("email".into()));
    // The failed signup left nothing behind, its token included.
    assert!(store.find_user(second.id).await.unwrap().is_none());

    let other = store.create_user(new_user(), "token-c").await.unwrap();
    let changes = UserChanges {
        email: Some(email),
        ..Default::default()
    };
    let err = store.update_user(other.id, changes).await.unwrap_err();
    assert_eq!(err, StoreError::DuplicateKey("email".into()));
}

#[actix_rt::test]
#[ignore = "requires DATABASE_URL"]
async fn test_tokens_are_additive() {
    let store = connect().await;
    let user = store.create_user(new_user(), "t1").await.unwrap();

    let (a, b) = futures::join!(store.push_token(user.id, "t2"), store.push_token(user.id, "t3"));
    a.unwrap();
    b.unwrap();
    // Re-appending an active token is a no-op, not an error.
    store.push_token(user.id, "t2").await.unwrap();

    let mut tokens = store.active_tokens(user.id).await.unwrap();
    tokens.sort();
    assert_eq!(tokens, vec!["t1", "t2", "t3"]);

    store.remove_token(user.id, "t2").await.unwrap();
    assert!(store.find_user_by_token(user.id, "t2").await.unwrap().is_none());
    assert!(store.find_user_by_token(user.id, "t3").await.unwrap().is_some());

    store.clear_tokens(user.id).await.unwrap();
    assert!(store.active_tokens(user.id).await.unwrap().is_empty());
}

#[actix_rt::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_user_cascades() {
    let store = connect().await;
    let doomed = store.create_user(new_user(), "ta").await.unwrap();
    let survivor = store.create_user(new_user(), "tb").await.unwrap();
    let doomed_task = store.create_task(task(doomed.id, "one", false)).await.unwrap();
    store.create_task(task(doomed.id, "two", true)).await.unwrap();
    store.create_task(task(survivor.id, "three", false)).await.unwrap();
    store.set_avatar(doomed.id, Some(vec![1, 2, 3])).await.unwrap();

    let deleted = store.delete_user(doomed.id).await.unwrap().unwrap();
    assert_eq!(deleted.id, doomed.id);

    let filter = TaskFilter::default();
    assert!(store.list_tasks(doomed.id, &filter).await.unwrap().is_empty());
    assert!(store.find_task(doomed_task.id, doomed.id).await.unwrap().is_none());
    assert!(store.active_tokens(doomed.id).await.unwrap().is_empty());
    assert!(store.avatar(doomed.id).await.unwrap().is_none());
    assert_eq!(descriptions(&store, survivor.id, &filter).await, vec!["three"]);

    assert!(store.delete_user(doomed.id).await.unwrap().is_none());
}

#[actix_rt::test]
#[ignore = "requires DATABASE_URL"]
async fn test_list_filters_sorts_and_pages() {
    let store = connect().await;
    let user = store.create_user(new_user(), "t").await.unwrap();
    for (description, completed) in [("c", false), ("a", true), ("b", false), ("d", false)] {
        store.create_task(task(user.id, description, completed)).await.unwrap();
    }

    assert_eq!(
        descriptions(&store, user.id, &TaskFilter::default()).await,
        vec!["c", "a", "b", "d"]
    );

    let filter = TaskFilter {
        completed: Some(false),
        sort: Some(Sort {
            field: SortField::Description,
            direction: SortDirection::Desc,
        }),
        limit: Some(2),
        skip: Some(1),
    };
    assert_eq!(descriptions(&store, user.id, &filter).await, vec!["c", "b"]);

    let sorted_by_completed = TaskFilter {
        sort: Some(Sort {
            field: SortField::Completed,
            direction: SortDirection::Desc,
        }),
        limit: Some(1),
        ..Default::default()
    };
    assert_eq!(descriptions(&store, user.id, &sorted_by_completed).await, vec!["a"]);

    let past_the_end = TaskFilter {
        limit: Some(u64::MAX),
        skip: Some(u64::MAX),
        ..Default::default()
    };
    assert!(store.list_tasks(user.id, &past_the_end).await.unwrap().is_empty());
}
