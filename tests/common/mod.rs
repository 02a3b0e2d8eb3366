//! Shared fixtures for the integration tests.
//!
//! Every test gets a fresh in-memory store seeded with two users and three tasks:
//! `task_one` and `task_two` belong to `user_one`, `task_three` to `user_two`.

#![allow(dead_code)]

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceResponse},
    http::{header, StatusCode},
    test, web, App,
};
use serde_json::Value;
use std::sync::Arc;
use taskforge::{
    avatar::AvatarPolicy,
    models::{NewUser, Task, TaskInput},
    routes,
    store::{MemoryStore, Store, TaskStore, UserStore},
    AppState,
};
use uuid::Uuid;

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct SeededUser {
    pub id: Uuid,
    pub name: &'static str,
    pub email: &'static str,
    pub password: &'static str,
    pub token: String,
}

pub struct Fixture {
    pub state: AppState,
    pub store: Arc<dyn Store>,
    pub user_one: SeededUser,
    pub user_two: SeededUser,
    pub task_one: Task,
    pub task_two: Task,
    pub task_three: Task,
}

pub fn test_state(store: Arc<dyn Store>, avatar_max_bytes: usize) -> AppState {
    AppState::new(
        store,
        TEST_SECRET,
        4,
        AvatarPolicy {
            max_bytes: avatar_max_bytes,
            dimension: 250,
        },
    )
}

async fn seed_user(
    state: &AppState,
    name: &'static str,
    email: &'static str,
    password: &'static str,
) -> SeededUser {
    let id = Uuid::new_v4();
    let token = state.auth.sign(id).unwrap();
    state
        .store
        .create_user(
            NewUser {
                id,
                name: name.to_string(),
                email: email.to_string(),
                password_hash: state.auth.hash(password).unwrap(),
                age: 0,
            },
            &token,
        )
        .await
        .unwrap();
    SeededUser {
        id,
        name,
        email,
        password,
        token,
    }
}

async fn seed_task(state: &AppState, owner: Uuid, description: &str, completed: bool) -> Task {
    state
        .store
        .create_task(Task::new(
            TaskInput {
                description: description.to_string(),
                completed: Some(completed),
            },
            owner,
        ))
        .await
        .unwrap()
}

pub async fn setup_with_avatar_limit(avatar_max_bytes: usize) -> Fixture {
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let state = test_state(store.clone(), avatar_max_bytes);

    let user_one = seed_user(&state, "Mike", "mike@example.com", "56what!!").await;
    let user_two = seed_user(&state, "Jess", "jess@example.com", "myhouse099@@").await;
    let task_one = seed_task(&state, user_one.id, "First task", false).await;
    let task_two = seed_task(&state, user_one.id, "Second task", true).await;
    let task_three = seed_task(&state, user_two.id, "Third task", false).await;

    Fixture {
        state,
        store,
        user_one,
        user_two,
        task_one,
        task_two,
        task_three,
    }
}

pub async fn setup() -> Fixture {
    setup_with_avatar_limit(1_000_000).await
}

pub async fn init_app(
    state: AppState,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .configure(routes::config),
    )
    .await
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

/// Sends the request and returns the status with the body parsed as JSON
/// (`Value::Null` for an empty body).
pub async fn send<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&body).into_owned())
        })
    };
    (status, json)
}

/// Builds a `multipart/form-data` body holding one file field.
pub fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----taskforge-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            boundary, field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    (format!("multipart/form-data; boundary={}", boundary), body)
}
