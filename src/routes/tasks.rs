use crate::{
    app::AppState,
    auth::Authenticated,
    error::AppError,
    models::{Task, TaskInput, TaskPatch},
    query::{TaskFilter, TaskListParams},
    store::TaskStore,
};
use actix_web::{delete, get, patch, post, web, HttpRequest, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

fn task_not_found() -> AppError {
    AppError::NotFound("Task not found".into())
}

/// Retrieves the authenticated user's tasks.
///
/// Results are always scoped to the caller; a user without tasks gets an empty array.
///
/// ## Query Parameters:
/// - `completed` (optional): `true` or `false`.
/// - `sortBy` (optional): `field:direction` with field in `description`, `completed`,
///   `createdAt`, `updatedAt` and direction `asc` or `desc`.
/// - `limit`, `skip` (optional): non-negative integers.
///
/// Unrecognised values are ignored rather than rejected, and a repeated key keeps its
/// last value.
///
/// ## Responses:
/// - `200 OK`: JSON array of `Task` objects.
/// - `401 Unauthorized`: missing or inactive token.
#[get("")]
pub async fn list_tasks(
    state: web::Data<AppState>,
    auth: Authenticated,
    req: HttpRequest,
) -> Result<impl Responder, AppError> {
    let filter = TaskFilter::from(&TaskListParams::from_query_str(req.query_string()));
    let tasks = state.store.list_tasks(auth.user.id, &filter).await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Request Body:
/// - `description`: required, non-blank.
/// - `completed` (optional): boolean, defaults to `false`.
///
/// ## Responses:
/// - `201 Created`: the new `Task`.
/// - `400 Bad Request`: blank description or non-boolean `completed`.
/// - `401 Unauthorized`: missing or inactive token.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    auth: Authenticated,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let input = task_data.into_inner().normalized();
    input.validate()?;

    let task = state
        .store
        .create_task(Task::new(input, auth.user.id))
        .await?;
    Ok(HttpResponse::Created().json(task))
}

/// Retrieves one task by id.
///
/// ## Responses:
/// - `200 OK`: the `Task`.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    auth: Authenticated,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state
        .store
        .find_task(task_id.into_inner(), auth.user.id)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Updates `description` and/or `completed` of a task the caller owns.
///
/// ## Responses:
/// - `200 OK`: the updated `Task` with a refreshed `updatedAt`.
/// - `400 Bad Request`: unknown field or invalid value; nothing is written.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[patch("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    auth: Authenticated,
    task_id: web::Path<Uuid>,
    task_data: web::Json<TaskPatch>,
) -> Result<impl Responder, AppError> {
    let patch = task_data.into_inner().normalized();
    patch.validate()?;

    let task = state
        .store
        .update_task(task_id.into_inner(), auth.user.id, &patch)
        .await?
        .ok_or_else(task_not_found)?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task the caller owns and returns it.
///
/// ## Responses:
/// - `200 OK`: the deleted `Task`.
/// - `404 Not Found`: no such task, or it belongs to someone else.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    auth: Authenticated,
    task_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let task = state
        .store
        .delete_task(task_id.into_inner(), auth.user.id)
        .await?
        .ok_or_else(task_not_found)?;
    log::info!("user {} deleted task {}", auth.user.id, task.id);
    Ok(HttpResponse::Ok().json(task))
}
