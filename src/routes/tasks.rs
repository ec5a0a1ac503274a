use crate::{
    auth::Authenticated,
    error::AppError,
    models::{NewTask, TaskPatch},
    service::TaskService,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use serde::Deserialize;

/// Names another owner's collection. Only admins may set it to anyone but themselves.
#[derive(Debug, Default, Deserialize)]
pub struct OwnerQuery {
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub n: usize,
    pub owner: Option<String>,
}

/// Creates a task for the caller, or for `?owner=` when the caller is an admin.
///
/// ## Request Body:
/// A JSON `NewTask`: `name` (1-50 chars), optional `description` (up to 300
/// chars) and `dueAt` in unix milliseconds, not in the past.
///
/// ## Responses:
/// - `201 Created`: the stored `Task`, including its generated `taskId`.
/// - `400 Bad Request`: validation failed or `dueAt` is in the past.
/// - `401 Unauthorized`: no valid token, or a user naming another owner.
#[post("")]
pub async fn create_task(
    service: web::Data<TaskService>,
    Authenticated(identity): Authenticated,
    owner: web::Query<OwnerQuery>,
    input: web::Json<NewTask>,
) -> Result<impl Responder, AppError> {
    let task = service
        .create_task(&identity, owner.owner.as_deref(), input.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(task))
}

/// The `n` most recently created tasks, newest first.
///
/// `n` is required and must be at least 1.
#[get("/recent")]
pub async fn list_recent(
    service: web::Data<TaskService>,
    Authenticated(identity): Authenticated,
    query: web::Query<RecentQuery>,
) -> Result<impl Responder, AppError> {
    let tasks = service
        .list_recent(&identity, query.owner.as_deref(), query.n)
        .await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Tasks whose due time has passed.
#[get("/expired")]
pub async fn list_expired(
    service: web::Data<TaskService>,
    Authenticated(identity): Authenticated,
    owner: web::Query<OwnerQuery>,
) -> Result<impl Responder, AppError> {
    let tasks = service
        .list_expired(&identity, owner.owner.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(tasks))
}

/// Retrieves a task by id.
///
/// ## Responses:
/// - `200 OK`: the `Task`.
/// - `401 Unauthorized`: the task belongs to someone else and the caller is not an admin.
/// - `404 Not Found`: no such task.
#[get("/{id}")]
pub async fn get_task(
    service: web::Data<TaskService>,
    Authenticated(identity): Authenticated,
    task_id: web::Path<String>,
    owner: web::Query<OwnerQuery>,
) -> Result<impl Responder, AppError> {
    let task = service
        .get_task(&identity, owner.owner.as_deref(), &task_id)
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Replaces name, description and due time of a task.
///
/// An unknown id creates the task unless the service runs in strict mode,
/// in which case it is `404 Not Found`.
#[put("/{id}")]
pub async fn update_task(
    service: web::Data<TaskService>,
    Authenticated(identity): Authenticated,
    task_id: web::Path<String>,
    owner: web::Query<OwnerQuery>,
    patch: web::Json<TaskPatch>,
) -> Result<impl Responder, AppError> {
    let task = service
        .update_task(&identity, owner.owner.as_deref(), &task_id, patch.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(task))
}

/// Deletes a task. `204 No Content` whether or not it existed.
#[delete("/{id}")]
pub async fn delete_task(
    service: web::Data<TaskService>,
    Authenticated(identity): Authenticated,
    task_id: web::Path<String>,
    owner: web::Query<OwnerQuery>,
) -> Result<impl Responder, AppError> {
    service
        .delete_task(&identity, owner.owner.as_deref(), &task_id)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}
