use crate::{auth::Authenticated, error::AppError, service::TaskService};
use actix_web::{post, web, HttpResponse, Responder};

/// Runs one reminder pass now and returns its `ReminderReport`. Admin only.
#[post("/trigger")]
pub async fn trigger(
    service: web::Data<TaskService>,
    Authenticated(identity): Authenticated,
) -> Result<impl Responder, AppError> {
    let report = service.trigger_reminders(&identity).await?;
    Ok(HttpResponse::Ok().json(report))
}
