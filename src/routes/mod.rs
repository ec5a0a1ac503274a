pub mod health;
pub mod reminders;
pub mod tasks;
pub mod users;

use actix_web::web;

/// Everything mounted under the authenticated `/api` scope.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .service(tasks::create_task)
            // Literal segments before `/{id}`.
            .service(tasks::list_recent)
            .service(tasks::list_expired)
            .service(tasks::get_task)
            .service(tasks::update_task)
            .service(tasks::delete_task),
    )
    .service(web::scope("/reminders").service(reminders::trigger))
    .service(
        web::scope("/users")
            .service(users::update_user)
            .service(users::get_user)
            .service(users::delete_user),
    );
}
