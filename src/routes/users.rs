use crate::{auth::Authenticated, error::AppError, models::UserProfile, service::UserService};
use actix_web::{delete, get, put, web, HttpResponse, Responder};

/// A user may read only their own profile; admins may read any.
#[get("/{id}")]
pub async fn get_user(
    service: web::Data<UserService>,
    Authenticated(identity): Authenticated,
    user_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let profile = service.get_user(&identity, &user_id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Creates or replaces the profile of the account registered under the
/// body's `email`. `userId` in the body is ignored.
#[put("")]
pub async fn update_user(
    service: web::Data<UserService>,
    Authenticated(identity): Authenticated,
    profile: web::Json<UserProfile>,
) -> Result<impl Responder, AppError> {
    let profile = service.update_user(&identity, profile.into_inner()).await?;
    Ok(HttpResponse::Ok().json(profile))
}

/// Admin only.
#[delete("/{id}")]
pub async fn delete_user(
    service: web::Data<UserService>,
    Authenticated(identity): Authenticated,
    user_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    service.delete_user(&identity, &user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
