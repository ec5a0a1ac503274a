use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use dotenv::dotenv;
use log::{error, info};
use std::sync::Arc;

use reminderd::auth::{AuthMiddleware, IdentityDirectory, IdentityVerifier, JwtVerifier, MemoryDirectory};
use reminderd::clock::{Clock, SystemClock};
use reminderd::config::Config;
use reminderd::reminder::{spawn_reminder_loop, LogNotifier, ReminderPipeline};
use reminderd::routes::{self, health};
use reminderd::service::{TaskService, UserService};
use reminderd::store::{DocumentStore, MemoryStore, TaskStore, UserStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let docs: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let tasks = Arc::new(TaskStore::new(docs.clone(), clock.clone()));
    let profiles = Arc::new(UserStore::new(docs));

    let pipeline = Arc::new(
        ReminderPipeline::new(tasks.clone(), Arc::new(LogNotifier))
            .with_batch_capacity(config.reminder_batch_size)
            .with_single_flight(config.reminder_single_flight),
    );
    // Accounts are provisioned by the identity provider; the in-process
    // directory starts empty.
    let directory: Arc<dyn IdentityDirectory> = Arc::new(MemoryDirectory::new());
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(JwtVerifier::new(&config.jwt_secret));

    let task_service = web::Data::new(
        TaskService::new(tasks, profiles.clone(), pipeline.clone(), clock)
            .with_update_mode(config.task_update_mode),
    );
    let user_service = web::Data::new(UserService::new(profiles, directory));

    let reminder_loop = spawn_reminder_loop(pipeline, config.reminder_interval);

    info!(
        "Starting reminderd at {} (task updates: {})",
        config.server_url(),
        config.task_update_mode
    );
    let result = HttpServer::new(move || {
        App::new()
            .app_data(task_service.clone())
            .app_data(user_service.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware::new(verifier.clone()))
                    .configure(routes::config),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await;

    reminder_loop.abort();
    result
}
