#![allow(dead_code)]

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::middleware::Logger;
use actix_web::{http::header, test, web, App};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Arc;

use reminderd::auth::{issue_token, AuthMiddleware, IdentityContext, JwtVerifier, MemoryDirectory, Role};
use reminderd::clock::ManualClock;
use reminderd::reminder::{RecordingNotifier, ReminderPipeline};
use reminderd::routes::{self, health};
use reminderd::service::{TaskService, UpdateMode, UserService};
use reminderd::store::{MemoryStore, TaskStore, UserStore};

pub const SECRET: &str = "integration-test-secret";

/// Everything a test app is built from, kept so tests can steer the clock,
/// inspect sent reminders and seed accounts.
pub struct TestContext {
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub directory: Arc<MemoryDirectory>,
    pub tasks: Arc<TaskStore>,
    pub profiles: Arc<UserStore>,
    task_service: web::Data<TaskService>,
    user_service: web::Data<UserService>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_update_mode(UpdateMode::Upsert)
    }

    pub fn with_update_mode(mode: UpdateMode) -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let docs = Arc::new(MemoryStore::new());
        let tasks = Arc::new(TaskStore::new(docs.clone(), clock.clone()));
        let profiles = Arc::new(UserStore::new(docs));
        let notifier = Arc::new(RecordingNotifier::new());
        let directory = Arc::new(MemoryDirectory::new());
        let pipeline = Arc::new(ReminderPipeline::new(tasks.clone(), notifier.clone()));

        let task_service = web::Data::new(
            TaskService::new(tasks.clone(), profiles.clone(), pipeline, clock.clone())
                .with_update_mode(mode),
        );
        let user_service = web::Data::new(UserService::new(profiles.clone(), directory.clone()));

        Self {
            clock,
            notifier,
            directory,
            tasks,
            profiles,
            task_service,
            user_service,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        use reminderd::clock::Clock;
        self.clock.now()
    }

    /// `now + offset` in unix milliseconds, the wire format for `dueAt`.
    pub fn due_in(&self, offset: Duration) -> i64 {
        (self.now() + offset).timestamp_millis()
    }
}

/// Builds the app the way `main` does, with the test context's collaborators.
pub async fn init_app(
    ctx: &TestContext,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    test::init_service(
        App::new()
            .app_data(ctx.task_service.clone())
            .app_data(ctx.user_service.clone())
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
                    .wrap(AuthMiddleware::new(Arc::new(JwtVerifier::new(SECRET))))
                    .configure(routes::config),
            ),
    )
    .await
}

pub fn alice() -> IdentityContext {
    IdentityContext::new("u1", "a@x.com", Role::User)
}

pub fn bob() -> IdentityContext {
    IdentityContext::new("u2", "b@x.com", Role::User)
}

pub fn admin() -> IdentityContext {
    IdentityContext::new("root", "root@x.com", Role::Admin)
}

/// `(Authorization, "Bearer <token>")` for `identity`.
pub fn bearer(identity: &IdentityContext) -> (header::HeaderName, String) {
    let token = issue_token(SECRET, identity, Duration::hours(1)).unwrap();
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

/// Sends `req` and returns the status with the JSON body, `Value::Null` when empty.
pub async fn send<S, B>(app: &S, req: actix_http::Request) -> (actix_web::http::StatusCode, Value)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            panic!("non-JSON body ({}): {}", e, String::from_utf8_lossy(&body))
        })
    };
    (status, json)
}
