mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use chrono::Duration;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{admin, alice, bearer, bob, init_app, send, TestContext};
use reminderd::auth::IdentityContext;

async fn create<S, B>(app: &S, who: &IdentityContext, name: &str, due_at: i64) -> String
where
    S: actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse<B>,
        Error = actix_web::Error,
    >,
    B: actix_web::body::MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer(who))
        .set_json(json!({"name": name, "dueAt": due_at}))
        .to_request();
    let (status, created) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", created);
    created["taskId"].as_str().unwrap().to_string()
}

#[actix_rt::test]
async fn test_trigger_sends_reminders_for_tasks_due_soon() {
    let ctx = TestContext::new();
    let app = init_app(&ctx).await;

    let t1 = create(&app, &alice(), "t1", ctx.due_in(Duration::minutes(2))).await;
    let t2 = create(&app, &alice(), "t2", ctx.due_in(Duration::minutes(10))).await;
    let t3 = create(&app, &bob(), "t3", ctx.due_in(Duration::minutes(4))).await;

    let req = test::TestRequest::post()
        .uri("/api/reminders/trigger")
        .insert_header(bearer(&admin()))
        .to_request();
    let (status, report) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "body: {}", report);
    assert_eq!(report, json!({"notified": 2, "commits": 1, "skipped": false}));

    assert_eq!(
        ctx.notifier.sent(),
        vec![
            ("a@x.com".to_string(), "Your task is expiring soon: t1".to_string()),
            ("b@x.com".to_string(), "Your task is expiring soon: t3".to_string()),
        ]
    );
    for (id, sent) in [(&t1, true), (&t2, false), (&t3, true)] {
        let indexed = ctx.tasks.find_indexed(id).await.unwrap().unwrap();
        assert_eq!(indexed.reminder_sent, sent, "task {}", indexed.name);
    }

    // Nothing new in the window.
    let req = test::TestRequest::post()
        .uri("/api/reminders/trigger")
        .insert_header(bearer(&admin()))
        .to_request();
    let (_, report) = send(&app, req).await;
    assert_eq!(report["notified"], 0);
    assert_eq!(report["commits"], 0);
    assert_eq!(ctx.notifier.sent().len(), 2);

    // Six minutes on, t2 is four minutes out and t1 has expired.
    ctx.clock.advance(Duration::minutes(6));
    let req = test::TestRequest::post()
        .uri("/api/reminders/trigger")
        .insert_header(bearer(&admin()))
        .to_request();
    let (_, report) = send(&app, req).await;
    assert_eq!(report["notified"], 1);
    assert_eq!(
        ctx.notifier.sent().last().cloned(),
        Some(("a@x.com".to_string(), "Your task is expiring soon: t2".to_string()))
    );
}

#[actix_rt::test]
async fn test_tasks_outside_the_window_are_not_reminded() {
    let ctx = TestContext::new();
    let app = init_app(&ctx).await;

    create(&app, &alice(), "edge", ctx.due_in(Duration::minutes(5))).await;
    create(&app, &alice(), "later", ctx.due_in(Duration::minutes(5) + Duration::milliseconds(1))).await;
    let gone = create(&app, &alice(), "gone", ctx.due_in(Duration::minutes(1))).await;

    // `gone` is due exactly at the time of the run, which no longer counts.
    ctx.clock.advance(Duration::minutes(1));
    let req = test::TestRequest::post()
        .uri("/api/reminders/trigger")
        .insert_header(bearer(&admin()))
        .to_request();
    let (_, report) = send(&app, req).await;

    // After the advance `edge` is 4 minutes out and `later` just over 4.
    assert_eq!(report["notified"], 2);
    let names: Vec<String> = ctx.notifier.sent().into_iter().map(|(_, m)| m).collect();
    assert_eq!(
        names,
        vec![
            "Your task is expiring soon: edge".to_string(),
            "Your task is expiring soon: later".to_string(),
        ]
    );
    assert!(!ctx.tasks.find_indexed(&gone).await.unwrap().unwrap().reminder_sent);
}

#[actix_rt::test]
async fn test_window_upper_bound_is_inclusive() {
    let ctx = TestContext::new();
    let app = init_app(&ctx).await;

    create(&app, &alice(), "edge", ctx.due_in(Duration::minutes(5))).await;
    create(&app, &alice(), "later", ctx.due_in(Duration::minutes(5) + Duration::milliseconds(1))).await;

    let req = test::TestRequest::post()
        .uri("/api/reminders/trigger")
        .insert_header(bearer(&admin()))
        .to_request();
    let (_, report) = send(&app, req).await;
    assert_eq!(report["notified"], 1);
    assert_eq!(ctx.notifier.sent()[0].1, "Your task is expiring soon: edge");
}

#[actix_rt::test]
async fn test_trigger_requires_admin() {
    let ctx = TestContext::new();
    let app = init_app(&ctx).await;
    create(&app, &alice(), "t1", ctx.due_in(Duration::minutes(2))).await;

    let req = test::TestRequest::post()
        .uri("/api/reminders/trigger")
        .insert_header(bearer(&alice()))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "Unauthorized");
    assert!(ctx.notifier.sent().is_empty());
}

#[actix_rt::test]
async fn test_send_failure_surfaces_as_internal() {
    let ctx = TestContext::new();
    let app = init_app(&ctx).await;
    let t1 = create(&app, &alice(), "t1", ctx.due_in(Duration::minutes(2))).await;
    ctx.notifier.fail_after(0);

    let req = test::TestRequest::post()
        .uri("/api/reminders/trigger")
        .insert_header(bearer(&admin()))
        .to_request();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "Internal");
    assert!(!ctx.tasks.find_indexed(&t1).await.unwrap().unwrap().reminder_sent);
}
