//! Notification scoping, read state, and email delivery.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{
    create_feedback, delete, expect_json, get, post_empty, post_json, token, FakeEmail,
    FakeMarketplace, MANAGER, OPERATOR, OTHER_OPERATOR,
};
use millwright_core::notifications::Recipient;
use async_trait::async_trait;
use millwright_events::{EmailChannel, EmailError, EmailMessage};
use serde_json::{json, Value};
use sqlx::PgPool;

async fn notify(app: &axum::Router, body: Value) -> Value {
    let json = expect_json(
        post_json(app, "/api/v1/notifications", &token(MANAGER), body).await,
        StatusCode::CREATED,
    )
    .await;
    json["data"].clone()
}

async fn unread(app: &axum::Router, user: (i64, &str)) -> i64 {
    let json = expect_json(
        get(app, "/api/v1/notifications/unread-count", &token(user)).await,
        StatusCode::OK,
    )
    .await;
    json["data"]["count"].as_i64().unwrap()
}

#[sqlx::test(migrations = "../db/migrations")]
async fn role_notifications_reach_role_members_only(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = notify(
        &app,
        json!({
            "title": "Shift handover",
            "message": "Line 2 restarts at 06:00",
            "recipient_type": "role",
            "recipient_role": "production_manager",
        }),
    )
    .await;
    assert_eq!(created["notification_type"], "general");
    assert_eq!(created["priority"], "medium");
    assert_eq!(created["delivery_method"], "in_app");

    assert_eq!(unread(&app, MANAGER).await, 1);
    assert_eq!(unread(&app, OPERATOR).await, 0);

    let uri = format!("/api/v1/notifications/{}/read", created["id"]);
    let response = post_empty(&app, &uri, &token(OPERATOR)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = post_empty(&app, &uri, &token(MANAGER)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(unread(&app, MANAGER).await, 0);

    // already read, still in scope
    let response = post_empty(&app, &uri, &token(MANAGER)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn only_managers_create_notifications(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        &app,
        "/api/v1/notifications",
        &token(OPERATOR),
        json!({
            "title": "Hi",
            "message": "there",
            "recipient_type": "user",
            "recipient_id": OTHER_OPERATOR.0,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn recipient_column_must_match_type(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        &app,
        "/api/v1/notifications",
        &token(MANAGER),
        json!({ "title": "Hi", "message": "there", "recipient_type": "user" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn mark_many_and_all_read(pool: PgPool) {
    let app = common::build_test_app(pool);
    let mut ids = Vec::new();
    for n in 0..3 {
        let created = notify(
            &app,
            json!({
                "title": format!("Notice {n}"),
                "message": "Check the board",
                "recipient_type": "user",
                "recipient_id": OPERATOR.0,
            }),
        )
        .await;
        ids.push(created["id"].as_i64().unwrap());
    }
    let foreign = notify(
        &app,
        json!({
            "title": "Not yours",
            "message": "Other operator",
            "recipient_type": "user",
            "recipient_id": OTHER_OPERATOR.0,
        }),
    )
    .await;

    let json = expect_json(
        post_json(
            &app,
            "/api/v1/notifications/read",
            &token(OPERATOR),
            json!({ "ids": [ids[0], ids[1], foreign["id"]] }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["marked_read"], 2);
    assert_eq!(unread(&app, OPERATOR).await, 1);
    assert_eq!(unread(&app, OTHER_OPERATOR).await, 1);

    let unread_list = expect_json(
        get(&app, "/api/v1/notifications?unread_only=true", &token(OPERATOR)).await,
        StatusCode::OK,
    )
    .await;
    let unread_list = unread_list["data"].as_array().unwrap();
    assert_eq!(unread_list.len(), 1);
    assert_eq!(unread_list[0]["id"], ids[2]);

    let json = expect_json(
        post_empty(&app, "/api/v1/notifications/read-all", &token(OPERATOR)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["marked_read"], 1);
    assert_eq!(unread(&app, OPERATOR).await, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn delete_is_scoped(pool: PgPool) {
    let app = common::build_test_app(pool);
    let created = notify(
        &app,
        json!({
            "title": "Yours",
            "message": "Only yours",
            "recipient_type": "user",
            "recipient_id": OPERATOR.0,
        }),
    )
    .await;
    let uri = format!("/api/v1/notifications/{}", created["id"]);

    let response = delete(&app, &uri, &token(OTHER_OPERATOR)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = delete(&app, &uri, &token(OPERATOR)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = delete(&app, &uri, &token(OPERATOR)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn email_delivery_marks_notification_delivered(pool: PgPool) {
    let email = Arc::new(FakeEmail::default());
    let app = common::build_test_app_with(
        pool,
        Some(email.clone() as Arc<dyn EmailChannel>),
        Arc::new(FakeMarketplace::default()),
    );

    let created = notify(
        &app,
        json!({
            "title": "Line down",
            "message": "Press 4 offline",
            "recipient_type": "email",
            "recipient_email": "floor@example.com",
            "priority": "high",
            "delivery_method": "both",
        }),
    )
    .await;
    assert_eq!(created["is_delivered"], true);
    assert!(created["delivered_at"].is_string());

    let sent = email.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Line down");
    assert_eq!(
        sent[0].recipient,
        Recipient::Email("floor@example.com".to_string())
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn email_failure_keeps_undelivered_notification(pool: PgPool) {
    let email = Arc::new(FakeEmail {
        fail: true,
        ..FakeEmail::default()
    });
    let app = common::build_test_app_with(
        pool,
        Some(email.clone() as Arc<dyn EmailChannel>),
        Arc::new(FakeMarketplace::default()),
    );

    let created = notify(
        &app,
        json!({
            "title": "Line down",
            "message": "Press 4 offline",
            "recipient_type": "role",
            "recipient_role": "production_manager",
            "delivery_method": "email",
        }),
    )
    .await;
    assert_eq!(created["is_delivered"], false);
    assert_eq!(unread(&app, MANAGER).await, 1);
    assert!(email.sent().is_empty());
}

/// Accepts the message, then renames `notifications` so recording the
/// delivery fails.
struct SentThenTableGone {
    pool: PgPool,
}

#[async_trait]
impl EmailChannel for SentThenTableGone {
    async fn send(&self, _message: &EmailMessage) -> Result<(), EmailError> {
        sqlx::query("ALTER TABLE notifications RENAME TO notifications_moved")
            .execute(&self.pool)
            .await
            .unwrap();
        Ok(())
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn sent_email_survives_failed_delivery_flag(pool: PgPool) {
    let email = Arc::new(SentThenTableGone { pool: pool.clone() });
    let app = common::build_test_app_with(
        pool.clone(),
        Some(email as Arc<dyn EmailChannel>),
        Arc::new(FakeMarketplace::default()),
    );

    let created = notify(
        &app,
        json!({
            "title": "Line down",
            "message": "Press 4 offline",
            "recipient_type": "email",
            "recipient_email": "floor@example.com",
            "delivery_method": "email",
        }),
    )
    .await;
    assert_eq!(created["is_delivered"], false);
    assert!(created["delivered_at"].is_null());

    sqlx::query("ALTER TABLE notifications_moved RENAME TO notifications")
        .execute(&pool)
        .await
        .unwrap();
    let (delivered,): (bool,) =
        sqlx::query_as("SELECT is_delivered FROM notifications WHERE id = $1")
            .bind(created["id"].as_i64().unwrap())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(!delivered);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn operators_see_only_their_feedback_notifications(pool: PgPool) {
    let app = common::build_test_app(pool);
    let id = create_feedback(&app, "PRD-N1", None).await;
    notify(
        &app,
        json!({
            "title": "For operator",
            "message": "Check step 2",
            "recipient_type": "user",
            "recipient_id": OPERATOR.0,
            "feedback_id": id,
        }),
    )
    .await;
    notify(
        &app,
        json!({
            "title": "For managers",
            "message": "Review yield",
            "recipient_type": "role",
            "recipient_role": "production_manager",
            "feedback_id": id,
        }),
    )
    .await;

    let uri = format!("/api/v1/feedback/{id}/notifications");
    let manager_view = expect_json(get(&app, &uri, &token(MANAGER)).await, StatusCode::OK).await;
    assert_eq!(manager_view["data"].as_array().unwrap().len(), 2);

    let operator_view =
        expect_json(get(&app, &uri, &token(OPERATOR)).await, StatusCode::OK).await;
    let operator_view = operator_view["data"].as_array().unwrap();
    assert_eq!(operator_view.len(), 1);
    assert_eq!(operator_view[0]["title"], "For operator");
}
