//! HTTP-level tests for the feedback resource.

mod common;

use axum::http::StatusCode;
use common::{
    create_feedback, delete, expect_json, get, post_json, put_json, token, MANAGER, OPERATOR,
};
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn created_feedback_starts_pending(pool: PgPool) {
    let app = common::build_test_app(pool);
    let id = create_feedback(&app, "PRD-100", Some("B-100")).await;

    let json = expect_json(
        get(&app, &format!("/api/v1/feedback/{id}"), &token(OPERATOR)).await,
        StatusCode::OK,
    )
    .await;
    let feedback = &json["data"];
    assert_eq!(feedback["status"], "pending");
    assert_eq!(feedback["completion_percentage"], 0);
    assert!(feedback["quality_score"].is_null());
    assert!(feedback["marketplace_update_status"].is_null());
    assert!(feedback["feedback_uid"].as_str().unwrap().starts_with("PF-"));
    assert_eq!(feedback["created_by"], MANAGER.0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn duplicate_production_id_conflicts(pool: PgPool) {
    let app = common::build_test_app(pool);
    create_feedback(&app, "PRD-200", None).await;

    let response = post_json(
        &app,
        "/api/v1/feedback",
        &token(MANAGER),
        json!({ "production_id": "PRD-200" }),
    )
    .await;
    let json = expect_json(response, StatusCode::CONFLICT).await;
    assert_eq!(json["code"], "CONFLICT");
    assert_eq!(json["error"], "Feedback already exists for this production_id");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn blank_production_id_is_rejected(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        &app,
        "/api/v1/feedback",
        &token(MANAGER),
        json!({ "production_id": "   " }),
    )
    .await;
    let json = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn lookup_by_uid_production_and_batch(pool: PgPool) {
    let app = common::build_test_app(pool);
    let id = create_feedback(&app, "PRD-300", Some("B-300")).await;
    create_feedback(&app, "PRD-301", Some("B-300")).await;
    let operator = token(OPERATOR);

    let json = expect_json(
        get(&app, &format!("/api/v1/feedback/{id}"), &operator).await,
        StatusCode::OK,
    )
    .await;
    let uid = json["data"]["feedback_uid"].as_str().unwrap().to_string();

    let by_uid = expect_json(
        get(&app, &format!("/api/v1/feedback/by-uid/{uid}"), &operator).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(by_uid["data"]["id"], id);

    let by_production = expect_json(
        get(&app, "/api/v1/feedback/by-production/PRD-300", &operator).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(by_production["data"]["id"], id);

    let by_batch = expect_json(
        get(&app, "/api/v1/feedback/by-batch/B-300", &operator).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(by_batch["data"].as_array().unwrap().len(), 2);

    let missing = get(&app, "/api/v1/feedback/by-uid/PF-NOPE", &operator).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn list_filters_and_paginates(pool: PgPool) {
    let app = common::build_test_app(pool);
    create_feedback(&app, "PRD-401", Some("LOT-A1")).await;
    create_feedback(&app, "PRD-402", Some("LOT-A2")).await;
    create_feedback(&app, "PRD-403", Some("OTHER")).await;
    let operator = token(OPERATOR);

    let json = expect_json(
        get(&app, "/api/v1/feedback?batch=lot-a&limit=1", &operator).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["total"], 2);
    assert_eq!(json["data"]["limit"], 1);
    assert_eq!(json["data"]["items"].as_array().unwrap().len(), 1);

    let json = expect_json(
        get(&app, "/api/v1/feedback?status=pending", &operator).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["total"], 3);

    let bad = get(&app, "/api/v1/feedback?status=paused", &operator).await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn update_changes_user_fields_only(pool: PgPool) {
    let app = common::build_test_app(pool);
    let id = create_feedback(&app, "PRD-500", None).await;

    let json = expect_json(
        put_json(
            &app,
            &format!("/api/v1/feedback/{id}"),
            &token(OPERATOR),
            json!({ "notes": "Tooling swapped", "status": "completed" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["notes"], "Tooling swapped");
    // status is derived and not client-settable
    assert_eq!(json["data"]["status"], "pending");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cancel_soft_deletes_and_notifies(pool: PgPool) {
    let app = common::build_test_app(pool);
    let id = create_feedback(&app, "PRD-600", Some("B-600")).await;

    let forbidden = delete(&app, &format!("/api/v1/feedback/{id}"), &token(OPERATOR)).await;
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let json = expect_json(
        delete(&app, &format!("/api/v1/feedback/{id}"), &token(MANAGER)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["data"]["status"], "cancelled");
    // marketplace is not configured in this app
    assert_eq!(json["marketplace_update"]["success"], false);
    assert!(json["data"]["marketplace_update_status"].is_null());

    let still_there = get(&app, &format!("/api/v1/feedback/{id}"), &token(OPERATOR)).await;
    assert_eq!(still_there.status(), StatusCode::OK);

    let notifications = expect_json(
        get(
            &app,
            &format!("/api/v1/feedback/{id}/notifications"),
            &token(MANAGER),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    let items = notifications["data"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["notification_type"], "status_change");
    assert_eq!(items[0]["recipient_role"], "production_manager");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn report_issue_notifies_managers(pool: PgPool) {
    let app = common::build_test_app(pool);
    let id = create_feedback(&app, "PRD-700", None).await;

    let json = expect_json(
        post_json(
            &app,
            &format!("/api/v1/feedback/{id}/issues"),
            &token(OPERATOR),
            json!({
                "severity": "critical",
                "title": "Press 2 jammed",
                "description": "Hydraulic fault on press 2",
            }),
        )
        .await,
        StatusCode::CREATED,
    )
    .await;
    let notification = &json["data"];
    assert_eq!(notification["notification_type"], "issue_reported");
    assert_eq!(notification["priority"], "high");
    assert_eq!(notification["delivery_method"], "both");
    // no email channel configured
    assert_eq!(notification["is_delivered"], false);
}
