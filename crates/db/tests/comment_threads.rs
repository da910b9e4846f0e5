//! Integration tests for comment threads.
//!
//! - Soft-deleting a parent keeps its replies reachable
//! - Visibility filters
//! - Depth walk over the parent chain

use millwright_core::comments::{VisibilityFilter, DELETED_PLACEHOLDER};
use millwright_core::feedback::generate_feedback_uid;
use millwright_db::models::comment::{CreateComment, UpdateComment};
use millwright_db::models::feedback::CreateFeedback;
use millwright_db::repositories::{CommentRepo, FeedbackRepo};
use sqlx::PgPool;

async fn seed_feedback(pool: &PgPool) -> i64 {
    let input = CreateFeedback {
        production_id: "PRD-COMMENTS".to_string(),
        batch_id: None,
        product_id: None,
        product_name: None,
        quantity_ordered: None,
        start_date: None,
        estimated_completion_date: None,
        notes: None,
        customer_notes: None,
    };
    FeedbackRepo::create(pool, &generate_feedback_uid(), &input, 1)
        .await
        .unwrap()
        .id
}

fn comment(content: &str, parent: Option<i64>) -> CreateComment {
    CreateComment {
        content: content.to_string(),
        is_important: false,
        is_public: false,
        visible_to_customer: false,
        parent_comment_id: parent,
        author_name: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_deleted_parent_keeps_replies(pool: PgPool) {
    let feedback_id = seed_feedback(&pool).await;
    let parent = CommentRepo::create(&pool, feedback_id, 10, &comment("Parent", None))
        .await
        .unwrap();
    let reply = CommentRepo::create(&pool, feedback_id, 11, &comment("Reply", Some(parent.id)))
        .await
        .unwrap();

    let deleted = CommentRepo::soft_delete(&pool, parent.id).await.unwrap().unwrap();
    assert!(deleted.is_deleted);
    assert_eq!(deleted.content, DELETED_PLACEHOLDER);
    assert!(deleted.deleted_at.is_some());

    // Second delete is a no-op.
    assert!(CommentRepo::soft_delete(&pool, parent.id).await.unwrap().is_none());

    let replies = CommentRepo::list_replies(&pool, parent.id).await.unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].id, reply.id);
    assert_eq!(replies[0].content, "Reply");

    let all = CommentRepo::list_for_feedback(&pool, feedback_id, VisibilityFilter::All)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_visibility_filters(pool: PgPool) {
    let feedback_id = seed_feedback(&pool).await;
    let mut public = comment("Public", None);
    public.is_public = true;
    let mut customer = comment("Customer", None);
    customer.visible_to_customer = true;
    for input in [comment("Internal", None), public, customer] {
        CommentRepo::create(&pool, feedback_id, 10, &input).await.unwrap();
    }

    let public = CommentRepo::list_for_feedback(&pool, feedback_id, VisibilityFilter::Public)
        .await
        .unwrap();
    assert_eq!(public.len(), 1);
    assert_eq!(public[0].content, "Public");

    let customer = CommentRepo::list_for_feedback(&pool, feedback_id, VisibilityFilter::Customer)
        .await
        .unwrap();
    assert_eq!(customer.len(), 1);
    assert_eq!(customer[0].content, "Customer");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_edit_marks_edited_and_skips_deleted(pool: PgPool) {
    let feedback_id = seed_feedback(&pool).await;
    let c = CommentRepo::create(&pool, feedback_id, 10, &comment("First", None))
        .await
        .unwrap();

    let flag_only = UpdateComment {
        is_important: Some(true),
        ..Default::default()
    };
    let flagged = CommentRepo::update(&pool, c.id, &flag_only).await.unwrap().unwrap();
    assert!(flagged.is_important);
    assert!(!flagged.is_edited);

    let edit = UpdateComment {
        content: Some("Second".to_string()),
        ..Default::default()
    };
    let edited = CommentRepo::update(&pool, c.id, &edit).await.unwrap().unwrap();
    assert!(edited.is_edited);
    assert_eq!(edited.content, "Second");

    CommentRepo::soft_delete(&pool, c.id).await.unwrap();
    assert!(CommentRepo::update(&pool, c.id, &edit).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_depth_counts_ancestors(pool: PgPool) {
    let feedback_id = seed_feedback(&pool).await;
    let root = CommentRepo::create(&pool, feedback_id, 1, &comment("root", None))
        .await
        .unwrap();
    let child = CommentRepo::create(&pool, feedback_id, 1, &comment("child", Some(root.id)))
        .await
        .unwrap();
    let grandchild =
        CommentRepo::create(&pool, feedback_id, 1, &comment("grandchild", Some(child.id)))
            .await
            .unwrap();

    assert_eq!(CommentRepo::depth(&pool, root.id).await.unwrap(), 0);
    assert_eq!(CommentRepo::depth(&pool, child.id).await.unwrap(), 1);
    assert_eq!(CommentRepo::depth(&pool, grandchild.id).await.unwrap(), 2);
}
