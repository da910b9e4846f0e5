//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Methods that participate in the
//! per-feedback serialization point take an open transaction instead.

pub mod comment_repo;
pub mod feedback_repo;
pub mod notification_repo;
pub mod quality_check_repo;
pub mod step_repo;

pub use comment_repo::CommentRepo;
pub use feedback_repo::FeedbackRepo;
pub use notification_repo::NotificationRepo;
pub use quality_check_repo::QualityCheckRepo;
pub use step_repo::StepRepo;
