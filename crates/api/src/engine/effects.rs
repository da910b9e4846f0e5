//! Post-commit side-effect intents and their execution.
//!
//! The aggregator decides *what* should happen after a derived-field change
//! while the row lock is held; nothing here runs until that transaction has
//! committed. Each intent is failure-isolated: a failed notification or push
//! is logged and never undoes the committed write.

use millwright_core::marketplace::SyncOutcome;
use millwright_core::notifications::NotificationDraft;
use millwright_db::models::feedback::Feedback;

use crate::engine::{dispatcher, synchronizer};
use crate::state::AppState;

/// Side effects to run once a feedback change has committed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PostCommit {
    /// Notifications to persist (and possibly email).
    pub notifications: Vec<NotificationDraft>,
    /// Whether to push the feedback to the marketplace.
    pub sync: bool,
}

impl PostCommit {
    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty() && !self.sync
    }
}

/// Result of running a [`PostCommit`].
#[derive(Debug)]
pub struct EffectOutcome {
    /// The feedback after any sync bookkeeping was recorded.
    pub feedback: Feedback,
    pub marketplace_update: Option<SyncOutcome>,
}

/// Execute intents for `feedback`: notifications first, then the marketplace push.
pub async fn run(state: &AppState, feedback: Feedback, intents: PostCommit) -> EffectOutcome {
    if intents.is_empty() {
        return EffectOutcome {
            feedback,
            marketplace_update: None,
        };
    }

    dispatcher::dispatch_all(state, &intents.notifications).await;

    if !intents.sync {
        return EffectOutcome {
            feedback,
            marketplace_update: None,
        };
    }

    let (outcome, refreshed) = synchronizer::sync_feedback(state, &feedback).await;
    EffectOutcome {
        feedback: refreshed.unwrap_or(feedback),
        marketplace_update: Some(outcome),
    }
}
