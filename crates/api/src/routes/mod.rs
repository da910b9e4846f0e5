pub mod comment;
pub mod feedback;
pub mod health;
pub mod notification;
pub mod quality;
pub mod step;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /feedback                                        list, create
/// /feedback/by-uid/{uid}                           get by feedback uid
/// /feedback/by-production/{production_id}          get by production id
/// /feedback/by-batch/{batch_id}                    list by batch id
/// /feedback/{id}                                   get, update, cancel
/// /feedback/{id}/marketplace-sync                  sync status, manual re-send
/// /feedback/{id}/recompute                         force recompute (POST)
/// /feedback/{id}/issues                            report issue (POST)
/// /feedback/{id}/steps                             list, create
/// /feedback/{id}/steps/batch                       create many (POST)
/// /feedback/{id}/quality-checks                    list, create
/// /feedback/{id}/quality-checks/batch              create many (POST)
/// /feedback/{id}/quality-summary                   summary (GET)
/// /feedback/{id}/comments                          list, create
/// /feedback/{id}/notifications                     list (GET)
///
/// /steps/{id}                                      get, update, delete
/// /quality-checks/{id}                             get, update, delete
/// /comments/{id}                                   update, delete
/// /comments/{id}/replies                           list replies (GET)
///
/// /notifications                                   list mine, create
/// /notifications/unread-count                      unread count (GET)
/// /notifications/read                              mark many read (POST)
/// /notifications/read-all                          mark all read (POST)
/// /notifications/{id}                              delete
/// /notifications/{id}/read                         mark read (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest(
            "/feedback",
            feedback::router()
                .merge(step::feedback_router())
                .merge(quality::feedback_router())
                .merge(comment::feedback_router())
                .merge(notification::feedback_router()),
        )
        .nest("/steps", step::router())
        .nest("/quality-checks", quality::router())
        .nest("/comments", comment::router())
        .nest("/notifications", notification::router())
}
