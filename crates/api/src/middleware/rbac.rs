//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! meet the minimum requirement.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use millwright_core::error::CoreError;
use millwright_core::roles::is_manager;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires `production_manager` or `admin`. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn managers_only(RequireManager(user): RequireManager) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireManager(pub AuthUser);

impl FromRequestParts<AppState> for RequireManager {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !is_manager(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Production manager or Admin role required".into(),
            )));
        }
        Ok(RequireManager(user))
    }
}
