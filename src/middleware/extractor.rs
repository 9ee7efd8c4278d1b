use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;

use super::error::AuthError;
use super::state::AuthState;
use crate::flow::IdentityProvider;
use crate::session::SessionBackend;
use crate::token::SessionClaims;

/// Active authentication session extracted from the session cookie.
///
/// Use as an Axum extractor in route handlers. Returns `401 Unauthorized`
/// if no valid session exists.
///
/// # Example
///
/// ```rust,ignore
/// async fn pending_order(session: ActiveSession) -> impl IntoResponse {
///     format!("order {} for {}", session.0.order_ref, session.0.personal_number)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ActiveSession(pub SessionClaims);

impl<P: IdentityProvider> FromRequestParts<AuthState<P>> for ActiveSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState<P>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthError::Unauthenticated)?;

        resolve_session(
            state.flow.sessions(),
            &jar,
            &state.settings.session_cookie_name,
        )
        .map(ActiveSession)
        .ok_or(AuthError::Unauthenticated)
    }
}

/// Resolve the session cookie against the configured store.
///
/// Expired, invalid, and absent all come back as `None`; callers cannot and
/// must not distinguish them.
#[must_use]
pub fn resolve_session(
    sessions: &SessionBackend,
    jar: &CookieJar,
    cookie_name: &str,
) -> Option<SessionClaims> {
    let token = jar.get(cookie_name)?.value().to_string();
    sessions.read(&token)
}
