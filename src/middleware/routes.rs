use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum_extra::extract::CookieJar;

use super::config::BankIdAuthConfig;
use super::cookies;
use super::error::AuthError;
use super::extractor;
use super::state::AuthState;
use super::types::{
    CancelResponse, CsrfResponse, SessionStatusResponse, StartRequest, StartResponse,
};
use crate::csrf;
use crate::flow::{AuthFlow, IdentityProvider};
use crate::personnummer::Personnummer;
use crate::sweep::SweeperHandle;
use crate::tracker::OngoingTracker;

/// Create the BankID authentication router.
///
/// Returns the router plus the handle owning the background sweep tasks.
/// Keep the handle alive for the lifetime of the server; dropping it stops
/// stale-record cleanup. Must be called inside a tokio runtime.
pub fn auth_routes(config: BankIdAuthConfig) -> (Router, SweeperHandle) {
    let sessions = Arc::new(config.build_backend());
    let tracker = Arc::new(OngoingTracker::new());
    let sweeper = SweeperHandle::spawn(tracker.clone(), sessions.clone());

    let auth_path = config.settings.auth_path.clone();
    let flow = AuthFlow::new(config.provider, sessions, tracker);
    let state = AuthState::new(flow, config.settings);

    (router_at(&auth_path, state), sweeper)
}

fn router_at<P: IdentityProvider>(auth_path: &str, state: AuthState<P>) -> Router {
    Router::new()
        .route(&format!("{auth_path}/start"), post(start::<P>))
        .route(&format!("{auth_path}/collect"), get(collect::<P>))
        .route(&format!("{auth_path}/cancel"), post(cancel::<P>))
        .route(&format!("{auth_path}/session"), get(session_status::<P>))
        .route(&format!("{auth_path}/csrf"), get(csrf_token::<P>))
        .with_state(state)
}

// ── Start ──────────────────────────────────────────────────────────

async fn start<P: IdentityProvider>(
    State(state): State<AuthState<P>>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<StartRequest>,
) -> Result<(CookieJar, Json<StartResponse>), AuthError> {
    let personal_number: Personnummer = body
        .personal_number
        .parse()
        .map_err(|_| AuthError::InvalidPersonalNumber)?;

    let end_user_ip = extract_client_ip(&headers).unwrap_or_else(|| "127.0.0.1".to_string());

    let started = state.flow.start(personal_number, &end_user_ip).await?;

    let cookie = cookies::session_cookie(
        &state.settings.session_cookie_name,
        &started.session_token,
        state.settings.session_ttl,
        state.settings.secure_cookies,
        state.settings.store_kind,
    );

    Ok((
        jar.add(cookie),
        Json(StartResponse {
            order_ref: started.order.order_ref,
            auto_start_token: started.order.auto_start_token,
        }),
    ))
}

// ── Collect ────────────────────────────────────────────────────────

async fn collect<P: IdentityProvider>(
    State(state): State<AuthState<P>>,
    jar: CookieJar,
) -> Result<Response, AuthError> {
    let token = cookies::get_session_token(&jar, &state.settings.session_cookie_name);
    let status = state.flow.status(token.as_deref()).await?;

    if status.is_terminal() {
        let jar = jar.remove(cookies::clear_session_cookie(
            &state.settings.session_cookie_name,
        ));
        Ok((jar, Json(status)).into_response())
    } else {
        Ok(Json(status).into_response())
    }
}

// ── Cancel ─────────────────────────────────────────────────────────

/// Always reports success: clearing client-visible state is idempotent and
/// safe even when server-side cleanup partially failed. The flow logs any
/// underlying error.
async fn cancel<P: IdentityProvider>(
    State(state): State<AuthState<P>>,
    jar: CookieJar,
) -> (CookieJar, Json<CancelResponse>) {
    let token = cookies::get_session_token(&jar, &state.settings.session_cookie_name);
    state.flow.cancel(token.as_deref()).await;

    let jar = jar.remove(cookies::clear_session_cookie(
        &state.settings.session_cookie_name,
    ));
    (
        jar,
        Json(CancelResponse {
            success: true,
            message: "Session cancelled".into(),
        }),
    )
}

// ── Session status ─────────────────────────────────────────────────

async fn session_status<P: IdentityProvider>(
    State(state): State<AuthState<P>>,
    jar: CookieJar,
) -> Json<SessionStatusResponse> {
    let active = extractor::resolve_session(
        state.flow.sessions(),
        &jar,
        &state.settings.session_cookie_name,
    )
    .is_some();

    Json(SessionStatusResponse {
        has_active_session: active,
    })
}

// ── CSRF ───────────────────────────────────────────────────────────

async fn csrf_token<P: IdentityProvider>(
    State(state): State<AuthState<P>>,
    jar: CookieJar,
) -> (CookieJar, Json<CsrfResponse>) {
    let token = csrf::generate_token();
    let cookie = cookies::csrf_cookie(
        &state.settings.csrf_cookie_name,
        &token,
        state.settings.secure_cookies,
    );

    (
        jar.add(cookie),
        Json(CsrfResponse {
            token,
            message: "CSRF token issued".into(),
        }),
    )
}

// ── Helpers ────────────────────────────────────────────────────────

fn extract_client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        })
}
