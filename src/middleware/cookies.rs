use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::session::StoreKind;

/// Create the session cookie.
///
/// SameSite is strict for the server-side store; the signed-token store uses
/// lax so the cookie survives the top-level navigation back from the BankID
/// app.
pub(super) fn session_cookie(
    name: &str,
    value: &str,
    ttl: Duration,
    secure: bool,
    store: StoreKind,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(same_site_for(store))
        .path("/".to_string())
        .max_age(ttl)
        .build()
}

fn same_site_for(store: StoreKind) -> SameSite {
    match store {
        StoreKind::SignedCookie => SameSite::Lax,
        StoreKind::Memory => SameSite::Strict,
    }
}

/// Create removal cookie for the session.
pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Create the CSRF cookie (24 h, strict).
pub(super) fn csrf_cookie(name: &str, token: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((name.to_string(), token.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .path("/".to_string())
        .max_age(Duration::hours(24))
        .build()
}

/// Get the session token from cookies.
pub(super) fn get_session_token(jar: &CookieJar, name: &str) -> Option<String> {
    jar.get(name).map(|c| c.value().to_string())
}
