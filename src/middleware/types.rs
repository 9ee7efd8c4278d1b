use serde::{Deserialize, Serialize};

use crate::types::OrderRef;

/// Body of `POST {auth_path}/start`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    /// 12-digit personal identity number. Validated server-side.
    pub personal_number: String,
}

/// Body of a successful start.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub order_ref: OrderRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_start_token: Option<String>,
}

/// Body of `POST {auth_path}/cancel`. Always reports success.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
}

/// Body of `GET {auth_path}/session`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub has_active_session: bool,
}

/// Body of `GET {auth_path}/csrf`.
#[derive(Debug, Serialize)]
pub struct CsrfResponse {
    pub token: String,
    pub message: String,
}
