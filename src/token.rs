use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use time::OffsetDateTime;

use crate::error::Error;
use crate::personnummer::Personnummer;
use crate::types::OrderRef;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

/// Sessions are valid for exactly this long from issuance.
pub const SESSION_LIFETIME: time::Duration = time::Duration::minutes(10);

/// Minimum accepted signing-key length (256 bits).
pub const MIN_KEY_BYTES: usize = 32;

/// Symmetric key for sealing session tokens. Held server-side only.
#[derive(Clone)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    /// # Errors
    ///
    /// Returns [`Error::WeakSigningKey`] if fewer than 32 bytes are provided.
    /// A short key is a deployment mistake and must fail startup, not degrade
    /// the token.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < MIN_KEY_BYTES {
            return Err(Error::WeakSigningKey(bytes.len()));
        }
        Ok(Self(bytes.to_vec()))
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

#[derive(Serialize, Deserialize)]
struct Header {
    alg: String,
}

/// Payload embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub personal_number: Personnummer,
    pub order_ref: OrderRef,
    /// Unix seconds.
    pub issued_at: i64,
    /// Unix seconds. Tokens decode as expired at or after this instant.
    pub expires_at: i64,
}

/// Why a token failed to decode.
///
/// Callers must treat both kinds as "no session"; the distinction exists for
/// server-side logging only and is never exposed to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

/// Seal a session payload into a compact tamper-evident token.
///
/// Three base64url segments (`header.claims.signature`), signed with
/// HMAC-SHA256 over the first two. The embedded expiry is `now + lifetime`.
#[must_use]
pub fn encode(
    key: &SigningKey,
    personal_number: Personnummer,
    order_ref: OrderRef,
    lifetime: time::Duration,
) -> String {
    encode_at(
        key,
        personal_number,
        order_ref,
        lifetime,
        OffsetDateTime::now_utc().unix_timestamp(),
    )
}

fn encode_at(
    key: &SigningKey,
    personal_number: Personnummer,
    order_ref: OrderRef,
    lifetime: time::Duration,
    now: i64,
) -> String {
    let claims = SessionClaims {
        personal_number,
        order_ref,
        issued_at: now,
        expires_at: now + lifetime.whole_seconds(),
    };

    let header = serde_json::to_vec(&Header {
        alg: ALGORITHM.into(),
    })
    .expect("header serializes to JSON");
    let body = serde_json::to_vec(&claims).expect("claims serialize to JSON");

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(body)
    );
    let signature = sign(key, signing_input.as_bytes());

    format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature))
}

/// Open a sealed token and return its claims.
///
/// # Errors
///
/// [`DecodeError::Invalid`] if the token is malformed, carries an unexpected
/// algorithm tag, or fails signature verification; [`DecodeError::Expired`]
/// if the signature verifies but the embedded expiry has passed. Integrity is
/// checked before expiry, so a tampered-but-expired token reports `Invalid`.
pub fn decode(key: &SigningKey, token: &str) -> Result<SessionClaims, DecodeError> {
    decode_at(key, token, OffsetDateTime::now_utc().unix_timestamp())
}

fn decode_at(key: &SigningKey, token: &str, now: i64) -> Result<SessionClaims, DecodeError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(DecodeError::Invalid);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|_| DecodeError::Invalid)?;
    let signing_input_len = parts[0].len() + 1 + parts[1].len();
    verify(key, token[..signing_input_len].as_bytes(), &signature)?;

    let header_bytes = URL_SAFE_NO_PAD
        .decode(parts[0])
        .map_err(|_| DecodeError::Invalid)?;
    let header: Header =
        serde_json::from_slice(&header_bytes).map_err(|_| DecodeError::Invalid)?;
    if header.alg != ALGORITHM {
        return Err(DecodeError::Invalid);
    }

    let body_bytes = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| DecodeError::Invalid)?;
    let claims: SessionClaims =
        serde_json::from_slice(&body_bytes).map_err(|_| DecodeError::Invalid)?;

    if now >= claims.expires_at {
        return Err(DecodeError::Expired);
    }
    Ok(claims)
}

fn sign(key: &SigningKey, input: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(&key.0).expect("HMAC accepts any key length");
    mac.update(input);
    mac.finalize().into_bytes().to_vec()
}

/// Constant-time comparison via the MAC implementation.
fn verify(key: &SigningKey, input: &[u8], signature: &[u8]) -> Result<(), DecodeError> {
    let mut mac = HmacSha256::new_from_slice(&key.0).expect("HMAC accepts any key length");
    mac.update(input);
    mac.verify_slice(signature).map_err(|_| DecodeError::Invalid)
}
