//! x-line-signature verification: base64(HMAC-SHA256(channel secret, raw body)).

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use hmac::{Hmac, Mac};
use http_body_util::LengthLimitError;
use sha2::Sha256;
use std::sync::Arc;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Largest webhook body accepted before verification.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

type HmacSha256 = Hmac<Sha256>;

/// Middleware state: the channel secret the signature is keyed with.
#[derive(Clone)]
pub struct ChannelSecret(pub Arc<str>);

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("no signature")]
    Missing,
    #[error("signature is not valid base64")]
    Encoding,
    #[error("signature validation failed")]
    Mismatch,
}

/// Constant-time check of a provided signature header against the body.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), SignatureError> {
    let signature = signature.trim();
    if signature.is_empty() {
        return Err(SignatureError::Missing);
    }
    let provided = B64
        .decode(signature)
        .map_err(|_| SignatureError::Encoding)?;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(body);
    mac.verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}

/// Signature for a body, as LINE computes it.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    B64.encode(mac.finalize().into_bytes())
}

/// Middleware: buffer the body, verify x-line-signature, then hand the request on intact.
pub async fn verify_line_signature(
    State(secret): State<ChannelSecret>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();
    let body_bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) if is_length_limit(&e) => {
            log::warn!("webhook: body exceeds {} bytes", MAX_BODY_BYTES);
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
        Err(e) => {
            log::warn!("webhook: failed to read body: {}", e);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    let provided = parts
        .headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if let Err(e) = verify_signature(&secret.0, &body_bytes, provided) {
        log::warn!("webhook: rejected request: {}", e);
        return (StatusCode::UNAUTHORIZED, e.to_string()).into_response();
    }
    let req = Request::from_parts(parts, Body::from(body_bytes));
    next.run(req).await
}

fn is_length_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
