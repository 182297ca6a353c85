// HS256 JWT encoding and verification for platform tokens
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;

use super::TokenError;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

fn mac_for(secret: &[u8], message: &[u8]) -> Result<HmacSha256, TokenError> {
    // HMAC accepts keys of any length; this only fails for an unusable key type
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|e| TokenError::Key(e.to_string()))?;
    mac.update(message);
    Ok(mac)
}

/// Create a JWT with the given claims signed with HMAC-SHA256
///
/// # Errors
///
/// Returns an error if the claims cannot be serialized.
pub fn encode<T: Serialize>(claims: &T, secret: &[u8]) -> Result<String, TokenError> {
    let header = Header {
        alg: ALGORITHM.to_string(),
        typ: "JWT".to_string(),
    };

    let header_json = serde_json::to_vec(&header)?;
    let payload_json = serde_json::to_vec(claims)?;

    let message = format!(
        "{}.{}",
        general_purpose::URL_SAFE_NO_PAD.encode(header_json),
        general_purpose::URL_SAFE_NO_PAD.encode(payload_json)
    );

    let signature = mac_for(secret, message.as_bytes())?.finalize().into_bytes();
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(signature);

    Ok(format!("{message}.{signature_b64}"))
}

/// Verify the signature of a JWT and return its claims
///
/// Only structure, algorithm and signature are checked here; claim
/// semantics (expiry, issuer, kind) belong to the caller.
///
/// # Errors
///
/// Returns an error if the token is malformed, uses another algorithm,
/// or the signature does not match.
pub fn decode<T: DeserializeOwned>(token: &str, secret: &[u8]) -> Result<T, TokenError> {
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Malformed("expected three segments".to_string()));
    };

    let header: Header = decode_segment(header_b64)?;
    if header.alg != ALGORITHM {
        return Err(TokenError::UnsupportedAlgorithm(header.alg));
    }

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| TokenError::Malformed("signature is not base64url".to_string()))?;

    let message_len = header_b64.len() + 1 + payload_b64.len();
    mac_for(secret, &token.as_bytes()[..message_len])?
        .verify_slice(&signature)
        .map_err(|_| TokenError::InvalidSignature)?;

    decode_segment(payload_b64)
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed("segment is not base64url".to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))
}
