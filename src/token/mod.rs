//! Session credentials: compact HS256 tokens binding a user id to an expiry.
//!
//! Tokens are stateless; verification checks the signature and the expiry
//! only. There is no server-side revocation list. The expiry is fixed at
//! issuance to [`SESSION_TTL_SECONDS`] past `iat`.

use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Sessions live for 24 hours from issuance.
pub const SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTokenHeader {
    pub alg: String,
    pub typ: String,
}

impl SessionTokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// User id the session is bound to.
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signing key")]
    InvalidKey,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, Error> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(s: &str) -> Result<T, Error> {
    let bytes = Base64UrlUnpadded::decode_vec(s).map_err(|_| Error::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Create an HS256-signed session token for `user_id`, valid for
/// [`SESSION_TTL_SECONDS`] from `now_unix_seconds`.
///
/// # Errors
///
/// Returns an error if the header/claims cannot be encoded or the secret is
/// unusable as an HMAC key.
pub fn issue_hs256(secret: &[u8], user_id: Uuid, now_unix_seconds: i64) -> Result<String, Error> {
    let claims = SessionClaims {
        sub: user_id,
        iat: now_unix_seconds,
        exp: now_unix_seconds + SESSION_TTL_SECONDS,
    };
    sign_hs256(secret, &claims)
}

/// Sign arbitrary session claims with HMAC-SHA256.
///
/// # Errors
///
/// Returns an error if the header/claims JSON cannot be encoded or the secret
/// is unusable as an HMAC key.
pub fn sign_hs256(secret: &[u8], claims: &SessionClaims) -> Result<String, Error> {
    let header_b64 = b64e_json(&SessionTokenHeader::hs256())?;
    let claims_b64 = b64e_json(claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| Error::InvalidKey)?;
    mac.update(signing_input.as_bytes());
    let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{signature_b64}"))
}

/// Verify an HS256 session token and return its decoded claims.
///
/// # Errors
///
/// Returns an error if:
/// - the token is malformed or contains invalid base64/json,
/// - the header advertises anything but HS256,
/// - the signature does not match,
/// - `exp` is at or before `now_unix_seconds`.
pub fn verify_hs256(
    token: &str,
    secret: &[u8],
    now_unix_seconds: i64,
) -> Result<SessionClaims, Error> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(Error::TokenFormat)?;
    let claims_b64 = parts.next().ok_or(Error::TokenFormat)?;
    let sig_b64 = parts.next().ok_or(Error::TokenFormat)?;
    if parts.next().is_some() {
        return Err(Error::TokenFormat);
    }

    let header: SessionTokenHeader = b64d_json(header_b64)?;
    if header.alg != "HS256" {
        return Err(Error::UnsupportedAlg(header.alg));
    }

    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature_bytes = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| Error::Base64)?;
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| Error::InvalidKey)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&signature_bytes)
        .map_err(|_| Error::InvalidSignature)?;

    let claims: SessionClaims = b64d_json(claims_b64)?;
    if claims.exp <= now_unix_seconds {
        return Err(Error::Expired);
    }

    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
    // Fixed clock so expiry assertions are stable.
    const NOW: i64 = 1_700_000_000;

    fn user() -> Uuid {
        Uuid::parse_str("a1a2a3a4-b1b2-c1c2-d1d2-e1e2e3e4e5e6").unwrap()
    }

    #[test]
    fn issue_and_verify_round_trip() -> Result<(), Error> {
        let token = issue_hs256(SECRET, user(), NOW)?;
        let claims = verify_hs256(&token, SECRET, NOW)?;
        assert_eq!(claims.sub, user());
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + SESSION_TTL_SECONDS);
        Ok(())
    }

    #[test]
    fn rejects_expired_token() -> Result<(), Error> {
        let token = issue_hs256(SECRET, user(), NOW)?;
        let result = verify_hs256(&token, SECRET, NOW + SESSION_TTL_SECONDS);
        assert!(matches!(result, Err(Error::Expired)));
        Ok(())
    }

    #[test]
    fn rejects_wrong_secret() -> Result<(), Error> {
        let token = issue_hs256(SECRET, user(), NOW)?;
        let result = verify_hs256(&token, b"another-secret-entirely-32-bytes", NOW);
        assert!(matches!(result, Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn rejects_tampered_claims() -> Result<(), Error> {
        let token = issue_hs256(SECRET, user(), NOW)?;
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = b64e_json(&SessionClaims {
            sub: user(),
            iat: NOW,
            exp: NOW + 10 * SESSION_TTL_SECONDS,
        })?;
        parts[1] = &forged;
        let forged_token = parts.join(".");
        let result = verify_hs256(&forged_token, SECRET, NOW);
        assert!(matches!(result, Err(Error::InvalidSignature)));
        Ok(())
    }

    #[test]
    fn rejects_malformed_tokens() {
        for garbage in ["", "a", "a.b", "a.b.c.d", "!!.!!.!!"] {
            assert!(
                verify_hs256(garbage, SECRET, NOW).is_err(),
                "accepted malformed token: {garbage}"
            );
        }
    }

    #[test]
    fn rejects_unsupported_alg() -> Result<(), Error> {
        let header_b64 = b64e_json(&SessionTokenHeader {
            alg: "none".to_string(),
            typ: "JWT".to_string(),
        })?;
        let claims_b64 = b64e_json(&SessionClaims {
            sub: user(),
            iat: NOW,
            exp: NOW + 60,
        })?;
        let token = format!("{header_b64}.{claims_b64}.");
        let result = verify_hs256(&token, SECRET, NOW);
        assert!(matches!(result, Err(Error::UnsupportedAlg(_))));
        Ok(())
    }
}
