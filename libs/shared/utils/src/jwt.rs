use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{TimeZone, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use tracing::debug;

use shared_models::auth::{JwtClaims, User};

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JwtError {
    #[error("JWT secret is not set")]
    MissingSecret,
    #[error("Invalid token format")]
    Malformed,
    #[error("Invalid signature encoding")]
    SignatureEncoding,
    #[error("Invalid token signature")]
    BadSignature,
    #[error("Invalid claims encoding")]
    ClaimsEncoding,
    #[error("Invalid claims format")]
    ClaimsFormat,
    #[error("Token expired")]
    Expired,
}

/// Validates an HS256 token and returns the user it was issued to.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<User, JwtError> {
    if jwt_secret.is_empty() {
        return Err(JwtError::MissingSecret);
    }

    let mut parts = token.split('.');
    let (header_b64, claims_b64, signature_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) => (h, c, s),
        _ => return Err(JwtError::Malformed),
    };

    verify_signature(header_b64, claims_b64, signature_b64, jwt_secret)?;
    let claims = decode_claims(claims_b64)?;

    if let Some(exp) = claims.exp {
        let now = Utc::now().timestamp().max(0) as u64;
        if exp < now {
            debug!("Token expired at {} (now: {})", exp, now);
            return Err(JwtError::Expired);
        }
    }

    let created_at = claims
        .iat
        .and_then(|timestamp| Utc.timestamp_opt(timestamp as i64, 0).single());

    let user = User {
        id: claims.sub,
        email: claims.email,
        role: claims.role,
        metadata: claims.user_metadata,
        created_at,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

fn verify_signature(
    header_b64: &str,
    claims_b64: &str,
    signature_b64: &str,
    jwt_secret: &str,
) -> Result<(), JwtError> {
    let signature = URL_SAFE_NO_PAD.decode(signature_b64).map_err(|e| {
        debug!("Failed to decode signature: {}", e);
        JwtError::SignatureEncoding
    })?;

    let mut mac =
        HmacSha256::new_from_slice(jwt_secret.as_bytes()).map_err(|_| JwtError::MissingSecret)?;
    mac.update(format!("{}.{}", header_b64, claims_b64).as_bytes());

    mac.verify_slice(&signature).map_err(|_| {
        debug!("Token signature verification failed");
        JwtError::BadSignature
    })
}

fn decode_claims(claims_b64: &str) -> Result<JwtClaims, JwtError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .map_err(|_| JwtError::ClaimsEncoding)?;
    let json = String::from_utf8(bytes).map_err(|_| JwtError::ClaimsEncoding)?;

    serde_json::from_str(&json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        JwtError::ClaimsFormat
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn test_valid_token_yields_user() {
        let test_user = TestUser::staff("frontdesk@clinic.test");
        let token = JwtTestUtils::create_test_token(&test_user, SECRET, Some(1));

        let user = validate_token(&token, SECRET).unwrap();
        assert_eq!(user.id, test_user.id);
        assert_eq!(user.role.as_deref(), Some("staff"));
    }

    #[test]
    fn test_rejections() {
        let test_user = TestUser::default();

        assert_eq!(validate_token("a.b.c", ""), Err(JwtError::MissingSecret));
        assert_eq!(
            validate_token(&JwtTestUtils::create_malformed_token(), SECRET),
            Err(JwtError::Malformed)
        );
        assert_eq!(
            validate_token(&JwtTestUtils::create_invalid_signature_token(&test_user), SECRET),
            Err(JwtError::BadSignature)
        );
        assert_eq!(
            validate_token(&JwtTestUtils::create_expired_token(&test_user, SECRET), SECRET),
            Err(JwtError::Expired)
        );
    }
}
