use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use futures::future::{ready, Ready};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::config::Config;
use crate::error::AppError;
use crate::schemas::UserId;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_HEADER: &str = "x-auth-token";

/// The caller every expense operation is scoped to.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    pub user_id: UserId,
    pub name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TokenHeader {
    alg: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Claims {
    user_id: UserId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Verifies an HS256 compact token (`header.claims.signature`, base64url)
/// signed with `secret` and returns the identity it carries.
///
/// Only this subset of JWT is understood: HS256 over a three-segment compact
/// token with `userId`, `name` and `exp` claims. Other algorithms, `kid`,
/// `nbf`/`aud` checks and JWE are rejected or ignored.
pub fn verify_token(token: &str, secret: &str) -> Result<Identity, AppError> {
    let (signed, signature) = token.trim().rsplit_once('.').ok_or(AppError::InvalidToken)?;
    let (header, claims) = signed.split_once('.').ok_or(AppError::InvalidToken)?;
    if claims.contains('.') {
        return Err(AppError::InvalidToken);
    }

    let header: TokenHeader = decode_segment(header)?;
    if header.alg != "HS256" {
        return Err(AppError::InvalidToken);
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature)
        .map_err(|_| AppError::InvalidToken)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::InvalidToken)?;
    mac.update(signed.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::InvalidToken)?;

    let claims: Claims = decode_segment(claims)?;
    if let Some(exp) = claims.exp {
        if exp <= chrono::Utc::now().timestamp() {
            return Err(AppError::InvalidToken);
        }
    }

    Ok(Identity {
        user_id: claims.user_id,
        name: claims.name,
    })
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, AppError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AppError::InvalidToken)?;
    serde_json::from_slice(&bytes).map_err(|_| AppError::InvalidToken)
}

pub fn authenticate(request: &HttpRequest) -> Result<Identity, AppError> {
    let config = request
        .app_data::<web::Data<Config>>()
        .ok_or_else(|| AppError::Internal("configuration is not registered".to_string()))?;
    let token = request
        .headers()
        .get(TOKEN_HEADER)
        .ok_or(AppError::MissingToken)?
        .to_str()
        .map_err(|_| AppError::InvalidToken)?;
    if token.trim().is_empty() {
        return Err(AppError::MissingToken);
    }
    verify_token(token, &config.auth_secret)
}

impl FromRequest for Identity {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(request: &HttpRequest, _: &mut Payload) -> Self::Future {
        let identity = authenticate(request);
        if let Err(err) = &identity {
            tracing::debug!(error = %err, "rejected request");
        }
        ready(identity)
    }
}

/// Issues a token the way the login service does; only needed by tests.
#[cfg(test)]
pub fn sign_token(claims: &serde_json::Value, secret: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let claims = URL_SAFE_NO_PAD.encode(claims.to_string());
    let signed = format!("{header}.{claims}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(signed.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{signed}.{signature}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "test-secret";

    #[test]
    fn accepts_a_valid_token() {
        let token = sign_token(&json!({"userId": "u1", "name": "Alice"}), SECRET);
        assert_eq!(
            verify_token(&token, SECRET).unwrap(),
            Identity {
                user_id: "u1".to_string(),
                name: Some("Alice".to_string()),
            }
        );
    }

    #[test]
    fn name_is_optional() {
        let token = sign_token(&json!({"userId": "u1"}), SECRET);
        assert_eq!(verify_token(&token, SECRET).unwrap().name, None);
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = sign_token(&json!({"userId": "u1"}), "other");
        assert!(matches!(verify_token(&token, SECRET), Err(AppError::InvalidToken)));
    }

    #[test]
    fn rejects_tampered_claims() {
        let token = sign_token(&json!({"userId": "u1"}), SECRET);
        let parts: Vec<_> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(json!({"userId": "admin"}).to_string());
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert!(matches!(verify_token(&tampered, SECRET), Err(AppError::InvalidToken)));
    }

    #[test]
    fn rejects_expired_token() {
        let token = sign_token(&json!({"userId": "u1", "exp": 1_000}), SECRET);
        assert!(matches!(verify_token(&token, SECRET), Err(AppError::InvalidToken)));
        let future = chrono::Utc::now().timestamp() + 3_600;
        let token = sign_token(&json!({"userId": "u1", "exp": future}), SECRET);
        assert!(verify_token(&token, SECRET).is_ok());
    }

    #[test]
    fn rejects_garbage() {
        for token in ["", "abc", "a.b", "a.b.c.d", "!!.??.**"] {
            assert!(matches!(verify_token(token, SECRET), Err(AppError::InvalidToken)));
        }
    }

    #[test]
    fn rejects_other_algorithms() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let claims = URL_SAFE_NO_PAD.encode(br#"{"userId":"u1"}"#);
        let token = format!("{header}.{claims}.");
        assert!(matches!(verify_token(&token, SECRET), Err(AppError::InvalidToken)));
    }
}
