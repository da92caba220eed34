use axum::http::{header, HeaderMap};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::models::AuthPayload;

/// Maps a request to the caller's user id, or `None` when the caller is
/// anonymous. Plain closures implement it, which is how tests mock it.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, headers: &HeaderMap) -> Option<String>;
}

impl<F> Authenticator for F
where
    F: Fn(&HeaderMap) -> Option<String> + Send + Sync,
{
    fn authenticate(&self, headers: &HeaderMap) -> Option<String> {
        self(headers)
    }
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

/// HS256 keys plus token lifetime, built once from config.
#[derive(Clone)]
pub struct JwtAuthenticator {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: u64,
}

impl JwtAuthenticator {
    pub fn new(secret: &[u8], ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    pub fn create_jwt(&self, username: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp().max(0) as usize;
        let ttl = usize::try_from(self.ttl_secs).unwrap_or(usize::MAX);
        let expiration = now.saturating_add(ttl);

        let claims = AuthPayload {
            sub: username.to_owned(),
            exp: expiration,
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn validate_jwt(&self, token: &str) -> Result<AuthPayload, jsonwebtoken::errors::Error> {
        let token_data = decode::<AuthPayload>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )?;
        Ok(token_data.claims)
    }
}

impl Authenticator for JwtAuthenticator {
    fn authenticate(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))?;

        match self.validate_jwt(token.trim()) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                tracing::debug!("Rejected bearer token: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_jwt_round_trip_identifies_user() {
        let auth = JwtAuthenticator::new(b"test-secret", 3600);
        let token = auth.create_jwt("alice").expect("Token");
        assert_eq!(auth.authenticate(&bearer(&token)), Some("alice".to_string()));
    }

    #[test]
    fn test_missing_or_foreign_token_is_anonymous() {
        let auth = JwtAuthenticator::new(b"test-secret", 3600);
        assert_eq!(auth.authenticate(&HeaderMap::new()), None);

        let other = JwtAuthenticator::new(b"another-secret", 3600);
        let token = other.create_jwt("mallory").unwrap();
        assert_eq!(auth.authenticate(&bearer(&token)), None);

        let mut basic = HeaderMap::new();
        basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(auth.authenticate(&basic), None);
    }

    #[test]
    fn test_huge_ttl_saturates_instead_of_expiring() {
        let auth = JwtAuthenticator::new(b"test-secret", u64::MAX);
        let token = auth.create_jwt("alice").expect("Token");
        let claims = auth.validate_jwt(&token).expect("Still valid");
        assert_eq!(claims.exp, usize::MAX);
        assert_eq!(auth.authenticate(&bearer(&token)), Some("alice".to_string()));
    }

    #[test]
    fn test_closure_authenticator() {
        let fixed = |_: &HeaderMap| Some("user_1".to_string());
        assert_eq!(fixed.authenticate(&HeaderMap::new()).as_deref(), Some("user_1"));
    }

    #[test]
    fn test_password_hash_verifies() {
        let hashed = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hashed).unwrap());
        assert!(!verify_password("hunter3", &hashed).unwrap());
    }
}
