use axum::http::HeaderValue;
use axum_extra::headers::authorization::Credentials;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{db::UserId, error::AppResult};

const TOKEN_LIFETIME_DAYS: i64 = 30;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: i64,
    pub user_id: UserId,
}

/// `Authorization: Token <jwt>` credentials.
#[derive(Debug)]
pub struct JWTToken(pub String);

impl Credentials for JWTToken {
    const SCHEME: &'static str = "Token";

    fn decode(value: &HeaderValue) -> Option<Self> {
        let mut it = value.to_str().ok()?.split_whitespace();
        let scheme = it.next()?;
        let token = it.next()?;

        if !scheme.eq_ignore_ascii_case(Self::SCHEME) || it.next().is_some() {
            None?
        }

        Some(Self(token.to_string()))
    }

    fn encode(&self) -> HeaderValue {
        HeaderValue::from_str(&format!("{} {}", Self::SCHEME, self.0))
            .unwrap_or_else(|_| HeaderValue::from_static(""))
    }
}

pub fn generate_jwt(user_id: UserId, key: &EncodingKey) -> AppResult<String> {
    let exp = (chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS)).timestamp();
    let claims = Claims { exp, user_id };
    let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, key)?;

    Ok(token)
}

pub fn verify_token(token: &str, key: &DecodingKey) -> AppResult<UserId> {
    let claim = verify_jwt(token, key)?;
    Ok(claim.user_id)
}

pub fn verify_jwt(token: &str, key: &DecodingKey) -> AppResult<Claims> {
    let claims =
        jsonwebtoken::decode::<Claims>(token, key, &Validation::new(Algorithm::HS256))?.claims;
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_carries_the_user_id() {
        let token = generate_jwt(42, &EncodingKey::from_secret(b"secret")).unwrap();
        let user_id = verify_token(&token, &DecodingKey::from_secret(b"secret")).unwrap();
        assert_eq!(user_id, 42);
    }

    #[test]
    fn token_signed_with_another_key_is_rejected() {
        let token = generate_jwt(42, &EncodingKey::from_secret(b"secret")).unwrap();
        assert!(verify_token(&token, &DecodingKey::from_secret(b"other")).is_err());
    }

    #[test]
    fn credentials_require_token_scheme() {
        let ok = JWTToken::decode(&HeaderValue::from_static("Token abc")).unwrap();
        assert_eq!(ok.0, "abc");
        assert!(JWTToken::decode(&HeaderValue::from_static("Bearer abc")).is_none());
        assert!(JWTToken::decode(&HeaderValue::from_static("Token abc def")).is_none());
    }
}
