use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{headers::Authorization, TypedHeader};

use crate::{
    db::{auth_user, UserAuth, UserId},
    error::AppError,
    utils::{jwt::JWTToken, permissions},
    AppState,
};

/// The authenticated user; rejects the request with 401 without a valid token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserAuth);

/// An authenticated admin; 401 without a token, 403 for other roles. Runs
/// before the body is read.
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserAuth);

/// The user behind the token if one was sent. An invalid token is still a 401.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<UserAuth>);

impl MaybeUser {
    pub fn id(&self) -> Option<UserId> {
        self.0.as_ref().map(|user| user.id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token =
            match TypedHeader::<Authorization<JWTToken>>::from_request_parts(parts, state).await {
                Ok(TypedHeader(Authorization(token))) => token,
                Err(rejection) if rejection.is_missing() => return Ok(MaybeUser(None)),
                Err(_) => return Err(AppError::Unauthorized),
            };

        let user = auth_user(&state.pool, &token.0, &state.decoding_key).await?;
        Ok(MaybeUser(Some(user)))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        user.map(AuthUser).ok_or(AppError::Unauthorized)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        permissions::require_admin(&user)?;
        Ok(AdminUser(user))
    }
}
