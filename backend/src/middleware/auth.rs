//! Authentication middleware
//!
//! Bearer JWT validation and the admin guard used by delete endpoints

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

/// Profile claim carried by administrators
pub const ADMIN_PROFILE: &str = "ADM";

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub profile: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.profile == ADMIN_PROFILE
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Acting user id
    pub sub: String,
    pub nome: String,
    pub perfil: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        Some(token) => token.to_string(),
        None => {
            return AppError::Unauthorized {
                message: "Missing or invalid Authorization header".to_string(),
                message_pt: "Token não informado".to_string(),
            }
            .into_response()
        }
    };

    match authenticate(&token, &state.config.jwt.secret) {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Decode a bearer token into the acting user
pub fn authenticate(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;

    Ok(AuthUser {
        user_id,
        name: claims.nome,
        profile: claims.perfil,
    })
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Authentication required".to_string(),
                message_pt: "Autenticação necessária".to_string(),
            })
    }
}

/// Admin guard for use in handlers
pub fn require_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        tracing::warn!(user_id = %user.user_id, "Admin-only action refused");
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn token(sub: &str, perfil: &str, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            nome: "Ana".to_string(),
            perfil: perfil.to_string(),
            exp: now + exp_offset,
            iat: now,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_valid_token_yields_user() {
        let id = Uuid::new_v4();
        let user = authenticate(&token(&id.to_string(), "ADM", 3600), SECRET).unwrap();
        assert_eq!(user.user_id, id);
        assert!(user.is_admin());
        assert!(require_admin(&user).is_ok());
    }

    #[test]
    fn test_non_admin_refused() {
        let user = authenticate(&token(&Uuid::new_v4().to_string(), "OPERADOR", 3600), SECRET)
            .unwrap();
        assert!(matches!(
            require_admin(&user),
            Err(AppError::InsufficientPermissions)
        ));
    }

    #[test]
    fn test_expired_and_tampered_tokens() {
        let expired = token(&Uuid::new_v4().to_string(), "ADM", -3600);
        assert!(matches!(
            authenticate(&expired, SECRET),
            Err(AppError::TokenExpired)
        ));

        let valid = token(&Uuid::new_v4().to_string(), "ADM", 3600);
        assert!(matches!(
            authenticate(&valid, "other-secret"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_subject_must_be_uuid() {
        assert!(matches!(
            authenticate(&token("not-a-uuid", "ADM", 3600), SECRET),
            Err(AppError::InvalidToken)
        ));
    }
}
