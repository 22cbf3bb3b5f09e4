use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};

use pingdeck_db::models::UserRow;
use pingdeck_types::api::SessionClaims;

use crate::error::{ApiError, blocking};
use crate::state::AppState;

/// Authenticated principal, attached to the request by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRow);

/// Dashboard auth: the bearer token is either a user's API key or an
/// identity-provider session token. API key wins — it is an exact unique
/// lookup; everything else is handed to the JWT path.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(unauthorized)?;

    let db = state.clone();
    let key = token.clone();
    if let Some(user) = blocking(move || db.db.get_user_by_api_key(&key)).await? {
        req.extensions_mut().insert(CurrentUser(user));
        return Ok(next.run(req).await);
    }

    let claims = decode_session(&token, &state.session_secret)?;

    let db = state.clone();
    let user = blocking(move || db.db.get_user_by_external_id(&claims.sub))
        .await?
        .ok_or_else(unauthorized)?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Verify an identity-provider session token.
pub fn decode_session(token: &str, secret: &str) -> Result<SessionClaims, ApiError> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| unauthorized())
}

fn unauthorized() -> ApiError {
    ApiError::Unauthenticated("Unauthorized".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, exp: usize) -> String {
        let claims = SessionClaims {
            sub: "ext-123".into(),
            email: "user@example.com".into(),
            exp,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn session_decode_round_trip() {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
        let claims = decode_session(&token("secret", exp), "secret").unwrap();
        assert_eq!(claims.sub, "ext-123");
        assert_eq!(claims.email, "user@example.com");
    }

    #[test]
    fn wrong_secret_rejected() {
        let exp = (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize;
        assert!(decode_session(&token("secret", exp), "other").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let exp = (chrono::Utc::now() - chrono::Duration::hours(1)).timestamp() as usize;
        assert!(decode_session(&token("secret", exp), "secret").is_err());
    }
}
