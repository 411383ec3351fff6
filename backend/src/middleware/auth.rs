use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::{
    error::AppError,
    models::user::User,
    state::AppState,
    types::UserId,
    utils::{
        cookies::{extract_cookie_value, ACCESS_COOKIE_NAME},
        jwt::{verify_access_token, Claims},
    },
};

/// Resolves the caller from a bearer token or the access cookie and makes
/// `Claims` and `User` available as request extensions.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
    let (claims, user) = authenticate(&state, &token).await?;

    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn parse_bearer_token(header: &str) -> Option<&str> {
    let (scheme, rest) = header.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("bearer") {
        let token = rest.trim();
        (!token.is_empty()).then_some(token)
    } else {
        None
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_bearer_token)
        .map(str::to_string);
    from_header.or_else(|| {
        headers
            .get(header::COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| extract_cookie_value(raw, ACCESS_COOKIE_NAME))
            .filter(|token| !token.is_empty())
    })
}

async fn authenticate(state: &AppState, token: &str) -> Result<(Claims, User), AppError> {
    let invalid = || AppError::Unauthorized("Invalid or expired token".to_string());

    let claims = verify_access_token(token, &state.config.jwt_secret).map_err(|_| invalid())?;
    if !state.tokens.is_active(&claims.jti).await? {
        return Err(invalid());
    }

    let user_id: UserId = claims.sub.parse().map_err(|_| invalid())?;
    let user = state.users.find_by_id(user_id).await?.ok_or_else(invalid)?;
    Ok((claims, user))
}
