use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::{
    models::user::User,
    repositories::user as user_repo,
    state::AppState,
    types::UserId,
    utils::{
        cookies::{extract_cookie_value, ACCESS_COOKIE_NAME},
        jwt::{verify_access_token, Claims},
    },
};

/// Verifies the caller's access token and loads the user. Account
/// management lives elsewhere; this service only consumes identities.
pub async fn auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (claims, user) = authenticate_request(&state, request.headers()).await?;
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Auth + require the lecturer role, for token issuance and roster routes.
pub async fn auth_lecturer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (claims, user) = authenticate_request(&state, request.headers()).await?;
    if !user.is_lecturer() {
        return Err(StatusCode::FORBIDDEN);
    }
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Auth + require the student role, for the scan route.
pub async fn auth_student(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (claims, user) = authenticate_request(&state, request.headers()).await?;
    if !user.is_student() {
        return Err(StatusCode::FORBIDDEN);
    }
    request.extensions_mut().insert(claims);
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn authenticate_request(
    state: &AppState,
    headers: &header::HeaderMap,
) -> Result<(Claims, User), StatusCode> {
    let token = extract_token(headers).ok_or(StatusCode::UNAUTHORIZED)?;
    let claims =
        verify_access_token(&token, &state.config.jwt_secret).map_err(|err| {
            tracing::debug!(error = ?err, "Access token rejected");
            StatusCode::UNAUTHORIZED
        })?;

    let user_id: UserId = claims
        .sub
        .parse()
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let user = user_repo::find_by_id(&state.pool, user_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    Ok((claims, user))
}

fn extract_token(headers: &header::HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_bearer_token)
    {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| extract_cookie_value(cookies, ACCESS_COOKIE_NAME))
}

fn parse_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_prefix_is_case_tolerant() {
        assert_eq!(parse_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("Basic abc"), None);
        assert_eq!(parse_bearer_token("Bearer "), None);
    }

    #[test]
    fn falls_back_to_access_cookie() {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "access_token=tok123; theme=dark".parse().unwrap(),
        );
        assert_eq!(extract_token(&headers), Some("tok123".to_string()));
    }

    #[test]
    fn authorization_header_wins_over_cookie() {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer fromheader".parse().unwrap());
        headers.insert(header::COOKIE, "access_token=fromcookie".parse().unwrap());
        assert_eq!(extract_token(&headers), Some("fromheader".to_string()));
    }
}
