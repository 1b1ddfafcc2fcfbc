use crate::utils::auth::{Claims, validate_jwt};
use crate::{AppState, entities::prelude::Users};
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use sea_orm::EntityTrait;
use serde::Deserialize;

#[derive(Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

fn bearer_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let auth_header = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string());

    if auth_header.is_some() {
        return auth_header;
    }

    // Try query parameter
    let query = uri.query().unwrap_or_default();
    serde_urlencoded::from_str::<AuthQuery>(query)
        .ok()
        .and_then(|q| q.token)
}

/// Resolve the caller from a bearer token (header or `?token=`). Tokens for
/// deleted accounts are rejected.
pub async fn authenticate(
    state: &AppState,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<Claims, StatusCode> {
    let token = bearer_token(headers, uri).ok_or(StatusCode::UNAUTHORIZED)?;
    let claims =
        validate_jwt(&token, &state.config.jwt_secret).map_err(|_| StatusCode::UNAUTHORIZED)?;

    let user_exists = Users::find_by_id(claims.sub.clone())
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .is_some();

    if !user_exists {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(claims)
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = authenticate(&state, req.headers(), req.uri()).await?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer abc "));
        let uri: Uri = "/api/videos?token=xyz".parse().unwrap();

        assert_eq!(bearer_token(&headers, &uri).as_deref(), Some("abc"));
    }

    #[test]
    fn test_query_token_fallback() {
        let uri: Uri = "/api/videos?token=xyz".parse().unwrap();
        assert_eq!(bearer_token(&HeaderMap::new(), &uri).as_deref(), Some("xyz"));

        let uri: Uri = "/api/videos".parse().unwrap();
        assert_eq!(bearer_token(&HeaderMap::new(), &uri), None);
    }

    #[test]
    fn test_non_bearer_scheme_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Basic dXNlcg=="));
        let uri: Uri = "/".parse().unwrap();

        assert_eq!(bearer_token(&headers, &uri), None);
    }
}
