use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};

use common::types::Envelope;
use models::user::User;
use service::auth::{LoginInput, RegisterInput};

use super::blocking;
use crate::errors::ApiError;
use crate::state::AppState;

pub const AUTH_COOKIE: &str = "auth_token";

/// The signed-in account. Extracting it authenticates the request.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }
        let user = authenticate(state, &parts.headers).await?;
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Bearer token from `Authorization`, falling back to the `auth_token` cookie.
fn token_from(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(h) = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return match h.strip_prefix("Bearer ") {
            Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
            _ => {
                tracing::warn!("invalid Authorization format (expect Bearer)");
                Err(ApiError::Unauthenticated)
            }
        };
    }
    CookieJar::from_headers(headers)
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthenticated)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, ApiError> {
    let token = token_from(headers)?;
    let auth = state.auth.clone();
    let user = blocking(move || Ok(auth.authenticate(&token)?)).await?;
    Ok(CurrentUser(user))
}

/// Route layer for `/admin`: only super admins get through.
pub async fn require_super_admin(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let user = authenticate(&state, req.headers()).await?;
    if !user.0.is_super_admin() {
        tracing::warn!(user_id = %user.0.id, path = %req.uri().path(), "admin access denied");
        return Err(ApiError::Forbidden);
    }
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<Envelope<Value>>), ApiError> {
    let auth = state.auth.clone();
    let user = blocking(move || Ok(auth.register(input)?)).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(json!({"user": user})))))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(input): Json<LoginInput>,
) -> Result<(CookieJar, Json<Envelope<Value>>), ApiError> {
    let auth = state.auth.clone();
    let session = blocking(move || Ok(auth.login(input)?)).await?;

    let mut cookie = Cookie::new(AUTH_COOKIE, session.token.clone());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(false);
    cookie.set_same_site(SameSite::Lax);
    let jar = jar.add(cookie);
    Ok((jar, Json(Envelope::ok(json!({"user": session.user, "token": session.token})))))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.remove(Cookie::from(AUTH_COOKIE));
    (jar, StatusCode::NO_CONTENT)
}
