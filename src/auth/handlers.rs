use std::future::Future;
use std::pin::Pin;

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{IssuedSession, NewUser, Principal};
use crate::error::{AppError, AuthError};
use crate::AppState;

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Principal,
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_in: i64,
    pub refresh_expires_in: i64,
}

impl From<&IssuedSession> for SessionResponse {
    fn from(issued: &IssuedSession) -> Self {
        Self {
            user: issued.principal.clone(),
            access_token: issued.tokens.access_token.clone(),
            refresh_token: issued.tokens.refresh_token.clone(),
            access_expires_in: issued.access_ttl.num_seconds(),
            refresh_expires_in: issued.refresh_ttl.num_seconds(),
        }
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/refresh", web::post().to(refresh))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me)),
    );
}

pub async fn register(
    req: web::Json<NewUser>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for email: {}", req.email);
    let principal = state.auth_service.register(&req).await?;
    Ok(HttpResponse::Created().json(principal))
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for email: {}", req.email);
    let issued = state.auth_service.login(&req.email, &req.password).await?;
    Ok(session_response(&issued))
}

pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = refresh_token_from(&req, body)?;
    let issued = state.auth_service.refresh(&token).await?;
    Ok(session_response(&issued))
}

pub async fn logout(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = refresh_token_from(&req, body)?;
    state.auth_service.logout(&token).await?;

    Ok(HttpResponse::Ok()
        .cookie(removal_cookie(ACCESS_TOKEN_COOKIE))
        .cookie(removal_cookie(REFRESH_TOKEN_COOKIE))
        .json(serde_json::json!({
            "message": "Successfully logged out"
        })))
}

pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(user.into_inner())
}

/// Route guard: resolves the request's access token to a live principal.
///
/// The token is taken from the `Authorization: Bearer` header, falling back
/// to the access token cookie. Any handler taking this extractor rejects
/// requests without a valid session with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Principal);

impl AuthenticatedUser {
    pub fn into_inner(self) -> Principal {
        self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let state = req.app_data::<web::Data<AppState>>().cloned().ok_or_else(|| {
                AppError::InternalError("application state is not configured".into())
            })?;
            let token = access_token(&req).ok_or(AuthError::MissingToken)?;

            let principal = state.auth_service.authenticate(&token).await.map_err(|e| {
                debug!("Rejected request to {}: {}", req.path(), e);
                e
            })?;
            Ok(AuthenticatedUser(principal))
        })
    }
}

fn access_token(req: &HttpRequest) -> Option<String> {
    bearer_token(req).or_else(|| req.cookie(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()))
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn refresh_token_from(
    req: &HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
) -> Result<String, AppError> {
    body.and_then(|b| b.into_inner().refresh_token)
        .filter(|t| !t.is_empty())
        .or_else(|| req.cookie(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_string()))
        .ok_or_else(|| AppError::ValidationError("refresh token not provided".into()))
}

fn session_response(issued: &IssuedSession) -> HttpResponse {
    HttpResponse::Ok()
        .cookie(token_cookie(
            ACCESS_TOKEN_COOKIE,
            &issued.tokens.access_token,
            issued.access_ttl.num_seconds(),
        ))
        .cookie(token_cookie(
            REFRESH_TOKEN_COOKIE,
            &issued.tokens.refresh_token,
            issued.refresh_ttl.num_seconds(),
        ))
        .json(SessionResponse::from(issued))
}

fn token_cookie(name: &'static str, value: &str, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build(name, value.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_secs))
        .finish()
}

fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build(name, "").path("/").finish();
    cookie.make_removal();
    cookie
}
