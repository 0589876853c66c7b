//! HTTP handlers for the user-facing API: registration, login, token
//! refresh/logout, and expression submission/lookup.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use distcalc_shared::auth::{hash_password, verify_password};
use distcalc_shared::domain::{Expression, User};
use distcalc_shared::errors::{AuthError, SchedulerError};
use distcalc_shared::store::UserStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bootstrap::AppState;
use crate::http::error::ApiError;
use crate::http::extractors::AuthUser;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    if state.users.get_by_username(&body.login).await.is_ok() {
        return Err(ApiError::from(AuthError::UsernameTaken));
    }

    let hashed_password = hash_password(&body.password).map_err(ApiError::from)?;
    state
        .users
        .insert(User {
            id: Uuid::now_v7().to_string(),
            username: body.login,
            hashed_password,
        })
        .await
        .map_err(SchedulerError::from)?;

    Ok(StatusCode::OK)
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<Credentials>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let user = state
        .users
        .get_by_username(&body.login)
        .await
        .map_err(|_| ApiError::from(AuthError::InvalidCredentials))?;

    let ok = verify_password(&body.password, &user.hashed_password).map_err(ApiError::from)?;
    if !ok {
        return Err(ApiError::from(AuthError::InvalidCredentials));
    }

    let pair = state.authenticator.issue_tokens(&user.id).map_err(ApiError::from)?;
    Ok(Json(TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Redeems a refresh token for a new access/refresh pair, revoking the
/// redeemed token's `jti` so it cannot be replayed.
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let claims = state
        .authenticator
        .verify_refresh(&body.refresh_token)
        .map_err(ApiError::from)?;
    let jti = claims.jti.as_deref().ok_or(ApiError::from(AuthError::InvalidToken))?;

    if state.revocations.is_revoked(jti).await {
        return Err(ApiError::from(AuthError::RevokedToken));
    }
    state.revocations.revoke(jti).await;

    let pair = state.authenticator.issue_tokens(&claims.sub).map_err(ApiError::from)?;
    Ok(Json(TokenPairResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// Revokes a refresh token outright, ending the session it belongs to.
pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<StatusCode, ApiError> {
    let claims = state
        .authenticator
        .verify_refresh(&body.refresh_token)
        .map_err(ApiError::from)?;
    if let Some(jti) = claims.jti.as_deref() {
        state.revocations.revoke(jti).await;
    }
    Ok(StatusCode::OK)
}

#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    pub expression: String,
}

#[derive(Debug, Serialize)]
pub struct CalculateResponse {
    pub id: String,
}

pub async fn calculate(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Json(body): Json<CalculateRequest>,
) -> Result<(StatusCode, Json<CalculateResponse>), ApiError> {
    let id = state.scheduler.submit(&body.expression, &owner).await?;
    Ok((StatusCode::CREATED, Json(CalculateResponse { id })))
}

#[derive(Debug, Serialize)]
pub struct ExpressionView {
    pub id: String,
    pub status: distcalc_shared::domain::ExpressionStatus,
    pub result: f64,
}

impl From<Expression> for ExpressionView {
    fn from(e: Expression) -> Self {
        Self {
            id: e.id,
            status: e.status,
            result: e.result,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListExpressionsResponse {
    pub expressions: Vec<ExpressionView>,
}

const DEFAULT_LIST_LIMIT: usize = 50;

pub async fn list_expressions(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListExpressionsResponse>, ApiError> {
    let expressions = state
        .scheduler
        .list_expressions(&owner, query.cursor.as_deref(), query.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?
        .into_iter()
        .map(ExpressionView::from)
        .collect();

    Ok(Json(ListExpressionsResponse { expressions }))
}

#[derive(Debug, Serialize)]
pub struct GetExpressionResponse {
    pub expression: ExpressionView,
}

pub async fn get_expression(
    State(state): State<AppState>,
    AuthUser(owner): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<GetExpressionResponse>, ApiError> {
    if Uuid::parse_str(&id).is_err() {
        return Err(ApiError::from(SchedulerError::BadRequest(
            "malformed expression id".to_string(),
        )));
    }

    let expression = state.scheduler.fetch_expression(&id, &owner).await?;
    Ok(Json(GetExpressionResponse {
        expression: expression.into(),
    }))
}
