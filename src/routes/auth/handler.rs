use axum::{
    extract::{Extension, Json, State},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};

use super::model::{LoginEntryResponse, LoginRequest, LoginResponse};
use crate::{
    AppState,
    error::AppError,
    middleware::{CurrentSession, clear_session_cookie, session_cookie},
    utils::success_to_api_response,
};

/// GET /login/ 登录入口
#[axum::debug_handler]
pub async fn login_entry(State(state): State<AppState>) -> impl IntoResponse {
    success_to_api_response(LoginEntryResponse {
        login_url: state.config.login_path.clone(),
        method: "POST",
    })
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("用户名和密码不能为空".to_string()));
    }

    let user = state
        .users
        .find_by_username(username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    match user.verify_login(&req.password).await {
        Ok(true) => {}
        Ok(false) => return Err(AppError::InvalidCredentials),
        Err(e) => {
            warn!(user_id = user.id, error = %e, "Stored password hash is unusable");
            return Err(AppError::InvalidCredentials);
        }
    }

    let (session, outcome) = state.sessions.login(user.id).await?;

    if let Some(evicted) = &outcome.evicted {
        let closed = state.rooms.disconnect_session(evicted);
        info!(user_id = user.id, closed, "Login replaced an existing session");
    } else {
        info!(user_id = user.id, "User logged in");
    }

    let jar = jar.add(session_cookie(&state.config, session.session_key));
    Ok((
        jar,
        success_to_api_response(LoginResponse {
            user_id: user.id,
            username: user.username,
            replaced_session: outcome.evicted.is_some(),
        }),
    ))
}

#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.logout(&current.session).await?;
    state.rooms.disconnect_session(&current.session.session_key);
    info!(user_id = current.user.id, "User logged out");

    let jar = clear_session_cookie(jar, &state.config);
    Ok((jar, Redirect::to(&state.config.login_path)))
}

/// GET /api/me
#[axum::debug_handler]
pub async fn me(Extension(current): Extension<CurrentSession>) -> impl IntoResponse {
    success_to_api_response(current.user)
}
