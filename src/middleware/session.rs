use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;

use crate::{AppState, cache::CachedSession, config::Config, database::User, error::AppError};

/// 已通过认证的请求上下文
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub session: CachedSession,
    pub user: User,
}

pub fn session_cookie(config: &Config, session_key: String) -> Cookie<'static> {
    Cookie::build((config.session_cookie.clone(), session_key))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn clear_session_cookie(jar: CookieJar, config: &Config) -> CookieJar {
    jar.remove(Cookie::build(config.session_cookie.clone()).path("/"))
}

/// 解析会话 Cookie；会话不存在或已被顶替时跳转登录页
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(session_key) = jar
        .get(&state.config.session_cookie)
        .map(|c| c.value().to_owned())
    else {
        return Ok(Redirect::to(&state.config.login_path).into_response());
    };

    let Some(session) = state.sessions.resolve(&session_key).await? else {
        debug!("Session no longer resolves, redirecting to login");
        let jar = clear_session_cookie(jar, &state.config);
        return Ok((jar, Redirect::to(&state.config.login_path)).into_response());
    };

    // 会话存在但用户记录缺失，交给拦截器统一处理
    let user = state
        .users
        .find_by_id(session.user_id)
        .await?
        .ok_or(AppError::RecordNotFound)?;

    if !user.is_active {
        state.sessions.terminate(&session_key).await?;
        let jar = clear_session_cookie(jar, &state.config);
        return Ok((jar, Redirect::to(&state.config.login_path)).into_response());
    }

    req.extensions_mut().insert(CurrentSession { session, user });
    Ok(next.run(req).await)
}
