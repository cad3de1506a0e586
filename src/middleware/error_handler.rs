use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{error, warn};

use super::session::clear_session_cookie;
use crate::{AppState, error::RecordNotFound};

/// 记录服务端错误响应
pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;

    if !response.status().is_server_error() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, 1024).await {
        Ok(b) => b,
        Err(e) => {
            error!(%method, %uri, status = %parts.status, "Failed to read error response body: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    error!(
        %method,
        %uri,
        status = %parts.status,
        body = %String::from_utf8_lossy(&bytes),
        "Server error occurred"
    );

    parts.headers.remove(axum::http::header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}

/// 请求过程中出现“记录不存在”时，注销当前会话并跳转登录页
pub async fn recover_stale_session(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request<Body>,
    next: Next,
) -> Response {
    let uri = req.uri().clone();
    let response = next.run(req).await;

    if response.extensions().get::<RecordNotFound>().is_none() {
        return response;
    }

    warn!(%uri, "Record not found during request, forcing logout");
    if let Some(session_key) = jar.get(&state.config.session_cookie).map(|c| c.value().to_owned()) {
        if let Err(e) = state.sessions.terminate(&session_key).await {
            warn!(error = %e, "Failed to terminate stale session");
        }
        state.rooms.disconnect_session(&session_key);
    }

    let jar = clear_session_cookie(jar, &state.config);
    (jar, Redirect::to(&state.config.login_path)).into_response()
}
