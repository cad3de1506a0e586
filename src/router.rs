use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{log_errors, recover_stale_session, require_session},
    routes, ws,
};

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new().route(
        "/login/",
        get(routes::auth::login_entry).post(routes::auth::login),
    );

    // 需要有效会话的路由
    let protected_routes = Router::new()
        .route("/logout/", post(routes::auth::logout))
        .route("/api/me", get(routes::auth::me))
        .route("/api/snapshot", get(routes::snapshot::current_snapshot))
        .route("/ws/gps/", get(ws::gps_socket))
        .layer(from_fn_with_state(state.clone(), require_session));

    // “记录不存在”拦截器挂在最外层，覆盖整个请求流程
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(from_fn_with_state(state.clone(), recover_stale_session))
        .layer(from_fn(log_errors))
        .with_state(state)
}
