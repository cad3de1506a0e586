use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::session::SessionError;
use crate::snapshot::StoreError;
use crate::utils::{error_codes, error_to_api_response};

#[derive(Debug)]
pub enum AppError {
    InvalidCredentials,
    /// 请求过程中找不到关联记录，由拦截器统一注销并跳转登录
    RecordNotFound,
    BadRequest(String),
    InternalServerError,
}

/// 标记响应来自 `AppError::RecordNotFound`
#[derive(Debug, Clone, Copy)]
pub struct RecordNotFound;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error_message) = match &self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                error_codes::AUTH_FAILED,
                "用户名或密码错误".to_string(),
            ),
            AppError::RecordNotFound => (
                StatusCode::NOT_FOUND,
                error_codes::NOT_FOUND,
                "记录不存在".to_string(),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                error_codes::VALIDATION_ERROR,
                msg.clone(),
            ),
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_codes::INTERNAL_ERROR,
                "内部服务器错误".to_string(),
            ),
        };

        let mut response =
            (status, error_to_api_response::<()>(code, &error_message)).into_response();
        if matches!(self, AppError::RecordNotFound) {
            response.extensions_mut().insert(RecordNotFound);
        }
        response
    }
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        tracing::error!("Session error: {}", e);
        AppError::InternalServerError
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        tracing::error!("Snapshot store error: {}", e);
        AppError::InternalServerError
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::RecordNotFound,
            other => {
                tracing::error!("Database error: {}", other);
                AppError::InternalServerError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_is_tagged() {
        let response = AppError::RecordNotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<RecordNotFound>().is_some());
    }

    #[test]
    fn other_errors_are_not_tagged() {
        let response = AppError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.extensions().get::<RecordNotFound>().is_none());
    }

    #[test]
    fn missing_rows_map_to_record_not_found() {
        assert!(matches!(
            AppError::from(sqlx::Error::RowNotFound),
            AppError::RecordNotFound
        ));
    }
}
