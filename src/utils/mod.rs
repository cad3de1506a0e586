use axum::Json;
use bcrypt::verify;
use serde::Serialize;
use uuid::Uuid;

use crate::result::ApiResult;

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// 生成不透明的会话键（32 位十六进制）
pub fn generate_session_key() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn success_to_api_response<T: Serialize>(data: T) -> Json<ApiResult<T>> {
    Json(ApiResult::success(data))
}

pub fn error_to_api_response<T: Serialize>(code: i32, msg: &str) -> Json<ApiResult<T>> {
    Json(ApiResult::error(code, msg))
}

pub mod error_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const AUTH_FAILED: i32 = 1002;
    pub const NOT_FOUND: i32 = 1004;
    pub const INTERNAL_ERROR: i32 = 5000;
}
