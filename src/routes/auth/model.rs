use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: i64,
    pub username: String,
    /// 本次登录是否顶替了其他设备上的会话
    pub replaced_session: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginEntryResponse {
    pub login_url: String,
    pub method: &'static str,
}
