/// 会话记录缓存键前缀
pub const SESSION_PREFIX: &str = "session:";

/// 生成会话记录缓存键
pub fn session_key(session_key: &str) -> String {
    format!("{}{}", SESSION_PREFIX, session_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_keys_are_prefixed() {
        assert_eq!(session_key("abc123"), "session:abc123");
    }
}
