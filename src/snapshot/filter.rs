use std::collections::HashSet;

/// 快照键过滤策略：只保留纯数字键（设备标识），并排除保留键
#[derive(Debug, Clone, Default)]
pub struct KeyFilter {
    denylist: HashSet<String>,
}

impl KeyFilter {
    pub fn new<I, S>(denied: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            denylist: denied.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_denied(&self, key: &str) -> bool {
        self.denylist.contains(key)
    }

    pub fn allows(&self, key: &str) -> bool {
        is_device_key(key) && !self.is_denied(key)
    }
}

fn is_device_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}
