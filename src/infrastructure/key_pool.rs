//! API 密钥池 - 基础设施层
//!
//! 持有进程内共享的密钥列表和当前游标，只暴露"取当前密钥"和"轮换"两个能力

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ConfigError;

/// 当前使用的密钥
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credential<'a> {
    /// 密钥在池中的位置
    pub slot: usize,
    pub key: &'a str,
}

/// API 密钥池
///
/// 职责：
/// - 持有启动时加载的全部密钥
/// - 维护当前游标，游标始终落在 `[0, len - 1]`
/// - 轮换用比较交换完成，同一个失败的密钥只会被换走一次
/// - 不关心请求内容和重试流程
pub struct KeyPool {
    keys: Vec<String>,
    active: AtomicUsize,
}

impl KeyPool {
    /// 创建密钥池，空白密钥会被丢弃
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        let keys = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            keys,
            active: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// 获取当前密钥
    pub fn current_credential(&self) -> Result<Credential<'_>, ConfigError> {
        if self.keys.is_empty() {
            return Err(ConfigError::NoCredentials);
        }
        let slot = self.active.load(Ordering::SeqCst) % self.keys.len();
        Ok(Credential {
            slot,
            key: &self.keys[slot],
        })
    }

    /// 从失败的密钥轮换到下一个（循环），返回当前位置
    ///
    /// 只有游标仍停在 `failed_slot` 时才前进；其他会话已经换走时保持不动。
    pub fn rotate_from(&self, failed_slot: usize) -> Result<usize, ConfigError> {
        let len = self.keys.len();
        if len == 0 {
            return Err(ConfigError::NoCredentials);
        }
        let failed = failed_slot % len;
        let next = (failed + 1) % len;
        match self
            .active
            .compare_exchange(failed, next, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => Ok(next),
            Err(current) => Ok(current % len),
        }
    }

    /// 当前位置（只读，用于日志和诊断）
    pub fn active_slot(&self) -> Option<usize> {
        if self.keys.is_empty() {
            None
        } else {
            Some(self.active.load(Ordering::SeqCst) % self.keys.len())
        }
    }
}

impl fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPool")
            .field("keys", &self.keys.len())
            .field("active", &self.active_slot())
            .finish()
    }
}

/// 遮蔽密钥，只保留最后 4 个字符
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
