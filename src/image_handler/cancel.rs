//! # 请求取消令牌
//!
//! 超时方与工作线程之间只竞争一次：工作线程在落盘前 `try_commit`，
//! 超时方调用 `cancel`。两者基于同一个原子状态做 CAS，恰有一方成功：
//! - 取消成功：工作线程在下一个检查点放弃，不会写出任何文件
//! - 提交成功：取消不再生效，超时方需等待落盘完成并如实返回结果

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

const RUNNING: u8 = 0;
const CANCELLED: u8 = 1;
const COMMITTED: u8 = 2;

/// 单次请求的取消令牌，克隆后共享同一状态。
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    state: Arc<AtomicU8>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CANCELLED
    }

    /// 进入落盘阶段；返回 `false` 表示请求已被取消。
    pub fn try_commit(&self) -> bool {
        self.transition(COMMITTED)
    }

    /// 取消请求；返回 `false` 表示工作线程已开始落盘。
    pub fn cancel(&self) -> bool {
        self.transition(CANCELLED)
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(RUNNING, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_before_commit_blocks_commit() {
        let token = CancelToken::new();
        let worker = token.clone();

        assert!(token.cancel());
        assert!(worker.is_cancelled());
        assert!(!worker.try_commit());
    }

    #[test]
    fn commit_before_cancel_wins() {
        let token = CancelToken::new();
        let worker = token.clone();

        assert!(worker.try_commit());
        assert!(!token.cancel());
        assert!(!worker.is_cancelled());
    }
}
