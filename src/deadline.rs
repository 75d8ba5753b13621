//! 取消与总时长控制
//!
//! 每次枚举派生一个独立的 [`CancellationToken`]：调用方主动取消或总时长耗尽时触发。
//! 计时任务随控制器一起销毁，提前结束的扫描不会留下后台任务。

use std::time::Duration;

use log::warn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct DeadlineController {
    token: CancellationToken,
    timer: Option<JoinHandle<()>>,
}

impl DeadlineController {
    /// 创建控制器
    ///
    /// `parent` 被取消时本次扫描一并取消，反之不影响 `parent`。
    /// `limit` 为 `None` 时不限时长。必须在 tokio 运行时内调用。
    pub fn new(parent: Option<&CancellationToken>, limit: Option<Duration>) -> Self {
        let token = match parent {
            Some(p) => p.child_token(),
            None => CancellationToken::new(),
        };

        let timer = limit.map(|limit| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        warn!("已达到最大枚举时长 {:?}，停止扫描", limit);
                        token.cancel();
                    }
                }
            })
        });

        DeadlineController { token, timer }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// 主动中止，可重复调用
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for DeadlineController {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
