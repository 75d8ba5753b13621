use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::model::Candidate;
use crate::resolver::{resolve, HostResolver};

/// 并发解析一批候选域名，返回解析成功的子集
///
/// 同时在途的查询不超过 `concurrency` 个。每次派发前检查取消信号，
/// 取消后不再派发新查询，已派发的查询会尽快退出。函数返回时不残留任何任务。
pub async fn resolve_all<R>(
    resolver: Arc<R>,
    candidates: Vec<Candidate>,
    concurrency: usize,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Vec<Candidate>
where
    R: HostResolver + ?Sized + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.clamp(1, Semaphore::MAX_PERMITS)));
    let mut tasks: JoinSet<Option<Candidate>> = JoinSet::new();
    let mut resolved = Vec::new();

    for candidate in candidates {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };
        if cancel.is_cancelled() {
            break;
        }

        // 顺手回收已完成的任务，避免结果堆积
        while let Some(done) = tasks.try_join_next() {
            collect(done, &mut resolved);
        }

        let resolver = Arc::clone(&resolver);
        let cancel = cancel.clone();
        tasks.spawn(async move {
            let _permit = permit;
            if resolve(&*resolver, &candidate.domain, timeout, &cancel).await {
                Some(candidate)
            } else {
                None
            }
        });
    }

    while let Some(done) = tasks.join_next().await {
        collect(done, &mut resolved);
    }

    resolved
}

fn collect(done: Result<Option<Candidate>, JoinError>, resolved: &mut Vec<Candidate>) {
    match done {
        Ok(Some(candidate)) => {
            debug!("发现子域名: {} (层级 {})", candidate.domain, candidate.depth);
            resolved.push(candidate);
        }
        Ok(None) => {}
        Err(e) => warn!("解析任务异常退出: {}", e),
    }
}
