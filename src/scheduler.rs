//! 逐层递进的子域名扫描调度
//!
//! 每一层都是一轮完整的并发解析，本层全部结束后才会生成下一层候选，
//! 且下一层只建立在本层解析成功的域名之上。

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::gen::generate_candidates;
use crate::model::LevelReport;
use crate::pool;
use crate::resolver::HostResolver;

/// 调度状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    LevelRunning(usize),
    LevelComplete(usize),
    Done,
}

/// 一次扫描的结果
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    /// 去重后的子域名，按发现顺序排列
    pub discovered: Vec<String>,
    /// 每层统计
    pub levels: Vec<LevelReport>,
    /// 是否因取消或超时提前结束
    pub cancelled: bool,
}

/// 只增不减的去重集合
#[derive(Debug, Default)]
struct DiscoveredSet {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl DiscoveredSet {
    fn insert(&mut self, domain: &str) -> bool {
        if self.seen.contains(domain) {
            return false;
        }
        self.seen.insert(domain.to_string());
        self.order.push(domain.to_string());
        true
    }

    fn into_vec(self) -> Vec<String> {
        self.order
    }
}

pub struct DepthScheduler<R: ?Sized> {
    resolver: Arc<R>,
    wordlist: Arc<[String]>,
    concurrency: usize,
    max_depth: usize,
    timeout: Duration,
    state: ScanState,
}

impl<R> DepthScheduler<R>
where
    R: HostResolver + ?Sized + 'static,
{
    pub fn new(
        resolver: Arc<R>,
        wordlist: Arc<[String]>,
        concurrency: usize,
        max_depth: usize,
        timeout: Duration,
    ) -> Self {
        DepthScheduler {
            resolver,
            wordlist,
            concurrency: concurrency.max(1),
            max_depth: max_depth.max(1),
            timeout,
            state: ScanState::Idle,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    fn transition(&mut self, next: ScanState) {
        debug!("调度状态 {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// 从根域名开始逐层扫描
    ///
    /// 解析失败不会中断扫描；取消只会让结果不完整，不会报错。
    pub async fn run(&mut self, root: &str, cancel: &CancellationToken) -> Enumeration {
        let mut discovered = DiscoveredSet::default();
        let mut tested: HashSet<String> = HashSet::new();
        let mut levels = Vec::new();
        let mut parents = vec![root.to_string()];
        let mut depth = 1;

        self.transition(ScanState::LevelRunning(depth));
        loop {
            let mut candidates = generate_candidates(&parents[..], &self.wordlist[..], depth);
            let generated = candidates.len();
            candidates.retain(|c| tested.insert(c.domain.clone()));

            info!(
                "第 {} 层: {} 个父域名, {} 个候选",
                depth,
                parents.len(),
                candidates.len()
            );

            let mut survivors = pool::resolve_all(
                Arc::clone(&self.resolver),
                candidates,
                self.concurrency,
                self.timeout,
                cancel,
            )
            .await;
            self.transition(ScanState::LevelComplete(depth));

            // 同层内完成顺序不确定，排序后输出稳定
            survivors.sort_by(|a, b| a.domain.cmp(&b.domain));
            let mut next = Vec::with_capacity(survivors.len());
            for survivor in survivors {
                if discovered.insert(&survivor.domain) {
                    next.push(survivor.domain);
                }
            }

            info!("第 {} 层完成: 发现 {} 个子域名", depth, next.len());
            levels.push(LevelReport {
                depth,
                parents: parents.len(),
                candidates: generated,
                resolved: next.len(),
            });

            if cancel.is_cancelled() || depth >= self.max_depth || next.is_empty() {
                break;
            }

            parents = next;
            depth += 1;
            self.transition(ScanState::LevelRunning(depth));
        }
        self.transition(ScanState::Done);

        Enumeration {
            discovered: discovered.into_vec(),
            levels,
            cancelled: cancel.is_cancelled(),
        }
    }
}
