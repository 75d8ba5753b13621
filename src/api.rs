use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::deadline::DeadlineController;
use crate::error::EnumError;
use crate::input::{load_wordlist, parse_comma_separated};
use crate::model::{EnumerationType, LevelReport};
use crate::records::{DnsRecordFetcher, DnsRecordsReport};
use crate::resolver::{DnsHostResolver, HostResolver};
use crate::scheduler::DepthScheduler;
use crate::wildcard::WildcardDetector;

/// 字典来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordlistSource {
    /// 直接给出的标签列表
    Inline(Vec<String>),
    /// 每行一个标签的文件
    File(PathBuf),
}

impl WordlistSource {
    /// 由命令行的两个互斥参数构造
    pub fn from_args(inline: Option<&str>, file: Option<PathBuf>) -> Result<Self, EnumError> {
        match (inline, file) {
            (Some(list), None) if !list.is_empty() => {
                Ok(WordlistSource::Inline(parse_comma_separated(list)))
            }
            (None, Some(path)) => Ok(WordlistSource::File(path)),
            _ => Err(EnumError::WordlistSource),
        }
    }

    fn load(&self) -> Result<Vec<String>, EnumError> {
        match self {
            WordlistSource::Inline(words) => Ok(words
                .iter()
                .map(|w| w.trim())
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect()),
            WordlistSource::File(path) => load_wordlist(path),
        }
    }
}

/// 子域名枚举配置
#[derive(Debug, Clone)]
pub struct SubdomainEnumConfig {
    /// 目标根域名
    pub domain: String,
    /// 字典来源
    pub wordlist: Option<WordlistSource>,
    /// 并发查询数
    pub concurrency: usize,
    /// 最大递归层数
    pub max_depth: usize,
    /// 单次查询超时
    pub lookup_timeout: Duration,
    /// 整体时长上限，`None` 为不限
    pub max_duration: Option<Duration>,
    /// DNS服务器列表
    pub resolvers: Vec<String>,
    /// 是否解析DNS记录
    pub resolve_records: bool,
    /// 是否先检测泛解析
    pub detect_wildcard: bool,
}

impl Default for SubdomainEnumConfig {
    fn default() -> Self {
        SubdomainEnumConfig {
            domain: String::new(),
            wordlist: None,
            concurrency: 10,
            max_depth: 3,
            lookup_timeout: Duration::from_secs(30),
            max_duration: Some(Duration::from_secs(10 * 60)),
            resolvers: Vec::new(),
            resolve_records: false,
            detect_wildcard: false,
        }
    }
}

impl SubdomainEnumConfig {
    /// 分钟数转时长上限，0 表示不限
    pub fn minutes(minutes: u64) -> Option<Duration> {
        if minutes == 0 {
            None
        } else {
            Some(Duration::from_secs(minutes.saturating_mul(60)))
        }
    }

    /// 校验配置并加载字典
    pub fn into_session(self) -> Result<Session, EnumError> {
        let domain = self.domain.trim().trim_end_matches('.').to_lowercase();
        if domain.is_empty() {
            return Err(EnumError::EmptyDomain);
        }
        if self.concurrency == 0 || self.concurrency > Semaphore::MAX_PERMITS {
            return Err(EnumError::InvalidConcurrency(self.concurrency));
        }
        if self.max_depth == 0 {
            return Err(EnumError::InvalidDepth(self.max_depth));
        }

        let wordlist = self.wordlist.as_ref().ok_or(EnumError::WordlistSource)?.load()?;
        if wordlist.is_empty() {
            return Err(EnumError::EmptyWordlist);
        }

        Ok(Session {
            domain,
            wordlist: wordlist.into(),
            concurrency: self.concurrency,
            max_depth: self.max_depth,
            lookup_timeout: self.lookup_timeout,
            max_duration: self.max_duration,
            resolvers: self.resolvers,
            resolve_records: self.resolve_records,
            detect_wildcard: self.detect_wildcard,
        })
    }
}

/// 校验后的不可变运行参数
#[derive(Debug, Clone)]
pub struct Session {
    pub domain: String,
    pub wordlist: Arc<[String]>,
    pub concurrency: usize,
    pub max_depth: usize,
    pub lookup_timeout: Duration,
    pub max_duration: Option<Duration>,
    pub resolvers: Vec<String>,
    pub resolve_records: bool,
    pub detect_wildcard: bool,
}

/// 枚举报告
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubenumReport {
    pub domain: String,
    pub enumeration_type: EnumerationType,
    pub subdomains: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<DnsRecordsReport>,
    #[serde(default)]
    pub levels: Vec<LevelReport>,
    pub cancelled: bool,
    pub errors: Vec<String>,
}

/// 子域名枚举引擎
pub struct SubdomainEnumEngine {
    session: Session,
    resolver: Arc<dyn HostResolver>,
}

impl SubdomainEnumEngine {
    /// 使用 trust-dns 解析器创建引擎
    pub fn new(config: SubdomainEnumConfig) -> Result<Self, EnumError> {
        let session = config.into_session()?;
        let resolver = DnsHostResolver::new(&session.resolvers, session.lookup_timeout)?;
        Ok(SubdomainEnumEngine {
            session,
            resolver: Arc::new(resolver),
        })
    }

    /// 使用自定义解析器创建引擎
    pub fn with_resolver(
        config: SubdomainEnumConfig,
        resolver: Arc<dyn HostResolver>,
    ) -> Result<Self, EnumError> {
        Ok(SubdomainEnumEngine {
            session: config.into_session()?,
            resolver,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// 执行枚举
    ///
    /// `cancel` 被取消或总时长耗尽时返回已发现的部分结果。
    pub async fn run(&self, cancel: Option<&CancellationToken>) -> SubenumReport {
        let session = &self.session;
        let mut report = SubenumReport {
            domain: session.domain.clone(),
            enumeration_type: EnumerationType::Brute,
            ..Default::default()
        };

        info!(
            "开始枚举 {}: 字典 {} 个, 并发 {}, 最大层数 {}",
            session.domain,
            session.wordlist.len(),
            session.concurrency,
            session.max_depth
        );

        // 控制器存活到返回为止，泛解析检测与记录查询同样受总时长约束
        let controller = DeadlineController::new(cancel, session.max_duration);
        let token = controller.token();

        if session.detect_wildcard {
            match WildcardDetector::new(&session.resolvers, session.lookup_timeout) {
                Ok(detector) => {
                    if detector.detect_wildcard(&session.domain, token).await {
                        warn!("检测到泛解析域名: {}", session.domain);
                        report
                            .errors
                            .push(format!("wildcard DNS detected on {}", session.domain));
                    }
                }
                Err(e) => report.errors.push(e.to_string()),
            }
        }

        let mut scheduler = DepthScheduler::new(
            Arc::clone(&self.resolver),
            Arc::clone(&session.wordlist),
            session.concurrency,
            session.max_depth,
            session.lookup_timeout,
        );
        let enumeration = scheduler.run(&session.domain, token).await;
        info!("枚举结束: 共发现 {} 个子域名", enumeration.discovered.len());

        report.subdomains = enumeration.discovered;
        report.levels = enumeration.levels;

        if session.resolve_records && !report.subdomains.is_empty() && !token.is_cancelled() {
            match DnsRecordFetcher::new(&session.resolvers) {
                Ok(fetcher) => {
                    report.records = fetcher
                        .fetch_many(report.subdomains.clone(), session.concurrency, token)
                        .await;
                }
                Err(e) => report.errors.push(e.to_string()),
            }
        }

        report.cancelled = controller.is_cancelled();
        if report.cancelled {
            warn!("枚举被中止，返回部分结果");
        }

        report
    }
}

/// 便捷的枚举函数
///
/// 配置错误不会返回 `Err`，而是写入报告的 `errors` 并跳过扫描。
pub async fn brute_force_subdomains(
    config: SubdomainEnumConfig,
    cancel: Option<&CancellationToken>,
) -> SubenumReport {
    let domain = config.domain.clone();
    match SubdomainEnumEngine::new(config) {
        Ok(engine) => engine.run(cancel).await,
        Err(e) => SubenumReport {
            domain,
            enumeration_type: EnumerationType::Brute,
            errors: vec![e.to_string()],
            ..Default::default()
        },
    }
}
