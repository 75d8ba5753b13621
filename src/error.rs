use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// 枚举启动阶段的致命错误
///
/// 单个候选域名解析失败不属于错误，只有配置问题会走到这里。
#[derive(Debug, Error)]
pub enum EnumError {
    #[error("target domain must not be empty")]
    EmptyDomain,

    #[error("wordlist is empty")]
    EmptyWordlist,

    #[error("exactly one of --wordlist or --wordlist-file must be specified")]
    WordlistSource,

    #[error("could not open wordlist {path}: {source}")]
    WordlistRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("concurrency out of range, got {0}")]
    InvalidConcurrency(usize),

    #[error("max recursion depth must be at least 1, got {0}")]
    InvalidDepth(usize),

    #[error("invalid resolver address {0}")]
    Resolver(String),
}
