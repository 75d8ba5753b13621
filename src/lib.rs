//! # rsubrecon
//!
//! 基于Rust实现的递归子域名暴破与DNS侦察工具库。
//!
//! ## 特性
//!
//! - 🚀 **有界并发**: 同时在途的DNS查询数量严格受限
//! - 🌲 **逐层递进**: 只在解析成功的子域名之下继续生成下一层候选
//! - ⏱️ **可随时中止**: 总时长上限与主动取消都会返回已发现的部分结果
//! - 🔍 **侦察辅助**: DNS记录、证书透明度、Shodan主机搜索、子域名接管检测
//! - 📊 **多格式输出**: 支持JSON、CSV、TXT三种输出格式
//!
//! ## 快速开始
//!
//! ```rust,no_run
//! use rsubrecon::{brute_force_subdomains, SubdomainEnumConfig, WordlistSource};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = SubdomainEnumConfig {
//!         domain: "example.com".to_string(),
//!         wordlist: Some(WordlistSource::Inline(vec!["www".into(), "api".into()])),
//!         max_depth: 2,
//!         ..Default::default()
//!     };
//!
//!     let report = brute_force_subdomains(config, None).await;
//!     println!("发现 {} 个子域名", report.subdomains.len());
//!     for domain in &report.subdomains {
//!         println!("  {}", domain);
//!     }
//! }
//! ```
//!
//! ## 自定义解析器与中止
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rsubrecon::{DnsHostResolver, SubdomainEnumConfig, SubdomainEnumEngine, WordlistSource};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SubdomainEnumConfig {
//!         domain: "example.com".to_string(),
//!         wordlist: Some(WordlistSource::File("wordlist.txt".into())),
//!         concurrency: 20,
//!         ..Default::default()
//!     };
//!     let resolver = DnsHostResolver::new(&["1.1.1.1".to_string()], config.lookup_timeout)?;
//!     let engine = SubdomainEnumEngine::with_resolver(config, Arc::new(resolver))?;
//!
//!     let cancel = CancellationToken::new();
//!     let report = engine.run(Some(&cancel)).await;
//!     println!("{:?}", report.subdomains);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod api;
pub mod deadline;
pub mod error;
pub mod gen;
pub mod input;
pub mod logger;
pub mod model;
pub mod output;
pub mod pool;
pub mod records;
pub mod resolver;
pub mod scheduler;
pub mod subdata;
pub mod wildcard;

#[cfg(feature = "certs")]
#[cfg_attr(docsrs, doc(cfg(feature = "certs")))]
pub mod certs;
#[cfg(feature = "shodan")]
#[cfg_attr(docsrs, doc(cfg(feature = "shodan")))]
pub mod shodan;
#[cfg(feature = "takeover")]
#[cfg_attr(docsrs, doc(cfg(feature = "takeover")))]
pub mod takeover;

// 重新导出主要的公共API
pub use api::{
    brute_force_subdomains, Session, SubdomainEnumConfig, SubdomainEnumEngine, SubenumReport,
    WordlistSource,
};

pub use deadline::DeadlineController;
pub use error::EnumError;
pub use gen::generate_candidates;
pub use input::{load_wordlist, parse_comma_separated, OutputFormat};
pub use model::{Candidate, EnumerationType, LevelReport};
pub use output::{export_results, Exportable};
pub use pool::resolve_all;
pub use records::{DnsRecord, DnsRecordFetcher, DnsRecords, DnsRecordsReport};
pub use resolver::{resolve, DnsHostResolver, HostResolver};
pub use scheduler::{DepthScheduler, Enumeration, ScanState};
pub use wildcard::WildcardDetector;
