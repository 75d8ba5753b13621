use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use log::trace;
use tokio_util::sync::CancellationToken;
use trust_dns_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

use crate::error::EnumError;

/// 主机存在性查询
///
/// 返回 `true` 表示至少解析到一个地址。实现方不应返回错误，
/// NXDOMAIN 与服务器故障一律视为不存在。
#[async_trait]
pub trait HostResolver: Send + Sync {
    async fn host_exists(&self, domain: &str) -> bool;
}

/// 基于 trust-dns 的默认解析器
pub struct DnsHostResolver {
    resolver: TokioAsyncResolver,
}

impl DnsHostResolver {
    /// `nameservers` 为空时使用默认的公共DNS
    pub fn new(nameservers: &[String], timeout: Duration) -> Result<Self, EnumError> {
        Ok(DnsHostResolver {
            resolver: build_resolver(nameservers, timeout)?,
        })
    }
}

/// 按给定DNS服务器构造 trust-dns 解析器
pub(crate) fn build_resolver(
    nameservers: &[String],
    timeout: Duration,
) -> Result<TokioAsyncResolver, EnumError> {
    let config = if nameservers.is_empty() {
        ResolverConfig::default()
    } else {
        let mut ips = Vec::with_capacity(nameservers.len());
        for ns in nameservers {
            let ip: IpAddr = ns
                .trim()
                .parse()
                .map_err(|_| EnumError::Resolver(ns.clone()))?;
            ips.push(ip);
        }
        ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&ips, 53, true),
        )
    };

    let mut opts = ResolverOpts::default();
    opts.timeout = timeout;
    opts.attempts = 1;

    Ok(TokioAsyncResolver::tokio(config, opts))
}

#[async_trait]
impl HostResolver for DnsHostResolver {
    async fn host_exists(&self, domain: &str) -> bool {
        match self.resolver.lookup_ip(domain).await {
            Ok(response) => response.iter().next().is_some(),
            Err(e) => {
                trace!("{} 解析失败: {}", domain, e);
                false
            }
        }
    }
}

/// 带超时与取消的单次解析
///
/// 取消信号先到达时立即返回 `false`。
pub async fn resolve<R>(
    resolver: &R,
    domain: &str,
    timeout: Duration,
    cancel: &CancellationToken,
) -> bool
where
    R: HostResolver + ?Sized,
{
    if cancel.is_cancelled() {
        return false;
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        res = tokio::time::timeout(timeout, resolver.host_exists(domain)) => match res {
            Ok(exists) => exists,
            Err(_) => {
                trace!("{} 解析超时", domain);
                false
            }
        },
    }
}
