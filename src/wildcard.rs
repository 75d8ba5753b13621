use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use trust_dns_resolver::TokioAsyncResolver;

use crate::error::EnumError;
use crate::resolver::build_resolver;

const PROBE_COUNT: usize = 3;
const PROBE_LEN: usize = 12;

/// 泛解析检测器
///
/// 存在泛解析时任何候选都会解析成功，逐层扫描会退化为穷举。
pub struct WildcardDetector {
    resolver: TokioAsyncResolver,
}

impl WildcardDetector {
    pub fn new(nameservers: &[String], timeout: Duration) -> Result<Self, EnumError> {
        Ok(WildcardDetector {
            resolver: build_resolver(nameservers, timeout)?,
        })
    }

    /// 任一随机子域名能解析即认为存在泛解析
    ///
    /// 取消后立即返回 `false`。
    pub async fn detect_wildcard(&self, domain: &str, cancel: &CancellationToken) -> bool {
        for probe in generate_probe_subdomains(domain, PROBE_COUNT) {
            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return false,
                response = self.resolver.lookup_ip(probe.as_str()) => response,
            };
            if let Ok(response) = response {
                if response.iter().next().is_some() {
                    return true;
                }
            }
        }
        false
    }
}

/// 生成测试用的随机子域名
fn generate_probe_subdomains(domain: &str, count: usize) -> Vec<String> {
    let mut rng = rand::thread_rng();
    let chars = b"abcdefghijklmnopqrstuvwxyz0123456789";

    (0..count)
        .map(|_| {
            let label: String = (0..PROBE_LEN)
                .map(|_| chars[rng.gen_range(0..chars.len())] as char)
                .collect();
            format!("{}.{}", label, domain)
        })
        .collect()
}
