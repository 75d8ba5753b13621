use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use trust_dns_resolver::error::ResolveErrorKind;
use trust_dns_resolver::proto::rr::{RData, RecordType};
use trust_dns_resolver::TokioAsyncResolver;

use crate::error::EnumError;
use crate::resolver::build_resolver;

/// DKIM 常见选择器
const DKIM_SELECTORS: &[&str] = &[
    "default",
    "selector1",
    "selector2",
    "google",
    "amazonses",
    "microsoft",
];

const QUESTION_TYPES: &[RecordType] = &[
    RecordType::A,
    RecordType::AAAA,
    RecordType::MX,
    RecordType::TXT,
    RecordType::NS,
    RecordType::CNAME,
];

/// 单条DNS记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub name: String,
    pub ttl: u32,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
}

/// 按类型分组的记录
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecords {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a: Vec<DnsRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aaaa: Vec<DnsRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mx: Vec<DnsRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub txt: Vec<DnsRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ns: Vec<DnsRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cname: Vec<DnsRecord>,
}

impl DnsRecords {
    fn bucket(&mut self, record_type: RecordType) -> Option<&mut Vec<DnsRecord>> {
        match record_type {
            RecordType::A => Some(&mut self.a),
            RecordType::AAAA => Some(&mut self.aaaa),
            RecordType::MX => Some(&mut self.mx),
            RecordType::TXT => Some(&mut self.txt),
            RecordType::NS => Some(&mut self.ns),
            RecordType::CNAME => Some(&mut self.cname),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
            && self.aaaa.is_empty()
            && self.mx.is_empty()
            && self.txt.is_empty()
            && self.ns.is_empty()
            && self.cname.is_empty()
    }
}

/// 单个域名的记录报告
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsRecordsReport {
    pub domain: String,
    pub records: DnsRecords,
    #[serde(default, skip_serializing_if = "DnsRecords::is_empty")]
    pub dmarc_records: DnsRecords,
    #[serde(default, skip_serializing_if = "DnsRecords::is_empty")]
    pub dkim_records: DnsRecords,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// DNS记录查询器
#[derive(Clone)]
pub struct DnsRecordFetcher {
    resolver: TokioAsyncResolver,
}

impl DnsRecordFetcher {
    pub fn new(nameservers: &[String]) -> Result<Self, EnumError> {
        Ok(DnsRecordFetcher {
            resolver: build_resolver(nameservers, Duration::from_secs(5))?,
        })
    }

    /// 查询域名的常用记录以及 DMARC/DKIM
    ///
    /// 取消后剩余的查询直接跳过，已得到的记录照常返回。
    pub async fn fetch(&self, domain: &str, cancel: &CancellationToken) -> DnsRecordsReport {
        let mut errors = Vec::new();

        let records = self.query(domain, QUESTION_TYPES, &mut errors, cancel).await;

        // DMARC 固定位于 _dmarc 子域 (RFC 7489)
        let dmarc_records = self
            .query(&format!("_dmarc.{}", domain), &[RecordType::TXT], &mut errors, cancel)
            .await;

        // DKIM 位于 <selector>._domainkey 下，选择器只能逐个猜
        let mut dkim_records = DnsRecords::default();
        for selector in DKIM_SELECTORS {
            let found = self
                .query(
                    &format!("{}._domainkey.{}", selector, domain),
                    &[RecordType::TXT],
                    &mut errors,
                    cancel,
                )
                .await;
            dkim_records.txt.extend(found.txt);
        }

        DnsRecordsReport {
            domain: domain.to_string(),
            records,
            dmarc_records,
            dkim_records,
            errors,
        }
    }

    /// 批量查询，并发受限，结果顺序与输入一致
    ///
    /// 取消后不再派发新的域名，返回时不残留任何任务。
    pub async fn fetch_many(
        &self,
        domains: Vec<String>,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> Vec<DnsRecordsReport> {
        let semaphore = Arc::new(Semaphore::new(concurrency.clamp(1, Semaphore::MAX_PERMITS)));
        let mut tasks: JoinSet<(usize, DnsRecordsReport)> = JoinSet::new();

        for (index, domain) in domains.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let fetcher = self.clone();
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = permit;
                (index, fetcher.fetch(&domain, &cancel).await)
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(done) = tasks.join_next().await {
            match done {
                Ok(result) => results.push(result),
                Err(e) => warn!("记录查询任务异常退出: {}", e),
            }
        }
        results.sort_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, report)| report).collect()
    }

    async fn query(
        &self,
        name: &str,
        types: &[RecordType],
        errors: &mut Vec<String>,
        cancel: &CancellationToken,
    ) -> DnsRecords {
        let mut records = DnsRecords::default();

        for &record_type in types {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.resolver.lookup(name, record_type) => result,
            };
            let lookup = match result {
                Ok(lookup) => lookup,
                Err(e) => {
                    if !matches!(e.kind(), ResolveErrorKind::NoRecordsFound { .. }) {
                        errors.push(format!("{} {}: {}", name, record_type, e));
                    }
                    continue;
                }
            };

            for record in lookup.record_iter() {
                // CNAME 链上的记录也会出现在应答里，只保留请求的类型
                if record.record_type() != record_type {
                    continue;
                }
                let Some(data) = record.data() else {
                    continue;
                };
                if let Some(bucket) = records.bucket(record_type) {
                    bucket.push(DnsRecord {
                        name: name.to_string(),
                        ttl: record.ttl(),
                        record_type: record_type.to_string(),
                        value: format_rdata(data),
                    });
                }
            }
        }

        debug!("{} 记录查询完成", name);
        records
    }
}

fn format_rdata(data: &RData) -> String {
    match data {
        RData::MX(mx) => format!("{} {}", mx.preference(), mx.exchange()),
        RData::TXT(txt) => txt
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).to_string())
            .collect::<Vec<_>>()
            .join(""),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::str::FromStr;
    use std::time::Instant;
    use trust_dns_resolver::proto::rr::rdata::{A, MX, TXT};
    use trust_dns_resolver::proto::rr::Name;

    #[test]
    fn formats_mx_and_txt() {
        let mx = RData::MX(MX::new(10, Name::from_str("mail.example.com.").unwrap()));
        assert!(format_rdata(&mx).starts_with("10 mail.example.com"));

        let txt = RData::TXT(TXT::new(vec!["v=spf1 ".to_string(), "-all".to_string()]));
        assert_eq!(format_rdata(&txt), "v=spf1 -all");

        let a = RData::A(A(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(format_rdata(&a), "192.0.2.1");
    }

    #[test]
    fn report_skips_empty_groups() {
        let report = DnsRecordsReport {
            domain: "www.example.com".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("dmarc_records").is_none());
        assert!(json.get("errors").is_none());
        assert!(json.get("records").is_some());
    }

    #[tokio::test]
    async fn fetch_many_stops_on_cancel() {
        // 192.0.2.0/24 为文档保留地址，查询只会超时
        let fetcher = DnsRecordFetcher::new(&["192.0.2.1".to_string()]).unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let domains: Vec<String> = (0..8).map(|i| format!("h{}.example.com", i)).collect();
        let start = Instant::now();
        let reports = fetcher.fetch_many(domains, 2, &cancel).await;

        assert!(start.elapsed() < Duration::from_secs(3));
        for (i, report) in reports.iter().enumerate() {
            assert_eq!(report.domain, format!("h{}.example.com", i));
        }
    }

    #[tokio::test]
    async fn fetch_many_cancelled_before_start() {
        let fetcher = DnsRecordFetcher::new(&["192.0.2.1".to_string()]).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let reports = fetcher
            .fetch_many(vec!["www.example.com".to_string()], 4, &cancel)
            .await;
        assert!(reports.is_empty());
    }
}
