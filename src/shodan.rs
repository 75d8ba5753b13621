use std::collections::HashMap;

use log::{info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const SHODAN_HOST_SEARCH_URL: &str = "https://api.shodan.io/shodan/host/search";
const QUERY_TYPE_STRICT_HOSTNAME: &str = "QueryShodanHostStrictHostnameMatch";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShodanHttp {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub robots_hash: Option<i64>,
    #[serde(default)]
    pub sitemap_hash: Option<i64>,
    #[serde(default)]
    pub securitytxt: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShodanVulnerability {
    #[serde(default)]
    pub cvss: Option<f64>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub verified: bool,
}

/// 主机搜索结果中的单条服务记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShodanRecord {
    #[serde(default)]
    pub ip_str: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub transport: Option<String>,
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub asn: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub isp: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub cpe23: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub http: Option<ShodanHttp>,
    #[serde(default)]
    pub vulns: HashMap<String, ShodanVulnerability>,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub hash: i64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    matches: Vec<serde_json::Value>,
}

/// Shodan 查询报告
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShodanReport {
    pub query: String,
    pub query_type: String,
    pub shodan_records: Vec<ShodanRecord>,
    pub errors: Vec<String>,
}

/// 只保留至少有一个主机名以 `suffix` 结尾的记录，`suffix` 为空时不过滤
pub fn filter_records_by_hostname(records: Vec<ShodanRecord>, suffix: &str) -> Vec<ShodanRecord> {
    if suffix.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| r.hostnames.iter().any(|h| h.ends_with(suffix)))
        .collect()
}

/// 主机搜索并按主机名后缀严格过滤，请求错误记入报告
pub async fn query_host_strict_hostname_match(
    client: &Client,
    api_key: &str,
    query: &str,
    hostname: &str,
) -> ShodanReport {
    let mut report = ShodanReport {
        query: query.to_string(),
        query_type: QUERY_TYPE_STRICT_HOSTNAME.to_string(),
        ..Default::default()
    };

    match search_hosts(client, api_key, query).await {
        Ok(records) => {
            report.shodan_records = filter_records_by_hostname(records, hostname);
            info!("Shodan 查询 {} 共保留 {} 条记录", query, report.shodan_records.len());
        }
        Err(e) => report.errors.push(e.to_string()),
    }

    report
}

async fn search_hosts(
    client: &Client,
    api_key: &str,
    query: &str,
) -> Result<Vec<ShodanRecord>, Box<dyn std::error::Error>> {
    let response = client
        .get(SHODAN_HOST_SEARCH_URL)
        .query(&[("key", api_key), ("query", query)])
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(format!("failed to query Shodan API: status code {}", status.as_u16()).into());
    }
    let body = response.text().await?;
    decode_search_response(&body)
}

/// 单条记录解析失败只跳过该条
fn decode_search_response(body: &str) -> Result<Vec<ShodanRecord>, Box<dyn std::error::Error>> {
    let response: SearchResponse = serde_json::from_str(body)?;
    let mut records = Vec::with_capacity(response.matches.len());
    for raw in response.matches {
        match serde_json::from_value::<ShodanRecord>(raw) {
            Ok(record) => records.push(record),
            Err(e) => warn!("跳过无法解析的 Shodan 记录: {}", e),
        }
    }
    Ok(records)
}
