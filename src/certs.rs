use std::collections::BTreeSet;

use log::info;
use reqwest::Client;
use serde::{Deserialize, Serialize};

const CRTSH_URL: &str = "https://crt.sh/";

/// crt.sh 返回的单条证书记录
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertificateRecord {
    #[serde(default)]
    pub issuer_ca_id: i64,
    #[serde(default)]
    pub issuer_name: String,
    #[serde(default)]
    pub common_name: String,
    #[serde(default)]
    pub name_value: String,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub entry_timestamp: Option<String>,
    #[serde(default)]
    pub not_before: String,
    #[serde(default)]
    pub not_after: String,
    #[serde(default)]
    pub serial_number: String,
    #[serde(default)]
    pub result_count: i64,
}

/// 证书透明度查询报告
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CertsReport {
    pub domain: String,
    pub certificates: Vec<CertificateRecord>,
    pub errors: Vec<String>,
}

impl CertsReport {
    /// 证书中出现的去重域名，忽略通配符前缀
    pub fn names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for cert in &self.certificates {
            for name in cert.name_value.split('\n') {
                let name = name.trim().trim_start_matches("*.").to_lowercase();
                if !name.is_empty() {
                    names.insert(name);
                }
            }
        }
        names.into_iter().collect()
    }
}

/// 查询 crt.sh，网络或解析错误记入报告
pub async fn get_domain_certs(client: &Client, domain: &str) -> CertsReport {
    let mut report = CertsReport {
        domain: domain.to_string(),
        ..Default::default()
    };

    match fetch_certs(client, domain).await {
        Ok(certificates) => {
            info!("{} 共找到 {} 条证书记录", domain, certificates.len());
            report.certificates = certificates;
        }
        Err(e) => report.errors.push(e.to_string()),
    }

    report
}

async fn fetch_certs(
    client: &Client,
    domain: &str,
) -> Result<Vec<CertificateRecord>, Box<dyn std::error::Error>> {
    let response = client
        .get(CRTSH_URL)
        .query(&[("q", domain), ("output", "json")])
        .send()
        .await?
        .error_for_status()?;
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
