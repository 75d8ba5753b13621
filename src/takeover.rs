use std::future::Future;
use std::path::Path;
use std::time::Duration;

use log::{debug, warn};
use regex::Regex;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use trust_dns_resolver::proto::rr::RecordType;
use trust_dns_resolver::TokioAsyncResolver;

use crate::resolver::build_resolver;

/// 接管指纹
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fingerprint {
    #[serde(default)]
    pub cicd_pass: bool,
    #[serde(default)]
    pub cname: Vec<String>,
    #[serde(default)]
    pub discussion: String,
    #[serde(default)]
    pub documentation: String,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub http_status: Option<u16>,
    #[serde(default)]
    pub nx_domain: bool,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub vulnerable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceMatch {
    pub name: String,
    pub fingerprint: String,
    pub vulnerable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainTakeover {
    pub target: String,
    pub status_code: u16,
    pub response_body: String,
    pub domain: String,
    pub cname: String,
    pub services: Vec<ServiceMatch>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainTakeoverReport {
    pub domain_takeovers: Vec<DomainTakeover>,
    pub errors: Vec<String>,
}

/// 接管检测参数
#[derive(Debug, Clone)]
pub struct TakeoverOptions {
    pub https_only: bool,
    pub only_vulnerable: bool,
    pub timeout: Duration,
}

/// 读取指纹文件
pub fn load_fingerprints(path: &Path) -> Result<Vec<Fingerprint>, Box<dyn std::error::Error>> {
    let data = std::fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|e| format!("could not unmarshal fingerprint file: {}", e).into())
}

/// 逐个检测目标，错误记入报告
pub async fn detect_domain_takeover(
    targets: &[String],
    fingerprints: &[Fingerprint],
    options: &TakeoverOptions,
) -> Result<DomainTakeoverReport, Box<dyn std::error::Error>> {
    let client = Client::builder()
        .timeout(options.timeout)
        .danger_accept_invalid_certs(!options.https_only)
        .build()?;
    let resolver = build_resolver(&[], options.timeout)?;
    let matchers = compile_fingerprints(fingerprints);

    let (client, resolver, matchers) = (&client, &resolver, &matchers[..]);
    let report = collect_takeovers(targets, options, move |url: String| async move {
        assess_target(client, resolver, &url, matchers)
            .await
            .map_err(|e| e.to_string())
    })
    .await;

    Ok(report)
}

/// 按目标逐个检测并汇总，单个目标失败只记入 `errors`
async fn collect_takeovers<F, Fut>(
    targets: &[String],
    options: &TakeoverOptions,
    mut assess: F,
) -> DomainTakeoverReport
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<DomainTakeover, String>>,
{
    let mut report = DomainTakeoverReport::default();
    for target in targets {
        for url in target_urls(target, options.https_only) {
            match assess(url.clone()).await {
                Ok(result) => {
                    let vulnerable = result.services.iter().any(|s| s.vulnerable);
                    if vulnerable {
                        warn!("{} 可能存在子域名接管风险", url);
                    }
                    if !options.only_vulnerable || vulnerable {
                        report.domain_takeovers.push(result);
                    }
                }
                Err(e) => report.errors.push(format!("{}: {}", url, e)),
            }
        }
    }
    report
}

/// 未带协议的目标同时检测 http 与 https
fn target_urls(target: &str, https_only: bool) -> Vec<String> {
    if target.starts_with("http://") || target.starts_with("https://") {
        vec![target.to_string()]
    } else if https_only {
        vec![format!("https://{}", target)]
    } else {
        vec![format!("http://{}", target), format!("https://{}", target)]
    }
}

struct Matcher<'a> {
    fingerprint: &'a Fingerprint,
    regex: Option<Regex>,
}

fn compile_fingerprints(fingerprints: &[Fingerprint]) -> Vec<Matcher<'_>> {
    fingerprints
        .iter()
        .map(|fp| {
            let regex = if fp.fingerprint.is_empty() {
                None
            } else {
                match Regex::new(&fp.fingerprint) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        debug!("忽略无效指纹 {}: {}", fp.service, e);
                        None
                    }
                }
            };
            Matcher {
                fingerprint: fp,
                regex,
            }
        })
        .collect()
}

fn analyze_response(body: &str, matchers: &[Matcher<'_>]) -> Vec<ServiceMatch> {
    matchers
        .iter()
        .map(|m| {
            let matched = m.regex.as_ref().is_some_and(|re| re.is_match(body));
            ServiceMatch {
                name: m.fingerprint.service.clone(),
                fingerprint: m.fingerprint.fingerprint.clone(),
                vulnerable: matched && !m.fingerprint.nx_domain && m.fingerprint.vulnerable,
            }
        })
        .collect()
}

async fn assess_target(
    client: &Client,
    resolver: &TokioAsyncResolver,
    url: &str,
    matchers: &[Matcher<'_>],
) -> Result<DomainTakeover, Box<dyn std::error::Error>> {
    let domain = Url::parse(url)?
        .host_str()
        .ok_or("url has no host")?
        .to_string();

    // 没有 CNAME 的目标照常检测响应内容
    let cname = match resolver.lookup(domain.as_str(), RecordType::CNAME).await {
        Ok(lookup) => lookup.iter().next().map(|r| r.to_string()).unwrap_or_default(),
        Err(e) => {
            debug!("{} 无 CNAME 记录: {}", domain, e);
            String::new()
        }
    };

    let response = client.get(url).send().await?;
    let status_code = response.status().as_u16();
    let body = response.text().await?;
    let services = analyze_response(&body, matchers);

    Ok(DomainTakeover {
        target: url.to_string(),
        status_code,
        response_body: body,
        domain,
        cname,
        services,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(service: &str, pattern: &str, vulnerable: bool, nx_domain: bool) -> Fingerprint {
        Fingerprint {
            service: service.to_string(),
            fingerprint: pattern.to_string(),
            vulnerable,
            nx_domain,
            ..Default::default()
        }
    }

    #[test]
    fn expands_bare_targets() {
        assert_eq!(
            target_urls("a.example.com", false),
            vec!["http://a.example.com", "https://a.example.com"]
        );
        assert_eq!(target_urls("a.example.com", true), vec!["https://a.example.com"]);
        assert_eq!(
            target_urls("http://a.example.com", true),
            vec!["http://a.example.com"]
        );
    }

    #[test]
    fn matches_vulnerable_fingerprints_only() {
        let fps = vec![
            fp("github", "There isn't a GitHub Pages site here", true, false),
            fp("heroku", "No such app", true, false),
            fp("azure", "", true, true),
            fp("nx", "There isn't", true, true),
            fp("broken", "([", true, false),
        ];
        let matchers = compile_fingerprints(&fps);
        let got = analyze_response("<p>There isn't a GitHub Pages site here.</p>", &matchers);

        assert_eq!(got.len(), 5);
        assert!(got[0].vulnerable);
        assert!(!got[1].vulnerable);
        assert!(!got[2].vulnerable);
        assert!(!got[3].vulnerable);
        assert!(!got[4].vulnerable);
    }

    fn takeover(url: &str, vulnerable: bool) -> DomainTakeover {
        DomainTakeover {
            target: url.to_string(),
            status_code: 404,
            response_body: String::new(),
            domain: url.split("://").nth(1).unwrap_or_default().to_string(),
            cname: String::new(),
            services: vec![ServiceMatch {
                name: "github".to_string(),
                fingerprint: String::new(),
                vulnerable,
            }],
        }
    }

    fn fake_assess(url: String) -> std::future::Ready<Result<DomainTakeover, String>> {
        let result = if url.contains("down.") {
            Err("connection refused".to_string())
        } else {
            Ok(takeover(&url, url.starts_with("https://vuln.")))
        };
        std::future::ready(result)
    }

    fn options(https_only: bool, only_vulnerable: bool) -> TakeoverOptions {
        TakeoverOptions {
            https_only,
            only_vulnerable,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn collects_results_and_errors() {
        let targets = vec![
            "vuln.example.com".to_string(),
            "safe.example.com".to_string(),
            "down.example.com".to_string(),
        ];
        let report = collect_takeovers(&targets, &options(false, false), fake_assess).await;

        assert_eq!(report.domain_takeovers.len(), 4);
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].starts_with("http://down.example.com: "));
        assert!(report.errors[1].contains("connection refused"));
    }

    #[tokio::test]
    async fn only_vulnerable_filters_output() {
        let targets = vec![
            "vuln.example.com".to_string(),
            "safe.example.com".to_string(),
        ];
        let report = collect_takeovers(&targets, &options(false, true), fake_assess).await;
        assert_eq!(report.domain_takeovers.len(), 1);
        assert_eq!(report.domain_takeovers[0].target, "https://vuln.example.com");
        assert!(report.errors.is_empty());

        let report = collect_takeovers(&targets, &options(true, false), fake_assess).await;
        let got: Vec<&str> = report.domain_takeovers.iter().map(|t| t.target.as_str()).collect();
        assert_eq!(got, vec!["https://vuln.example.com", "https://safe.example.com"]);
    }

    #[test]
    fn fingerprint_file_format() {
        let data = r#"[{"cicdPass":true,"cname":["github.io"],"discussion":"","documentation":"",
            "fingerprint":"There isn't a GitHub Pages site here","httpStatus":404,"nxDomain":false,
            "service":"Github","status":"Vulnerable","vulnerable":true}]"#;
        let fps: Vec<Fingerprint> = serde_json::from_str(data).unwrap();
        assert_eq!(fps[0].service, "Github");
        assert_eq!(fps[0].http_status, Some(404));
        assert!(fps[0].vulnerable);
    }
}
