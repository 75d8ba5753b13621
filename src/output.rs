use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use log::info;
use serde::Serialize;

use crate::api::SubenumReport;
use crate::input::OutputFormat;
use crate::records::{DnsRecords, DnsRecordsReport};

/// 可导出的报告
pub trait Exportable: Serialize {
    /// CSV 表头
    fn header(&self) -> &'static [&'static str];
    /// 表格行，CSV 与 TXT 共用
    fn rows(&self) -> Vec<Vec<String>>;
}

/// 带导出时间的外层结构
#[derive(Serialize)]
struct ExportData<'a, T: Serialize> {
    export_time: String,
    content: &'a T,
}

impl Exportable for SubenumReport {
    fn header(&self) -> &'static [&'static str] {
        &["subdomain", "depth"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let root_labels = self.domain.split('.').count();
        self.subdomains
            .iter()
            .map(|s| {
                let depth = s.split('.').count().saturating_sub(root_labels);
                vec![s.clone(), depth.to_string()]
            })
            .collect()
    }
}

impl Exportable for DnsRecordsReport {
    fn header(&self) -> &'static [&'static str] {
        &["name", "type", "ttl", "value"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for group in [&self.records, &self.dmarc_records, &self.dkim_records] {
            push_records(group, &mut rows);
        }
        rows
    }
}

#[cfg(feature = "certs")]
impl Exportable for crate::certs::CertsReport {
    fn header(&self) -> &'static [&'static str] {
        &["id", "common_name", "name_value", "not_before", "not_after", "issuer_name"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.certificates
            .iter()
            .map(|c| {
                vec![
                    c.id.to_string(),
                    c.common_name.clone(),
                    c.name_value.replace('\n', " "),
                    c.not_before.clone(),
                    c.not_after.clone(),
                    c.issuer_name.clone(),
                ]
            })
            .collect()
    }
}

#[cfg(feature = "shodan")]
impl Exportable for crate::shodan::ShodanReport {
    fn header(&self) -> &'static [&'static str] {
        &["ip", "port", "hostnames", "org", "product"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.shodan_records
            .iter()
            .map(|r| {
                vec![
                    r.ip_str.clone(),
                    r.port.to_string(),
                    r.hostnames.join(";"),
                    r.org.clone().unwrap_or_default(),
                    r.product.clone().unwrap_or_default(),
                ]
            })
            .collect()
    }
}

#[cfg(feature = "takeover")]
impl Exportable for crate::takeover::DomainTakeoverReport {
    fn header(&self) -> &'static [&'static str] {
        &["target", "status_code", "cname", "vulnerable_services"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.domain_takeovers
            .iter()
            .map(|t| {
                let vulnerable: Vec<&str> = t
                    .services
                    .iter()
                    .filter(|s| s.vulnerable)
                    .map(|s| s.name.as_str())
                    .collect();
                vec![
                    t.target.clone(),
                    t.status_code.to_string(),
                    t.cname.clone(),
                    vulnerable.join(";"),
                ]
            })
            .collect()
    }
}

fn push_records(group: &DnsRecords, rows: &mut Vec<Vec<String>>) {
    let all = [
        &group.a,
        &group.aaaa,
        &group.cname,
        &group.mx,
        &group.ns,
        &group.txt,
    ];
    for records in all {
        for r in records {
            rows.push(vec![
                r.name.clone(),
                r.record_type.clone(),
                r.ttl.to_string(),
                r.value.clone(),
            ]);
        }
    }
}

/// 按格式渲染报告
pub fn render<T: Exportable>(report: &T, format: OutputFormat) -> Result<String, Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            let data = ExportData {
                export_time: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                content: report,
            };
            Ok(serde_json::to_string_pretty(&data)?)
        }
        OutputFormat::Csv => {
            let mut csv = report.header().join(",");
            csv.push('\n');
            for row in report.rows() {
                let line: Vec<String> = row.iter().map(|f| escape_csv(f)).collect();
                csv.push_str(&line.join(","));
                csv.push('\n');
            }
            Ok(csv)
        }
        OutputFormat::Txt => {
            let mut txt = String::new();
            for row in report.rows() {
                txt.push_str(&row.join("\t"));
                txt.push('\n');
            }
            Ok(txt)
        }
    }
}

/// 导出结果到文件，未指定路径时写到标准输出
pub fn export_results<T: Exportable>(
    report: &T,
    output_path: Option<&Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = render(report, format)?;
    match output_path {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(data.as_bytes())?;
            info!("结果已导出到: {}", path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(data.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
