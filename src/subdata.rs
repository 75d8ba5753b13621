/// 内置常用子域名字典
const DEFAULT_SUB_DATA: &[&str] = &[
    "www", "mail", "ftp", "smtp", "pop", "imap", "webmail", "ns1", "ns2", "ns3",
    "dns", "mx", "mx1", "mx2", "api", "dev", "test", "staging", "stage", "uat",
    "qa", "prod", "beta", "alpha", "demo", "admin", "portal", "vpn", "remote", "gateway",
    "proxy", "cdn", "static", "assets", "img", "images", "media", "files", "download", "upload",
    "blog", "shop", "store", "m", "mobile", "app", "apps", "auth", "login", "sso",
    "id", "accounts", "account", "secure", "internal", "intranet", "corp", "git", "gitlab", "jenkins",
    "ci", "build", "docs", "doc", "wiki", "help", "support", "status", "monitor", "grafana",
    "kibana", "elastic", "db", "mysql", "redis", "mongo", "backup", "old", "new", "v1",
    "v2", "web", "web1", "web2", "server", "host", "cloud", "s3", "office", "exchange",
    "owa", "autodiscover", "cpanel", "whm", "news", "forum", "community", "crm", "erp", "hr",
];

/// 返回内置字典的拷贝
pub fn get_default_sub_next_data() -> Vec<String> {
    DEFAULT_SUB_DATA.iter().map(|s| s.to_string()).collect()
}
