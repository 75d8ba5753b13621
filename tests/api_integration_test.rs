use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use rsubrecon::{
    brute_force_subdomains, EnumerationType, HostResolver, SubdomainEnumConfig,
    SubdomainEnumEngine, WordlistSource,
};

/// 只解析给定集合的假解析器，记录查询与并发峰值
///
/// 命中立即返回，未命中的查询等待 `miss_delay`。
struct FakeResolver {
    live: HashSet<String>,
    miss_delay: Duration,
    queried: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeResolver {
    fn new(live: &[&str], miss_delay: Duration) -> Arc<Self> {
        Arc::new(FakeResolver {
            live: live.iter().map(|s| s.to_string()).collect(),
            miss_delay,
            queried: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    fn queried(&self) -> Vec<String> {
        self.queried.lock().unwrap().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl HostResolver for FakeResolver {
    async fn host_exists(&self, domain: &str) -> bool {
        self.queried.lock().unwrap().push(domain.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.peak.fetch_max(now, Ordering::SeqCst);
        if self.live.contains(domain) {
            return true;
        }
        if !self.miss_delay.is_zero() {
            tokio::time::sleep(self.miss_delay).await;
        }
        false
    }
}

fn config(words: &[&str], max_depth: usize, concurrency: usize) -> SubdomainEnumConfig {
    SubdomainEnumConfig {
        domain: "example.com".to_string(),
        wordlist: Some(WordlistSource::Inline(
            words.iter().map(|s| s.to_string()).collect(),
        )),
        max_depth,
        concurrency,
        lookup_timeout: Duration::from_secs(1),
        max_duration: None,
        ..Default::default()
    }
}

fn parent_of(domain: &str) -> &str {
    domain.split_once('.').map(|(_, rest)| rest).unwrap_or("")
}

#[tokio::test]
async fn test_two_level_scenario() {
    let fake = FakeResolver::new(&["www.example.com", "api.www.example.com"], Duration::ZERO);
    let engine = SubdomainEnumEngine::with_resolver(config(&["www", "api"], 2, 4), fake.clone())
        .unwrap();

    let report = engine.run(None).await;

    assert_eq!(report.subdomains, vec!["www.example.com", "api.www.example.com"]);
    assert_eq!(report.enumeration_type, EnumerationType::Brute);
    assert!(report.errors.is_empty());
    assert!(!report.cancelled);

    let queried: HashSet<String> = fake.queried().into_iter().collect();
    let expected: HashSet<String> = [
        "www.example.com",
        "api.example.com",
        "www.www.example.com",
        "api.www.example.com",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(queried, expected);
    assert!(!queried.iter().any(|q| q.ends_with(".api.example.com")));
}

#[tokio::test]
async fn test_depth_one_containment() {
    let fake = FakeResolver::new(
        &["www.example.com", "mail.example.com", "other.example.org"],
        Duration::ZERO,
    );
    let words = ["www", "mail", "dev"];
    let engine = SubdomainEnumEngine::with_resolver(config(&words, 1, 2), fake.clone()).unwrap();
    let report = engine.run(None).await;

    let allowed: HashSet<String> = words.iter().map(|w| format!("{}.example.com", w)).collect();
    assert!(report.subdomains.iter().all(|s| allowed.contains(s)));
    assert_eq!(report.subdomains.len(), 2);
}

#[tokio::test]
async fn test_parentage_and_uniqueness() {
    let live = [
        "a.example.com",
        "b.example.com",
        "a.a.example.com",
        "b.a.example.com",
        "a.b.example.com",
        "a.a.a.example.com",
        // 父域名 c.example.com 不存在，永远不会被测试
        "a.c.example.com",
    ];
    let fake = FakeResolver::new(&live, Duration::from_millis(1));
    let engine =
        SubdomainEnumEngine::with_resolver(config(&["a", "b", "c", "a"], 3, 3), fake.clone())
            .unwrap();
    let report = engine.run(None).await;

    let unique: HashSet<&String> = report.subdomains.iter().collect();
    assert_eq!(unique.len(), report.subdomains.len());

    let mut known: HashSet<&str> = HashSet::from(["example.com"]);
    for s in &report.subdomains {
        assert!(known.contains(parent_of(s)), "{} discovered before its parent", s);
        known.insert(s.as_str());
    }
    assert!(!report.subdomains.contains(&"a.c.example.com".to_string()));
    assert_eq!(report.subdomains.len(), 6);

    let queried = fake.queried();
    let distinct: HashSet<&String> = queried.iter().collect();
    assert_eq!(distinct.len(), queried.len(), "a candidate was resolved twice");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_ceiling() {
    let words: Vec<String> = (0..40).map(|i| format!("w{}", i)).collect();
    let word_refs: Vec<&str> = words.iter().map(String::as_str).collect();
    let fake = FakeResolver::new(&["w1.example.com", "w2.example.com"], Duration::from_millis(5));
    let engine = SubdomainEnumEngine::with_resolver(config(&word_refs, 2, 4), fake.clone()).unwrap();

    let report = engine.run(None).await;

    assert_eq!(report.subdomains.len(), 2);
    assert!(fake.peak.load(Ordering::SeqCst) <= 4);
    assert_eq!(fake.queried().len(), 40 + 2 * 40);
}

#[tokio::test]
async fn test_deadline_cancels_blocked_lookups() {
    let fake = FakeResolver::new(&[], Duration::from_secs(10));
    let mut cfg = config(&["www", "api", "dev", "mail", "ftp", "vpn"], 3, 2);
    cfg.lookup_timeout = Duration::from_secs(30);
    cfg.max_duration = Some(Duration::from_millis(50));
    let engine = SubdomainEnumEngine::with_resolver(cfg, fake.clone()).unwrap();

    let start = Instant::now();
    let report = engine.run(None).await;

    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(report.cancelled);
    assert!(report.subdomains.is_empty());
    assert!(report.errors.is_empty());
    // 取消后所有查询都已退出
    assert_eq!(fake.in_flight.load(Ordering::SeqCst), 0);
    assert!(fake.queried().len() <= 2);
}

#[tokio::test]
async fn test_caller_abort_keeps_partial_result() {
    let fake = FakeResolver::new(&["www.example.com"], Duration::from_secs(10));
    let engine = SubdomainEnumEngine::with_resolver(config(&["www"], 3, 1), fake.clone()).unwrap();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let report = engine.run(Some(&cancel)).await;
    assert!(start.elapsed() < Duration::from_secs(2));
    assert!(report.cancelled);
    assert_eq!(report.subdomains, vec!["www.example.com"]);
}

#[tokio::test]
async fn test_record_enrichment_respects_deadline() {
    let fake = FakeResolver::new(&["www.example.com"], Duration::ZERO);
    let mut cfg = config(&["www"], 1, 2);
    // 文档保留地址，记录查询只会等到超时
    cfg.resolvers = vec!["192.0.2.1".to_string()];
    cfg.resolve_records = true;
    cfg.max_duration = Some(Duration::from_millis(50));
    let engine = SubdomainEnumEngine::with_resolver(cfg, fake).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let report = engine.run(Some(&cancel)).await;

    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(report.subdomains, vec!["www.example.com"]);
    // 没有网络时查询会立即失败，此时记录阶段可能在取消前就已结束
    assert!(report.cancelled || report.records.len() == 1);
}

#[tokio::test]
async fn test_report_serializes_enumeration_type() {
    let fake = FakeResolver::new(&["www.example.com"], Duration::ZERO);
    let engine = SubdomainEnumEngine::with_resolver(config(&["www"], 1, 1), fake).unwrap();
    let report = engine.run(None).await;
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["enumeration_type"], "brute");
    assert!(json.get("records").is_none());
}

#[tokio::test]
async fn test_miss_is_not_an_error() {
    let fake = FakeResolver::new(&[], Duration::ZERO);
    let engine = SubdomainEnumEngine::with_resolver(config(&["www", "api"], 3, 2), fake.clone())
        .unwrap();
    let report = engine.run(None).await;

    assert!(report.subdomains.is_empty());
    assert!(report.errors.is_empty());
    assert!(!report.cancelled);
    assert_eq!(report.levels.len(), 1);
    assert_eq!(fake.queried().len(), 2);
}

#[tokio::test]
async fn test_config_error_reported_without_work() {
    let mut cfg = config(&[], 3, 2);
    cfg.wordlist = Some(WordlistSource::File("/nonexistent/rsubrecon/words.txt".into()));
    let report = brute_force_subdomains(cfg, None).await;

    assert_eq!(report.domain, "example.com");
    assert_eq!(report.enumeration_type, EnumerationType::Brute);
    assert!(report.subdomains.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("could not open wordlist"));
}

#[test]
fn test_engine_rejects_empty_wordlist() {
    let fake = FakeResolver::new(&[], Duration::ZERO);
    let result = SubdomainEnumEngine::with_resolver(config(&[], 1, 1), fake);
    assert!(result.is_err());
}
