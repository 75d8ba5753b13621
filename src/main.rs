use std::path::Path;
use std::time::Duration;

use clap::Parser;
use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use rsubrecon::input::{BruteArgs, Command, Opts, OutputFormat};
use rsubrecon::logger::init_logger;
use rsubrecon::output::export_results;
use rsubrecon::records::DnsRecordFetcher;
use rsubrecon::subdata;
use rsubrecon::{brute_force_subdomains, SubdomainEnumConfig, WordlistSource};

#[tokio::main]
async fn main() {
    let opts = Opts::parse();

    if let Err(e) = init_logger(opts.verbose, opts.quiet) {
        eprintln!("日志初始化失败: {}", e);
    }

    let format = opts.format.parse::<OutputFormat>().unwrap_or_else(|e| {
        warn!("输出格式解析错误: {}, 使用默认JSON格式", e);
        OutputFormat::Json
    });
    let output = opts.output.as_deref();

    let result = match opts.command {
        Command::Brute(args) => run_brute(args, output, format).await,
        Command::Records { domain } => run_records(&domain, output, format).await,
        #[cfg(feature = "certs")]
        Command::Certs { domain } => run_certs(&domain, output, format).await,
        #[cfg(feature = "shodan")]
        Command::Shodan { command } => run_shodan(command, output, format).await,
        #[cfg(feature = "takeover")]
        Command::Takeover(args) => run_takeover(args, output, format).await,
    };

    if let Err(e) = result {
        error!("执行失败: {}", e);
        std::process::exit(1);
    }
}

/// Ctrl-C 中止当前任务，仍然输出已得到的结果；再按一次立即退出
fn spawn_interrupt_handler(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("收到中断信号，正在停止... 再次按下 Ctrl-C 立即退出");
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    })
}

/// 执行子域名暴破
async fn run_brute(
    args: BruteArgs,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    // 字典参数有误时交给配置校验统一报告
    let wordlist = if args.builtin {
        Some(WordlistSource::Inline(subdata::get_default_sub_next_data()))
    } else {
        WordlistSource::from_args(args.wordlist.as_deref(), args.wordlist_file).ok()
    };

    let config = SubdomainEnumConfig {
        domain: args.domain,
        wordlist,
        concurrency: args.workers,
        max_depth: args.max_recursion_depth,
        lookup_timeout: Duration::from_secs(args.timeout),
        max_duration: SubdomainEnumConfig::minutes(args.max_enum_minutes),
        resolvers: args.resolvers,
        resolve_records: args.resolve_records,
        detect_wildcard: args.detect_wildcard,
    };

    let cancel = CancellationToken::new();
    let ctrl_c = spawn_interrupt_handler(cancel.clone());
    let report = brute_force_subdomains(config, Some(&cancel)).await;
    ctrl_c.abort();

    for e in &report.errors {
        warn!("{}", e);
    }
    info!("共发现 {} 个子域名", report.subdomains.len());

    export_results(&report, output, format)
}

/// 查询单个域名的DNS记录
async fn run_records(
    domain: &str,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let fetcher = DnsRecordFetcher::new(&[])?;
    let cancel = CancellationToken::new();
    let ctrl_c = spawn_interrupt_handler(cancel.clone());
    let report = fetcher.fetch(domain, &cancel).await;
    ctrl_c.abort();
    for e in &report.errors {
        warn!("{}", e);
    }
    export_results(&report, output, format)
}

#[cfg(feature = "certs")]
async fn run_certs(
    domain: &str,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()?;
    let report = rsubrecon::certs::get_domain_certs(&client, domain).await;
    for e in &report.errors {
        warn!("{}", e);
    }
    export_results(&report, output, format)
}

#[cfg(feature = "shodan")]
async fn run_shodan(
    command: rsubrecon::input::ShodanCommand,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    use rsubrecon::input::ShodanCommand;
    use rsubrecon::shodan::query_host_strict_hostname_match;

    match command {
        ShodanCommand::Hostname(args) => {
            let api_key = args
                .apikey
                .filter(|k| !k.is_empty())
                .ok_or("either SHODAN_API_KEY environment variable or --apikey must be set")?;
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(60))
                .build()?;
            let report =
                query_host_strict_hostname_match(&client, &api_key, &args.query, &args.hostname)
                    .await;
            for e in &report.errors {
                warn!("{}", e);
            }
            export_results(&report, output, format)
        }
    }
}

#[cfg(feature = "takeover")]
async fn run_takeover(
    args: rsubrecon::input::TakeoverArgs,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    use rsubrecon::input::load_lines;
    use rsubrecon::takeover::{detect_domain_takeover, load_fingerprints, TakeoverOptions};

    let mut targets = args.targets;
    targets.extend(load_lines(&args.files)?);
    if targets.is_empty() {
        return Err("no targets specified".into());
    }

    let fingerprints = load_fingerprints(&args.fingerprints)?;
    let options = TakeoverOptions {
        https_only: args.https,
        only_vulnerable: args.only_vulnerable,
        timeout: Duration::from_secs(args.timeout),
    };

    let report = detect_domain_takeover(&targets, &fingerprints, &options).await?;
    for e in &report.errors {
        warn!("{}", e);
    }
    export_results(&report, output, format)
}
