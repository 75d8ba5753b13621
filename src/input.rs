use std::fs::File;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::error::EnumError;

/// 输出格式枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
    Txt,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "txt" => Ok(OutputFormat::Txt),
            _ => Err(format!("不支持的输出格式: {}。支持的格式: json, csv, txt", s)),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rsubrecon")]
#[command(author = "gelenlen")]
#[command(version)]
#[command(about = "Recursive subdomain brute-force and DNS recon", long_about = None, arg_required_else_help = true)]
pub struct Opts {
    /// verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// output file path, stdout when omitted
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// output format (json, csv, txt)
    #[arg(long, global = true, default_value = "json")]
    pub format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Brute-force enumerate subdomains for a given domain
    Brute(BruteArgs),
    /// Gather DNS records for a given domain
    Records {
        /// domain to get DNS records for
        #[arg(short, long)]
        domain: String,
    },
    /// Gather certificate transparency entries for a given domain
    #[cfg(feature = "certs")]
    Certs {
        /// domain to get certs for
        #[arg(short, long)]
        domain: String,
    },
    /// Query Shodan for information
    #[cfg(feature = "shodan")]
    Shodan {
        #[command(subcommand)]
        command: ShodanCommand,
    },
    /// Detect domain takeovers given targets
    #[cfg(feature = "takeover")]
    Takeover(TakeoverArgs),
}

#[cfg(feature = "shodan")]
#[derive(Subcommand, Debug)]
pub enum ShodanCommand {
    /// Query Shodan for a hostname string search
    Hostname(ShodanHostnameArgs),
}

#[cfg(feature = "shodan")]
#[derive(Args, Debug)]
pub struct ShodanHostnameArgs {
    /// Shodan API key
    #[arg(long, env = "SHODAN_API_KEY", hide_env_values = true)]
    pub apikey: Option<String>,

    /// query string to search Shodan for
    #[arg(long)]
    pub query: String,

    /// hostname suffix every kept record must contain
    #[arg(long, default_value = "")]
    pub hostname: String,
}

#[derive(Args, Debug)]
pub struct BruteArgs {
    /// need scan domain
    #[arg(short, long)]
    pub domain: String,

    /// comma-separated wordlist
    #[arg(short, long)]
    pub wordlist: Option<String>,

    /// wordlist file, one label per line
    #[arg(short = 'f', long)]
    pub wordlist_file: Option<PathBuf>,

    /// use the built-in wordlist
    #[arg(long, conflicts_with_all = ["wordlist", "wordlist_file"])]
    pub builtin: bool,

    /// number of concurrent lookups
    #[arg(long, default_value_t = 10)]
    pub workers: usize,

    /// per-lookup timeout in seconds
    #[arg(short, long, default_value_t = 30)]
    pub timeout: u64,

    /// maximum recursion depth
    #[arg(long, default_value_t = 3)]
    pub max_recursion_depth: usize,

    /// maximum minutes for the whole enumeration, 0 for unlimited
    #[arg(long, default_value_t = 10)]
    pub max_enum_minutes: u64,

    /// resolvers ip, use default dns on default
    #[arg(short, long, value_delimiter = ',')]
    pub resolvers: Vec<String>,

    /// fetch DNS records for every discovered subdomain
    #[arg(long)]
    pub resolve_records: bool,

    /// probe the root domain for wildcard records first
    #[arg(long)]
    pub detect_wildcard: bool,
}

#[cfg(feature = "takeover")]
#[derive(Args, Debug)]
pub struct TakeoverArgs {
    /// targets to analyze
    #[arg(short, long, value_delimiter = ',')]
    pub targets: Vec<String>,

    /// files containing targets, one per line
    #[arg(long, value_delimiter = ',')]
    pub files: Vec<PathBuf>,

    /// fingerprints file
    #[arg(long, default_value = "configs/fingerprints.json")]
    pub fingerprints: PathBuf,

    /// only check https
    #[arg(long)]
    pub https: bool,

    /// only report vulnerable targets
    #[arg(long)]
    pub only_vulnerable: bool,

    /// request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout: u64,
}

/// 解析逗号分隔的字典
pub fn parse_comma_separated(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// 从文件加载字典，跳过空行
pub fn load_wordlist(path: &Path) -> Result<Vec<String>, EnumError> {
    let read_err = |source: io::Error| EnumError::WordlistRead {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(read_err)?;
    let reader = io::BufReader::new(file);
    let mut dictionary = Vec::new();

    for line in reader.lines() {
        let line = line.map_err(read_err)?;
        let word = line.trim();
        if !word.is_empty() {
            dictionary.push(word.to_string());
        }
    }

    Ok(dictionary)
}

/// 读取多个文件中的目标，每行一个
pub fn load_lines(paths: &[PathBuf]) -> Result<Vec<String>, io::Error> {
    let mut entries = Vec::new();
    for path in paths {
        let file = File::open(path)?;
        for line in io::BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                entries.push(line.trim().to_string());
            }
        }
    }
    Ok(entries)
}
