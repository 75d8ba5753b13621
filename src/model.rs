use serde::{Deserialize, Serialize};

/// 待解析的候选域名
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub domain: String, // 完整域名
    pub depth: usize,   // 域名层级，根域名下一层为1
}

impl Candidate {
    pub fn new(domain: impl Into<String>, depth: usize) -> Self {
        Candidate {
            domain: domain.into(),
            depth,
        }
    }
}

/// 枚举方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnumerationType {
    #[default]
    Brute,
}

/// 单层扫描统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
    pub depth: usize,
    pub parents: usize,
    pub candidates: usize,
    pub resolved: usize,
}

