use itertools::iproduct;

use crate::model::Candidate;

/// 由上一层存活域名和字典生成本层候选域名
///
/// 外层遍历父域名，内层按字典顺序遍历，产出 `word.parent`。
/// 父域名需由调用方去重，函数本身不做任何过滤。
pub fn generate_candidates<P, W>(parents: &[P], wordlist: &[W], depth: usize) -> Vec<Candidate>
where
    P: AsRef<str>,
    W: AsRef<str>,
{
    let mut candidates = Vec::with_capacity(parents.len() * wordlist.len());
    for (parent, word) in iproduct!(parents.iter(), wordlist.iter()) {
        let mut domain = String::with_capacity(word.as_ref().len() + 1 + parent.as_ref().len());
        domain.push_str(word.as_ref());
        domain.push('.');
        domain.push_str(parent.as_ref());
        candidates.push(Candidate::new(domain, depth));
    }
    candidates
}
