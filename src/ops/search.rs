use crate::model::friend::FriendRegistry;
use crate::model::record::Ledger;

/// A friend matching a filter, with its position in the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FriendHit<'a> {
    pub index: usize,
    pub name: &'a str,
}

/// Normalize a user-typed keyword: trimmed and lowercased.
fn normalize(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

fn matches(name: &str, keyword: &str) -> bool {
    keyword.is_empty() || name.to_lowercase().contains(keyword)
}

/// Friends whose name contains `keyword`, case-insensitively. Registry
/// order is kept so indices can be handed back to rename/remove.
pub fn filter_friends<'a>(registry: &'a FriendRegistry, keyword: &str) -> Vec<FriendHit<'a>> {
    let keyword = normalize(keyword);
    registry
        .iter()
        .enumerate()
        .filter(|(_, f)| matches(&f.name, &keyword))
        .map(|(index, f)| FriendHit {
            index,
            name: f.name.as_str(),
        })
        .collect()
}

/// Distinct postcard names containing `keyword`, sorted.
pub fn filter_postcards<'a>(ledger: &'a Ledger, keyword: &str) -> Vec<&'a str> {
    let keyword = normalize(keyword);
    let mut names: Vec<&str> = ledger
        .distinct_postcard_names()
        .into_iter()
        .filter(|name| matches(name, &keyword))
        .collect();
    names.sort_unstable();
    names
}
