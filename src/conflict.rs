//! Duplicate proxy name resolution
//!
//! Clash rejects configurations with two proxies of the same name, and
//! subscriptions routinely reuse names. Later duplicates get the smallest free
//! `_N` suffix, and group member lists are rewritten so the k-th reference to
//! a name points at the k-th proxy that carried it.

use crate::descriptor::ProxyDescriptor;
use crate::group::ProxyGroup;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Name used for a proxy whose name is blank.
const BLANK_NAME: &str = "proxy";

/// Renames duplicate proxies in place and rewrites group references.
///
/// Both slices are mutated in place. Within each group list the n-th
/// occurrence of a base name maps to the n-th assigned variant; once the
/// variants run out the last one is reused. Names with no matching proxy are
/// left untouched.
///
/// # Example
///
/// ```rust
/// use clash_link_serde::{GroupType, ProxyGroup, parse_link, resolve_name_conflicts};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut proxies = vec![
///     parse_link("trojan://a@h1:443#srv")?,
///     parse_link("trojan://b@h2:443#srv")?,
/// ];
/// let mut group = ProxyGroup::new("G", GroupType::Select);
/// group.proxies = vec!["srv".into(), "srv".into()];
/// let mut groups = vec![group];
///
/// resolve_name_conflicts(&mut proxies, &mut groups);
/// assert_eq!(proxies[1].name, "srv_1");
/// assert_eq!(groups[0].proxies, vec!["srv", "srv_1"]);
/// # Ok(())
/// # }
/// ```
pub fn resolve_name_conflicts(proxies: &mut [ProxyDescriptor], groups: &mut [ProxyGroup]) {
    if proxies.is_empty() {
        return;
    }

    let mut used: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut variants: HashMap<String, Vec<String>> = HashMap::new();

    for proxy in proxies.iter_mut() {
        let trimmed = proxy.name.trim();
        let base = if trimmed.is_empty() {
            BLANK_NAME.to_string()
        } else {
            trimmed.to_string()
        };

        let name = if used.contains(&base) {
            let mut idx = counters.get(&base).copied().unwrap_or(1);
            while used.contains(&format!("{}_{}", base, idx)) {
                idx += 1;
            }
            counters.insert(base.clone(), idx + 1);
            format!("{}_{}", base, idx)
        } else {
            counters.entry(base.clone()).or_insert(1);
            base.clone()
        };

        if name != proxy.name {
            debug!("Renamed proxy '{}' to '{}'", proxy.name, name);
        }
        used.insert(name.clone());
        variants.entry(base).or_default().push(name.clone());
        proxy.name = name;
    }

    for group in groups.iter_mut() {
        remap(&mut group.proxies, &variants);
        remap(&mut group.manual, &variants);
    }
}

fn remap(list: &mut [String], variants: &HashMap<String, Vec<String>>) {
    let mut usage: HashMap<String, usize> = HashMap::new();
    for entry in list.iter_mut() {
        let base = entry.trim().to_string();
        let Some(names) = variants.get(&base).filter(|v| !v.is_empty()) else {
            continue;
        };
        let used = usage.entry(base).or_insert(0);
        let idx = (*used).min(names.len() - 1);
        *used += 1;
        *entry = names[idx].clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ProxyType;
    use crate::group::GroupType;

    fn proxy(name: &str) -> ProxyDescriptor {
        ProxyDescriptor::new(ProxyType::Trojan, name.to_string(), "h".to_string(), 1)
    }

    fn names(proxies: &[ProxyDescriptor]) -> Vec<&str> {
        proxies.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn suffixes_skip_taken_names() {
        let mut proxies = vec![proxy("a"), proxy("a_1"), proxy("a"), proxy("a"), proxy(" ")];
        resolve_name_conflicts(&mut proxies, &mut []);
        assert_eq!(names(&proxies), vec!["a", "a_1", "a_2", "a_3", "proxy"]);
    }

    #[test]
    fn group_references_follow_occurrences() {
        let mut proxies = vec![proxy("srv"), proxy("srv"), proxy("other")];
        let mut g = ProxyGroup::new("G", GroupType::Select);
        g.proxies = vec!["srv".into(), "other".into(), "srv".into(), "srv".into()];
        g.manual = vec!["srv".into(), "DIRECT".into()];
        let mut groups = vec![g];

        resolve_name_conflicts(&mut proxies, &mut groups);

        assert_eq!(names(&proxies), vec!["srv", "srv_1", "other"]);
        assert_eq!(groups[0].proxies, vec!["srv", "other", "srv_1", "srv_1"]);
        assert_eq!(groups[0].manual, vec!["srv", "DIRECT"]);
    }

    #[test]
    fn empty_inputs_are_no_ops() {
        let mut g = ProxyGroup::new("G", GroupType::Select);
        g.proxies = vec!["x".into()];
        let mut groups = vec![g];
        resolve_name_conflicts(&mut [], &mut groups);
        assert_eq!(groups[0].proxies, vec!["x"]);

        let mut proxies = vec![proxy("x"), proxy("x")];
        resolve_name_conflicts(&mut proxies, &mut []);
        assert_eq!(names(&proxies), vec!["x", "x_1"]);
    }
}
