//! Short wire names for record fields.
//!
//! Every field of a minified schema is assigned the shortest lowercase prefix
//! of its name that no other field of the same schema shares. Allocation runs
//! in rounds of growing prefix length:
//!
//! 1. Group the unresolved names by `lowercase(name[..l])`.
//! 2. A group with one member resolves to the group key.
//! 3. A larger group is carried to round `l + 1` while at least one member is
//!    longer than `l`. If every member is exhausted, each falls back to its
//!    full lowercased name.
//!
//! The result depends only on the set of names, so regenerating a schema
//! reproduces the same table.

use std::collections::BTreeMap;

/// Allocate a short code for every name.
///
/// Names are expected to be distinct. The returned map is keyed by the
/// original name.
pub fn allocate_short_names<S: AsRef<str>>(names: &[S]) -> BTreeMap<String, String> {
    let mut codes = BTreeMap::new();
    let mut remaining: Vec<&str> = names.iter().map(AsRef::as_ref).collect();
    let mut prefix_len = 1;

    while !remaining.is_empty() {
        let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
        for name in &remaining {
            groups.entry(prefix(name, prefix_len)).or_default().push(name);
        }

        let mut carried = Vec::new();
        for (key, members) in groups {
            if let [only] = members.as_slice() {
                codes.insert((*only).to_string(), key);
            } else if members.iter().all(|n| n.chars().count() <= prefix_len) {
                for member in members {
                    codes.insert(member.to_string(), member.to_lowercase());
                }
            } else {
                carried.extend(members);
            }
        }

        remaining = carried;
        prefix_len += 1;
    }

    codes
}

/// Report codes that were handed out more than once.
///
/// This only happens when two names are equal after lowercasing (for example
/// `Id` and `ID`): both are exhausted at the same prefix length and fall back
/// to the same full name. Each entry is `(code, first, second)`.
pub fn find_collisions(codes: &BTreeMap<String, String>) -> Vec<(String, String, String)> {
    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    let mut collisions = Vec::new();

    for (name, code) in codes {
        match owners.get(code.as_str()) {
            Some(first) => collisions.push((code.clone(), (*first).to_string(), name.clone())),
            None => {
                owners.insert(code, name);
            }
        }
    }

    collisions
}

fn prefix(name: &str, len: usize) -> String {
    name.chars().take(len).collect::<String>().to_lowercase()
}
