//! Watch-scope handling for the operator process.
//!
//! The scope is supplied as a comma-separated namespace list; the single empty
//! entry is the sentinel for cluster-wide operation.

/// Splits a comma-separated namespace list into its entries, trimming
/// surrounding whitespace from each one.
pub fn parse_watch_namespaces(raw: &str) -> Vec<String> {
    raw.split(',').map(|entry| entry.trim().to_owned()).collect()
}

/// A watch scope is cluster-wide exactly when it consists of a single empty
/// entry. Any named namespace, even alongside an empty entry, scopes the
/// operator down.
pub fn is_cluster_wide(namespaces: &[String]) -> bool {
    matches!(namespaces, [only] if only.is_empty())
}
