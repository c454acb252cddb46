//! Wildcard glob matching used by the access-control engine.
//!
//! `*` matches any run of characters, including `.` — there is no
//! segment-boundary semantics the way there might be in a path glob.

/// Match `value` against `pattern`.
///
/// - `"*"` matches anything.
/// - A pattern with no `*` is compared for exact equality.
/// - Otherwise the pattern is split on `*` into literal fragments: the
///   first fragment (if non-empty) must prefix `value`, each interior
///   fragment must occur in order after the previous match, and the last
///   fragment (if the pattern doesn't end in `*`) must suffix `value`.
pub fn match_pattern(pattern: &str, value: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if !pattern.contains('*') {
        return pattern == value;
    }

    let starts_with_star = pattern.starts_with('*');
    let ends_with_star = pattern.ends_with('*');
    let fragments: Vec<&str> = pattern.split('*').filter(|f| !f.is_empty()).collect();

    if fragments.is_empty() {
        // Pattern was made up entirely of `*` characters.
        return true;
    }

    let mut cursor = 0usize;

    // The leading fragment must prefix `value` unless the pattern starts with `*`.
    if !starts_with_star {
        let frag = fragments[0];
        if !value[cursor..].starts_with(frag) {
            return false;
        }
        cursor += frag.len();
    }

    // Interior fragments (neither the consumed prefix nor the trailing suffix,
    // if one is pinned) must occur in order after the last match.
    let start = if starts_with_star { 0 } else { 1 };
    let end = if ends_with_star { fragments.len() } else { fragments.len() - 1 };
    for frag in &fragments[start..end] {
        match value[cursor..].find(frag) {
            Some(pos) => cursor += pos + frag.len(),
            None => return false,
        }
    }

    // The trailing fragment must suffix `value`, at or after `cursor`.
    if !ends_with_star {
        let frag = fragments[fragments.len() - 1];
        return value.len() >= cursor + frag.len() && value.ends_with(frag);
    }

    true
}

/// Reserved ACL caller token for a null (top-level) caller id.
pub const EXTERNAL_CALLER: &str = "@external";

/// Reserved ACL caller token matching identities of kind `"system"`.
pub const SYSTEM_CALLER: &str = "@system";
