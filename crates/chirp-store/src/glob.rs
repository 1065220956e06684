//! Key pattern matching.
//!
//! `*` matches any run of characters, including none. Every other character,
//! `?` and `[` included, matches only itself.

/// Returns true if `text` matches `pattern`.
pub fn matches(pattern: &str, text: &str) -> bool {
    let mut segments = pattern.split('*');
    let head = segments.next().unwrap_or_default();
    let Some(mut rest) = text.strip_prefix(head) else {
        return false;
    };

    let segments: Vec<&str> = segments.collect();
    let Some((tail, middle)) = segments.split_last() else {
        return rest.is_empty();
    };

    for segment in middle {
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }
    rest.ends_with(tail)
}

/// Returns true if the pattern has no wildcard.
pub fn is_literal(pattern: &str) -> bool {
    !pattern.contains('*')
}

/// Rewrite a pattern for SQLite `GLOB`, where `?` and `[` are also special.
pub fn to_sqlite_glob(pattern: &str) -> String {
    let mut glob = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '?' => glob.push_str("[?]"),
            '[' => glob.push_str("[[]"),
            c => glob.push(c),
        }
    }
    glob
}
