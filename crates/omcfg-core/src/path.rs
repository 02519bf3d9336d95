//! Dotted path helpers.

/// Join a prefix and a name with a dot. An empty prefix yields the name.
pub fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Split `a.b.c` into `(Some("a.b"), "c")`; a single segment has no parent.
pub fn split_last(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('.') {
        Some((parent, last)) => (Some(parent), last),
        None => (None, path),
    }
}

/// Whether every segment of the path is non-empty and free of whitespace.
pub fn is_well_formed(path: &str) -> bool {
    !path.is_empty()
        && path
            .split('.')
            .all(|seg| !seg.is_empty() && !seg.chars().any(char::is_whitespace))
}
