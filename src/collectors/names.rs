//! Prometheus naming rules.

/// Check a metric name against `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

/// Check a label name against `[a-zA-Z_][a-zA-Z0-9_]*`, rejecting the
/// reserved `__` prefix.
pub fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Turn an arbitrary path into a valid metric name.
///
/// Invalid characters become `_`, runs of `_` collapse into one, and a
/// leading digit gets an `_` prefix. Trailing underscores are dropped.
pub fn sanitize_metric_name(raw: &str) -> String {
    let mut result = String::with_capacity(raw.len() + 1);
    let mut last_was_underscore = false;

    if raw.starts_with(|c: char| c.is_ascii_digit()) {
        result.push('_');
        last_was_underscore = true;
    }

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == ':' {
            result.push(c);
            last_was_underscore = false;
        } else if !last_was_underscore {
            result.push('_');
            last_was_underscore = true;
        }
    }

    while result.len() > 1 && result.ends_with('_') {
        result.pop();
    }

    result
}

/// Join a prefix and a name with `_`, or return the name alone.
pub fn prefixed(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}_{}", p, name),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_metric_names() {
        assert!(is_valid_metric_name("value"));
        assert!(is_valid_metric_name("_hidden"));
        assert!(is_valid_metric_name("ns:cpu_load"));
        assert!(!is_valid_metric_name(""));
        assert!(!is_valid_metric_name("1value"));
        assert!(!is_valid_metric_name("with-dash"));
        assert!(!is_valid_metric_name("with space"));
    }

    #[test]
    fn test_valid_label_names() {
        assert!(is_valid_label_name("host"));
        assert!(is_valid_label_name("_x"));
        assert!(!is_valid_label_name("__reserved"));
        assert!(!is_valid_label_name("a:b"));
        assert!(!is_valid_label_name(""));
    }

    #[test]
    fn test_sanitize_metric_name() {
        assert_eq!(sanitize_metric_name("metrics.cpu.load"), "metrics_cpu_load");
        assert_eq!(sanitize_metric_name("items[0].size"), "items_0_size");
        assert_eq!(sanitize_metric_name("0day"), "_0day");
        assert_eq!(sanitize_metric_name("a..b"), "a_b");
        assert!(is_valid_metric_name(&sanitize_metric_name("héllo wörld")));
    }

    #[test]
    fn test_prefixed() {
        assert_eq!(prefixed(Some("cluster"), "hosts"), "cluster_hosts");
        assert_eq!(prefixed(Some(""), "hosts"), "hosts");
        assert_eq!(prefixed(None, "hosts"), "hosts");
    }
}
