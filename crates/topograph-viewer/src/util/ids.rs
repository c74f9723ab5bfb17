use topograph_core::Node;

/// Bucket used for coloring and host filtering. Blank or missing hostnames
/// all land in `default_key`.
pub fn host_key<'a>(hostname: Option<&'a str>, default_key: &'a str) -> &'a str {
    match hostname.map(str::trim) {
        Some(h) if !h.is_empty() => h,
        _ => default_key,
    }
}

pub fn node_host_key<'a>(node: &'a Node, default_key: &'a str) -> &'a str {
    host_key(node.hostname(), default_key)
}
