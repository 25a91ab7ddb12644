use std::net::IpAddr;

/// Validate a hostname.
/// Allows alphanumeric, hyphens, dots, and underscores. No path separators or shell metacharacters.
/// Hostnames become file names, so ".." on its own is rejected too.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 || hostname == "." || hostname == ".." {
        return false;
    }
    hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

/// Validate a management address: an IP address or a DNS name.
/// Numeric forms are parsed strictly, so "010.0.0.1" is rejected rather than
/// left for the resolver to read as octal. A DNS name must not end in a
/// numeric or hex label, which inet_aton would also turn into an address.
pub fn is_valid_management_address(addr: &str) -> bool {
    if addr.parse::<IpAddr>().is_ok() {
        return true;
    }
    if addr.chars().all(|c| c.is_ascii_digit() || c == '.') || addr.contains(':') {
        return false;
    }
    if !is_valid_hostname(addr) || addr.contains('_') {
        return false;
    }
    let last = addr.rsplit('.').next().unwrap_or(addr).to_ascii_lowercase();
    let numeric = last.chars().all(|c| c.is_ascii_digit());
    let hex = last.strip_prefix("0x").is_some_and(|h| h.chars().all(|c| c.is_ascii_hexdigit()));
    !last.is_empty() && !numeric && !hex
}
