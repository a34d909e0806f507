//! Server capability detection by version.

/// Role grants are available on servers newer than this.
pub const ROLE_SUPPORT_VERSION: [u64; 3] = [8, 0, 0];

/// Whether a server reporting `version` (e.g. `8.0.32-log`) supports role
/// membership grants. Unparseable versions are treated as unsupported.
pub fn supports_roles(version: &str) -> bool {
    match parse_version(version) {
        Some(v) => v > ROLE_SUPPORT_VERSION,
        None => false,
    }
}

/// The leading `major.minor.patch` of a version string, missing parts as 0.
fn parse_version(version: &str) -> Option<[u64; 3]> {
    let numeric = version
        .trim()
        .split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .next()?;
    let mut parts = [0; 3];
    for (i, part) in numeric.split('.').filter(|p| !p.is_empty()).take(3).enumerate() {
        parts[i] = part.parse().ok()?;
    }
    if numeric.is_empty() {
        None
    } else {
        Some(parts)
    }
}
