//! Parsing of a project's own ignore file into simple path rules.
//!
//! This is deliberately not full gitignore semantics: anchoring is not
//! distinguished from non-anchored patterns, and negation (`!pattern`)
//! is not supported - a negation line is kept as a literal pattern that
//! will not match any real path.

/// One filter rule derived from an ignore-file line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreRule {
    /// An exact path, also covering everything beneath it.
    Literal(String),
    /// A directory pattern written with a trailing separator (`dist/`).
    DirPrefix(String),
    /// An extension wildcard (`*.log`).
    Extension(String),
    /// A leading-prefix wildcard (`temp*`).
    Prefix(String),
}

impl IgnoreRule {
    /// Matches against the candidate path with any leading separator
    /// stripped, so rules apply the same to `/src/a.log` and `src/a.log`.
    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');
        match self {
            IgnoreRule::Literal(p) | IgnoreRule::DirPrefix(p) => {
                path == p || path.starts_with(&format!("{p}/"))
            }
            IgnoreRule::Extension(ext) => path.ends_with(&format!(".{ext}")),
            IgnoreRule::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

/// Parses ignore-file contents into rules.
///
/// Splits on line breaks, trims, drops blanks and `#` comments, and strips
/// one leading separator from each remaining line before classifying it.
pub fn parse(content: &str) -> Vec<IgnoreRule> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| classify(line.strip_prefix('/').unwrap_or(line)))
        .collect()
}

fn classify(pattern: &str) -> IgnoreRule {
    if let Some(dir) = pattern.strip_suffix('/') {
        IgnoreRule::DirPrefix(dir.to_string())
    } else if let Some(ext) = pattern.strip_prefix("*.") {
        IgnoreRule::Extension(ext.to_string())
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        IgnoreRule::Prefix(prefix.to_string())
    } else {
        IgnoreRule::Literal(pattern.to_string())
    }
}
