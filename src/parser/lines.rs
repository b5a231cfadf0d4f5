use std::sync::LazyLock;

use regex::Regex;

static TOP_BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*\s+(.*)$").unwrap());
static SUB_BULLET_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s+\*\s+(.*)$").unwrap());
static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#{1,6}\s+(.+)$").unwrap());

/// What a single physical line is. Bullet and continuation payloads are
/// already trimmed and stripped of their marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind {
    Heading(String),
    TopBullet(String),
    SubBullet(String),
    Continuation(String),
    Blank,
}

/// Ordered rules: top bullet, sub bullet, heading, blank, continuation.
pub fn classify_line(line: &str) -> LineKind {
    if let Some(caps) = TOP_BULLET_RE.captures(line) {
        return LineKind::TopBullet(caps[1].trim().to_string());
    }
    if let Some(caps) = SUB_BULLET_RE.captures(line) {
        return LineKind::SubBullet(caps[1].trim().to_string());
    }

    let trimmed = line.trim();
    if let Some(caps) = HEADING_RE.captures(trimmed) {
        return LineKind::Heading(caps[1].trim().to_string());
    }
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    LineKind::Continuation(trimmed.to_string())
}

pub fn classify_lines(text: &str) -> Vec<LineKind> {
    text.lines().map(classify_line).collect()
}
