use std::sync::LazyLock;

use regex::Regex;

use super::attribution::LINK_RE;

static COLON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([^:]{3,}?)\s*:\s*(.+)$").unwrap());
static COROLLARY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)corollary").unwrap());
static KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(murphy|cole|law|rule|principle|theory|paradox)\b").unwrap()
});
static RESPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(.*?)(?:\s*(?:[–—:;]+|-{2,})\s*|\s{2,})(.+)$").unwrap()
});

/// Titles longer than this are accepted without a keyword.
const LONG_TITLE_CHARS: usize = 12;
/// A link must start before this fraction of the body to trigger a re-split.
const LINK_POSITION_LIMIT: f64 = 0.7;
const MIN_PART_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitOutcome {
    Titled { title: String, body: String },
    Untitled { body: String },
}

impl SplitOutcome {
    pub fn into_parts(self) -> (Option<String>, String) {
        match self {
            SplitOutcome::Titled { title, body } => (Some(title), body),
            SplitOutcome::Untitled { body } => (None, body),
        }
    }
}

/// First colon with at least three characters before it and something after.
pub fn split_at_colon(text: &str) -> Option<(&str, &str)> {
    let caps = COLON_RE.captures(text)?;
    let title = caps.get(1)?.as_str().trim();
    let body = caps.get(2)?.as_str().trim();
    if body.is_empty() {
        return None;
    }
    Some((title, body))
}

pub fn is_title_like(candidate: &str) -> bool {
    COROLLARY_RE.is_match(candidate)
        || KEYWORD_RE.is_match(candidate)
        || candidate.chars().count() > LONG_TITLE_CHARS
}

/// Colon split with keyword/length acceptance. Used directly for sub-bullets.
pub fn split_label(clean_text: &str) -> SplitOutcome {
    match split_at_colon(clean_text) {
        Some((title, body)) if is_title_like(title) => SplitOutcome::Titled {
            title: title.to_string(),
            body: normalize_text(body),
        },
        _ => SplitOutcome::Untitled {
            body: normalize_text(clean_text),
        },
    }
}

/// Full splitter for top-level entries: colon split, then the link-position
/// re-split when no title was accepted.
pub fn split_title(clean_text: &str) -> SplitOutcome {
    if let Some((title, body)) = split_at_colon(clean_text) {
        if is_title_like(title) {
            return SplitOutcome::Titled {
                title: title.to_string(),
                body: normalize_text(body),
            };
        }
    }
    if let Some((title, body)) = split_before_link(clean_text) {
        return SplitOutcome::Titled {
            title: title.to_string(),
            body: normalize_text(body),
        };
    }
    SplitOutcome::Untitled {
        body: normalize_text(clean_text),
    }
}

/// Recover a title separated from its body by a dash, colon, semicolon or
/// double space, when a link sits early in the text and ends up in the body.
fn split_before_link(body: &str) -> Option<(&str, &str)> {
    let link = LINK_RE.find(body)?;
    if link.start() as f64 >= body.len() as f64 * LINK_POSITION_LIMIT {
        return None;
    }
    let caps = RESPLIT_RE.captures(body)?;
    let head = caps.get(1)?.as_str().trim();
    let tail = caps.get(2)?.as_str().trim();
    if head.chars().count() > MIN_PART_CHARS
        && tail.chars().count() > MIN_PART_CHARS
        && tail.contains(link.as_str())
    {
        Some((head, tail))
    } else {
        None
    }
}

/// Straighten quotes and dashes, then drop one stray quote at either end.
pub fn normalize_text(text: &str) -> String {
    let mut straightened = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{201C}' | '\u{201D}' | '\u{201E}' => straightened.push('"'),
            '\u{2018}' | '\u{2019}' => straightened.push('\''),
            '\u{2013}' => straightened.push('-'),
            '\u{2014}' => straightened.push_str("--"),
            other => straightened.push(other),
        }
    }
    let mut s = straightened.trim();
    if let Some(rest) = s.strip_prefix(['"', '\'']) {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix(['"', '\'']) {
        s = rest;
    }
    s.trim().to_string()
}

#[cfg(test)]
impl SplitOutcome {
    fn title(&self) -> Option<&str> {
        match self {
            SplitOutcome::Titled { title, .. } => Some(title),
            SplitOutcome::Untitled { .. } => None,
        }
    }

    fn body(&self) -> &str {
        match self {
            SplitOutcome::Titled { body, .. } | SplitOutcome::Untitled { body } => body,
        }
    }
}
