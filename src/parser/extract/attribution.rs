use std::sync::LazyLock;

use regex::Regex;

use crate::model::{AttributionDraft, ContactType};

pub(crate) static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").unwrap());
static SENT_BY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bsent\s+by\b").unwrap());
static HTTP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^https?://").unwrap());
static NAME_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*?)(?:\s*[-–—:,;()]+\s*|\s{2,})(.+)$").unwrap());

const MAILTO: &str = "mailto:";
const NOTE_LEAD: &[char] = &['-', '–', '—', ':', ',', ';', '(', ')'];

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub clean_text: String,
    pub attributions: Vec<AttributionDraft>,
}

struct LinkSpan<'a> {
    start: usize,
    end: usize,
    label: &'a str,
    target: &'a str,
}

/// A "sent by ..." sentence. `link` indexes the first link inside it, if any.
struct SentBy {
    start: usize,
    body_start: usize,
    end: usize,
    link: Option<usize>,
}

enum Cut<'a> {
    Replace { start: usize, end: usize, label: &'a str },
    Remove { start: usize, end: usize },
}

impl Cut<'_> {
    fn span(&self) -> (usize, usize) {
        match self {
            Cut::Replace { start, end, .. } | Cut::Remove { start, end } => (*start, *end),
        }
    }
}

/// Pull attributions out of an entry's raw text.
///
/// Every `[label](target)` link becomes an attribution named after its label
/// and is replaced by that label in the clean text. A "sent by" sentence gives
/// the link inside it a trailing note; without a link the whole sentence is a
/// plain-text attribution and is removed from the clean text.
pub fn extract_attributions(raw: &str) -> Extraction {
    let links: Vec<LinkSpan> = LINK_RE
        .captures_iter(raw)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(LinkSpan {
                start: whole.start(),
                end: whole.end(),
                label: caps.get(1)?.as_str(),
                target: caps.get(2)?.as_str(),
            })
        })
        .collect();
    let sentences = find_sent_by(raw, &links);

    let mut found: Vec<(usize, AttributionDraft)> = Vec::new();
    let mut cuts: Vec<Cut> = Vec::new();

    for (idx, link) in links.iter().enumerate() {
        cuts.push(Cut::Replace {
            start: link.start,
            end: link.end,
            label: link.label,
        });
        let name = link.label.trim();
        let target = link.target.trim();
        if name.is_empty() || target.is_empty() {
            continue;
        }
        let note = sentences
            .iter()
            .find(|s| s.link == Some(idx))
            .and_then(|s| trim_note(&raw[link.end..s.end]));
        let (contact_type, contact_value) = classify_target(target);
        found.push((
            link.start,
            AttributionDraft {
                name: name.to_string(),
                contact_type,
                contact_value,
                note,
                source_fragment: raw[link.start..link.end].to_string(),
            },
        ));
    }

    for s in sentences.iter().filter(|s| s.link.is_none()) {
        let body = raw[s.body_start..s.end].trim().trim_end_matches('.');
        let (name, note) = split_name(body);
        if name.is_empty() {
            continue;
        }
        cuts.push(Cut::Remove {
            start: s.start,
            end: s.end,
        });
        found.push((
            s.start,
            AttributionDraft {
                name: name.to_string(),
                contact_type: ContactType::Text,
                contact_value: name.to_string(),
                note,
                source_fragment: raw[s.start..s.end].to_string(),
            },
        ));
    }

    found.sort_by_key(|(pos, _)| *pos);
    cuts.sort_by_key(|c| c.span().0);

    Extraction {
        clean_text: apply_cuts(raw, &cuts),
        attributions: found.into_iter().map(|(_, a)| a).collect(),
    }
}

fn find_sent_by(raw: &str, links: &[LinkSpan]) -> Vec<SentBy> {
    let mut out = Vec::new();
    let mut last_end = 0;
    for m in SENT_BY_RE.find_iter(raw) {
        let inside_link = links.iter().any(|l| l.start <= m.start() && m.start() < l.end);
        if m.start() < last_end || inside_link {
            continue;
        }
        let cursor = m.end();
        // The next link claims the sentence even across an abbreviation's period.
        let link = links.iter().position(|l| l.start >= cursor);
        let from = link.map_or(cursor, |i| links[i].end);
        let end = raw[from..].find('.').map_or(raw.len(), |p| from + p + 1);
        out.push(SentBy {
            start: m.start(),
            body_start: cursor,
            end,
            link,
        });
        last_end = end;
    }
    out
}

/// Name up to the first dash, colon, comma, semicolon or parenthesis run;
/// the remainder is the note.
fn split_name(body: &str) -> (&str, Option<String>) {
    match NAME_SPLIT_RE.captures(body) {
        Some(caps) => {
            let name = caps.get(1).map_or("", |m| m.as_str()).trim();
            let note = caps.get(2).and_then(|m| trim_note(m.as_str()));
            (name.trim_end_matches(',').trim_end(), note)
        }
        None => (body.trim(), None),
    }
}

fn classify_target(target: &str) -> (ContactType, String) {
    let is_mailto = target
        .get(..MAILTO.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(MAILTO));
    if is_mailto {
        let addr: String = target[MAILTO.len()..].split_whitespace().collect();
        (ContactType::Email, addr)
    } else if HTTP_RE.is_match(target) {
        (ContactType::Url, target.split_whitespace().collect())
    } else {
        (ContactType::Text, target.to_string())
    }
}

fn trim_note(s: &str) -> Option<String> {
    let note = s
        .trim_end()
        .trim_end_matches('.')
        .trim_start_matches(|c: char| c.is_whitespace() || NOTE_LEAD.contains(&c))
        .trim();
    let note = if note.ends_with(')') && !note.contains('(') {
        note.trim_end_matches(')').trim_end()
    } else {
        note
    };
    if note.is_empty() {
        None
    } else {
        Some(note.to_string())
    }
}

/// Rebuild the text with links collapsed to their labels and removed
/// sentences squeezed out.
fn apply_cuts(raw: &str, cuts: &[Cut]) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pos = 0;
    let mut squeeze = false;

    for cut in cuts {
        let (start, end) = cut.span();
        if start < pos {
            continue;
        }
        let seg = &raw[pos..start];
        out.push_str(if squeeze { seg.trim_start() } else { seg });
        squeeze = false;
        match cut {
            Cut::Replace { label, .. } => out.push_str(label),
            Cut::Remove { .. } => {
                let keep = out.trim_end().len();
                out.truncate(keep);
                if !out.is_empty() {
                    out.push(' ');
                }
                squeeze = true;
            }
        }
        pos = end;
    }
    let tail = &raw[pos..];
    out.push_str(if squeeze { tail.trim_start() } else { tail });
    out.trim().to_string()
}
