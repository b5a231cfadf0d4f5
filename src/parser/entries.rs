use tracing::debug;

use super::lines::LineKind;
use crate::model::SourceKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    Top,
    Sub,
}

/// One logical bullet: the bullet line plus its continuation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: SourceKey,
    pub raw_text: String,
    pub depth: Depth,
}

/// A top-level entry and the sub-entries directly beneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct LawBlock {
    pub entry: Entry,
    pub children: Vec<Entry>,
}

#[derive(Debug, Clone, Default)]
pub struct Outline {
    /// First heading in the document, if any.
    pub heading: Option<String>,
    pub blocks: Vec<LawBlock>,
    /// Bullets dropped because they were empty or had no parent.
    pub skipped: usize,
}

/// Group classified lines into law blocks. Assembly of a block stops at the
/// next top bullet, a blank line, a heading, or end of input.
pub fn assemble(path: &str, kinds: &[LineKind]) -> Outline {
    let mut outline = Outline::default();
    let mut i = 0;

    while i < kinds.len() {
        match &kinds[i] {
            LineKind::Heading(text) => {
                if outline.heading.is_none() {
                    outline.heading = Some(text.clone());
                }
                i += 1;
            }
            LineKind::TopBullet(first) => {
                let (raw, mut j) = gather(kinds, i, first);
                let mut children = Vec::new();
                while let Some(LineKind::SubBullet(sub_first)) = kinds.get(j) {
                    let (sub_raw, next) = gather(kinds, j, sub_first);
                    if sub_raw.is_empty() {
                        debug!(path, line = j + 1, "skipping empty sub-bullet");
                        outline.skipped += 1;
                    } else {
                        children.push(Entry {
                            key: SourceKey::new(path, line_number(j)),
                            raw_text: sub_raw,
                            depth: Depth::Sub,
                        });
                    }
                    j = next;
                }

                if raw.is_empty() {
                    debug!(path, line = i + 1, dropped = children.len(), "skipping empty bullet");
                    outline.skipped += 1 + children.len();
                } else {
                    outline.blocks.push(LawBlock {
                        entry: Entry {
                            key: SourceKey::new(path, line_number(i)),
                            raw_text: raw,
                            depth: Depth::Top,
                        },
                        children,
                    });
                }
                i = j;
            }
            LineKind::SubBullet(_) => {
                debug!(path, line = i + 1, "skipping sub-bullet without a parent");
                outline.skipped += 1;
                i += 1;
            }
            LineKind::Continuation(_) | LineKind::Blank => i += 1,
        }
    }

    outline
}

/// Join a bullet's own text with its trailing continuation lines.
/// Returns the joined text and the index of the first line not consumed.
fn gather(kinds: &[LineKind], start: usize, first: &str) -> (String, usize) {
    let mut parts: Vec<&str> = Vec::new();
    if !first.is_empty() {
        parts.push(first);
    }
    let mut j = start + 1;
    while let Some(LineKind::Continuation(text)) = kinds.get(j) {
        parts.push(text);
        j += 1;
    }
    (parts.join(" "), j)
}

fn line_number(idx: usize) -> u32 {
    u32::try_from(idx + 1).unwrap_or(u32::MAX)
}
