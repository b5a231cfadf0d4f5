pub mod attribution;
pub mod relation;
pub mod title;

use super::entries::{Depth, Entry};
use crate::model::{AttributionDraft, Law, RelationType};
use attribution::extract_attributions;

/// A law ready for emission, with the attributions pulled out of its text.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledLaw {
    pub law: Law,
    pub attributions: Vec<AttributionDraft>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSub {
    pub compiled: CompiledLaw,
    pub relation_type: RelationType,
    pub note: Option<String>,
}

/// Top-level entries get the full title splitter; sub-entries only the
/// colon-label split.
fn compile_law(entry: &Entry) -> (CompiledLaw, String) {
    let extracted = extract_attributions(&entry.raw_text);
    let split = match entry.depth {
        Depth::Top => title::split_title(&extracted.clean_text),
        Depth::Sub => title::split_label(&extracted.clean_text),
    };
    let (title, text) = split.into_parts();
    let compiled = CompiledLaw {
        law: Law {
            key: entry.key.clone(),
            title,
            text,
            raw_markdown: entry.raw_text.clone(),
        },
        attributions: extracted.attributions,
    };
    (compiled, extracted.clean_text)
}

pub fn compile_top(entry: &Entry) -> CompiledLaw {
    compile_law(entry).0
}

pub fn compile_sub(entry: &Entry) -> CompiledSub {
    let (compiled, clean_text) = compile_law(entry);
    let (relation_type, note) = relation::classify_relation(&clean_text);
    CompiledSub {
        compiled,
        relation_type,
        note,
    }
}
