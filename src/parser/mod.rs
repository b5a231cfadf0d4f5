pub mod entries;
pub mod extract;
pub mod lines;

use crate::model::Category;
use crate::scanner::SourceDocument;
use extract::{CompiledLaw, CompiledSub};

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledBlock {
    pub top: CompiledLaw,
    pub subs: Vec<CompiledSub>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDocument {
    pub category: Category,
    pub blocks: Vec<CompiledBlock>,
    pub skipped: usize,
}

/// Pipeline for one document: lines → outline → extracted, split laws.
pub fn compile_document(doc: &SourceDocument) -> CompiledDocument {
    let kinds = lines::classify_lines(&doc.text);
    let outline = entries::assemble(&doc.path, &kinds);

    let basename = doc.basename();
    let category = Category {
        slug: category_slug(basename),
        title: outline.heading.unwrap_or_else(|| basename.to_string()),
        source_file_path: doc.path.clone(),
    };

    let blocks = outline
        .blocks
        .iter()
        .map(|block| CompiledBlock {
            top: extract::compile_top(&block.entry),
            subs: block.children.iter().map(extract::compile_sub).collect(),
        })
        .collect();

    CompiledDocument {
        category,
        blocks,
        skipped: outline.skipped,
    }
}

/// Category slugs come from the file name so that retitling a document
/// keeps its category identity.
fn category_slug(basename: &str) -> String {
    let slug = slugify(basename);
    if slug.is_empty() {
        "uncategorized".to_string()
    } else {
        slug
    }
}

pub fn slugify(s: &str) -> String {
    let kept: String = s
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationType;
    use pretty_assertions::assert_eq;

    fn fixture(name: &str) -> SourceDocument {
        let text = std::fs::read_to_string(format!("tests/fixtures/{}.md", name)).unwrap();
        SourceDocument::new(format!("murphys-laws/{}.md", name), text)
    }

    #[test]
    fn slugify_basics() {
        assert_eq!(slugify("Murphy's Laws"), "murphys-laws");
        assert_eq!(slugify("  Computers -- and  Tech "), "computers-and-tech");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(category_slug("!!!"), "uncategorized");
    }

    #[test]
    fn category_from_heading_and_basename() {
        let doc = SourceDocument::new("laws/murphys-technology-laws.md", "# Technology\n* a");
        let c = compile_document(&doc).category;
        assert_eq!(c.slug, "murphys-technology-laws");
        assert_eq!(c.title, "Technology");
        assert_eq!(c.source_file_path, "laws/murphys-technology-laws.md");
    }

    #[test]
    fn category_title_falls_back_to_basename() {
        let doc = SourceDocument::new("laws/Misc Laws.md", "* a");
        let c = compile_document(&doc).category;
        assert_eq!(c.title, "Misc Laws");
        assert_eq!(c.slug, "misc-laws");
    }

    #[test]
    fn general_fixture() {
        let doc = compile_document(&fixture("murphys-general-laws"));
        assert_eq!(doc.category.title, "Murphy's General Laws");
        assert_eq!(doc.category.slug, "murphys-general-laws");
        assert_eq!(doc.blocks.len(), 5);

        let first = &doc.blocks[0];
        assert_eq!(first.top.law.key.line_number, 5);
        assert_eq!(first.top.law.title.as_deref(), Some("Murphy's Law"));
        assert_eq!(first.top.law.text, "Anything that can go wrong, will go wrong.");
        assert_eq!(first.subs.len(), 2);
        assert_eq!(first.subs[0].relation_type, RelationType::CorollaryOf);
        assert_eq!(first.subs[0].compiled.law.key.line_number, 6);
        assert_eq!(first.subs[1].relation_type, RelationType::CommentOn);

        let wrapped = &doc.blocks[1];
        assert_eq!(wrapped.top.law.key.line_number, 9);
        assert_eq!(
            wrapped.top.law.raw_markdown,
            "Nothing is as easy as it looks. Everything takes longer than you think."
        );

        let attributed = &doc.blocks[2];
        assert_eq!(attributed.top.attributions.len(), 1);
        assert_eq!(attributed.top.attributions[0].name, "Jane Doe");
        assert_eq!(attributed.top.law.text, "Left to themselves, things go from bad to worse. Jane Doe");

        let noted = &doc.blocks[3];
        assert_eq!(noted.top.law.title, None);
        assert_eq!(noted.top.law.text, "Note: see above");

        let sent = &doc.blocks[4];
        assert_eq!(sent.top.law.text, "If everything seems to be going well, you have obviously overlooked something.");
        assert_eq!(sent.top.attributions[0].name, "Bob Smith");
        assert_eq!(sent.top.attributions[0].note.as_deref(), Some("a reader from Ohio"));

        // the orphaned sub-bullet after the blank line
        assert_eq!(doc.skipped, 1);
    }

    #[test]
    fn headingless_fixture() {
        let doc = compile_document(&fixture("computer-laws"));
        assert_eq!(doc.category.title, "computer-laws");
        assert_eq!(doc.blocks.len(), 3);
        let titles: Vec<_> = doc.blocks.iter().map(|b| b.top.law.title.as_deref()).collect();
        assert_eq!(titles, vec![Some("Weinberg's Second Law"), None, Some("Hofstadter's Law")]);

        // "Corollary" not directly followed by the colon is only a comment.
        let subs = &doc.blocks[2].subs;
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].relation_type, RelationType::CommentOn);
        assert_eq!(subs[0].note, None);
        assert_eq!(subs[0].compiled.law.key.line_number, 4);
    }
}
