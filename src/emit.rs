//! Record emission. Compiled documents are turned into an ordered stream of
//! conflict-tolerant records and pushed through a [`RecordSink`]; the sink
//! decides whether they land in a live database or a data file.

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::model::{Attribution, AttributionDraft, LawCategory, LawRelation, Record, SourceKey};
use crate::parser::{compile_document, CompiledDocument};
use crate::scanner::SourceDocument;

/// Destination for emitted records. Nothing is durable until `commit`;
/// dropping a sink without committing discards everything it received.
pub trait RecordSink {
    fn emit(&mut self, record: &Record) -> Result<()>;

    fn commit(self) -> Result<RunCounts>
    where
        Self: Sized;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunCounts {
    pub documents: usize,
    pub categories: usize,
    pub laws_inserted: usize,
    /// Laws whose `(file, line)` identity already existed; left untouched.
    pub laws_unchanged: usize,
    pub category_links: usize,
    pub attributions: usize,
    pub relations: usize,
}

impl RunCounts {
    pub fn print(&self) {
        println!(
            "{} documents: {} categories, {} new laws ({} already present), {} category links, {} attributions, {} relations.",
            self.documents,
            self.categories,
            self.laws_inserted,
            self.laws_unchanged,
            self.category_links,
            self.attributions,
            self.relations,
        );
    }
}

/// Emit one document: category first, then each top law with its category
/// link and attributions, then its sub-laws with attributions and relation.
pub fn emit_document<S: RecordSink>(doc: &CompiledDocument, sink: &mut S) -> Result<()> {
    sink.emit(&Record::UpsertCategory(doc.category.clone()))?;

    for block in &doc.blocks {
        let parent = &block.top.law.key;
        sink.emit(&Record::InsertLaw(block.top.law.clone()))?;
        sink.emit(&Record::LinkCategory(LawCategory {
            law: parent.clone(),
            category_slug: doc.category.slug.clone(),
            position: parent.line_number,
        }))?;
        emit_attributions(parent, &block.top.attributions, sink)?;

        for sub in &block.subs {
            let child = &sub.compiled.law.key;
            sink.emit(&Record::InsertLaw(sub.compiled.law.clone()))?;
            emit_attributions(child, &sub.compiled.attributions, sink)?;
            sink.emit(&Record::RelateLaws(LawRelation {
                from: child.clone(),
                to: parent.clone(),
                relation_type: sub.relation_type,
                note: sub.note.clone(),
            }))?;
        }
    }
    Ok(())
}

fn emit_attributions<S: RecordSink>(
    law: &SourceKey,
    drafts: &[AttributionDraft],
    sink: &mut S,
) -> Result<()> {
    for draft in drafts {
        sink.emit(&Record::AddAttribution(Attribution {
            law: law.clone(),
            draft: draft.clone(),
        }))?;
    }
    Ok(())
}

/// Compile every document in corpus order and commit the sink once at the
/// end. An error anywhere drops the sink uncommitted.
pub fn compile_corpus<S: RecordSink>(
    docs: &[SourceDocument],
    mut sink: S,
    pb: &ProgressBar,
) -> Result<RunCounts> {
    for doc in docs {
        let compiled = compile_document(doc);
        if compiled.blocks.is_empty() {
            warn!(path = %doc.path, "document has no bullets");
        }
        debug!(
            path = %doc.path,
            category = %compiled.category.slug,
            laws = compiled.blocks.len(),
            skipped = compiled.skipped,
            "compiled document"
        );
        emit_document(&compiled, &mut sink)?;
        pb.inc(1);
    }

    let mut counts = sink.commit()?;
    counts.documents = docs.len();
    info!(?counts, "corpus committed");
    Ok(counts)
}

/// Sink that only counts. Backs the `check` command.
#[derive(Debug, Default)]
pub struct CountingSink {
    counts: RunCounts,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordSink for CountingSink {
    fn emit(&mut self, record: &Record) -> Result<()> {
        tally(&mut self.counts, record);
        Ok(())
    }

    fn commit(self) -> Result<RunCounts> {
        Ok(self.counts)
    }
}

/// Count a record as emitted. File sinks cannot tell new laws from existing
/// ones, so every law counts as inserted.
pub(crate) fn tally(counts: &mut RunCounts, record: &Record) {
    match record {
        Record::UpsertCategory(_) => counts.categories += 1,
        Record::InsertLaw(_) => counts.laws_inserted += 1,
        Record::LinkCategory(_) => counts.category_links += 1,
        Record::AddAttribution(_) => counts.attributions += 1,
        Record::RelateLaws(_) => counts.relations += 1,
    }
}
