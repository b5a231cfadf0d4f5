//! Portable destinations: a replayable SQLite script or a JSON-lines stream.
//! Both write to a `*.partial` sibling and rename into place on commit.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use tracing::{debug, info};

use crate::emit::{tally, RecordSink, RunCounts};
use crate::error::Result;
use crate::model::{Record, SourceKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Sql,
    Jsonl,
}

impl ExportFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "sql" => Some(ExportFormat::Sql),
            "jsonl" | "ndjson" => Some(ExportFormat::Jsonl),
            _ => None,
        }
    }
}

/// A file that only appears at its final path once `finish` succeeds.
struct PartialFile {
    target: PathBuf,
    partial: PathBuf,
    writer: BufWriter<File>,
    finished: bool,
}

impl PartialFile {
    fn create(target: &Path) -> Result<Self> {
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut name = OsString::from(target.as_os_str());
        name.push(".partial");
        let partial = PathBuf::from(name);
        let writer = BufWriter::new(File::create(&partial)?);
        debug!(path = %partial.display(), "writing partial export");
        Ok(PartialFile {
            target: target.to_path_buf(),
            partial,
            writer,
            finished: false,
        })
    }

    fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        fs::rename(&self.partial, &self.target)?;
        self.finished = true;
        info!(path = %self.target.display(), "export written");
        Ok(())
    }
}

impl Write for PartialFile {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.finished {
            let _ = fs::remove_file(&self.partial);
        }
    }
}

// ── SQL script ──

pub struct SqlScriptSink {
    out: PartialFile,
    counts: RunCounts,
}

impl SqlScriptSink {
    pub fn create(path: &Path) -> Result<Self> {
        let mut out = PartialFile::create(path)?;
        writeln!(
            out,
            "-- Generated by laws_compiler at {}",
            chrono::Utc::now().to_rfc3339()
        )?;
        writeln!(out, "BEGIN TRANSACTION;")?;
        Ok(SqlScriptSink {
            out,
            counts: RunCounts::default(),
        })
    }
}

/// SQL literal for an optional string.
fn q(value: Option<&str>) -> String {
    match value {
        Some(s) => format!("'{}'", s.replace('\'', "''")),
        None => "NULL".to_string(),
    }
}

fn law_match(alias: &str, key: &SourceKey) -> String {
    format!(
        "{alias}.first_seen_file_path={} AND {alias}.first_seen_line_number={}",
        q(Some(&key.file_path)),
        key.line_number
    )
}

fn statement(record: &Record) -> String {
    match record {
        Record::UpsertCategory(c) => format!(
            "INSERT INTO categories (slug, title, source_file_path)\n\
             VALUES ({}, {}, {})\n\
             ON CONFLICT(slug) DO UPDATE SET title=excluded.title, source_file_path=excluded.source_file_path;",
            q(Some(&c.slug)),
            q(Some(&c.title)),
            q(Some(&c.source_file_path)),
        ),
        Record::InsertLaw(law) => format!(
            "INSERT INTO laws (slug, title, text, raw_markdown, origin_note, first_seen_file_path, first_seen_line_number)\n\
             VALUES (NULL, {}, {}, {}, NULL, {}, {})\n\
             ON CONFLICT(first_seen_file_path, first_seen_line_number) DO NOTHING;",
            q(law.title.as_deref()),
            q(Some(&law.text)),
            q(Some(&law.raw_markdown)),
            q(Some(&law.key.file_path)),
            law.key.line_number,
        ),
        Record::LinkCategory(link) => format!(
            "INSERT OR IGNORE INTO law_categories (law_id, category_id, position)\n\
             SELECT laws.id, categories.id, {} FROM laws, categories\n\
             WHERE {} AND categories.slug={};",
            link.position,
            law_match("laws", &link.law),
            q(Some(&link.category_slug)),
        ),
        Record::AddAttribution(a) => format!(
            "INSERT INTO attributions (law_id, name, contact_type, contact_value, note, source_fragment)\n\
             SELECT laws.id, {}, {}, {}, {}, {} FROM laws\n\
             WHERE {};",
            q(Some(&a.draft.name)),
            q(Some(a.draft.contact_type.as_str())),
            q(Some(&a.draft.contact_value)),
            q(a.draft.note.as_deref()),
            q(Some(&a.draft.source_fragment)),
            law_match("laws", &a.law),
        ),
        Record::RelateLaws(rel) => format!(
            "INSERT INTO law_relations (from_law_id, to_law_id, relation_type, note)\n\
             SELECT f.id, t.id, {}, {} FROM laws f, laws t\n\
             WHERE {} AND {};",
            q(Some(rel.relation_type.as_str())),
            q(rel.note.as_deref()),
            law_match("f", &rel.from),
            law_match("t", &rel.to),
        ),
    }
}

impl RecordSink for SqlScriptSink {
    fn emit(&mut self, record: &Record) -> Result<()> {
        writeln!(self.out, "{}", statement(record))?;
        tally(&mut self.counts, record);
        Ok(())
    }

    fn commit(mut self) -> Result<RunCounts> {
        writeln!(self.out, "COMMIT;")?;
        self.out.finish()?;
        Ok(self.counts)
    }
}

// ── JSON lines ──

pub struct JsonLinesSink {
    out: PartialFile,
    counts: RunCounts,
}

impl JsonLinesSink {
    pub fn create(path: &Path) -> Result<Self> {
        Ok(JsonLinesSink {
            out: PartialFile::create(path)?,
            counts: RunCounts::default(),
        })
    }
}

impl RecordSink for JsonLinesSink {
    fn emit(&mut self, record: &Record) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        writeln!(self.out)?;
        tally(&mut self.counts, record);
        Ok(())
    }

    fn commit(self) -> Result<RunCounts> {
        self.out.finish()?;
        Ok(self.counts)
    }
}
