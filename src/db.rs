use std::collections::HashMap;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::debug;

use crate::emit::{RecordSink, RunCounts};
use crate::error::{CompileError, Result};
use crate::model::{Attribution, Category, Law, LawCategory, LawRelation, Record, SourceKey};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS categories (
            id               INTEGER PRIMARY KEY,
            slug             TEXT UNIQUE NOT NULL,
            title            TEXT NOT NULL,
            source_file_path TEXT NOT NULL,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS laws (
            id                     INTEGER PRIMARY KEY,
            slug                   TEXT UNIQUE,
            title                  TEXT,
            text                   TEXT NOT NULL,
            raw_markdown           TEXT NOT NULL,
            origin_note            TEXT,
            first_seen_file_path   TEXT NOT NULL,
            first_seen_line_number INTEGER NOT NULL,
            created_at             TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(first_seen_file_path, first_seen_line_number)
        );

        CREATE TABLE IF NOT EXISTS law_categories (
            law_id      INTEGER NOT NULL REFERENCES laws(id),
            category_id INTEGER NOT NULL REFERENCES categories(id),
            position    INTEGER NOT NULL,
            PRIMARY KEY (law_id, category_id)
        );
        CREATE INDEX IF NOT EXISTS idx_law_categories_order ON law_categories(category_id, position);

        CREATE TABLE IF NOT EXISTS attributions (
            id              INTEGER PRIMARY KEY,
            law_id          INTEGER NOT NULL REFERENCES laws(id),
            name            TEXT NOT NULL,
            contact_type    TEXT NOT NULL CHECK(contact_type IN ('email','url','text')),
            contact_value   TEXT NOT NULL,
            note            TEXT,
            source_fragment TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_attributions_law ON attributions(law_id);

        CREATE TABLE IF NOT EXISTS law_relations (
            id            INTEGER PRIMARY KEY,
            from_law_id   INTEGER NOT NULL REFERENCES laws(id),
            to_law_id     INTEGER NOT NULL REFERENCES laws(id),
            relation_type TEXT NOT NULL CHECK(relation_type IN ('COROLLARY_OF','COMMENT_ON')),
            note          TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_relations_from ON law_relations(from_law_id);
        CREATE INDEX IF NOT EXISTS idx_relations_to ON law_relations(to_law_id);
        ",
    )?;
    Ok(())
}

// ── Import ──

const UPSERT_CATEGORY: &str = "INSERT INTO categories (slug, title, source_file_path)
     VALUES (?1, ?2, ?3)
     ON CONFLICT(slug) DO UPDATE SET title = excluded.title, source_file_path = excluded.source_file_path
     RETURNING id";

const INSERT_LAW: &str = "INSERT INTO laws
     (slug, title, text, raw_markdown, origin_note, first_seen_file_path, first_seen_line_number)
     VALUES (NULL, ?1, ?2, ?3, NULL, ?4, ?5)
     ON CONFLICT(first_seen_file_path, first_seen_line_number) DO NOTHING
     RETURNING id";

const FIND_LAW: &str =
    "SELECT id FROM laws WHERE first_seen_file_path = ?1 AND first_seen_line_number = ?2";

/// Applies records to a live database inside one transaction. Dropping the
/// sink without calling `commit` rolls every record back.
pub struct SqliteSink<'conn> {
    tx: Transaction<'conn>,
    law_ids: HashMap<SourceKey, i64>,
    category_ids: HashMap<String, i64>,
    counts: RunCounts,
}

impl<'conn> SqliteSink<'conn> {
    pub fn begin(conn: &'conn Connection) -> Result<Self> {
        let tx = conn.unchecked_transaction()?;
        Ok(SqliteSink {
            tx,
            law_ids: HashMap::new(),
            category_ids: HashMap::new(),
            counts: RunCounts::default(),
        })
    }

    fn upsert_category(&mut self, c: &Category) -> Result<()> {
        let id: i64 = self
            .tx
            .prepare_cached(UPSERT_CATEGORY)?
            .query_row(params![c.slug, c.title, c.source_file_path], |r| r.get(0))?;
        self.category_ids.insert(c.slug.clone(), id);
        self.counts.categories += 1;
        Ok(())
    }

    fn insert_law(&mut self, law: &Law) -> Result<()> {
        let inserted: Option<i64> = self
            .tx
            .prepare_cached(INSERT_LAW)?
            .query_row(
                params![
                    law.title,
                    law.text,
                    law.raw_markdown,
                    law.key.file_path,
                    law.key.line_number
                ],
                |r| r.get(0),
            )
            .optional()?;

        let id = match inserted {
            Some(id) => {
                self.counts.laws_inserted += 1;
                id
            }
            None => {
                debug!(law = %law.key, "law already present");
                self.counts.laws_unchanged += 1;
                self.find_law(&law.key)?
            }
        };
        self.law_ids.insert(law.key.clone(), id);
        Ok(())
    }

    fn law_id(&mut self, key: &SourceKey) -> Result<i64> {
        if let Some(id) = self.law_ids.get(key) {
            return Ok(*id);
        }
        let id = self.find_law(key)?;
        self.law_ids.insert(key.clone(), id);
        Ok(id)
    }

    fn find_law(&self, key: &SourceKey) -> Result<i64> {
        self.tx
            .prepare_cached(FIND_LAW)?
            .query_row(params![key.file_path, key.line_number], |r| r.get(0))
            .optional()?
            .ok_or_else(|| CompileError::UnknownLaw(key.to_string()))
    }

    fn category_id(&mut self, slug: &str) -> Result<i64> {
        if let Some(id) = self.category_ids.get(slug) {
            return Ok(*id);
        }
        let id: i64 = self
            .tx
            .prepare_cached("SELECT id FROM categories WHERE slug = ?1")?
            .query_row(params![slug], |r| r.get(0))
            .optional()?
            .ok_or_else(|| CompileError::UnknownCategory(slug.to_string()))?;
        self.category_ids.insert(slug.to_string(), id);
        Ok(id)
    }

    fn link_category(&mut self, link: &LawCategory) -> Result<()> {
        let law_id = self.law_id(&link.law)?;
        let category_id = self.category_id(&link.category_slug)?;
        self.counts.category_links += self
            .tx
            .prepare_cached(
                "INSERT OR IGNORE INTO law_categories (law_id, category_id, position)
                 VALUES (?1, ?2, ?3)",
            )?
            .execute(params![law_id, category_id, link.position])?;
        Ok(())
    }

    fn add_attribution(&mut self, a: &Attribution) -> Result<()> {
        let law_id = self.law_id(&a.law)?;
        let d = &a.draft;
        self.counts.attributions += self
            .tx
            .prepare_cached(
                "INSERT INTO attributions
                 (law_id, name, contact_type, contact_value, note, source_fragment)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?
            .execute(params![
                law_id,
                d.name,
                d.contact_type.as_str(),
                d.contact_value,
                d.note,
                d.source_fragment
            ])?;
        Ok(())
    }

    fn relate(&mut self, rel: &LawRelation) -> Result<()> {
        let from = self.law_id(&rel.from)?;
        let to = self.law_id(&rel.to)?;
        self.counts.relations += self
            .tx
            .prepare_cached(
                "INSERT INTO law_relations (from_law_id, to_law_id, relation_type, note)
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![from, to, rel.relation_type.as_str(), rel.note])?;
        Ok(())
    }
}

impl RecordSink for SqliteSink<'_> {
    fn emit(&mut self, record: &Record) -> Result<()> {
        match record {
            Record::UpsertCategory(c) => self.upsert_category(c),
            Record::InsertLaw(law) => self.insert_law(law),
            Record::LinkCategory(link) => self.link_category(link),
            Record::AddAttribution(a) => self.add_attribution(a),
            Record::RelateLaws(rel) => self.relate(rel),
        }
    }

    fn commit(self) -> Result<RunCounts> {
        self.tx.commit()?;
        Ok(self.counts)
    }
}

/// Run a script produced by the SQL exporter. A failure part-way leaves the
/// database as it was before the script's `BEGIN`.
pub fn apply_script(conn: &Connection, sql: &str) -> Result<()> {
    if let Err(e) = conn.execute_batch(sql) {
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        return Err(e.into());
    }
    Ok(())
}

// ── Stats ──

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub categories: usize,
    pub laws: usize,
    pub category_links: usize,
    pub attributions: usize,
    pub relations: usize,
    pub corollaries: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let count = |sql: &str| -> Result<usize> { Ok(conn.query_row(sql, [], |r| r.get(0))?) };
    Ok(Stats {
        categories: count("SELECT COUNT(*) FROM categories")?,
        laws: count("SELECT COUNT(*) FROM laws")?,
        category_links: count("SELECT COUNT(*) FROM law_categories")?,
        attributions: count("SELECT COUNT(*) FROM attributions")?,
        relations: count("SELECT COUNT(*) FROM law_relations")?,
        corollaries: count(
            "SELECT COUNT(*) FROM law_relations WHERE relation_type = 'COROLLARY_OF'",
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::{compile_corpus, emit_document};
    use crate::parser::compile_document;
    use crate::scanner::SourceDocument;
    use indicatif::ProgressBar;
    use pretty_assertions::assert_eq;

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys=ON;").unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn run(conn: &Connection, docs: &[SourceDocument]) -> RunCounts {
        let sink = SqliteSink::begin(conn).unwrap();
        compile_corpus(docs, sink, &ProgressBar::hidden()).unwrap()
    }

    fn doc(text: &str) -> SourceDocument {
        SourceDocument::new("murphys-laws/general.md", text)
    }

    fn law_rows(conn: &Connection) -> Vec<(i64, Option<String>, String, u32)> {
        let mut stmt = conn
            .prepare("SELECT id, title, text, first_seen_line_number FROM laws ORDER BY id")
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    const CORPUS: &str = "# General\n\
        * Murphy's Law: Anything that can go wrong, will go wrong.\n\
        \x20\x20* Corollary: It will happen at the worst possible time.\n\
        * Left to themselves, things go from bad to worse. [Jane Doe](mailto:jane@example.com)\n";

    #[test]
    fn first_run_inserts_everything() {
        let conn = memory();
        let counts = run(&conn, &[doc(CORPUS)]);
        assert_eq!(counts.laws_inserted, 3);
        assert_eq!(counts.laws_unchanged, 0);
        assert_eq!(
            get_stats(&conn).unwrap(),
            Stats {
                categories: 1,
                laws: 3,
                category_links: 2,
                attributions: 1,
                relations: 1,
                corollaries: 1,
            }
        );

        let (name, kind, value): (String, String, String) = conn
            .query_row("SELECT name, contact_type, contact_value FROM attributions", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!((name.as_str(), kind.as_str(), value.as_str()), ("Jane Doe", "email", "jane@example.com"));
    }

    #[test]
    fn rerun_keeps_law_identity() {
        let conn = memory();
        run(&conn, &[doc(CORPUS)]);
        let before = law_rows(&conn);

        let counts = run(&conn, &[doc(CORPUS)]);
        assert_eq!(counts.laws_inserted, 0);
        assert_eq!(counts.laws_unchanged, 3);
        assert_eq!(counts.category_links, 0);
        assert_eq!(law_rows(&conn), before);

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.laws, 3);
        assert_eq!(stats.categories, 1);
        assert_eq!(stats.category_links, 2);
    }

    #[test]
    fn rerun_does_not_refresh_edited_text() {
        let conn = memory();
        run(&conn, &[doc("* Old wording of the law")]);
        run(&conn, &[doc("* New wording of the law")]);
        let rows = law_rows(&conn);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].2, "Old wording of the law");
    }

    #[test]
    fn moved_bullet_is_a_new_law() {
        let conn = memory();
        run(&conn, &[doc("* Same text")]);
        run(&conn, &[doc("\n* Same text")]);
        let lines: Vec<u32> = law_rows(&conn).into_iter().map(|r| r.3).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn heading_change_refreshes_category_title() {
        let conn = memory();
        run(&conn, &[doc("# One\n* a law")]);
        let id_before: i64 = conn
            .query_row("SELECT id FROM categories", [], |r| r.get(0))
            .unwrap();

        run(&conn, &[doc("# Two\n* a law")]);
        let (id, slug, title): (i64, String, String) = conn
            .query_row("SELECT id, slug, title FROM categories", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(id, id_before);
        assert_eq!(slug, "general");
        assert_eq!(title, "Two");

        let linked: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM law_categories WHERE category_id = ?1",
                [id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(linked, 1);
    }

    #[test]
    fn dropped_sink_rolls_back() {
        let conn = memory();
        {
            let mut sink = SqliteSink::begin(&conn).unwrap();
            emit_document(&compile_document(&doc(CORPUS)), &mut sink).unwrap();
        }
        assert_eq!(get_stats(&conn).unwrap(), Stats::default());
    }

    // Attributions and relations are not keyed, so each run adds another copy.
    #[test]
    fn attributions_and_relations_accumulate() {
        let conn = memory();
        run(&conn, &[doc(CORPUS)]);
        run(&conn, &[doc(CORPUS)]);
        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.laws, 3);
        assert_eq!(stats.attributions, 2);
        assert_eq!(stats.relations, 2);
    }

    #[test]
    fn relation_links_child_to_parent() {
        let conn = memory();
        run(&conn, &[doc(CORPUS)]);
        let (from_line, to_line, kind, note): (u32, u32, String, Option<String>) = conn
            .query_row(
                "SELECT f.first_seen_line_number, t.first_seen_line_number, r.relation_type, r.note
                 FROM law_relations r
                 JOIN laws f ON f.id = r.from_law_id
                 JOIN laws t ON t.id = r.to_law_id",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .unwrap();
        assert_eq!((from_line, to_line), (3, 2));
        assert_eq!(kind, "COROLLARY_OF");
        assert_eq!(note.as_deref(), Some("Corollary"));
    }

    #[test]
    fn unknown_law_reference_is_an_error() {
        let conn = memory();
        let mut sink = SqliteSink::begin(&conn).unwrap();
        let err = sink
            .emit(&Record::RelateLaws(LawRelation {
                from: SourceKey::new("x.md", 1),
                to: SourceKey::new("x.md", 2),
                relation_type: crate::model::RelationType::CommentOn,
                note: None,
            }))
            .unwrap_err();
        assert!(matches!(err, CompileError::UnknownLaw(_)));
    }

    #[test]
    fn failed_script_leaves_database_untouched() {
        let conn = memory();
        let script = "BEGIN TRANSACTION;
            INSERT INTO categories (slug, title, source_file_path) VALUES ('a', 'A', 'a.md');
            INSERT INTO no_such_table VALUES (1);
            COMMIT;";
        assert!(apply_script(&conn, script).is_err());
        assert!(conn.is_autocommit());
        assert_eq!(get_stats(&conn).unwrap().categories, 0);
    }

    #[test]
    fn connect_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("laws.sqlite");
        let conn = connect(&path).unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert!(path.exists());
    }
}
