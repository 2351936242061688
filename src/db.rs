use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;

use crate::pipeline::{PipelineInput, RenderedDocument};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            id             INTEGER PRIMARY KEY,
            title          TEXT NOT NULL,
            url            TEXT,
            markdown       TEXT NOT NULL,
            section_count  INTEGER NOT NULL,
            fragment_count INTEGER NOT NULL,
            inlined        INTEGER NOT NULL,
            appended       INTEGER NOT NULL,
            missing        INTEGER NOT NULL,
            created_at     TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_documents_url ON documents(url);
        ",
    )?;
    Ok(())
}

// ── Archive ──

pub fn save_document(
    conn: &Connection,
    input: &PipelineInput,
    doc: &RenderedDocument,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO documents
         (title, url, markdown, section_count, fragment_count, inlined, appended, missing)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            doc.title,
            input.url,
            doc.markdown,
            doc.section_count,
            doc.fragment_count,
            doc.stats.inlined,
            doc.stats.appended,
            doc.stats.missing,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub struct DocumentRow {
    pub id: i64,
    pub title: String,
    pub url: Option<String>,
    pub markdown: String,
    pub section_count: usize,
    pub fragment_count: usize,
    pub created_at: String,
}

pub fn fetch_document(conn: &Connection, id: i64) -> Result<Option<DocumentRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, url, markdown, section_count, fragment_count, created_at
         FROM documents WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map([id], |row| {
        Ok(DocumentRow {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            markdown: row.get(3)?,
            section_count: row.get(4)?,
            fragment_count: row.get(5)?,
            created_at: row.get(6)?,
        })
    })?;
    let row = rows.next().transpose()?;
    Ok(row)
}

pub struct ListRow {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub section_count: usize,
    pub fragment_count: usize,
    pub created_at: String,
}

/// Most recent documents first.
pub fn list_documents(conn: &Connection, limit: usize) -> Result<Vec<ListRow>> {
    let sql = format!(
        "SELECT id, title, COALESCE(url,''), section_count, fragment_count, created_at
         FROM documents
         ORDER BY id DESC
         LIMIT {}",
        limit
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ListRow {
                id: row.get(0)?,
                title: row.get(1)?,
                url: row.get(2)?,
                section_count: row.get(3)?,
                fragment_count: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub documents: usize,
    pub fragments: usize,
    pub inlined: usize,
    pub appended: usize,
    pub missing: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let (documents, fragments, inlined, appended, missing): (usize, usize, usize, usize, usize) =
        conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(fragment_count),0), COALESCE(SUM(inlined),0),
                    COALESCE(SUM(appended),0), COALESCE(SUM(missing),0)
             FROM documents",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )?;
    Ok(Stats {
        documents,
        fragments,
        inlined,
        appended,
        missing,
    })
}

// ── Tests ──
