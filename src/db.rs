use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "classtrack.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;

    // One JSON body per fixed document key, rewritten wholesale on every save.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents(
            key TEXT PRIMARY KEY,
            body TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;

    ensure_documents_updated_at(&conn)?;

    Ok(conn)
}

pub fn document_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let body: Option<String> = conn
        .query_row("SELECT body FROM documents WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    let Some(body) = body else {
        return Ok(None);
    };
    match serde_json::from_str(&body) {
        Ok(v) => Ok(Some(v)),
        Err(e) => {
            tracing::warn!(key, error = %e, "stored document is not valid JSON; reading as empty");
            Ok(None)
        }
    }
}

pub fn document_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    let body = serde_json::to_string(value)?;
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO documents(key, body, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        (key, &body, &now),
    )?;
    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let value: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    let Some(value) = value else {
        return Ok(None);
    };
    Ok(serde_json::from_str(&value).ok())
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    let text = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        (key, &text),
    )?;
    Ok(())
}

fn ensure_documents_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "documents", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE documents ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
