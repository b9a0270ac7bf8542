use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Message text stored for the one-time greeting row. The greeting is a bot
/// turn with no matching user message, so the message column carries this
/// marker instead.
pub const WELCOME_SENTINEL: &str = "__welcome__";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatHistoryRecord {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub response: String,
    pub created_at: String,
}

/// Record one completed query/answer exchange. The caller treats this as
/// best-effort; nothing here feeds back into answer production.
pub fn record_exchange(
    conn: &Connection,
    user_id: i64,
    message: &str,
    response: &str,
) -> Result<ChatHistoryRecord, AppError> {
    conn.execute(
        "INSERT INTO chat_history(user_id, message, response, created_at)
         VALUES (?1, ?2, ?3, strftime('%Y-%m-%dT%H:%M:%fZ','now'))",
        rusqlite::params![user_id, message, response],
    )
    .map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to insert chat history row")
            .with_details(e.to_string())
    })?;

    get_record(conn, conn.last_insert_rowid())
}

/// Insert the greeting row for a user unless one already exists. Returns
/// whether a row was inserted.
pub fn seed_welcome(conn: &Connection, user_id: i64, welcome: &str) -> Result<bool, AppError> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM chat_history WHERE user_id = ?1 AND message = ?2",
            rusqlite::params![user_id, WELCOME_SENTINEL],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to query welcome row")
                .with_details(e.to_string())
        })?;
    if existing.is_some() {
        return Ok(false);
    }

    record_exchange(conn, user_id, WELCOME_SENTINEL, welcome)?;
    Ok(true)
}

pub fn list_for_user(conn: &Connection, user_id: i64) -> Result<Vec<ChatHistoryRecord>, AppError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_id, message, response, created_at
             FROM chat_history
             WHERE user_id = ?1
             ORDER BY created_at, id",
        )
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to prepare chat history query")
                .with_details(e.to_string())
        })?;

    let rows = stmt
        .query_map([user_id], |row| {
            Ok(ChatHistoryRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                message: row.get(2)?,
                response: row.get(3)?,
                created_at: row.get(4)?,
            })
        })
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to query chat history")
                .with_details(e.to_string())
        })?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r.map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to decode chat history row")
                .with_details(e.to_string())
        })?);
    }
    Ok(out)
}

fn get_record(conn: &Connection, id: i64) -> Result<ChatHistoryRecord, AppError> {
    conn.query_row(
        "SELECT id, user_id, message, response, created_at FROM chat_history WHERE id = ?1",
        [id],
        |row| {
            Ok(ChatHistoryRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                message: row.get(2)?,
                response: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )
    .map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to read chat history row")
            .with_details(format!("id={id}; err={e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn test_conn() -> Connection {
        let mut conn = db::open_in_memory().expect("open");
        db::migrate(&mut conn).expect("migrate");
        conn
    }

    #[test]
    fn records_and_lists_in_order() {
        let conn = test_conn();
        let a = record_exchange(&conn, 7, "hi", "hello").expect("record");
        let b = record_exchange(&conn, 7, "hours?", "9am-5pm").expect("record");
        record_exchange(&conn, 8, "other user", "answer").expect("record");

        let rows = list_for_user(&conn, 7).expect("list");
        assert_eq!(rows, vec![a, b]);
    }

    #[test]
    fn welcome_is_seeded_once() {
        let conn = test_conn();
        assert!(seed_welcome(&conn, 3, "Hi there!").expect("seed"));
        assert!(!seed_welcome(&conn, 3, "Hi there!").expect("seed again"));

        let rows = list_for_user(&conn, 3).expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].message, WELCOME_SENTINEL);
        assert_eq!(rows[0].response, "Hi there!");
    }
}
