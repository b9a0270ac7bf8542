use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: String,
}

/// Hex SHA-256 of the password. Credentials never leave this module in
/// plain form.
fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

pub fn create_user(conn: &Connection, username: &str, password: &str) -> Result<User, AppError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::new(
            "USER_INVALID",
            "Username must not be empty",
        ));
    }
    if password.is_empty() {
        return Err(AppError::new(
            "USER_INVALID",
            "Password must not be empty",
        ));
    }

    if find_by_username(conn, username)?.is_some() {
        return Err(
            AppError::new("USER_EXISTS", "Username already exists")
                .with_details(format!("username={username}")),
        );
    }

    conn.execute(
        "INSERT INTO users(username, password_sha256, created_at)
         VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ','now'))",
        rusqlite::params![username, password_digest(password)],
    )
    .map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to insert user").with_details(e.to_string())
    })?;

    let id = conn.last_insert_rowid();
    get_user(conn, id)
}

pub fn get_user(conn: &Connection, id: i64) -> Result<User, AppError> {
    conn.query_row(
        "SELECT id, username, created_at FROM users WHERE id = ?1",
        [id],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .map_err(|e| {
        AppError::new("USER_NOT_FOUND", "User not found")
            .with_details(format!("id={id}; err={e}"))
    })
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>, AppError> {
    conn.query_row(
        "SELECT id, username, created_at FROM users WHERE username = ?1",
        [username],
        |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
                created_at: row.get(2)?,
            })
        },
    )
    .optional()
    .map_err(|e| {
        AppError::new("DB_QUERY_FAILED", "Failed to query user").with_details(e.to_string())
    })
}

/// Returns the user when the credentials match, `None` otherwise. Unknown
/// usernames and wrong passwords are indistinguishable to the caller.
pub fn verify_login(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    let stored: Option<(i64, String)> = conn
        .query_row(
            "SELECT id, password_sha256 FROM users WHERE username = ?1",
            [username.trim()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(|e| {
            AppError::new("DB_QUERY_FAILED", "Failed to query credentials")
                .with_details(e.to_string())
        })?;

    match stored {
        Some((id, digest)) if digest == password_digest(password) => {
            Ok(Some(get_user(conn, id)?))
        }
        _ => Ok(None),
    }
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
    fn create_and_login_roundtrip() {
        let conn = test_conn();
        let user = create_user(&conn, "ana", "secret").expect("create");
        assert_eq!(user.username, "ana");

        let ok = verify_login(&conn, "ana", "secret").expect("login");
        assert_eq!(ok, Some(user));

        let bad = verify_login(&conn, "ana", "wrong").expect("login");
        assert_eq!(bad, None);
        let unknown = verify_login(&conn, "bob", "secret").expect("login");
        assert_eq!(unknown, None);
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let conn = test_conn();
        create_user(&conn, "ana", "secret").expect("create");
        let err = create_user(&conn, "ana", "other").expect_err("duplicate");
        assert_eq!(err.code, "USER_EXISTS");
    }

    #[test]
    fn empty_credentials_are_rejected() {
        let conn = test_conn();
        assert_eq!(
            create_user(&conn, "  ", "x").expect_err("username").code,
            "USER_INVALID"
        );
        assert_eq!(
            create_user(&conn, "ana", "").expect_err("password").code,
            "USER_INVALID"
        );
    }
}
