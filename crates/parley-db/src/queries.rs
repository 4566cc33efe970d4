use rusqlite::{Connection, OptionalExtension};

use crate::models::{GroupMessageRow, PrivateMessageRow, UserRow};
use crate::{Database, StoreError};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        firstname: &str,
        lastname: &str,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, firstname, lastname, password)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, username, firstname, lastname, password_hash),
            )
            .map_err(map_constraint_err)?;
            Ok(())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>, StoreError> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    // -- Group messages --

    pub fn insert_group_message(
        &self,
        id: &str,
        room: &str,
        from_user: &str,
        message: &str,
        date_sent: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO group_messages (id, room, from_user, message, date_sent)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, room, from_user, message, date_sent),
            )?;
            Ok(())
        })
    }

    pub fn list_group_messages(
        &self,
        room: &str,
        limit: u32,
    ) -> Result<Vec<GroupMessageRow>, StoreError> {
        self.with_conn(|conn| query_group_messages(conn, room, limit))
    }

    // -- Private messages --

    pub fn insert_private_message(
        &self,
        id: &str,
        from_user: &str,
        to_user: &str,
        message: &str,
        date_sent: &str,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO private_messages (id, from_user, to_user, message, date_sent)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, from_user, to_user, message, date_sent),
            )?;
            Ok(())
        })
    }

    /// Messages between a pair of users, matched in either direction.
    pub fn list_private_messages(
        &self,
        user_a: &str,
        user_b: &str,
        limit: u32,
    ) -> Result<Vec<PrivateMessageRow>, StoreError> {
        self.with_conn(|conn| query_private_messages(conn, user_a, user_b, limit))
    }
}

/// UNIQUE violations become `DuplicateKey`; everything else passes through.
fn map_constraint_err(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &e {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            return StoreError::DuplicateKey;
        }
    }
    StoreError::Sqlite(e)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, firstname, lastname, password, created_at
         FROM users WHERE username = ?1",
    )?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                firstname: row.get(2)?,
                lastname: row.get(3)?,
                password: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_group_messages(
    conn: &Connection,
    room: &str,
    limit: u32,
) -> Result<Vec<GroupMessageRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, room, from_user, message, date_sent
         FROM group_messages
         WHERE room = ?1
         ORDER BY date_sent DESC
         LIMIT ?2",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![room, limit], |row| {
            Ok(GroupMessageRow {
                id: row.get(0)?,
                room: row.get(1)?,
                from_user: row.get(2)?,
                message: row.get(3)?,
                date_sent: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_private_messages(
    conn: &Connection,
    user_a: &str,
    user_b: &str,
    limit: u32,
) -> Result<Vec<PrivateMessageRow>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, from_user, to_user, message, date_sent
         FROM private_messages
         WHERE (from_user = ?1 AND to_user = ?2)
            OR (from_user = ?2 AND to_user = ?1)
         ORDER BY date_sent DESC
         LIMIT ?3",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![user_a, user_b, limit], |row| {
            Ok(PrivateMessageRow {
                id: row.get(0)?,
                from_user: row.get(1)?,
                to_user: row.get(2)?,
                message: row.get(3)?,
                date_sent: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
