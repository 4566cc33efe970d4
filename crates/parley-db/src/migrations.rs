use rusqlite::Connection;
use tracing::info;

use crate::StoreError;

pub fn run(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            firstname   TEXT NOT NULL,
            lastname    TEXT NOT NULL,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS group_messages (
            id          TEXT PRIMARY KEY,
            room        TEXT NOT NULL,
            from_user   TEXT NOT NULL,
            message     TEXT NOT NULL,
            date_sent   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_group_messages_room
            ON group_messages(room, date_sent);

        CREATE TABLE IF NOT EXISTS private_messages (
            id          TEXT PRIMARY KEY,
            from_user   TEXT NOT NULL,
            to_user     TEXT NOT NULL,
            message     TEXT NOT NULL,
            date_sent   TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_private_messages_pair
            ON private_messages(from_user, to_user, date_sent);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
