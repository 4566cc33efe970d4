/// Database row types that map directly to SQLite rows.
/// Timestamps stay as the stored RFC 3339 strings; the API layer parses them.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub firstname: String,
    pub lastname: String,
    pub password: String,
    pub created_at: String,
}

pub struct GroupMessageRow {
    pub id: String,
    pub room: String,
    pub from_user: String,
    pub message: String,
    pub date_sent: String,
}

pub struct PrivateMessageRow {
    pub id: String,
    pub from_user: String,
    pub to_user: String,
    pub message: String,
    pub date_sent: String,
}
