use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT,
                avatar_url  TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE groups (
                id           TEXT PRIMARY KEY,
                name         TEXT NOT NULL,
                invite_code  TEXT NOT NULL UNIQUE,
                created_by   TEXT NOT NULL REFERENCES users(id),
                created_at   TEXT NOT NULL
            );

            CREATE TABLE group_members (
                id          TEXT PRIMARY KEY,
                group_id    TEXT NOT NULL REFERENCES groups(id),
                user_id     TEXT NOT NULL REFERENCES users(id),
                is_active   INTEGER NOT NULL DEFAULT 1,
                joined_at   TEXT NOT NULL,
                UNIQUE(group_id, user_id)
            );

            CREATE INDEX idx_group_members_user
                ON group_members(user_id, is_active);

            CREATE TABLE rejections (
                id           TEXT PRIMARY KEY,
                user_id      TEXT NOT NULL REFERENCES users(id),
                group_id     TEXT NOT NULL REFERENCES groups(id),
                description  TEXT NOT NULL,
                points       INTEGER NOT NULL DEFAULT 1,
                created_at   TEXT NOT NULL
            );

            CREATE INDEX idx_rejections_group
                ON rejections(group_id, created_at);

            CREATE INDEX idx_rejections_created
                ON rejections(created_at);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
