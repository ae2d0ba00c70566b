use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            first_name  TEXT NOT NULL,
            last_name   TEXT NOT NULL,
            full_name   TEXT NOT NULL,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'Member',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Ownership is by reference, not containment: user_id/post_id are
        -- plain columns, not enforced foreign keys. Deleting an owner does
        -- not cascade and must not be blocked by dependent rows.
        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            text        TEXT NOT NULL,
            privacy     TEXT NOT NULL DEFAULT 'Public',
            likes       INTEGER NOT NULL DEFAULT 0,
            dislikes    INTEGER NOT NULL DEFAULT 0,
            user_id     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_user
            ON posts(user_id);

        CREATE INDEX IF NOT EXISTS idx_posts_created
            ON posts(created_at);

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            text        TEXT NOT NULL,
            likes       INTEGER NOT NULL DEFAULT 0,
            dislikes    INTEGER NOT NULL DEFAULT 0,
            post_id     TEXT NOT NULL,
            user_id     TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
