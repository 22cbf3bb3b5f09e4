use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            external_id TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL,
            api_key     TEXT NOT NULL UNIQUE,
            discord_id  TEXT,
            plan        TEXT NOT NULL DEFAULT 'FREE',
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS event_categories (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            name        TEXT NOT NULL,
            emoji       TEXT,
            color       INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(name, user_id)
        );

        -- Deleting a category removes its events.
        CREATE TABLE IF NOT EXISTS events (
            id                TEXT PRIMARY KEY,
            category_id       TEXT NOT NULL REFERENCES event_categories(id) ON DELETE CASCADE,
            user_id           TEXT NOT NULL REFERENCES users(id),
            name              TEXT NOT NULL,
            formatted_message TEXT NOT NULL,
            fields            TEXT NOT NULL,
            delivery_status   TEXT NOT NULL DEFAULT 'PENDING',
            created_at        TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_events_category
            ON events(category_id, created_at);

        -- One row per (user, calendar month). count stays in lock-step with
        -- delivered events, never with mere acceptance.
        CREATE TABLE IF NOT EXISTS quotas (
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            month       INTEGER NOT NULL,
            year        INTEGER NOT NULL,
            count       INTEGER NOT NULL DEFAULT 0,
            updated_at  TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (user_id, month, year)
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
