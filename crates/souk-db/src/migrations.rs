use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            TEXT PRIMARY KEY,
            email         TEXT NOT NULL UNIQUE,
            password      TEXT NOT NULL,
            display_name  TEXT NOT NULL,
            phone         TEXT,
            phone_code    TEXT,
            address       TEXT,
            gender        TEXT,
            phone_public  INTEGER NOT NULL DEFAULT 0,
            blocked       INTEGER NOT NULL DEFAULT 0,
            role          TEXT NOT NULL DEFAULT 'user',
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS listings (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            price       REAL NOT NULL,
            category    TEXT NOT NULL,
            location    TEXT NOT NULL,
            condition   TEXT NOT NULL,
            image_url   TEXT,
            owner_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            status      TEXT NOT NULL DEFAULT 'pending',
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_listings_created
            ON listings(created_at);
        CREATE INDEX IF NOT EXISTS idx_listings_owner
            ON listings(owner_id);

        -- The UNIQUE pair constraint is what makes favorite adds idempotent;
        -- without it two rapid toggles can race into duplicate rows.
        CREATE TABLE IF NOT EXISTS favorites (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            listing_id  TEXT NOT NULL REFERENCES listings(id) ON DELETE CASCADE,
            created_at  TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(user_id, listing_id)
        );

        CREATE INDEX IF NOT EXISTS idx_favorites_user
            ON favorites(user_id);

        -- id is the canonical pair id: the two participant ids sorted and
        -- joined with '_'. user_a < user_b always.
        CREATE TABLE IF NOT EXISTS conversations (
            id               TEXT PRIMARY KEY,
            user_a           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            user_b           TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            created_at       TEXT NOT NULL DEFAULT (datetime('now')),
            last_message_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS messages (
            id               TEXT PRIMARY KEY,
            conversation_id  TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            sender_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            recipient_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            body             TEXT NOT NULL,
            read             INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_messages_unread
            ON messages(conversation_id, recipient_id, read);

        -- sender_id/listing_id are loose references on purpose: a listing or
        -- sender may be deleted after the notification was written, and the
        -- notification should survive that.
        CREATE TABLE IF NOT EXISTS notifications (
            id               TEXT PRIMARY KEY,
            user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            kind             TEXT NOT NULL,
            body             TEXT NOT NULL,
            sender_id        TEXT,
            listing_id       TEXT,
            conversation_id  TEXT,
            read             INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
