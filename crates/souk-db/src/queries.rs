use crate::Database;
use crate::models::{
    AdminUserRow, ConversationRow, ListingFilter, ListingRow, MessageRow, NewMessage,
    NotificationRow, UserRow,
};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params};
use souk_types::domain::{ListingStatus, NotificationKind};

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        email: &str,
        password_hash: &str,
        display_name: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, display_name) VALUES (?1, ?2, ?3, ?4)",
                (id, email, password_hash, display_name),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} WHERE email = ?1", SELECT_USER))?;
            Ok(stmt.query_row([email], map_user_row).optional()?)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_USER))?;
            Ok(stmt.query_row([id], map_user_row).optional()?)
        })
    }

    pub fn get_display_name(&self, id: &str) -> Result<String> {
        self.with_conn(|conn| {
            conn.query_row("SELECT display_name FROM users WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .map_err(|_| anyhow!("User not found: {}", id))
        })
    }

    pub fn update_profile(
        &self,
        id: &str,
        display_name: &str,
        phone: Option<&str>,
        phone_code: Option<&str>,
        address: Option<&str>,
        gender: Option<&str>,
        phone_public: bool,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE users
                 SET display_name = ?2, phone = ?3, phone_code = ?4,
                     address = ?5, gender = ?6, phone_public = ?7
                 WHERE id = ?1",
                params![id, display_name, phone, phone_code, address, gender, phone_public],
            )?;
            Ok(n > 0)
        })
    }

    /// Flip a user's blocked flag. Returns the new value, or None if the
    /// user does not exist.
    pub fn toggle_user_blocked(&self, id: &str) -> Result<Option<bool>> {
        self.with_conn_mut(|conn| {
            let blocked: Option<bool> = conn
                .query_row("SELECT blocked FROM users WHERE id = ?1", [id], |row| {
                    row.get(0)
                })
                .optional()?;

            let Some(blocked) = blocked else {
                return Ok(None);
            };
            conn.execute(
                "UPDATE users SET blocked = ?2 WHERE id = ?1",
                params![id, !blocked],
            )?;
            Ok(Some(!blocked))
        })
    }

    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    pub fn list_users_with_listing_counts(&self) -> Result<Vec<AdminUserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.email, u.display_name, u.blocked, u.role,
                        (SELECT COUNT(*) FROM listings l WHERE l.owner_id = u.id),
                        u.created_at
                 FROM users u
                 ORDER BY u.created_at DESC, u.rowid DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(AdminUserRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        display_name: row.get(2)?,
                        blocked: row.get(3)?,
                        role: row.get(4)?,
                        listing_count: row.get::<_, i64>(5)? as u32,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Listings --

    #[allow(clippy::too_many_arguments)]
    pub fn insert_listing(
        &self,
        id: &str,
        title: &str,
        description: &str,
        price: f64,
        category: &str,
        location: &str,
        condition: &str,
        image_url: Option<&str>,
        owner_id: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO listings (id, title, description, price, category, location, condition, image_url, owner_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![id, title, description, price, category, location, condition, image_url, owner_id],
            )?;
            Ok(())
        })
    }

    pub fn get_listing(&self, id: &str) -> Result<Option<ListingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_LISTING))?;
            Ok(stmt.query_row([id], map_listing_row).optional()?)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_listing(
        &self,
        id: &str,
        title: &str,
        description: &str,
        price: f64,
        category: &str,
        location: &str,
        condition: &str,
        image_url: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE listings
                 SET title = ?2, description = ?3, price = ?4, category = ?5,
                     location = ?6, condition = ?7, image_url = ?8,
                     updated_at = datetime('now')
                 WHERE id = ?1",
                params![id, title, description, price, category, location, condition, image_url],
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_listing(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute("DELETE FROM listings WHERE id = ?1", [id])?;
            Ok(n > 0)
        })
    }

    /// Newest-first feed with conjunctive store-side filters. The free-text
    /// search term is applied by the caller, in memory, over this result.
    pub fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let mut sql = SELECT_LISTING.to_string();
            let mut clauses: Vec<&str> = Vec::new();
            let mut sql_params: Vec<&dyn rusqlite::types::ToSql> = Vec::new();

            if let Some(category) = &filter.category {
                clauses.push("category = ?");
                sql_params.push(category);
            }
            if let Some(max_price) = &filter.max_price {
                clauses.push("price <= ?");
                sql_params.push(max_price);
            }
            if let Some(location) = &filter.location {
                clauses.push("location = ?");
                sql_params.push(location);
            }
            if let Some(min_date) = &filter.min_date {
                clauses.push("created_at >= ?");
                sql_params.push(min_date);
            }
            if let Some(condition) = &filter.condition {
                clauses.push("condition = ?");
                sql_params.push(condition);
            }

            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            sql.push_str(" ORDER BY created_at DESC, rowid DESC");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(sql_params.as_slice(), map_listing_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_listings_by_owner(&self, owner_id: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
                SELECT_LISTING
            ))?;
            let rows = stmt
                .query_map([owner_id], map_listing_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn distinct_categories(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT category FROM listings ORDER BY category")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Toggle pending <-> approved and notify the owner, atomically.
    /// Returns the new status, or None if the listing does not exist.
    pub fn toggle_listing_status(
        &self,
        listing_id: &str,
        notification_id: &str,
    ) -> Result<Option<ListingStatus>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let row: Option<(String, String, String)> = tx
                .query_row(
                    "SELECT status, owner_id, title FROM listings WHERE id = ?1",
                    [listing_id],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;
            let Some((status, owner_id, title)) = row else {
                return Ok(None);
            };

            let current = ListingStatus::parse(&status)
                .ok_or_else(|| anyhow!("Unknown listing status '{}' on {}", status, listing_id))?;
            let next = current.toggled();

            tx.execute(
                "UPDATE listings SET status = ?2, updated_at = datetime('now') WHERE id = ?1",
                params![listing_id, next.as_str()],
            )?;

            let (kind, body) = match next {
                ListingStatus::Approved => (
                    NotificationKind::ListingApproved,
                    format!("Your listing \"{}\" was approved.", title),
                ),
                ListingStatus::Pending => (
                    NotificationKind::ListingBlocked,
                    format!("Your listing \"{}\" was blocked.", title),
                ),
            };
            tx.execute(
                "INSERT INTO notifications (id, user_id, kind, body, listing_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![notification_id, owner_id, kind.as_str(), body, listing_id],
            )?;

            tx.commit()?;
            Ok(Some(next))
        })
    }

    pub fn list_all_listings(&self) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{} ORDER BY created_at DESC, rowid DESC",
                SELECT_LISTING
            ))?;
            let rows = stmt
                .query_map([], map_listing_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Favorites --

    /// Idempotent add. Returns true if a row was inserted, false if the
    /// (user, listing) pair already existed.
    pub fn add_favorite(&self, id: &str, user_id: &str, listing_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO favorites (id, user_id, listing_id) VALUES (?1, ?2, ?3)",
                (id, user_id, listing_id),
            )?;
            Ok(n > 0)
        })
    }

    /// Deletes every matching pair (tolerates legacy duplicates). Returns
    /// the number of rows removed.
    pub fn remove_favorite(&self, user_id: &str, listing_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM favorites WHERE user_id = ?1 AND listing_id = ?2",
                (user_id, listing_id),
            )?;
            Ok(n)
        })
    }

    pub fn favorite_listing_ids(&self, user_id: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT listing_id FROM favorites WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn list_favorite_listings(&self, user_id: &str) -> Result<Vec<ListingRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT l.id, l.title, l.description, l.price, l.category, l.location,
                        l.condition, l.image_url, l.owner_id, l.status, l.created_at, l.updated_at
                 FROM favorites f
                 JOIN listings l ON l.id = f.listing_id
                 WHERE f.user_id = ?1
                 ORDER BY f.created_at DESC, f.rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], map_listing_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messaging --

    /// Apply one "message sent" event: message insert, conversation pointer
    /// upsert, recipient notification. All-or-nothing.
    pub fn send_message(&self, msg: &NewMessage) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO conversations (id, user_a, user_b) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET last_message_at = datetime('now')",
                params![msg.conversation_id, msg.user_a, msg.user_b],
            )?;
            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, recipient_id, body)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    msg.message_id,
                    msg.conversation_id,
                    msg.sender_id,
                    msg.recipient_id,
                    msg.body
                ],
            )?;
            tx.execute(
                "INSERT INTO notifications (id, user_id, kind, body, sender_id, conversation_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    msg.notification_id,
                    msg.recipient_id,
                    NotificationKind::NewMessage.as_str(),
                    msg.notification_body,
                    msg.sender_id,
                    msg.conversation_id
                ],
            )?;

            tx.commit()?;
            Ok(())
        })
    }

    pub fn list_messages(&self, conversation_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| query_messages(conn, conversation_id))
    }

    /// Mark every unread message addressed to `recipient_id` in this
    /// conversation as read. Messages addressed to the other participant
    /// are untouched. Returns the number of rows flipped.
    pub fn mark_conversation_read(&self, conversation_id: &str, recipient_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE messages SET read = 1
                 WHERE conversation_id = ?1 AND recipient_id = ?2 AND read = 0",
                (conversation_id, recipient_id),
            )?;
            Ok(n)
        })
    }

    pub fn list_conversations(&self, user_id: &str) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id,
                        CASE WHEN c.user_a = ?1 THEN c.user_b ELSE c.user_a END,
                        u.display_name,
                        (SELECT COUNT(*) FROM messages m
                         WHERE m.conversation_id = c.id
                           AND m.recipient_id = ?1 AND m.read = 0),
                        c.last_message_at
                 FROM conversations c
                 JOIN users u
                   ON u.id = CASE WHEN c.user_a = ?1 THEN c.user_b ELSE c.user_a END
                 WHERE c.user_a = ?1 OR c.user_b = ?1
                 ORDER BY c.last_message_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ConversationRow {
                        id: row.get(0)?,
                        peer_id: row.get(1)?,
                        peer_name: row.get(2)?,
                        unread_count: row.get::<_, i64>(3)? as u32,
                        last_message_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Notifications --

    pub fn list_notifications(&self, user_id: &str) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, body, sender_id, listing_id, conversation_id, read, created_at
                 FROM notifications
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        kind: row.get(2)?,
                        body: row.get(3)?,
                        sender_id: row.get(4)?,
                        listing_id: row.get(5)?,
                        conversation_id: row.get(6)?,
                        read: row.get(7)?,
                        created_at: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Owner-scoped: a notification can only be marked read by its recipient.
    pub fn mark_notification_read(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "UPDATE notifications SET read = 1 WHERE id = ?1 AND user_id = ?2",
                (id, user_id),
            )?;
            Ok(n > 0)
        })
    }

    pub fn delete_notification(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM notifications WHERE id = ?1 AND user_id = ?2",
                (id, user_id),
            )?;
            Ok(n > 0)
        })
    }

    /// Delete read notifications older than the retention window.
    pub fn prune_read_notifications(&self, retention_days: u32) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let n = conn.execute(
                "DELETE FROM notifications
                 WHERE read = 1
                   AND created_at < datetime('now', '-' || ?1 || ' days')",
                [retention_days as i64],
            )?;
            Ok(n)
        })
    }
}

const SELECT_USER: &str = "SELECT id, email, password, display_name, phone, phone_code, address, \
                           gender, phone_public, blocked, role, created_at FROM users";

const SELECT_LISTING: &str = "SELECT id, title, description, price, category, location, \
                              condition, image_url, owner_id, status, created_at, updated_at \
                              FROM listings";

fn map_user_row(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        display_name: row.get(3)?,
        phone: row.get(4)?,
        phone_code: row.get(5)?,
        address: row.get(6)?,
        gender: row.get(7)?,
        phone_public: row.get(8)?,
        blocked: row.get(9)?,
        role: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn map_listing_row(row: &rusqlite::Row) -> rusqlite::Result<ListingRow> {
    Ok(ListingRow {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        category: row.get(4)?,
        location: row.get(5)?,
        condition: row.get(6)?,
        image_url: row.get(7)?,
        owner_id: row.get(8)?,
        status: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn query_messages(conn: &Connection, conversation_id: &str) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, conversation_id, sender_id, recipient_id, body, read, created_at
         FROM messages
         WHERE conversation_id = ?1
         ORDER BY created_at ASC, rowid ASC",
    )?;
    let rows = stmt
        .query_map([conversation_id], |row| {
            Ok(MessageRow {
                id: row.get(0)?,
                conversation_id: row.get(1)?,
                sender_id: row.get(2)?,
                recipient_id: row.get(3)?,
                body: row.get(4)?,
                read: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use souk_types::domain::{conversation_id, conversation_pair};
    use uuid::Uuid;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, email: &str, name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, email, "hash", name).unwrap();
        id
    }

    fn seed_listing(db: &Database, owner: &str, title: &str, price: f64) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_listing(
            &id,
            title,
            "description",
            price,
            "Electronics",
            "Casablanca",
            "used",
            None,
            owner,
        )
        .unwrap();
        id
    }

    fn send(db: &Database, from: &str, to: &str, body: &str) -> String {
        let from_id: Uuid = from.parse().unwrap();
        let to_id: Uuid = to.parse().unwrap();
        let (a, b) = conversation_pair(from_id, to_id);
        let msg = NewMessage {
            message_id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id(from_id, to_id),
            user_a: a.to_string(),
            user_b: b.to_string(),
            sender_id: from.to_string(),
            recipient_id: to.to_string(),
            body: body.to_string(),
            notification_id: Uuid::new_v4().to_string(),
            notification_body: "New message".to_string(),
        };
        db.send_message(&msg).unwrap();
        msg.conversation_id
    }

    fn backdate_listing(db: &Database, id: &str, timestamp: &str) {
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE listings SET created_at = ?2 WHERE id = ?1",
                (id, timestamp),
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn feed_filters_combine_conjunctively() {
        let db = test_db();
        let owner = seed_user(&db, "a@example.com", "A");

        let cheap_used = seed_listing(&db, &owner, "Old phone", 100.0);
        let pricey_used = seed_listing(&db, &owner, "Laptop", 900.0);
        let cheap_new = Uuid::new_v4().to_string();
        db.insert_listing(
            &cheap_new, "Charger", "description", 50.0, "Electronics", "Casablanca", "new",
            None, &owner,
        )
        .unwrap();
        let other_city = Uuid::new_v4().to_string();
        db.insert_listing(
            &other_city, "Bike", "description", 80.0, "Bikes", "Rabat", "used", None, &owner,
        )
        .unwrap();

        let filter = ListingFilter {
            category: Some("Electronics".into()),
            max_price: Some(200.0),
            location: Some("Casablanca".into()),
            condition: Some("used".into()),
            ..Default::default()
        };
        let rows = db.list_listings(&filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, cheap_used);
        assert_ne!(rows[0].id, pricey_used);
        assert_ne!(rows[0].id, cheap_new);
    }

    #[test]
    fn feed_min_date_is_inclusive_lower_bound() {
        let db = test_db();
        let owner = seed_user(&db, "a@example.com", "A");
        let old = seed_listing(&db, &owner, "Old", 10.0);
        let recent = seed_listing(&db, &owner, "Recent", 10.0);
        backdate_listing(&db, &old, "2020-01-01 00:00:00");

        let filter = ListingFilter {
            min_date: Some("2025-01-01".into()),
            ..Default::default()
        };
        let rows = db.list_listings(&filter).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, recent);
    }

    #[test]
    fn feed_is_newest_first() {
        let db = test_db();
        let owner = seed_user(&db, "a@example.com", "A");
        let first = seed_listing(&db, &owner, "First", 10.0);
        let second = seed_listing(&db, &owner, "Second", 10.0);
        backdate_listing(&db, &first, "2024-01-01 00:00:00");
        backdate_listing(&db, &second, "2024-06-01 00:00:00");

        let rows = db.list_listings(&ListingFilter::default()).unwrap();
        assert_eq!(rows[0].id, second);
        assert_eq!(rows[1].id, first);
    }

    #[test]
    fn favorite_add_is_idempotent() {
        let db = test_db();
        let user = seed_user(&db, "a@example.com", "A");
        let listing = seed_listing(&db, &user, "Phone", 100.0);

        assert!(db.add_favorite(&Uuid::new_v4().to_string(), &user, &listing).unwrap());
        assert!(!db.add_favorite(&Uuid::new_v4().to_string(), &user, &listing).unwrap());
        assert_eq!(db.favorite_listing_ids(&user).unwrap(), vec![listing]);
    }

    #[test]
    fn favorite_toggle_round_trips_to_unfavorited() {
        let db = test_db();
        let user = seed_user(&db, "a@example.com", "A");
        let listing = seed_listing(&db, &user, "Phone", 100.0);

        db.add_favorite(&Uuid::new_v4().to_string(), &user, &listing).unwrap();
        assert_eq!(db.remove_favorite(&user, &listing).unwrap(), 1);
        assert!(db.favorite_listing_ids(&user).unwrap().is_empty());
    }

    #[test]
    fn send_message_writes_message_pointer_and_notification() {
        let db = test_db();
        let alice = seed_user(&db, "alice@example.com", "Alice");
        let bob = seed_user(&db, "bob@example.com", "Bob");

        let conv = send(&db, &alice, &bob, "hello");

        let messages = db.list_messages(&conv).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "hello");
        assert!(!messages[0].read);

        let bobs_conversations = db.list_conversations(&bob).unwrap();
        assert_eq!(bobs_conversations.len(), 1);
        assert_eq!(bobs_conversations[0].id, conv);
        assert_eq!(bobs_conversations[0].peer_name, "Alice");
        assert_eq!(bobs_conversations[0].unread_count, 1);

        let notifications = db.list_notifications(&bob).unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, "new_message");
        assert_eq!(notifications[0].sender_id.as_deref(), Some(alice.as_str()));
        assert_eq!(notifications[0].conversation_id.as_deref(), Some(conv.as_str()));
    }

    #[test]
    fn both_directions_land_in_the_same_conversation() {
        let db = test_db();
        let alice = seed_user(&db, "alice@example.com", "Alice");
        let bob = seed_user(&db, "bob@example.com", "Bob");

        let conv_a = send(&db, &alice, &bob, "hi");
        let conv_b = send(&db, &bob, &alice, "hey");

        assert_eq!(conv_a, conv_b);
        assert_eq!(db.list_messages(&conv_a).unwrap().len(), 2);
        assert_eq!(db.list_conversations(&alice).unwrap().len(), 1);
    }

    #[test]
    fn mark_read_only_touches_the_recipients_messages() {
        let db = test_db();
        let alice = seed_user(&db, "alice@example.com", "Alice");
        let bob = seed_user(&db, "bob@example.com", "Bob");

        let conv = send(&db, &alice, &bob, "to bob");
        send(&db, &bob, &alice, "to alice");

        // Bob opens the conversation: only the message addressed to him flips.
        assert_eq!(db.mark_conversation_read(&conv, &bob).unwrap(), 1);

        let messages = db.list_messages(&conv).unwrap();
        let to_bob = messages.iter().find(|m| m.recipient_id == bob).unwrap();
        let to_alice = messages.iter().find(|m| m.recipient_id == alice).unwrap();
        assert!(to_bob.read);
        assert!(!to_alice.read);
    }

    #[test]
    fn status_toggle_cycles_and_notifies_owner() {
        let db = test_db();
        let owner = seed_user(&db, "a@example.com", "A");
        let listing = seed_listing(&db, &owner, "Phone", 100.0);

        let status = db
            .toggle_listing_status(&listing, &Uuid::new_v4().to_string())
            .unwrap();
        assert_eq!(status, Some(ListingStatus::Approved));

        let status = db
            .toggle_listing_status(&listing, &Uuid::new_v4().to_string())
            .unwrap();
        assert_eq!(status, Some(ListingStatus::Pending));

        let notifications = db.list_notifications(&owner).unwrap();
        assert_eq!(notifications.len(), 2);
        let kinds: Vec<&str> = notifications.iter().map(|n| n.kind.as_str()).collect();
        assert!(kinds.contains(&"listing_approved"));
        assert!(kinds.contains(&"listing_blocked"));
    }

    #[test]
    fn toggle_status_of_missing_listing_is_none() {
        let db = test_db();
        let status = db
            .toggle_listing_status(&Uuid::new_v4().to_string(), &Uuid::new_v4().to_string())
            .unwrap();
        assert_eq!(status, None);
    }

    #[test]
    fn toggle_user_blocked_flips_and_reports() {
        let db = test_db();
        let user = seed_user(&db, "a@example.com", "A");

        assert_eq!(db.toggle_user_blocked(&user).unwrap(), Some(true));
        assert_eq!(db.toggle_user_blocked(&user).unwrap(), Some(false));
        assert_eq!(db.toggle_user_blocked("missing").unwrap(), None);
    }

    #[test]
    fn delete_user_cascades_to_listings_and_favorites() {
        let db = test_db();
        let user = seed_user(&db, "a@example.com", "A");
        let listing = seed_listing(&db, &user, "Phone", 100.0);
        db.add_favorite(&Uuid::new_v4().to_string(), &user, &listing).unwrap();

        assert!(db.delete_user(&user).unwrap());
        assert!(db.get_listing(&listing).unwrap().is_none());
    }

    #[test]
    fn prune_removes_only_old_read_notifications() {
        let db = test_db();
        let owner = seed_user(&db, "a@example.com", "A");
        let listing = seed_listing(&db, &owner, "Phone", 100.0);

        // Three notifications: old+read, old+unread, recent+read.
        for _ in 0..3 {
            db.toggle_listing_status(&listing, &Uuid::new_v4().to_string()).unwrap();
        }
        let ids: Vec<String> = db
            .list_notifications(&owner)
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        db.mark_notification_read(&ids[0], &owner).unwrap();
        db.mark_notification_read(&ids[1], &owner).unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE notifications SET created_at = '2020-01-01 00:00:00' WHERE id IN (?1, ?2)",
                (&ids[1], &ids[2]),
            )?;
            Ok(())
        })
        .unwrap();

        // ids[1] is old+read, ids[2] is old+unread, ids[0] is recent+read.
        assert_eq!(db.prune_read_notifications(30).unwrap(), 1);
        let remaining: Vec<String> = db
            .list_notifications(&owner)
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert!(remaining.contains(&ids[0]));
        assert!(remaining.contains(&ids[2]));
        assert!(!remaining.contains(&ids[1]));
    }

    #[test]
    fn users_listed_with_listing_counts() {
        let db = test_db();
        let a = seed_user(&db, "a@example.com", "A");
        let b = seed_user(&db, "b@example.com", "B");
        seed_listing(&db, &a, "One", 10.0);
        seed_listing(&db, &a, "Two", 20.0);

        let users = db.list_users_with_listing_counts().unwrap();
        let row_a = users.iter().find(|u| u.id == a).unwrap();
        let row_b = users.iter().find(|u| u.id == b).unwrap();
        assert_eq!(row_a.listing_count, 2);
        assert_eq!(row_b.listing_count, 0);
    }
}
