use crate::Database;
use crate::models::{CategoryRow, EventRow, UserRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, external_id: &str, email: &str, api_key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, external_id, email, api_key) VALUES (?1, ?2, ?3, ?4)",
                (id, external_id, email, api_key),
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_api_key(&self, api_key: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "api_key", api_key))
    }

    pub fn get_user_by_external_id(&self, external_id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "external_id", external_id))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    pub fn set_discord_id(&self, user_id: &str, discord_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET discord_id = ?1, updated_at = datetime('now') WHERE id = ?2",
                (discord_id, user_id),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn set_plan(&self, user_id: &str, plan: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET plan = ?1, updated_at = datetime('now') WHERE id = ?2",
                (plan, user_id),
            )?;
            Ok(changed > 0)
        })
    }

    // -- Categories --

    pub fn create_category(
        &self,
        id: &str,
        user_id: &str,
        name: &str,
        emoji: Option<&str>,
        color: i64,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO event_categories (id, user_id, name, emoji, color) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, user_id, name, emoji, color],
            )?;
            Ok(())
        })
    }

    pub fn get_category(&self, user_id: &str, name: &str) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, emoji, color, created_at, updated_at
                 FROM event_categories WHERE user_id = ?1 AND name = ?2",
            )?;
            stmt.query_row((user_id, name), category_from_row).optional()
        })
    }

    pub fn list_categories(&self, user_id: &str) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, emoji, color, created_at, updated_at
                 FROM event_categories WHERE user_id = ?1
                 ORDER BY updated_at DESC, name ASC",
            )?;
            let rows = stmt
                .query_map([user_id], category_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_categories(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM event_categories WHERE user_id = ?1",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Delete a category by name. Owned events go with it (FK cascade).
    pub fn delete_category(&self, user_id: &str, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM event_categories WHERE user_id = ?1 AND name = ?2",
                (user_id, name),
            )?;
            Ok(changed > 0)
        })
    }

    // -- Category stats --

    pub fn events_count_since(&self, category_id: &str, since: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM events WHERE category_id = ?1 AND created_at >= ?2",
                (category_id, since),
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Raw `fields` JSON of every event since `since` — the caller collects
    /// distinct field names across them.
    pub fn event_fields_since(&self, category_id: &str, since: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT fields FROM events WHERE category_id = ?1 AND created_at >= ?2",
            )?;
            let rows = stmt
                .query_map((category_id, since), |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    pub fn last_event_at(&self, category_id: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT created_at FROM events WHERE category_id = ?1
                 ORDER BY created_at DESC LIMIT 1",
                [category_id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    // -- Events --

    pub fn insert_event(
        &self,
        id: &str,
        category_id: &str,
        user_id: &str,
        name: &str,
        formatted_message: &str,
        fields_json: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO events (id, category_id, user_id, name, formatted_message, fields)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, category_id, user_id, name, formatted_message, fields_json],
            )?;
            Ok(())
        })
    }

    pub fn set_event_status(&self, event_id: &str, status: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE events SET delivery_status = ?1 WHERE id = ?2",
                (status, event_id),
            )?;
            Ok(())
        })
    }

    pub fn get_event(&self, event_id: &str) -> Result<Option<EventRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, category_id, user_id, name, formatted_message, fields, delivery_status, created_at
                 FROM events WHERE id = ?1",
            )?;
            stmt.query_row([event_id], event_from_row).optional()
        })
    }

    /// Newest-first event feed for a category. `before` is the `created_at`
    /// of the oldest event from the previous page.
    pub fn list_events(&self, category_id: &str, limit: u32, before: Option<&str>) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| query_events(conn, category_id, limit, before))
    }

    // -- Quotas --

    pub fn get_quota_count(&self, user_id: &str, month: u32, year: i32) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn
                .query_row(
                    "SELECT count FROM quotas WHERE user_id = ?1 AND month = ?2 AND year = ?3",
                    rusqlite::params![user_id, month, year],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(count.unwrap_or(0))
        })
    }

    /// Atomic increment-or-create. Two concurrent first-events of a month
    /// both land: final count 2, no lost update.
    pub fn increment_quota(&self, user_id: &str, month: u32, year: i32) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO quotas (user_id, month, year, count) VALUES (?1, ?2, ?3, 1)
                 ON CONFLICT(user_id, month, year)
                 DO UPDATE SET count = count + 1, updated_at = datetime('now')",
                rusqlite::params![user_id, month, year],
            )?;
            Ok(())
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is always a literal from the methods above, never user input.
    let sql = format!(
        "SELECT id, external_id, email, api_key, discord_id, plan, created_at, updated_at
         FROM users WHERE {} = ?1",
        column
    );
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                external_id: row.get(1)?,
                email: row.get(2)?,
                api_key: row.get(3)?,
                discord_id: row.get(4)?,
                plan: row.get(5)?,
                created_at: row.get(6)?,
                updated_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn category_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<CategoryRow, rusqlite::Error> {
    Ok(CategoryRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        emoji: row.get(3)?,
        color: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn event_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<EventRow, rusqlite::Error> {
    Ok(EventRow {
        id: row.get(0)?,
        category_id: row.get(1)?,
        user_id: row.get(2)?,
        name: row.get(3)?,
        formatted_message: row.get(4)?,
        fields: row.get(5)?,
        delivery_status: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn query_events(
    conn: &Connection,
    category_id: &str,
    limit: u32,
    before: Option<&str>,
) -> Result<Vec<EventRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, category_id, user_id, name, formatted_message, fields, delivery_status, created_at
         FROM events
         WHERE category_id = ?1 AND (?2 IS NULL OR created_at < ?2)
         ORDER BY created_at DESC
         LIMIT ?3",
    )?;

    let rows = stmt
        .query_map(rusqlite::params![category_id, before, limit], event_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, suffix: &str) -> String {
        let id = format!("user-{}", suffix);
        db.create_user(
            &id,
            &format!("ext-{}", suffix),
            &format!("{}@example.com", suffix),
            &format!("key-{}", suffix),
        )
        .unwrap();
        id
    }

    fn seed_category(db: &Database, user_id: &str, name: &str) -> String {
        let id = format!("cat-{}-{}", user_id, name);
        db.create_category(&id, user_id, name, Some("💰"), 0xFF6B6B).unwrap();
        id
    }

    fn backdate_event(db: &Database, event_id: &str, created_at: &str) {
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE events SET created_at = ?1 WHERE id = ?2",
                (created_at, event_id),
            )?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn user_lookup_paths() {
        let db = test_db();
        let id = seed_user(&db, "a");

        let by_key = db.get_user_by_api_key("key-a").unwrap().unwrap();
        assert_eq!(by_key.id, id);
        assert_eq!(by_key.plan, "FREE");
        assert!(by_key.discord_id.is_none());

        assert!(db.get_user_by_api_key("nope").unwrap().is_none());
        assert!(db.get_user_by_external_id("ext-a").unwrap().is_some());
        assert!(db.get_user_by_id(&id).unwrap().is_some());
    }

    #[test]
    fn discord_id_and_plan_updates() {
        let db = test_db();
        let id = seed_user(&db, "a");

        assert!(db.set_discord_id(&id, "1234567890").unwrap());
        assert!(db.set_plan(&id, "PRO").unwrap());

        let user = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.discord_id.as_deref(), Some("1234567890"));
        assert_eq!(user.plan, "PRO");

        assert!(!db.set_plan("missing", "PRO").unwrap());
    }

    #[test]
    fn category_names_unique_per_user() {
        let db = test_db();
        let alice = seed_user(&db, "alice");
        let bob = seed_user(&db, "bob");

        seed_category(&db, &alice, "sale");
        assert!(db.create_category("dup", &alice, "sale", None, 0).is_err());
        // Same name under a different user is fine.
        seed_category(&db, &bob, "sale");

        assert_eq!(db.count_categories(&alice).unwrap(), 1);
        let found = db.get_category(&alice, "sale").unwrap().unwrap();
        assert_eq!(found.color, 0xFF6B6B);
        assert!(db.get_category(&alice, "signup").unwrap().is_none());
    }

    #[test]
    fn delete_category_cascades_events() {
        let db = test_db();
        let user = seed_user(&db, "a");
        let cat = seed_category(&db, &user, "sale");

        db.insert_event("ev-1", &cat, &user, "sale", "msg", "{}").unwrap();
        assert!(db.get_event("ev-1").unwrap().is_some());

        assert!(db.delete_category(&user, "sale").unwrap());
        assert!(db.get_event("ev-1").unwrap().is_none());
        assert!(!db.delete_category(&user, "sale").unwrap());
    }

    #[test]
    fn event_status_written_once_after_creation() {
        let db = test_db();
        let user = seed_user(&db, "a");
        let cat = seed_category(&db, &user, "sale");

        db.insert_event("ev-1", &cat, &user, "sale", "msg", r#"{"amount":42}"#).unwrap();
        let event = db.get_event("ev-1").unwrap().unwrap();
        assert_eq!(event.delivery_status, "PENDING");

        db.set_event_status("ev-1", "DELIVERED").unwrap();
        let event = db.get_event("ev-1").unwrap().unwrap();
        assert_eq!(event.delivery_status, "DELIVERED");
        assert_eq!(event.fields, r#"{"amount":42}"#);
    }

    #[test]
    fn quota_upsert_never_loses_an_increment() {
        let db = test_db();
        let user = seed_user(&db, "a");

        assert_eq!(db.get_quota_count(&user, 7, 2026).unwrap(), 0);

        // Two first-events-of-the-month: both increments land.
        db.increment_quota(&user, 7, 2026).unwrap();
        db.increment_quota(&user, 7, 2026).unwrap();
        assert_eq!(db.get_quota_count(&user, 7, 2026).unwrap(), 2);

        // Periods are independent.
        db.increment_quota(&user, 8, 2026).unwrap();
        assert_eq!(db.get_quota_count(&user, 8, 2026).unwrap(), 1);
        assert_eq!(db.get_quota_count(&user, 7, 2026).unwrap(), 2);
    }

    #[test]
    fn month_window_stats() {
        let db = test_db();
        let user = seed_user(&db, "a");
        let cat = seed_category(&db, &user, "sale");

        db.insert_event("old", &cat, &user, "sale", "msg", r#"{"a":1}"#).unwrap();
        backdate_event(&db, "old", "2026-06-15 10:00:00");
        db.insert_event("new-1", &cat, &user, "sale", "msg", r#"{"a":1,"b":2}"#).unwrap();
        backdate_event(&db, "new-1", "2026-07-02 08:00:00");
        db.insert_event("new-2", &cat, &user, "sale", "msg", r#"{"c":true}"#).unwrap();
        backdate_event(&db, "new-2", "2026-07-03 09:30:00");

        let since = "2026-07-01 00:00:00";
        assert_eq!(db.events_count_since(&cat, since).unwrap(), 2);

        let fields = db.event_fields_since(&cat, since).unwrap();
        assert_eq!(fields.len(), 2);
        assert!(fields.contains(&r#"{"a":1,"b":2}"#.to_string()));

        assert_eq!(db.last_event_at(&cat).unwrap().as_deref(), Some("2026-07-03 09:30:00"));
        assert_eq!(db.last_event_at("missing").unwrap(), None);
    }

    #[test]
    fn event_feed_pagination() {
        let db = test_db();
        let user = seed_user(&db, "a");
        let cat = seed_category(&db, &user, "sale");

        for (id, ts) in [
            ("ev-1", "2026-07-01 00:00:01"),
            ("ev-2", "2026-07-01 00:00:02"),
            ("ev-3", "2026-07-01 00:00:03"),
        ] {
            db.insert_event(id, &cat, &user, "sale", "msg", "{}").unwrap();
            backdate_event(&db, id, ts);
        }

        let page = db.list_events(&cat, 2, None).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "ev-3");
        assert_eq!(page[1].id, "ev-2");

        let next = db.list_events(&cat, 2, Some(&page[1].created_at)).unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, "ev-1");
    }
}
