//! Message queries and activity origin lookup.

use crate::{Database, DbResult};
use chatroom_reports_core::parse_date;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRow {
    pub id: i64,
    pub room_id: i64,
    pub sender: String,
    pub body: String,
    /// Unix seconds.
    pub created_at: i64,
}

impl Database {
    /// Insert a message and return its id.
    ///
    /// The room must exist (foreign keys are enforced).
    pub async fn insert_message(
        &self,
        room_id: i64,
        sender: &str,
        body: &str,
        created_at: i64,
    ) -> DbResult<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"INSERT INTO messages (room_id, sender, body, created_at)
               VALUES (?, ?, ?, ?) RETURNING id"#,
        )
        .bind(room_id)
        .bind(sender)
        .bind(body)
        .bind(created_at)
        .fetch_one(self.pool())
        .await?;
        Ok(row.0)
    }

    pub async fn get_message(&self, id: i64) -> DbResult<Option<MessageRow>> {
        let row: Option<(i64, i64, String, String, i64)> = sqlx::query_as(
            "SELECT id, room_id, sender, body, created_at FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(|(id, room_id, sender, body, created_at)| MessageRow {
            id,
            room_id,
            sender,
            body,
            created_at,
        }))
    }

    /// Re-stamp a message, e.g. when importing history.
    pub async fn set_message_created_at(&self, id: i64, created_at: i64) -> DbResult<bool> {
        let result = sqlx::query("UPDATE messages SET created_at = ? WHERE id = ?")
            .bind(created_at)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn earliest_message_created_at(&self) -> DbResult<Option<i64>> {
        let row: (Option<i64>,) = sqlx::query_as("SELECT MIN(created_at) FROM messages")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }

    /// Local calendar date where chat activity begins.
    ///
    /// The earlier of the first room and the first message, so history
    /// imported into a freshly created room still counts.
    pub async fn activity_origin(&self) -> DbResult<Option<NaiveDate>> {
        let row: (Option<String>,) = sqlx::query_as(
            r#"SELECT date(MIN(first), 'unixepoch', 'localtime')
               FROM (SELECT MIN(created_at) AS first FROM rooms
                     UNION ALL
                     SELECT MIN(created_at) FROM messages)"#,
        )
        .fetch_one(self.pool())
        .await?;
        Ok(row.0.as_deref().and_then(parse_date))
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;
    use chrono::{Local, NaiveDate, TimeZone};

    fn local_ts(y: i32, m: u32, d: u32) -> i64 {
        Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .single()
            .unwrap()
            .timestamp()
    }

    #[tokio::test]
    async fn test_insert_and_get_message() {
        let db = Database::new_in_memory().await.unwrap();
        let room = db.insert_room("general", 0).await.unwrap();
        let id = db.insert_message(room, "ana", "hello", 1_000).await.unwrap();

        let msg = db.get_message(id).await.unwrap().unwrap();
        assert_eq!(msg.room_id, room);
        assert_eq!(msg.sender, "ana");
        assert_eq!(msg.body, "hello");
        assert_eq!(msg.created_at, 1_000);
    }

    #[tokio::test]
    async fn test_message_requires_room() {
        let db = Database::new_in_memory().await.unwrap();
        assert!(db.insert_message(42, "ana", "orphan", 1_000).await.is_err());
    }

    #[tokio::test]
    async fn test_set_message_created_at() {
        let db = Database::new_in_memory().await.unwrap();
        let room = db.insert_room("general", 0).await.unwrap();
        let id = db.insert_message(room, "ana", "hi", 1_000).await.unwrap();

        assert!(db.set_message_created_at(id, 5_000).await.unwrap());
        assert_eq!(db.get_message(id).await.unwrap().unwrap().created_at, 5_000);
        assert!(!db.set_message_created_at(id + 10, 5_000).await.unwrap());
    }

    #[tokio::test]
    async fn test_activity_origin_takes_earliest_activity() {
        let db = Database::new_in_memory().await.unwrap();
        assert_eq!(db.activity_origin().await.unwrap(), None);

        let room = db.insert_room("general", local_ts(2020, 1, 1)).await.unwrap();
        assert_eq!(
            db.activity_origin().await.unwrap(),
            NaiveDate::from_ymd_opt(2020, 1, 1)
        );

        // Imported history older than the room.
        db.insert_message(room, "ana", "hi", local_ts(2019, 6, 1))
            .await
            .unwrap();
        assert_eq!(
            db.activity_origin().await.unwrap(),
            NaiveDate::from_ymd_opt(2019, 6, 1)
        );

        db.insert_message(room, "bo", "hey", local_ts(2021, 2, 2))
            .await
            .unwrap();
        assert_eq!(
            db.activity_origin().await.unwrap(),
            NaiveDate::from_ymd_opt(2019, 6, 1)
        );
    }

    #[tokio::test]
    async fn test_activity_origin_uses_oldest_room() {
        let db = Database::new_in_memory().await.unwrap();
        db.insert_room("late", local_ts(2022, 5, 5)).await.unwrap();
        db.insert_room("early", local_ts(2021, 3, 3)).await.unwrap();

        assert_eq!(
            db.activity_origin().await.unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 3)
        );
    }
}
