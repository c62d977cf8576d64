//! Room queries.

use crate::{Database, DbResult};
use serde::{Deserialize, Serialize};

/// A chat room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRow {
    pub id: i64,
    pub name: String,
    /// Unix seconds.
    pub created_at: i64,
}

impl Database {
    /// Insert a room and return its id.
    pub async fn insert_room(&self, name: &str, created_at: i64) -> DbResult<i64> {
        let row: (i64,) =
            sqlx::query_as("INSERT INTO rooms (name, created_at) VALUES (?, ?) RETURNING id")
                .bind(name)
                .bind(created_at)
                .fetch_one(self.pool())
                .await?;
        Ok(row.0)
    }

    pub async fn get_room(&self, id: i64) -> DbResult<Option<RoomRow>> {
        let row: Option<(i64, String, i64)> =
            sqlx::query_as("SELECT id, name, created_at FROM rooms WHERE id = ?")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.map(|(id, name, created_at)| RoomRow {
            id,
            name,
            created_at,
        }))
    }

    /// Move a room's creation time (the all-time report starts at the first room).
    pub async fn set_room_created_at(&self, id: i64, created_at: i64) -> DbResult<bool> {
        let result = sqlx::query("UPDATE rooms SET created_at = ? WHERE id = ?")
            .bind(created_at)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Creation time of the oldest room, if any.
    pub async fn earliest_room_created_at(&self) -> DbResult<Option<i64>> {
        let row: (Option<i64>,) = sqlx::query_as("SELECT MIN(created_at) FROM rooms")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[tokio::test]
    async fn test_insert_and_get_room() {
        let db = Database::new_in_memory().await.unwrap();
        let id = db.insert_room("general", 1_700_000_000).await.unwrap();
        assert!(id > 0);

        let room = db.get_room(id).await.unwrap().unwrap();
        assert_eq!(room.name, "general");
        assert_eq!(room.created_at, 1_700_000_000);
        assert!(db.get_room(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_earliest_room_created_at() {
        let db = Database::new_in_memory().await.unwrap();
        assert_eq!(db.earliest_room_created_at().await.unwrap(), None);

        db.insert_room("b", 2_000).await.unwrap();
        let a = db.insert_room("a", 3_000).await.unwrap();
        assert_eq!(db.earliest_room_created_at().await.unwrap(), Some(2_000));

        assert!(db.set_room_created_at(a, 1_000).await.unwrap());
        assert_eq!(db.earliest_room_created_at().await.unwrap(), Some(1_000));
    }
}
