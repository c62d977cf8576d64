//! Shared fixtures for database integration tests.
#![allow(dead_code)]

use chatroom_reports_db::Database;
use chrono::{Local, NaiveDate, TimeZone};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
}

/// Unix timestamp of local noon on `day`. Noon keeps fixtures clear of DST gaps.
pub fn local_noon(day: NaiveDate) -> i64 {
    let naive = day.and_hms_opt(12, 0, 0).expect("valid time");
    Local
        .from_local_datetime(&naive)
        .earliest()
        .expect("local noon exists")
        .timestamp()
}

pub async fn seed_room(db: &Database, day: NaiveDate) -> i64 {
    db.insert_room("general", local_noon(day))
        .await
        .expect("insert room")
}

/// Post one message from `sender` on `day`, creating a room for it.
pub async fn seed_message(db: &Database, sender: &str, day: NaiveDate) -> i64 {
    let room = seed_room(db, day).await;
    seed_message_in(db, room, sender, day).await
}

pub async fn seed_message_in(db: &Database, room: i64, sender: &str, day: NaiveDate) -> i64 {
    db.insert_message(room, sender, "hello", local_noon(day))
        .await
        .expect("insert message")
}
