// crates/db/src/queries/mod.rs
// Query methods on `Database`, grouped by table.

pub mod messages;
pub mod participants;
pub mod rooms;
pub mod settings;
