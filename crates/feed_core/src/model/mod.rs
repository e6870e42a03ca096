//! Feed domain model.
//!
//! # Responsibility
//! - Define the records owned by the item store (items, content, like marks).
//! - Define read models returned to callers (item summaries, author profiles).
//! - Define the keyset position and its opaque cursor encoding.
//!
//! # Invariants
//! - Every item is identified by a stable `ItemId` and never reused.
//! - Like and reply counts are derived from rows, never stored.

pub mod cursor;
pub mod item;
