//! Database access layer for confman-server
//!
//! One module per table. Functions take `&SqlitePool`, except those that must
//! share a caller's transaction, which take `&mut SqliteConnection`.

pub mod codes;
pub mod conferences;
pub mod registrations;
pub mod reviews;
pub mod settings;
pub mod submissions;
pub mod users;
