//! Attendance check-in sidecar.
//!
//! A scanner submits `"<full name> <classCode>"`; the name is folded and
//! looked up in a cached index over every class's attendance sheet, the class
//! is checked, today's column is found in the sheet header, and the arrival
//! time decides which status (if any) is written.

pub mod cache;
pub mod checkin;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod ipc;
pub mod locator;
pub mod normalize;
pub mod registry;
pub mod resolver;
pub mod roster;
pub mod store;
