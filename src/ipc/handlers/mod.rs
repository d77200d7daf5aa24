pub mod admin;
pub mod core;
pub mod roster;
pub mod scan;
