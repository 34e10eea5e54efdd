pub mod attendance;
pub mod cache;
pub mod core;
pub mod questions;
pub mod search;
