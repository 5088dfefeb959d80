pub mod api;
pub mod common;
pub mod config;
pub mod logging;
pub mod ui;
pub mod users;
