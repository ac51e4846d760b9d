pub mod api;
pub mod auth;
pub mod capabilities;
pub mod clipboard;
pub mod config;
pub mod diary_entry;
pub mod error;
pub mod router;
pub mod search_page;
pub mod ui;
