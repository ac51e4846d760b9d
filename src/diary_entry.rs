use chrono::{DateTime, Local};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiaryEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(rename = "isPublic")]
    pub is_public: bool,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn label(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl DiaryEntry {
    pub fn visibility(&self) -> Visibility {
        if self.is_public {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }

    /// Formats an RFC 3339 timestamp in local time, or returns it untouched
    /// when the server sent something else.
    pub fn display_timestamp(raw: &str) -> String {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            Err(_) => raw.to_string(),
        }
    }
}
