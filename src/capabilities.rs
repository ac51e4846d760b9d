//! Collaborators the search page is handed instead of reaching for globals.

use crate::error::ClipboardError;
use async_trait::async_trait;

pub trait AuthContext {
    fn is_authenticated(&self) -> bool;
}

pub trait Navigator {
    fn redirect(&mut self, path: &str);
    fn query_param(&self, name: &str) -> Option<String>;
}

/// Blocking user prompts: a yes/no confirmation and a notice to acknowledge.
pub trait Dialogs {
    fn confirm(&mut self, message: &str) -> bool;
    fn notify(&mut self, message: &str);
}

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}
