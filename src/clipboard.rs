use crate::capabilities::Clipboard;
use crate::error::ClipboardError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// System clipboard via arboard, opened on first use.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Arc<Mutex<Option<arboard::Clipboard>>>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

fn write_blocking(
    slot: &Mutex<Option<arboard::Clipboard>>,
    text: String,
) -> Result<(), ClipboardError> {
    let mut slot = slot
        .lock()
        .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;

    if slot.is_none() {
        let clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        *slot = Some(clipboard);
    }

    match slot.as_mut() {
        Some(clipboard) => clipboard
            .set_text(text)
            .map_err(|e| ClipboardError::Write(e.to_string())),
        None => Err(ClipboardError::Unavailable("not initialized".to_string())),
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        // arboard talks to the display server synchronously
        let inner = Arc::clone(&self.inner);
        let owned = text.to_owned();
        tokio::task::spawn_blocking(move || write_blocking(&inner, owned))
            .await
            .map_err(|e| ClipboardError::Unavailable(e.to_string()))??;
        debug!(len = text.len(), "copied to clipboard");
        Ok(())
    }
}
