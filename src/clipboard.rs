//! The system clipboard behind the `+` and `*` registers.

use tracing::{debug, warn};

use crate::traits::Clipboard;

/// A [`Clipboard`] backed by the operating system clipboard.
pub struct SystemClipboard {
    inner: arboard::Clipboard,
}

impl SystemClipboard {
    /// Connects to the system clipboard. `None` when no clipboard is
    /// available, e.g. on a headless machine.
    pub fn new() -> Option<Self> {
        match arboard::Clipboard::new() {
            Ok(inner) => Some(Self { inner }),
            Err(err) => {
                warn!(%err, "system clipboard unavailable");
                None
            }
        }
    }
}

impl Clipboard for SystemClipboard {
    fn get(&mut self) -> Option<String> {
        self.inner
            .get_text()
            .inspect_err(|err| debug!(%err, "clipboard read failed"))
            .ok()
    }

    fn set(&mut self, text: String) {
        if let Err(err) = self.inner.set_text(text) {
            warn!(%err, "clipboard write failed");
        }
    }
}
