use std::sync::Arc;

use parking_lot::Mutex;
use vim_core::Clipboard;

/// A clipboard whose contents the test can inspect after handing it to an
/// engine.
#[derive(Default, Debug, Clone)]
pub struct MockClipboard {
    content: Arc<Mutex<Option<String>>>,
}

#[allow(dead_code)]
impl MockClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.content.lock().clone()
    }
}

impl Clipboard for MockClipboard {
    fn get(&mut self) -> Option<String> {
        self.content.lock().clone()
    }

    fn set(&mut self, text: String) {
        *self.content.lock() = Some(text);
    }
}
