//! Opening external links in a new browsing context.

use std::sync::{Arc, Mutex, PoisonError};

use url::Url;

/// Host-side action that opens a link outside the widget.
///
/// Failures are the host's concern; the widget never reports them.
pub trait LinkOpener: Send + Sync + std::fmt::Debug {
    fn open(&self, url: &Url);
}

/// Opener that records every request so the host can act on it later.
#[derive(Debug, Clone, Default)]
pub struct RecordingOpener {
    opened: Arc<Mutex<Vec<Url>>>,
}

impl RecordingOpener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Links opened so far, oldest first.
    #[must_use]
    pub fn opened(&self) -> Vec<Url> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LinkOpener for RecordingOpener {
    fn open(&self, url: &Url) {
        tracing::info!(name: "widget.link.opened", url = %url, "Opening external link");
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.clone());
    }
}
