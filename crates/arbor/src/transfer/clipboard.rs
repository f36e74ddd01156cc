//! Clipboard backends.
//!
//! A [`TreeView`](crate::TreeView) writes copied nodes to a
//! [`ClipboardBackend`]. [`LocalClipboard`] keeps the payload in process and
//! can be shared between views by cloning it. With the `system-clipboard`
//! feature, [`SystemClipboard`] stores the payload on the platform clipboard
//! through `arboard`.

use std::sync::Arc;

use parking_lot::Mutex;

use super::mime::MimeData;
use crate::error::Result;

/// Transport for copied node payloads.
pub trait ClipboardBackend: Send + Sync {
    /// Replace the clipboard contents.
    fn write(&self, data: MimeData) -> Result<()>;

    /// Read the contents if they hold any of `types` (any type if empty).
    fn read(&self, types: &[&str]) -> Result<Option<MimeData>>;

    /// Whether the clipboard holds nothing.
    fn is_empty(&self) -> bool;
}

/// An in-process clipboard.
///
/// Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct LocalClipboard {
    contents: Arc<Mutex<MimeData>>,
}

impl LocalClipboard {
    /// Creates an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties the clipboard.
    pub fn clear(&self) {
        *self.contents.lock() = MimeData::new();
    }
}

impl ClipboardBackend for LocalClipboard {
    fn write(&self, data: MimeData) -> Result<()> {
        *self.contents.lock() = data;
        Ok(())
    }

    fn read(&self, types: &[&str]) -> Result<Option<MimeData>> {
        Ok(self.contents.lock().clone().matching(types))
    }

    fn is_empty(&self) -> bool {
        self.contents.lock().is_empty()
    }
}

#[cfg(feature = "system-clipboard")]
pub use system::SystemClipboard;

#[cfg(feature = "system-clipboard")]
mod system {
    use std::fmt;

    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};

    use super::ClipboardBackend;
    use crate::error::{Result, TreeError};
    use crate::transfer::mime::MimeData;

    const ENVELOPE_FORMAT: &str = "arbor-mime-1";

    #[derive(Serialize, Deserialize)]
    struct Envelope {
        format: String,
        payload: MimeData,
    }

    impl From<arboard::Error> for TreeError {
        fn from(err: arboard::Error) -> Self {
            TreeError::clipboard(err.to_string())
        }
    }

    /// The platform clipboard.
    ///
    /// Payloads are stored as a JSON envelope in the text slot so other
    /// applications see readable text. Plain text placed on the clipboard by
    /// other applications reads back as a single `text/plain` entry.
    pub struct SystemClipboard {
        inner: Mutex<arboard::Clipboard>,
    }

    impl SystemClipboard {
        /// Open the platform clipboard.
        ///
        /// # Errors
        ///
        /// Returns an error if the clipboard is unavailable, for example in a
        /// headless session.
        pub fn new() -> Result<Self> {
            Ok(Self {
                inner: Mutex::new(arboard::Clipboard::new()?),
            })
        }

        fn read_all(&self) -> Option<MimeData> {
            let text = self.inner.lock().get_text().ok()?;
            if text.is_empty() {
                return None;
            }
            match serde_json::from_str::<Envelope>(&text) {
                Ok(envelope) if envelope.format == ENVELOPE_FORMAT => Some(envelope.payload),
                _ => {
                    let mut data = MimeData::new();
                    data.push_text(text);
                    Some(data)
                }
            }
        }
    }

    impl ClipboardBackend for SystemClipboard {
        fn write(&self, data: MimeData) -> Result<()> {
            let envelope = Envelope {
                format: ENVELOPE_FORMAT.to_string(),
                payload: data,
            };
            let text = serde_json::to_string(&envelope)
                .map_err(|err| TreeError::clipboard(err.to_string()))?;
            self.inner.lock().set_text(text)?;
            Ok(())
        }

        fn read(&self, types: &[&str]) -> Result<Option<MimeData>> {
            Ok(self.read_all().and_then(|data| data.matching(types)))
        }

        fn is_empty(&self) -> bool {
            self.read_all().is_none()
        }
    }

    impl fmt::Debug for SystemClipboard {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("SystemClipboard").finish_non_exhaustive()
        }
    }
}
